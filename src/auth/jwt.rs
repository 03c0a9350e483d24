use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::hub::UserId;

use super::Claims;

pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(config: &JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::default();

        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = config.audience {
            validation.set_audience(&[audience]);
        }

        Self {
            decoding_key,
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate a token and resolve the user it was issued to
    pub fn resolve_user(&self, token: &str) -> Result<UserId, AppError> {
        self.validate(token)?.user_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn create_test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            issuer: None,
            audience: None,
        }
    }

    fn create_test_token(sub: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
            extra: Default::default(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_resolves_user() {
        let config = create_test_config();
        let validator = JwtValidator::new(&config);

        let token = create_test_token("123", &config.secret);
        assert_eq!(validator.resolve_user(&token).unwrap(), UserId(123));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let validator = JwtValidator::new(&create_test_config());
        let token = create_test_token("123", "another-secret");
        assert!(validator.resolve_user(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let validator = JwtValidator::new(&create_test_config());
        assert!(validator.validate("invalid-token").is_err());
    }

    #[test]
    fn test_non_positive_subject_rejected() {
        let config = create_test_config();
        let validator = JwtValidator::new(&config);

        for sub in ["0", "-3"] {
            let token = create_test_token(sub, &config.secret);
            assert!(matches!(validator.resolve_user(&token), Err(AppError::Auth(_))));
        }
    }
}
