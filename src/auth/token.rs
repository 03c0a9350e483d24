use axum::http::{header, HeaderMap};
use serde::Deserialize;

/// Cookie carrying the bearer token for browser clients
pub const AUTH_COOKIE: &str = "X-Authorization";

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Extract a token from the query string, the auth cookie, or the
/// Authorization header, in that order
pub fn extract_token(query: &TokenQuery, headers: &HeaderMap) -> Option<String> {
    if let Some(ref token) = query.token {
        return Some(token.clone());
    }

    if let Some(token) = cookie_token(headers) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| {
            let value = value.trim_matches('"');
            value.strip_prefix("Bearer ").unwrap_or(value).to_string()
        })
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_query_token_wins() {
        let query = TokenQuery {
            token: Some("q".to_string()),
        };
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer h"));

        assert_eq!(extract_token(&query, &headers), Some("q".to_string()));
    }

    #[test]
    fn test_cookie_token_strips_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; X-Authorization=Bearer abc.def"),
        );

        assert_eq!(
            extract_token(&TokenQuery::default(), &headers),
            Some("abc.def".to_string())
        );
    }

    #[test]
    fn test_empty_cookie_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("X-Authorization="));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer h"));

        assert_eq!(
            extract_token(&TokenQuery::default(), &headers),
            Some("h".to_string())
        );
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(extract_token(&TokenQuery::default(), &HeaderMap::new()), None);
    }
}
