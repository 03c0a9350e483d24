//! Token validation: resolves the user id a connection belongs to.

mod claims;
mod jwt;
mod token;

pub use claims::Claims;
pub use jwt::JwtValidator;
pub use token::{extract_token, TokenQuery, AUTH_COOKIE};
