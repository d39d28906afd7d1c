//! HS256 session tokens issued to CMS administrators.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the cookie the admin UI stores its session token in.
pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminClaims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

pub fn create_token(secret: &str, subject: &str, expire_secs: u64) -> Result<String, TokenError> {
    let now = Utc::now().timestamp().max(0) as u64;
    let claims = AdminClaims {
        sub: subject.to_string(),
        iat: now,
        exp: now + expire_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

pub fn validate_token(secret: &str, token: &str) -> Result<AdminClaims, TokenError> {
    decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

/// Pull the session token out of a raw `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let token = create_token("secret", "admin", 60).unwrap();
        let claims = validate_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp, claims.iat + 60);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_token("secret", "admin", 60).unwrap();
        assert_eq!(validate_token("other", &token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now().timestamp() as u64;
        let claims = AdminClaims {
            sub: "admin".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(validate_token("secret", &token), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_from_cookie_header() {
        assert_eq!(
            token_from_cookie_header("theme=dark; token=abc.def.ghi; lang=en"),
            Some("abc.def.ghi")
        );
        assert_eq!(token_from_cookie_header("theme=dark"), None);
        assert_eq!(token_from_cookie_header("token="), None);
    }
}
