//! Admin bearer tokens and password verification.
//!
//! Tokens are signed, time-limited HS256 JWTs issued against the single
//! configured admin password. The password may be supplied as plain text
//! or pre-hashed (`sha256:<hex>`); comparison is constant-time either way.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Issued tokens live for 24 hours.
pub const ADMIN_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum AuthTokenError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Claims embedded in an admin token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates admin bearer tokens.
#[derive(Clone)]
pub struct AdminTokenService {
    secret: Arc<SecretString>,
}

impl AdminTokenService {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret: Arc::new(secret),
        }
    }

    /// Generate a fresh admin token; returns the token and its TTL in
    /// seconds.
    pub fn generate(&self) -> Result<(String, i64), AuthTokenError> {
        let now = Utc::now();
        let claims = AdminClaims {
            role: "admin".to_string(),
            iat: now.timestamp(),
            exp: (now + ChronoDuration::seconds(ADMIN_TOKEN_TTL_SECS)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )?;
        Ok((token, ADMIN_TOKEN_TTL_SECS))
    }

    pub fn verify(&self, token: &str) -> Result<AdminClaims, AuthTokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthTokenError::TokenExpired,
            _ => AuthTokenError::InvalidToken,
        })?;
        Ok(data.claims)
    }
}

/// Check a login attempt against the configured admin password.
///
/// The configured value is either the plain password or its SHA-256
/// digest in the form `sha256:<hex>`.
pub fn verify_password(candidate: &str, configured: &SecretString) -> bool {
    let configured = configured.expose_secret();
    match configured.strip_prefix("sha256:") {
        Some(expected_hex) => {
            let digest = Sha256::digest(candidate.as_bytes());
            let candidate_hex: String =
                digest.iter().map(|b| format!("{b:02x}")).collect();
            candidate_hex
                .as_bytes()
                .ct_eq(expected_hex.trim().to_lowercase().as_bytes())
                .into()
        }
        None => candidate.as_bytes().ct_eq(configured.as_bytes()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AdminTokenService {
        AdminTokenService::new(SecretString::from("test-secret"))
    }

    #[test]
    fn issued_tokens_verify_with_role_admin() {
        let service = service();
        let (token, expires_in) = service.generate().unwrap();
        assert_eq!(expires_in, ADMIN_TOKEN_TTL_SECS);

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let (token, _) = service().generate().unwrap();
        let other = AdminTokenService::new(SecretString::from("other-secret"));
        assert!(matches!(
            other.verify(&token),
            Err(AuthTokenError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(service().verify("not-a-token").is_err());
    }

    #[test]
    fn plain_passwords_compare_directly() {
        let configured = SecretString::from("hunter2");
        assert!(verify_password("hunter2", &configured));
        assert!(!verify_password("hunter3", &configured));
    }

    #[test]
    fn hashed_passwords_compare_by_digest() {
        // sha256("hunter2")
        let configured = SecretString::from(
            "sha256:f52fbd32b2b3b86ff88ef6c490628285f482af15ddcb29541f94bcf526a3f6c7",
        );
        assert!(verify_password("hunter2", &configured));
        assert!(!verify_password("hunter3", &configured));
    }
}
