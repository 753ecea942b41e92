use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::config::AuthConfig;
use crate::error::AppError;

/// Claims embedded in every session token. Validity is decided purely by
/// the signature and the expiry; there is no server-side session lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token asserts
    pub username: String,
    /// Standard JWT expiry (Unix timestamp, seconds)
    pub exp: usize,
}

/// Verified identity handed to protected handlers as a request extension
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
}

/// Issues and verifies HS256-signed session tokens
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            ttl: Duration::hours(config.token_ttl_hours),
        }
    }

    /// Sign a token asserting the given username, expiring after the
    /// configured lifetime
    pub fn issue(&self, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            username: username.to_string(),
            exp: (Utc::now() + self.ttl).timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Verify signature and expiry, returning the validated claims
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }
}

/// Middleware guarding the protected routes. Rejects requests without a
/// valid bearer token and exposes the verified username to handlers as a
/// typed [`AuthenticatedUser`] extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = state
        .tokens
        .verify(token)
        .map_err(|_| AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthenticatedUser {
        username: claims.username,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig {
            secret: "test-secret".to_string(),
            token_ttl_hours: 24,
        })
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let issuer = test_issuer();
        let token = issuer.issue("alice").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn test_expiry_is_24_hours_out() {
        let issuer = test_issuer();
        let token = issuer.issue("alice").unwrap();
        let claims = issuer.verify(&token).unwrap();

        let expected = (Utc::now() + Duration::hours(24)).timestamp() as usize;
        // Allow a few seconds of slack for test execution time
        assert!(claims.exp.abs_diff(expected) <= 5);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = test_issuer();
        let claims = Claims {
            username: "alice".to_string(),
            // Two hours in the past, well beyond the default leeway
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = test_issuer();
        let token = issuer.issue("alice").unwrap();

        let other = TokenIssuer::new(&AuthConfig {
            secret: "other-secret".to_string(),
            token_ttl_hours: 24,
        });
        assert!(other.verify(&token).is_err());
    }
}
