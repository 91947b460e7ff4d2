//! Token authentication.
//!
//! Requests carry `Authorization: Token <jwt>` (or `Bearer <jwt>`) signed
//! with HS256. The `id` claim names the acting user.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use common::{Identity, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Deserializer, Serialize, de};
use store::Store;
use thiserror::Error;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingToken,

    #[error("authorization header must use the Token or Bearer scheme")]
    MalformedHeader,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token does not name a valid user")]
    InvalidSubject,

    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(deserialize_with = "user_id_claim")]
    id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Accepts the id as an integer or as a whole float, which is how some
/// issuers encode JSON numbers.
fn user_id_claim<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(id) => Ok(id),
        Raw::Float(id) if id.fract() == 0.0 => Ok(id as i64),
        Raw::Float(id) => Err(de::Error::custom(format!("invalid user id {id}"))),
    }
}

/// Verifies request tokens. Built once from configuration and shared.
#[derive(Clone)]
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier").finish_non_exhaustive()
    }
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Long-lived app tokens carry no expiry; `exp` is enforced when present
        validation.set_required_spec_claims::<&str>(&[]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issues a token for a user, valid for `ttl`.
    pub fn sign(&self, user_id: UserId, ttl: chrono::Duration) -> Result<String, AuthError> {
        let claims = Claims {
            id: user_id.as_i64(),
            exp: Some((Utc::now() + ttl).timestamp()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Identity::new(UserId::new(data.claims.id)).ok_or(AuthError::InvalidSubject)
    }

    /// Verifies the value of an `Authorization` header.
    pub fn verify_header(&self, header: &str) -> Result<Identity, AuthError> {
        let token = header
            .strip_prefix("Token ")
            .or_else(|| header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedHeader)?;

        self.verify(token)
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Identity);

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let identity = state.verifier.verify_header(header).inspect_err(|e| {
            tracing::debug!(error = %e, "request rejected");
        })?;

        Ok(Self(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> JwtVerifier {
        JwtVerifier::new("test-secret")
    }

    #[test]
    fn test_signed_token_round_trips() {
        let verifier = verifier();
        let token = verifier
            .sign(UserId::new(7), chrono::Duration::hours(1))
            .unwrap();

        let identity = verifier.verify_header(&format!("Token {token}")).unwrap();
        assert_eq!(identity.user_id(), UserId::new(7));

        let identity = verifier.verify_header(&format!("Bearer {token}")).unwrap();
        assert_eq!(identity.user_id(), UserId::new(7));
    }

    #[test]
    fn test_other_scheme_is_malformed() {
        let err = verifier().verify_header("Basic abc").unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader));

        let err = verifier().verify_header("Token ").unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtVerifier::new("other")
            .sign(UserId::new(7), chrono::Duration::hours(1))
            .unwrap();

        let err = verifier().verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let verifier = verifier();
        let token = verifier
            .sign(UserId::new(7), chrono::Duration::hours(-2))
            .unwrap();

        let err = verifier.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn test_token_without_expiry_is_accepted() {
        let secret = EncodingKey::from_secret(b"test-secret");
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "id": 12.0, "email": "budi@example.com" }),
            &secret,
        )
        .unwrap();

        let identity = verifier().verify(&token).unwrap();
        assert_eq!(identity.user_id(), UserId::new(12));
    }

    #[test]
    fn test_non_positive_id_is_rejected() {
        let verifier = verifier();
        let token = verifier
            .sign(UserId::new(0), chrono::Duration::hours(1))
            .unwrap();

        let err = verifier.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSubject));
    }
}
