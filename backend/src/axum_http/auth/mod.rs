use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error_responses::json_error;

/// Claims of a staff token. Tokens are issued elsewhere and signed with the shared HS256 secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffClaims {
    pub sub: String,
    pub role: String,
    pub email: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffRole {
    Admin,
    Staff,
}

impl StaffRole {
    fn from_claim(role: &str) -> Option<Self> {
        match role {
            "admin" => Some(StaffRole::Admin),
            "staff" => Some(StaffRole::Staff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffUser {
    pub subject: String,
    pub email: Option<String>,
    pub role: StaffRole,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    MissingToken,
    #[error("token validation failed")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("role {0:?} may not use staff routes")]
    Forbidden(String),
    #[error("staff token keys are not configured")]
    NotConfigured,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        };
        json_error(status, self.to_string())
    }
}

/// Shared through an `Extension` layer so every staff route validates with the same key.
#[derive(Clone)]
pub struct StaffTokenKeys {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl StaffTokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn validate(&self, token: &str) -> Result<StaffUser, AuthError> {
        let token_data = decode::<StaffClaims>(token, &self.decoding_key, &self.validation)
            .map_err(AuthError::InvalidToken)?;
        let claims = token_data.claims;

        let role =
            StaffRole::from_claim(&claims.role).ok_or(AuthError::Forbidden(claims.role.clone()))?;

        Ok(StaffUser {
            subject: claims.sub,
            email: claims.email,
            role,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = parts
            .extensions
            .get::<Arc<StaffTokenKeys>>()
            .cloned()
            .ok_or(AuthError::NotConfigured)?;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::MissingToken)?;

        keys.validate(bearer.token()).inspect_err(|err| {
            warn!(error = %err, path = %parts.uri.path(), "auth: staff token rejected");
        })
    }
}
