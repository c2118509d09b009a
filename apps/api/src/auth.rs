//! Bearer-token sessions.
//!
//! Tokens are HS256 JWTs whose `sub` is the user's id. They are minted by the
//! sign-in flow (or [`issue_token`]) and checked by the [`AuthUser`] extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Session lifetime for issued tokens.
const TOKEN_TTL_SECS: i64 = 60 * 60 * 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

pub fn issue_token(user_id: Uuid, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        exp: now + TOKEN_TTL_SECS,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// The user behind the request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl AuthUser {
    /// Rejects requests that name a different user than the session's.
    pub fn ensure_owner(&self, user_id: Option<Uuid>) -> Result<(), AppError> {
        match user_id {
            Some(id) if id != self.user_id => Err(AppError::Forbidden),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let claims = validate_token(token, &state.config.jwt_secret).map_err(|e| {
            tracing::debug!("Rejected bearer token: {e}");
            AppError::Unauthorized
        })?;

        Ok(AuthUser { user_id: claims.sub })
    }
}
