use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flyeasy_core::models::User;
use flyeasy_core::Actor;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("malformed subject: {0}")]
    MalformedSubject(String),
    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn for_user(user: &User, now: DateTime<Utc>, ttl_seconds: u64) -> Self {
        Self {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.to_string(),
            exp: (now + Duration::seconds(ttl_seconds as i64)).timestamp() as usize,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::MalformedSubject(self.sub.clone()))
    }
}

pub fn issue_token(auth: &AuthConfig, claims: &Claims) -> Result<String, AuthError> {
    Ok(encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(auth.secret.as_bytes()),
    )?)
}

pub fn decode_token(auth: &AuthConfig, token: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Resolves the bearer token to a live account and injects its `Actor`.
/// The role comes from the stored user, not the token, so demotions apply
/// immediately.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AuthError::MissingToken)?;

    let claims = decode_token(&state.auth, bearer.token())?;
    let user = state
        .repos
        .users
        .find_by_id(claims.user_id()?)
        .await?
        .ok_or_else(|| {
            AppError::AuthenticationError("Not authorized to access this route".to_string())
        })?;

    req.extensions_mut().insert(Actor::new(user.id, user.role));
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

// ============================================================================
// Admin Middleware
// ============================================================================

/// Must run inside `auth_middleware`.
pub async fn admin_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    let actor = req
        .extensions()
        .get::<Actor>()
        .copied()
        .ok_or_else(|| {
            AppError::AuthenticationError("Not authorized to access this route".to_string())
        })?;
    actor.ensure_admin()?;

    Ok(next.run(req).await)
}
