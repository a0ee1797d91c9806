use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use flyeasy_core::models::user::normalize_email;
use flyeasy_core::models::{Role, User, UserProfile};
use flyeasy_core::{Actor, CoreError, StoreError};

use crate::envelope::{self, Envelope};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::auth::{auth_middleware, issue_token, AuthError, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    success: bool,
    token: String,
    user: UserProfile,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

pub(crate) fn validate_name(name: &str) -> Result<(), CoreError> {
    let len = name.trim().chars().count();
    if !(2..=50).contains(&len) {
        return Err(CoreError::ValidationError(
            "Name must be between 2 and 50 characters".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), CoreError> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(CoreError::ValidationError(
            "Please include a valid email".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < 6 {
        return Err(CoreError::ValidationError(
            "Password must be at least 6 characters long".to_string(),
        ));
    }
    Ok(())
}

/// bcrypt is CPU bound; keep it off the async workers.
pub(crate) async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await?;
    Ok(hash.map_err(AuthError::from)?)
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    Ok(matches.map_err(AuthError::from)?)
}

fn token_response(
    state: &AppState,
    user: &User,
    status: StatusCode,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let claims = Claims::for_user(user, state.clock.now(), state.auth.expiration);
    let token = issue_token(&state.auth, &claims)?;
    Ok((
        status,
        Json(AuthResponse {
            success: true,
            token,
            user: user.profile(),
        }),
    ))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_name(&req.name)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    if state.repos.users.find_by_email(&req.email).await?.is_some() {
        return Err(CoreError::Conflict("User already exists".to_string()).into());
    }

    let email = normalize_email(&req.email);
    let role = match &state.auth.bootstrap_admin_email {
        Some(admin) if normalize_email(admin) == email => Role::Admin,
        _ => Role::Passenger,
    };
    let password_hash = hash_password(req.password, state.auth.bcrypt_cost).await?;
    let user = User::new(
        req.name.trim().to_string(),
        &email,
        req.phone,
        password_hash,
        role,
        state.clock.now(),
    );

    match state.repos.users.insert(&user).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(CoreError::Conflict("User already exists".to_string()).into())
        }
        Err(e) => return Err(e.into()),
    }
    info!(user_id = %user.id, role = %user.role, "user registered");

    token_response(&state, &user, StatusCode::CREATED)
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError(
            "Please provide email and password".to_string(),
        ));
    }

    let invalid = || AppError::AuthenticationError("Invalid credentials".to_string());
    let user = state
        .repos
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    token_response(&state, &user, StatusCode::OK)
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Envelope<UserProfile>>, AppError> {
    let user = state
        .repos
        .users
        .find_by_id(actor.user_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;
    Ok(envelope::ok(user.profile()))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its copy.
async fn logout() -> Json<Envelope<serde_json::Value>> {
    envelope::empty()
}
