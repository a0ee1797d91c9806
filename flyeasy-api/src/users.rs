use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use flyeasy_core::models::user::normalize_email;
use flyeasy_core::models::{Role, UserPreferences, UserProfile};
use flyeasy_core::{Actor, CoreError, StoreError};

use crate::auth::{hash_password, validate_email, validate_name, validate_password};
use crate::envelope::{self, Envelope};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::{admin_middleware, auth_middleware};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub preferences: Option<UserPreferences>,
    pub role: Option<Role>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list_users))
        .route_layer(from_fn(admin_middleware));

    Router::new()
        .route("/{id}", get(get_user).put(update_user))
        .merge(admin)
        .route_layer(from_fn_with_state(state, auth_middleware))
}

/// GET /api/users
async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<UserProfile>>>, AppError> {
    let users = state.repos.users.list().await?;
    Ok(envelope::list(users.iter().map(|u| u.profile()).collect()))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Envelope<UserProfile>>, AppError> {
    actor.ensure_owner_or_admin(id, "user")?;
    let user = state
        .repos
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;
    Ok(envelope::ok(user.profile()))
}

/// PUT /api/users/{id}
///
/// Owners edit their own profile; only admins may change a role.
async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<Json<Envelope<UserProfile>>, AppError> {
    actor.ensure_owner_or_admin(id, "user")?;
    let mut user = state
        .repos
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;

    if let Some(role) = req.role {
        if role != user.role {
            if !actor.is_admin() {
                return Err(CoreError::Forbidden("Only admins can change user roles".to_string()).into());
            }
            info!(user_id = %user.id, from = %user.role, to = %role, "role changed");
            user.role = role;
        }
    }
    if let Some(name) = req.name {
        validate_name(&name)?;
        user.name = name.trim().to_string();
    }
    if let Some(email) = req.email {
        validate_email(&email)?;
        let email = normalize_email(&email);
        if email != user.email {
            if state.repos.users.find_by_email(&email).await?.is_some() {
                return Err(CoreError::Conflict("Email already in use".to_string()).into());
            }
            user.email = email;
        }
    }
    if let Some(phone) = req.phone {
        user.phone = Some(phone);
    }
    if let Some(preferences) = req.preferences {
        user.preferences = preferences;
    }
    if let Some(password) = req.password {
        validate_password(&password)?;
        user.password_hash = hash_password(password, state.auth.bcrypt_cost).await?;
    }

    match state.repos.users.update(&user).await {
        Ok(()) => Ok(envelope::ok(user.profile())),
        Err(StoreError::Duplicate(_)) => {
            Err(CoreError::Conflict("Email already in use".to_string()).into())
        }
        Err(StoreError::NotFound) => Err(AppError::NotFoundError("User not found".to_string())),
        Err(e) => Err(e.into()),
    }
}
