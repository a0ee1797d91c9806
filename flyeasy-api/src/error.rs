use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use flyeasy_core::{CoreError, StoreError};

use crate::envelope::ErrorBody;
use crate::middleware::auth::AuthError;

const SERVER_ERROR: &str = "Server Error";

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    ValidationError(String),
    NotFoundError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation", msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Anyhow(err) => classify(err),
        }
    }
}

fn server_error() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "server_error",
        SERVER_ERROR.to_string(),
    )
}

/// Errors arrive here through `?`; recover the domain kind where there is one.
fn classify(err: anyhow::Error) -> (StatusCode, &'static str, String) {
    if let Some(core) = err.downcast_ref::<CoreError>() {
        return core_parts(core);
    }
    if let Some(auth) = err.downcast_ref::<AuthError>() {
        return match auth {
            AuthError::Hashing(_) => {
                tracing::error!("Password hashing failed: {}", auth);
                server_error()
            }
            _ => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Not authorized to access this route".to_string(),
            ),
        };
    }
    if let Some(rejection) = err.downcast_ref::<JsonRejection>() {
        return (StatusCode::BAD_REQUEST, "validation", rejection.body_text());
    }
    if let Some(rejection) = err.downcast_ref::<QueryRejection>() {
        return (StatusCode::BAD_REQUEST, "validation", rejection.body_text());
    }
    if let Some(rejection) = err.downcast_ref::<PathRejection>() {
        return (StatusCode::BAD_REQUEST, "validation", rejection.body_text());
    }
    if let Some(StoreError::Duplicate(key)) = err.downcast_ref::<StoreError>() {
        return (
            StatusCode::BAD_REQUEST,
            "conflict",
            format!("Duplicate value for {}", key),
        );
    }
    tracing::error!("Internal Server Error: {:#}", err);
    server_error()
}

fn core_parts(err: &CoreError) -> (StatusCode, &'static str, String) {
    let status = match err {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CoreError::Conflict(_) | CoreError::InvalidState(_) | CoreError::ValidationError(_) => {
            StatusCode::BAD_REQUEST
        }
        CoreError::ReferenceExhausted(_) | CoreError::Store(_) => {
            tracing::error!("Internal Server Error: {}", err);
            return server_error();
        }
    };
    let message = match err {
        CoreError::ValidationError(msg) => msg.clone(),
        other => other.to_string(),
    };
    (status, err.kind(), message)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, error) = self.parts();
        let body = Json(ErrorBody {
            success: false,
            error,
            kind,
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
