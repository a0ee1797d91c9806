pub mod clock;
pub mod identity;
pub mod models;
pub mod money;
pub mod payment;
pub mod repository;

pub use clock::{Clock, FixedClock, SystemClock};
pub use identity::Actor;
pub use repository::{StoreError, StoreResult};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Could not allocate a booking reference after {0} attempts")]
    ReferenceExhausted(u32),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Stable machine-readable kind, used by clients to branch on the outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::Unauthorized(_) => "unauthorized",
            CoreError::Conflict(_) => "conflict",
            CoreError::InvalidState(_) => "invalid_state",
            CoreError::ValidationError(_) => "validation",
            CoreError::ReferenceExhausted(_) | CoreError::Store(_) => "server_error",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
