use uuid::Uuid;

use crate::models::Role;
use crate::{CoreError, CoreResult};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_access(&self, owner: Uuid) -> bool {
        self.is_admin() || self.user_id == owner
    }

    pub fn ensure_owner_or_admin(&self, owner: Uuid, what: &str) -> CoreResult<()> {
        if self.can_access(owner) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, %owner, "denied access to {}", what);
            Err(CoreError::Forbidden(format!(
                "Not authorized to access this {}",
                what
            )))
        }
    }

    pub fn ensure_admin(&self) -> CoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                self.role
            )))
        }
    }
}
