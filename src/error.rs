use crate::types::{RoleId, SubjectId, TenantId};
use thiserror::Error;

/// Store-layer error type.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Store error wrapper.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// Invalid permission input.
    #[error("invalid permission: {0}")]
    InvalidPermission(String),
    /// Missing or unusable tenant context. Never defaulted, always surfaced.
    #[error("tenant context error: {0}")]
    TenantContext(String),
    /// Structured denial raised by `check_or_deny`.
    #[error("permission denied: {permission} for subject {subject} in tenant {tenant} ({reason})")]
    PermissionDenied {
        permission: String,
        tenant: TenantId,
        subject: SubjectId,
        reason: String,
    },
    /// Role name already taken within the tenant.
    #[error("role name {name:?} already exists in tenant {tenant}")]
    DuplicateRoleName { tenant: TenantId, name: String },
    /// Role lookup failed.
    #[error("role {role} not found in tenant {tenant}")]
    RoleNotFound { tenant: TenantId, role: RoleId },
    /// System roles are read-only at the tenant layer.
    #[error("role {role} in tenant {tenant} is a system role and cannot be modified")]
    SystemRoleImmutable { tenant: TenantId, role: RoleId },
    /// Binding expiration must be future-dated.
    #[error("binding expiration for role {role}, subject {subject} is not in the future")]
    ExpiryInPast { role: RoleId, subject: SubjectId },
    /// Invalid mutation input (empty name, malformed field).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}
