use crate::error::{Error, Result};
use crate::permission::Permission;
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

const MAX_NAME_LEN: usize = 128;

fn validate_simple_name(value: &str, kind: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidId(format!("{kind} must not be empty")));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(Error::InvalidId(format!(
            "{kind} length must be <= {MAX_NAME_LEN}"
        )));
    }
    if !trimmed.chars().all(is_allowed_name_char) {
        return Err(Error::InvalidId(format!(
            "{kind} contains invalid characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn is_allowed_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, ':' | '_' | '-')
}

macro_rules! define_id_type {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Eq, PartialEq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier.
            pub fn new(value: impl AsRef<str>) -> Result<Self> {
                validate_simple_name(value.as_ref(), $kind).map(Self)
            }

            /// Creates an identifier from a trusted string without validation.
            pub fn from_string(value: String) -> Self {
                Self(value)
            }

            /// Returns the underlying string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from_string(value)
            }
        }
    };
}

define_id_type!(
    /// Tenant identifier.
    TenantId,
    "tenant id"
);
define_id_type!(
    /// Subject identifier.
    SubjectId,
    "subject id"
);
define_id_type!(
    /// Role identifier.
    RoleId,
    "role id"
);

/// Tenant lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TenantStatus {
    /// Tenant is operational.
    Active,
    /// Tenant is temporarily disabled.
    Suspended,
    /// Tenant is gone; retained for record linkage only.
    Deleted,
}

/// Kind of acting principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubjectKind {
    /// Human user account.
    User,
    /// Machine service account.
    Service,
    /// Internal system process; bypasses permission checks.
    System,
    /// Unauthenticated caller; holds no implicit grants.
    Anonymous,
}

/// Tenant isolation boundary for a check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TenantContext {
    /// Tenant identifier.
    pub id: TenantId,
    /// Tenant status.
    pub status: TenantStatus,
}

impl TenantContext {
    /// Creates an active tenant context.
    pub fn active(id: TenantId) -> Self {
        Self {
            id,
            status: TenantStatus::Active,
        }
    }

    /// Validates the context for use in a permission check.
    ///
    /// Suspended and deleted tenants fail validation; a check never
    /// silently defaults the tenant.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().is_empty() {
            return Err(Error::TenantContext("tenant id must not be empty".into()));
        }
        match self.status {
            TenantStatus::Active => Ok(()),
            TenantStatus::Suspended => Err(Error::TenantContext(format!(
                "tenant {} is suspended",
                self.id
            ))),
            TenantStatus::Deleted => Err(Error::TenantContext(format!(
                "tenant {} is deleted",
                self.id
            ))),
        }
    }
}

/// Acting principal for a check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubjectContext {
    /// Subject identifier.
    pub id: SubjectId,
    /// Subject kind.
    pub kind: SubjectKind,
    /// Permissions attached directly to the subject, checked before any
    /// role resolution. May contain the global wildcard `*`.
    pub direct_permissions: HashSet<Permission>,
    /// Role ids the caller claims for the subject; informational only,
    /// effective permissions always come from the binding store.
    pub roles: Vec<RoleId>,
}

impl SubjectContext {
    /// Creates a subject context with no direct permissions.
    pub fn new(id: SubjectId, kind: SubjectKind) -> Self {
        Self {
            id,
            kind,
            direct_permissions: HashSet::new(),
            roles: Vec::new(),
        }
    }

    /// Attaches direct permissions.
    pub fn with_direct_permissions(
        mut self,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        self.direct_permissions.extend(permissions);
        self
    }
}
