use crate::permission::{Permission, PermissionSet};
use crate::types::{RoleId, SubjectId, TenantId};
use chrono::{DateTime, Utc};

/// Role provenance. System roles are seeded at startup and are read-only
/// at the tenant layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoleKind {
    /// Seeded, immutable, undeletable.
    System,
    /// Tenant-defined.
    Custom,
    /// Cloneable blueprint role.
    Template,
}

/// Role lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoleStatus {
    /// Role participates in resolution.
    Active,
    /// Role is retained but contributes no permissions.
    Disabled,
}

/// Named permission bundle, unique per (tenant, id) and (tenant, name).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleDefinition {
    /// Owning tenant.
    pub tenant: TenantId,
    /// Role identifier.
    pub id: RoleId,
    /// Human-readable name, unique within the tenant.
    pub name: String,
    /// Permission codes granted by this role.
    pub permissions: PermissionSet,
    /// Direct parent roles whose permissions are inherited.
    pub inherits: Vec<RoleId>,
    /// Role provenance.
    pub kind: RoleKind,
    /// Role status.
    pub status: RoleStatus,
}

impl RoleDefinition {
    /// Creates an active custom role.
    pub fn custom(
        tenant: TenantId,
        id: RoleId,
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            tenant,
            id,
            name: name.into(),
            permissions: permissions.into_iter().collect(),
            inherits: Vec::new(),
            kind: RoleKind::Custom,
            status: RoleStatus::Active,
        }
    }

    /// Adds inherited parent roles.
    pub fn with_inherits(mut self, parents: impl IntoIterator<Item = RoleId>) -> Self {
        self.inherits.extend(parents);
        self
    }
}

/// Assignment of a role to a subject, optionally time-limited.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleBinding {
    /// Owning tenant.
    pub tenant: TenantId,
    /// Bound role.
    pub role: RoleId,
    /// Bound subject.
    pub subject: SubjectId,
    /// Expiration instant; `None` means the binding never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Subject that created the binding, when known.
    pub created_by: Option<SubjectId>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl RoleBinding {
    /// Creates a non-expiring binding stamped with the current time.
    pub fn new(tenant: TenantId, role: RoleId, subject: SubjectId) -> Self {
        Self {
            tenant,
            role,
            subject,
            expires_at: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    /// Returns true once the binding's expiration has passed.
    ///
    /// Expired bindings are inert for resolution but stay in the store
    /// until a cleanup sweep removes them.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry <= now)
    }
}

/// Resolver output: the flattened permission set a subject holds after
/// walking role bindings and inheritance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectivePermissions {
    /// Owning tenant.
    pub tenant: TenantId,
    /// Resolved subject.
    pub subject: SubjectId,
    /// Every role that contributed, in traversal order.
    pub roles: Vec<RoleId>,
    /// Flattened permission codes.
    pub permissions: PermissionSet,
    /// When the set was computed.
    pub computed_at: DateTime<Utc>,
}
