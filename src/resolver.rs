use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::permission::PermissionSet;
use crate::role::{EffectivePermissions, RoleStatus};
use crate::store::Store;
use crate::types::{RoleId, SubjectId, TenantId};

/// Seam through which effective-permission computation plugs into the
/// checker. The checker has no knowledge of how the set was produced, so
/// alternative backends can be swapped in at construction time.
#[async_trait]
pub trait EffectiveResolver: Send + Sync {
    /// Resolves the flattened permission set for a subject within a tenant.
    async fn resolve(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
    ) -> std::result::Result<PermissionSet, StoreError>;
}

/// Resolver that walks the role/binding store.
///
/// Traversal is breadth-first from the subject's non-expired bindings:
/// each bound role contributes its permission set, its inherited role ids
/// are queued, and a visited set guarantees termination under cyclic
/// inheritance, contributing each role at most once.
#[derive(Debug, Clone)]
pub struct StoreResolver<S> {
    store: S,
}

impl<S: Store> StoreResolver<S> {
    /// Creates a resolver backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolves with full provenance: contributing roles in traversal
    /// order plus the computation timestamp.
    pub async fn resolve_detailed(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
    ) -> std::result::Result<EffectivePermissions, StoreError> {
        let now = Utc::now();
        let bindings = self.store.bindings_for_subject(tenant, subject).await?;

        let mut queue: VecDeque<RoleId> = bindings
            .into_iter()
            .filter(|binding| !binding.is_expired(now))
            .map(|binding| binding.role)
            .collect();
        let mut visited: HashSet<RoleId> = HashSet::new();
        let mut roles = Vec::new();
        let mut permissions = PermissionSet::new();

        while let Some(role_id) = queue.pop_front() {
            if !visited.insert(role_id.clone()) {
                continue;
            }
            // A dangling role id (e.g. a binding outliving its role) is
            // skipped rather than treated as an error.
            let Some(role) = self.store.get_role(tenant, &role_id).await? else {
                continue;
            };
            if role.status != RoleStatus::Active {
                continue;
            }
            roles.push(role_id);
            permissions.extend(role.permissions);
            queue.extend(role.inherits);
        }

        Ok(EffectivePermissions {
            tenant: tenant.clone(),
            subject: subject.clone(),
            roles,
            permissions,
            computed_at: now,
        })
    }
}

#[async_trait]
impl<S: Store> EffectiveResolver for StoreResolver<S> {
    async fn resolve(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
    ) -> std::result::Result<PermissionSet, StoreError> {
        Ok(self.resolve_detailed(tenant, subject).await?.permissions)
    }
}

/// Resolver returning a fixed permission set for every subject.
///
/// Useful for wiring stubs and allow-all/deny-all test doubles.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    permissions: PermissionSet,
}

impl StaticResolver {
    /// Creates a resolver that always returns the given set.
    pub fn new(permissions: PermissionSet) -> Self {
        Self { permissions }
    }

    /// Creates a deny-all resolver (empty set).
    pub fn deny_all() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EffectiveResolver for StaticResolver {
    async fn resolve(
        &self,
        _tenant: &TenantId,
        _subject: &SubjectId,
    ) -> std::result::Result<PermissionSet, StoreError> {
        Ok(self.permissions.clone())
    }
}
