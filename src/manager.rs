use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::PermissionCache;
use crate::error::{Error, Result};
use crate::permission::PermissionSet;
use crate::role::{RoleBinding, RoleDefinition, RoleKind, RoleStatus};
use crate::store::Store;
use crate::types::{RoleId, SubjectId, TenantId};

/// Input for role creation.
#[derive(Debug, Clone)]
pub struct NewRole {
    /// Role identifier, unique per tenant.
    pub id: RoleId,
    /// Role name, unique per tenant.
    pub name: String,
    /// Granted permission codes.
    pub permissions: PermissionSet,
    /// Direct parent roles.
    pub inherits: Vec<RoleId>,
}

impl NewRole {
    /// Builds a role creation request.
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            permissions: PermissionSet::new(),
            inherits: Vec::new(),
        }
    }

    /// Adds permissions.
    pub fn with_permissions(
        mut self,
        permissions: impl IntoIterator<Item = crate::permission::Permission>,
    ) -> Self {
        self.permissions.extend(permissions);
        self
    }

    /// Adds inherited parents.
    pub fn with_inherits(mut self, parents: impl IntoIterator<Item = RoleId>) -> Self {
        self.inherits.extend(parents);
        self
    }
}

/// Partial role update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RoleUpdate {
    /// New name, unique per tenant.
    pub name: Option<String>,
    /// Replacement permission set.
    pub permissions: Option<PermissionSet>,
    /// Replacement parent list.
    pub inherits: Option<Vec<RoleId>>,
    /// New status.
    pub status: Option<RoleStatus>,
}

/// Mutation surface for role definitions.
///
/// Every successful mutation bumps the tenant's cache version and
/// invalidates the tenant's cached permission sets before returning, so a
/// subsequent check never reads pre-mutation permissions past the TTL
/// ceiling. Invalidation is tenant-broad: which subjects a role change
/// affects is not tracked here.
#[derive(Debug, Clone)]
pub struct RoleManager<S> {
    store: S,
    cache: PermissionCache,
}

impl<S: Store> RoleManager<S> {
    /// Creates a manager over a store and the cache it must invalidate.
    pub fn new(store: S, cache: PermissionCache) -> Self {
        Self { store, cache }
    }

    /// Creates a custom role. Rejects duplicate names within the tenant.
    pub async fn create_role(&self, tenant: &TenantId, role: NewRole) -> Result<RoleDefinition> {
        self.create_with_kind(tenant, role, RoleKind::Custom).await
    }

    /// Registers a seeded system role. System roles are immutable and
    /// undeletable afterwards.
    pub async fn register_system_role(
        &self,
        tenant: &TenantId,
        role: NewRole,
    ) -> Result<RoleDefinition> {
        self.create_with_kind(tenant, role, RoleKind::System).await
    }

    async fn create_with_kind(
        &self,
        tenant: &TenantId,
        role: NewRole,
        kind: RoleKind,
    ) -> Result<RoleDefinition> {
        let name = role.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("role name must not be empty".into()));
        }
        if self
            .store
            .find_role_by_name(tenant, name)
            .await
            .map_err(Error::from)?
            .is_some()
        {
            return Err(Error::DuplicateRoleName {
                tenant: tenant.clone(),
                name: name.to_string(),
            });
        }
        if self
            .store
            .get_role(tenant, &role.id)
            .await
            .map_err(Error::from)?
            .is_some()
        {
            return Err(Error::DuplicateRoleName {
                tenant: tenant.clone(),
                name: role.id.as_str().to_string(),
            });
        }

        let definition = RoleDefinition {
            tenant: tenant.clone(),
            id: role.id,
            name: name.to_string(),
            permissions: role.permissions,
            inherits: role.inherits,
            kind,
            status: RoleStatus::Active,
        };
        self.store
            .put_role(definition.clone())
            .await
            .map_err(Error::from)?;
        self.invalidate(tenant);
        Ok(definition)
    }

    /// Applies a partial update to a role. System roles are rejected.
    pub async fn update_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
        update: RoleUpdate,
    ) -> Result<RoleDefinition> {
        let mut definition = self
            .store
            .get_role(tenant, role)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::RoleNotFound {
                tenant: tenant.clone(),
                role: role.clone(),
            })?;
        if definition.kind == RoleKind::System {
            return Err(Error::SystemRoleImmutable {
                tenant: tenant.clone(),
                role: role.clone(),
            });
        }

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(Error::InvalidInput("role name must not be empty".into()));
            }
            if name != definition.name
                && self
                    .store
                    .find_role_by_name(tenant, &name)
                    .await
                    .map_err(Error::from)?
                    .is_some()
            {
                return Err(Error::DuplicateRoleName {
                    tenant: tenant.clone(),
                    name,
                });
            }
            definition.name = name;
        }
        if let Some(permissions) = update.permissions {
            definition.permissions = permissions;
        }
        if let Some(inherits) = update.inherits {
            definition.inherits = inherits;
        }
        if let Some(status) = update.status {
            definition.status = status;
        }

        self.store
            .put_role(definition.clone())
            .await
            .map_err(Error::from)?;
        self.invalidate(tenant);
        Ok(definition)
    }

    /// Deletes a role along with every binding that references it.
    /// System roles are rejected.
    pub async fn delete_role(&self, tenant: &TenantId, role: &RoleId) -> Result<()> {
        let definition = self
            .store
            .get_role(tenant, role)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::RoleNotFound {
                tenant: tenant.clone(),
                role: role.clone(),
            })?;
        if definition.kind == RoleKind::System {
            return Err(Error::SystemRoleImmutable {
                tenant: tenant.clone(),
                role: role.clone(),
            });
        }

        let orphaned = self
            .store
            .delete_bindings_for_role(tenant, role)
            .await
            .map_err(Error::from)?;
        self.store
            .delete_role(tenant, role)
            .await
            .map_err(Error::from)?;
        debug!(tenant = %tenant, role = %role, orphaned, "deleted role");
        self.invalidate(tenant);
        Ok(())
    }

    /// Returns every role owned by a tenant.
    pub async fn list_roles(&self, tenant: &TenantId) -> Result<Vec<RoleDefinition>> {
        self.store.list_roles(tenant).await.map_err(Error::from)
    }

    fn invalidate(&self, tenant: &TenantId) {
        self.cache.bump_version(tenant);
        self.cache.invalidate_tenant(tenant);
    }
}

/// Mutation surface for role bindings.
///
/// Binding mutations invalidate exactly the affected subject's cache entry
/// and bump the tenant version before returning.
#[derive(Debug, Clone)]
pub struct BindingManager<S> {
    store: S,
    cache: PermissionCache,
}

impl<S: Store> BindingManager<S> {
    /// Creates a manager over a store and the cache it must invalidate.
    pub fn new(store: S, cache: PermissionCache) -> Self {
        Self { store, cache }
    }

    /// Assigns a role to a subject.
    ///
    /// Idempotent: an existing live binding for the same (role, subject)
    /// is returned unchanged; an expired one is deleted and replaced.
    /// `expires_at` must lie in the future.
    pub async fn assign_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
        subject: &SubjectId,
        expires_at: Option<DateTime<Utc>>,
        created_by: Option<SubjectId>,
    ) -> Result<RoleBinding> {
        let now = Utc::now();
        if matches!(expires_at, Some(expiry) if expiry <= now) {
            return Err(Error::ExpiryInPast {
                role: role.clone(),
                subject: subject.clone(),
            });
        }
        if self
            .store
            .get_role(tenant, role)
            .await
            .map_err(Error::from)?
            .is_none()
        {
            return Err(Error::RoleNotFound {
                tenant: tenant.clone(),
                role: role.clone(),
            });
        }

        if let Some(existing) = self
            .store
            .find_binding(tenant, role, subject)
            .await
            .map_err(Error::from)?
        {
            if !existing.is_expired(now) {
                self.invalidate(tenant, subject);
                return Ok(existing);
            }
            self.store
                .delete_binding(tenant, role, subject)
                .await
                .map_err(Error::from)?;
        }

        let binding = RoleBinding {
            tenant: tenant.clone(),
            role: role.clone(),
            subject: subject.clone(),
            expires_at,
            created_by,
            created_at: now,
        };
        self.store
            .put_binding(binding.clone())
            .await
            .map_err(Error::from)?;
        self.invalidate(tenant, subject);
        Ok(binding)
    }

    /// Revokes one role from a subject; returns whether a binding existed.
    pub async fn revoke_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
        subject: &SubjectId,
    ) -> Result<bool> {
        let removed = self
            .store
            .delete_binding(tenant, role, subject)
            .await
            .map_err(Error::from)?;
        self.invalidate(tenant, subject);
        Ok(removed)
    }

    /// Revokes every role from a subject; returns the count removed.
    pub async fn revoke_all_roles(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
    ) -> Result<usize> {
        let removed = self
            .store
            .delete_bindings_for_subject(tenant, subject)
            .await
            .map_err(Error::from)?;
        self.invalidate(tenant, subject);
        Ok(removed)
    }

    /// Deletes every expired binding for a tenant; returns the count
    /// removed.
    ///
    /// Storage hygiene only: expired bindings are already excluded from
    /// resolution, so no cache invalidation happens here.
    pub async fn cleanup_expired(&self, tenant: &TenantId) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;
        for binding in self
            .store
            .list_bindings(tenant)
            .await
            .map_err(Error::from)?
        {
            if binding.is_expired(now)
                && self
                    .store
                    .delete_binding(tenant, &binding.role, &binding.subject)
                    .await
                    .map_err(Error::from)?
            {
                removed += 1;
            }
        }
        debug!(tenant = %tenant, removed, "cleaned up expired bindings");
        Ok(removed)
    }

    fn invalidate(&self, tenant: &TenantId, subject: &SubjectId) {
        self.cache.bump_version(tenant);
        self.cache.invalidate_subject(tenant, subject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::permission::Permission;
    use chrono::Duration;
    use futures::executor::block_on;
    use std::sync::Arc;

    fn tenant() -> TenantId {
        TenantId::try_from("t1").unwrap()
    }

    fn role_id(value: &str) -> RoleId {
        RoleId::try_from(value).unwrap()
    }

    fn subject(value: &str) -> SubjectId {
        SubjectId::try_from(value).unwrap()
    }

    fn perm(code: &str) -> Permission {
        Permission::try_from(code).unwrap()
    }

    fn managers() -> (RoleManager<MemoryStore>, BindingManager<MemoryStore>, PermissionCache) {
        let store = MemoryStore::new();
        let cache = PermissionCache::new(64);
        (
            RoleManager::new(store.clone(), cache.clone()),
            BindingManager::new(store, cache.clone()),
            cache,
        )
    }

    #[test]
    fn create_role_rejects_duplicate_name() {
        let (roles, _, _) = managers();
        block_on(roles.create_role(
            &tenant(),
            NewRole::new(role_id("editor"), "Editor").with_permissions([perm("doc:read")]),
        ))
        .unwrap();

        let err = block_on(
            roles.create_role(&tenant(), NewRole::new(role_id("editor_2"), "Editor")),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateRoleName { .. }));
    }

    #[test]
    fn create_role_rejects_empty_name() {
        let (roles, _, _) = managers();
        let err = block_on(roles.create_role(&tenant(), NewRole::new(role_id("editor"), "  ")))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn system_role_cannot_be_updated_or_deleted() {
        let (roles, _, _) = managers();
        block_on(roles.register_system_role(
            &tenant(),
            NewRole::new(role_id("tenant_admin"), "Tenant Admin")
                .with_permissions([perm("*")]),
        ))
        .unwrap();

        let update = block_on(roles.update_role(
            &tenant(),
            &role_id("tenant_admin"),
            RoleUpdate {
                status: Some(RoleStatus::Disabled),
                ..RoleUpdate::default()
            },
        ));
        assert!(matches!(update, Err(Error::SystemRoleImmutable { .. })));

        let delete = block_on(roles.delete_role(&tenant(), &role_id("tenant_admin")));
        assert!(matches!(delete, Err(Error::SystemRoleImmutable { .. })));
    }

    #[test]
    fn update_role_replaces_fields_and_bumps_version() {
        let (roles, _, cache) = managers();
        block_on(roles.create_role(
            &tenant(),
            NewRole::new(role_id("editor"), "Editor").with_permissions([perm("doc:read")]),
        ))
        .unwrap();
        let version_after_create = cache.version(&tenant()).unwrap().version;

        let updated = block_on(roles.update_role(
            &tenant(),
            &role_id("editor"),
            RoleUpdate {
                permissions: Some([perm("doc:read"), perm("doc:write")].into_iter().collect()),
                ..RoleUpdate::default()
            },
        ))
        .unwrap();

        assert_eq!(updated.permissions.len(), 2);
        assert!(cache.version(&tenant()).unwrap().version > version_after_create);
    }

    #[test]
    fn delete_role_cascades_to_bindings() {
        let (roles, bindings, _) = managers();
        block_on(roles.create_role(&tenant(), NewRole::new(role_id("editor"), "Editor")))
            .unwrap();
        block_on(bindings.assign_role(&tenant(), &role_id("editor"), &subject("u1"), None, None))
            .unwrap();

        block_on(roles.delete_role(&tenant(), &role_id("editor"))).unwrap();

        let remaining = block_on(bindings.revoke_all_roles(&tenant(), &subject("u1"))).unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn assign_role_is_idempotent_for_live_binding() {
        let (roles, bindings, _) = managers();
        block_on(roles.create_role(&tenant(), NewRole::new(role_id("editor"), "Editor")))
            .unwrap();

        let first =
            block_on(bindings.assign_role(&tenant(), &role_id("editor"), &subject("u1"), None, None))
                .unwrap();
        let second =
            block_on(bindings.assign_role(&tenant(), &role_id("editor"), &subject("u1"), None, None))
                .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn assign_role_replaces_expired_binding() {
        let store = MemoryStore::new();
        let cache = PermissionCache::new(64);
        let roles = RoleManager::new(store.clone(), cache.clone());
        let bindings = BindingManager::new(store.clone(), cache);

        block_on(roles.create_role(&tenant(), NewRole::new(role_id("editor"), "Editor")))
            .unwrap();
        let mut stale = RoleBinding::new(tenant(), role_id("editor"), subject("u1"));
        stale.expires_at = Some(Utc::now() - Duration::minutes(5));
        block_on(crate::store::BindingStore::put_binding(&store, stale)).unwrap();

        let fresh =
            block_on(bindings.assign_role(&tenant(), &role_id("editor"), &subject("u1"), None, None))
                .unwrap();
        assert!(fresh.expires_at.is_none());
    }

    #[test]
    fn assign_role_rejects_past_expiry() {
        let (roles, bindings, _) = managers();
        block_on(roles.create_role(&tenant(), NewRole::new(role_id("editor"), "Editor")))
            .unwrap();

        let err = block_on(bindings.assign_role(
            &tenant(),
            &role_id("editor"),
            &subject("u1"),
            Some(Utc::now() - Duration::minutes(1)),
            None,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::ExpiryInPast { .. }));
    }

    #[test]
    fn assign_role_rejects_unknown_role() {
        let (_, bindings, _) = managers();
        let err = block_on(bindings.assign_role(
            &tenant(),
            &role_id("ghost"),
            &subject("u1"),
            None,
            None,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::RoleNotFound { .. }));
    }

    #[test]
    fn revoke_all_roles_counts_removed_bindings() {
        let (roles, bindings, _) = managers();
        for role in ["editor", "viewer"] {
            block_on(roles.create_role(&tenant(), NewRole::new(role_id(role), role.to_string())))
                .unwrap();
            block_on(bindings.assign_role(&tenant(), &role_id(role), &subject("u1"), None, None))
                .unwrap();
        }

        assert_eq!(
            block_on(bindings.revoke_all_roles(&tenant(), &subject("u1"))).unwrap(),
            2
        );
        assert!(!block_on(bindings.revoke_role(&tenant(), &role_id("editor"), &subject("u1")))
            .unwrap());
    }

    #[test]
    fn cleanup_expired_removes_only_expired_bindings() {
        let store = MemoryStore::new();
        let cache = PermissionCache::new(64);
        let roles = RoleManager::new(store.clone(), cache.clone());
        let bindings = BindingManager::new(store.clone(), cache);

        block_on(roles.create_role(&tenant(), NewRole::new(role_id("editor"), "Editor")))
            .unwrap();
        block_on(bindings.assign_role(&tenant(), &role_id("editor"), &subject("live"), None, None))
            .unwrap();
        // Expired binding planted directly; assign_role would reject it.
        let mut expired =
            RoleBinding::new(tenant(), role_id("editor"), subject("stale"));
        expired.expires_at = Some(Utc::now() - Duration::minutes(5));
        block_on(crate::store::BindingStore::put_binding(&store, expired)).unwrap();

        assert_eq!(block_on(bindings.cleanup_expired(&tenant())).unwrap(), 1);
        assert_eq!(
            block_on(bindings.revoke_all_roles(&tenant(), &subject("live"))).unwrap(),
            1
        );
    }

    #[test]
    fn binding_mutations_invalidate_subject_cache() {
        let store = MemoryStore::new();
        let cache = PermissionCache::new(64);
        let roles = RoleManager::new(store.clone(), cache.clone());
        let bindings = BindingManager::new(store, cache.clone());

        cache.set(
            &tenant(),
            &subject("u1"),
            Arc::new([perm("doc:read")].into_iter().collect()),
        );
        block_on(roles.create_role(&tenant(), NewRole::new(role_id("editor"), "Editor")))
            .unwrap();
        block_on(bindings.assign_role(&tenant(), &role_id("editor"), &subject("u1"), None, None))
            .unwrap();

        assert!(cache.get(&tenant(), &subject("u1")).is_none());
    }
}
