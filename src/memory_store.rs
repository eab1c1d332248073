use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::role::{RoleBinding, RoleDefinition};
use crate::store::{BindingStore, RoleStore};
use crate::types::{RoleId, SubjectId, TenantId};

/// In-memory store implementation for tests, demos and small deployments.
///
/// Cloning shares the underlying state.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    roles: RwLock<HashMap<(TenantId, RoleId), RoleDefinition>>,
    bindings: RwLock<HashMap<(TenantId, RoleId, SubjectId), RoleBinding>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn get_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
    ) -> std::result::Result<Option<RoleDefinition>, crate::StoreError> {
        let guard = self.inner.roles.read().expect("poisoned lock");
        Ok(guard.get(&(tenant.clone(), role.clone())).cloned())
    }

    async fn find_role_by_name(
        &self,
        tenant: &TenantId,
        name: &str,
    ) -> std::result::Result<Option<RoleDefinition>, crate::StoreError> {
        let guard = self.inner.roles.read().expect("poisoned lock");
        Ok(guard
            .values()
            .find(|role| &role.tenant == tenant && role.name == name)
            .cloned())
    }

    async fn put_role(&self, role: RoleDefinition) -> std::result::Result<(), crate::StoreError> {
        let mut guard = self.inner.roles.write().expect("poisoned lock");
        guard.insert((role.tenant.clone(), role.id.clone()), role);
        Ok(())
    }

    async fn delete_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
    ) -> std::result::Result<bool, crate::StoreError> {
        let mut guard = self.inner.roles.write().expect("poisoned lock");
        Ok(guard.remove(&(tenant.clone(), role.clone())).is_some())
    }

    async fn list_roles(
        &self,
        tenant: &TenantId,
    ) -> std::result::Result<Vec<RoleDefinition>, crate::StoreError> {
        let guard = self.inner.roles.read().expect("poisoned lock");
        Ok(guard
            .values()
            .filter(|role| &role.tenant == tenant)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BindingStore for MemoryStore {
    async fn bindings_for_subject(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
    ) -> std::result::Result<Vec<RoleBinding>, crate::StoreError> {
        let guard = self.inner.bindings.read().expect("poisoned lock");
        Ok(guard
            .values()
            .filter(|binding| &binding.tenant == tenant && &binding.subject == subject)
            .cloned()
            .collect())
    }

    async fn bindings_for_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
    ) -> std::result::Result<Vec<RoleBinding>, crate::StoreError> {
        let guard = self.inner.bindings.read().expect("poisoned lock");
        Ok(guard
            .values()
            .filter(|binding| &binding.tenant == tenant && &binding.role == role)
            .cloned()
            .collect())
    }

    async fn find_binding(
        &self,
        tenant: &TenantId,
        role: &RoleId,
        subject: &SubjectId,
    ) -> std::result::Result<Option<RoleBinding>, crate::StoreError> {
        let guard = self.inner.bindings.read().expect("poisoned lock");
        Ok(guard
            .get(&(tenant.clone(), role.clone(), subject.clone()))
            .cloned())
    }

    async fn put_binding(
        &self,
        binding: RoleBinding,
    ) -> std::result::Result<(), crate::StoreError> {
        let mut guard = self.inner.bindings.write().expect("poisoned lock");
        guard.insert(
            (
                binding.tenant.clone(),
                binding.role.clone(),
                binding.subject.clone(),
            ),
            binding,
        );
        Ok(())
    }

    async fn delete_binding(
        &self,
        tenant: &TenantId,
        role: &RoleId,
        subject: &SubjectId,
    ) -> std::result::Result<bool, crate::StoreError> {
        let mut guard = self.inner.bindings.write().expect("poisoned lock");
        Ok(guard
            .remove(&(tenant.clone(), role.clone(), subject.clone()))
            .is_some())
    }

    async fn delete_bindings_for_subject(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
    ) -> std::result::Result<usize, crate::StoreError> {
        let mut guard = self.inner.bindings.write().expect("poisoned lock");
        let before = guard.len();
        guard.retain(|(t, _, s), _| !(t == tenant && s == subject));
        Ok(before - guard.len())
    }

    async fn delete_bindings_for_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
    ) -> std::result::Result<usize, crate::StoreError> {
        let mut guard = self.inner.bindings.write().expect("poisoned lock");
        let before = guard.len();
        guard.retain(|(t, r, _), _| !(t == tenant && r == role));
        Ok(before - guard.len())
    }

    async fn list_bindings(
        &self,
        tenant: &TenantId,
    ) -> std::result::Result<Vec<RoleBinding>, crate::StoreError> {
        let guard = self.inner.bindings.read().expect("poisoned lock");
        Ok(guard
            .values()
            .filter(|binding| &binding.tenant == tenant)
            .cloned()
            .collect())
    }
}
