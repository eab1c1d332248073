use crate::error::StoreError;
use crate::role::{RoleBinding, RoleDefinition};
use crate::types::{RoleId, SubjectId, TenantId};
use async_trait::async_trait;

/// Store interface for tenant-scoped role definitions.
#[async_trait]
pub trait RoleStore {
    /// Returns a role by id.
    async fn get_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
    ) -> std::result::Result<Option<RoleDefinition>, StoreError>;

    /// Returns a role by its unique name within a tenant.
    async fn find_role_by_name(
        &self,
        tenant: &TenantId,
        name: &str,
    ) -> std::result::Result<Option<RoleDefinition>, StoreError>;

    /// Inserts or replaces a role definition.
    async fn put_role(&self, role: RoleDefinition) -> std::result::Result<(), StoreError>;

    /// Deletes a role; returns whether it existed.
    async fn delete_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
    ) -> std::result::Result<bool, StoreError>;

    /// Returns every role owned by a tenant.
    async fn list_roles(
        &self,
        tenant: &TenantId,
    ) -> std::result::Result<Vec<RoleDefinition>, StoreError>;
}

/// Store interface for role-to-subject bindings.
#[async_trait]
pub trait BindingStore {
    /// Returns all bindings for a subject, expired ones included.
    async fn bindings_for_subject(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
    ) -> std::result::Result<Vec<RoleBinding>, StoreError>;

    /// Returns all bindings referencing a role.
    async fn bindings_for_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
    ) -> std::result::Result<Vec<RoleBinding>, StoreError>;

    /// Returns the binding for a (role, subject) pair, if any.
    async fn find_binding(
        &self,
        tenant: &TenantId,
        role: &RoleId,
        subject: &SubjectId,
    ) -> std::result::Result<Option<RoleBinding>, StoreError>;

    /// Inserts or replaces a binding.
    async fn put_binding(&self, binding: RoleBinding) -> std::result::Result<(), StoreError>;

    /// Deletes the binding for a (role, subject) pair; returns whether it existed.
    async fn delete_binding(
        &self,
        tenant: &TenantId,
        role: &RoleId,
        subject: &SubjectId,
    ) -> std::result::Result<bool, StoreError>;

    /// Deletes every binding for a subject; returns the count removed.
    async fn delete_bindings_for_subject(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
    ) -> std::result::Result<usize, StoreError>;

    /// Deletes every binding referencing a role; returns the count removed.
    async fn delete_bindings_for_role(
        &self,
        tenant: &TenantId,
        role: &RoleId,
    ) -> std::result::Result<usize, StoreError>;

    /// Returns every binding owned by a tenant.
    async fn list_bindings(
        &self,
        tenant: &TenantId,
    ) -> std::result::Result<Vec<RoleBinding>, StoreError>;
}

/// Composite store trait.
pub trait Store: RoleStore + BindingStore + Send + Sync {}

impl<T> Store for T where T: RoleStore + BindingStore + Send + Sync {}
