//! Multi-tenant authorization decision engine.
//!
//! Given a tenant, a subject, and a required permission, [`Checker`]
//! decides allow or deny with a machine-readable [`Reason`]. Effective
//! permissions are resolved from role bindings through a pluggable
//! [`EffectiveResolver`] and memoized per (tenant, subject) in a
//! [`PermissionCache`] with TTL, bounded capacity and tenant-scoped
//! invalidation. Every ambiguous or failing resolution path denies.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use tenant_gate::{
//!     CheckContext, Checker, MemoryStore, Permission, PermissionCache, StoreResolver,
//!     SubjectContext, SubjectId, SubjectKind, TenantContext, TenantId,
//! };
//!
//! # async fn run() -> tenant_gate::Result<()> {
//! let store = MemoryStore::new();
//! let checker = Checker::new(
//!     Arc::new(StoreResolver::new(store)),
//!     PermissionCache::new(1024),
//! );
//!
//! let context = CheckContext::new(
//!     TenantContext::active(TenantId::new("tenant_1")?),
//!     SubjectContext::new(SubjectId::new("user_1")?, SubjectKind::User),
//!     Permission::new("invoice:read")?,
//! );
//! let result = checker.check(&context).await?;
//! println!("allowed={} reason={}", result.allowed, result.reason);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod cache;
mod checker;
mod error;
mod manager;
mod memory_store;
mod permission;
mod resolver;
mod role;
mod store;
mod types;

pub use crate::cache::{CacheStats, EvictionStrategy, PermissionCache, VersionInfo};
pub use crate::checker::{
    BatchOptions, BatchResult, CheckContext, CheckResult, Checker, DEFAULT_MAX_CONCURRENCY, Reason,
};
pub use crate::error::{Error, Result, StoreError};
pub use crate::manager::{BindingManager, NewRole, RoleManager, RoleUpdate};
pub use crate::memory_store::MemoryStore;
pub use crate::permission::{GLOBAL_WILDCARD, MatchKind, Permission, PermissionSet};
pub use crate::resolver::{EffectiveResolver, StaticResolver, StoreResolver};
pub use crate::role::{EffectivePermissions, RoleBinding, RoleDefinition, RoleKind, RoleStatus};
pub use crate::store::{BindingStore, RoleStore, Store};
pub use crate::types::{
    RoleId, SubjectContext, SubjectId, SubjectKind, TenantContext, TenantId, TenantStatus,
};
