use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::permission::PermissionSet;
use crate::resolver::EffectiveResolver;
use crate::types::{SubjectId, TenantId};

const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Eviction strategy applied when the cache is at capacity.
///
/// A closed variant set selected at construction time; each variant has
/// its own eviction function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionStrategy {
    /// Evicts the least recently touched entry.
    #[default]
    Lru,
    /// Evicts the oldest inserted entry.
    Fifo,
    /// Sweeps every expired entry, falling back to LRU when none expired.
    Ttl,
}

/// Hit/miss counters with a derived hit rate.
///
/// Observability only; statistics never influence eviction or lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from cache; 0.0 when never queried.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Per-tenant invalidation epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Owning tenant.
    pub tenant: TenantId,
    /// Monotonically increasing counter, bumped on every role/binding
    /// mutation for the tenant.
    pub version: u64,
    /// When the counter last changed.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct CacheKey {
    tenant: TenantId,
    subject: SubjectId,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<PermissionSet>,
    created_at: Instant,
    touched_at: Instant,
    expires_at: Instant,
    version: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    versions: HashMap<TenantId, VersionInfo>,
    hits: u64,
    misses: u64,
}

/// Tenant-scoped cache of effective permission sets.
///
/// Entries are keyed by (tenant, subject), expire after a TTL, and are
/// bounded by a capacity with a configurable [`EvictionStrategy`]. Cloning
/// shares the underlying state.
#[derive(Debug, Clone)]
pub struct PermissionCache {
    inner: Arc<Mutex<CacheState>>,
    capacity: usize,
    ttl: Duration,
    strategy: EvictionStrategy,
}

impl PermissionCache {
    /// Creates a cache with the given capacity and a 5 minute TTL.
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState::default())),
            capacity,
            ttl: DEFAULT_TTL,
            strategy: EvictionStrategy::default(),
        }
    }

    /// Configures the entry time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Configures the eviction strategy.
    pub fn with_strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn key(tenant: &TenantId, subject: &SubjectId) -> CacheKey {
        CacheKey {
            tenant: tenant.clone(),
            subject: subject.clone(),
        }
    }

    fn current_version(state: &CacheState, tenant: &TenantId) -> u64 {
        state
            .versions
            .get(tenant)
            .map(|info| info.version)
            .unwrap_or(0)
    }

    /// Returns the live cached set for a (tenant, subject) pair.
    ///
    /// An entry past its TTL or recorded under a stale tenant version is
    /// deleted and reported as a miss.
    pub fn get(&self, tenant: &TenantId, subject: &SubjectId) -> Option<Arc<PermissionSet>> {
        if self.capacity == 0 {
            return None;
        }
        let key = Self::key(tenant, subject);
        let now = Instant::now();
        let mut guard = self.inner.lock().expect("poisoned lock");

        let live = match guard.entries.get(&key) {
            None => None,
            Some(entry) => {
                if entry.expires_at <= now
                    || entry.version < Self::current_version(&guard, tenant)
                {
                    None
                } else {
                    Some(entry.value.clone())
                }
            }
        };

        match live {
            Some(value) => {
                guard.hits += 1;
                if let Some(entry) = guard.entries.get_mut(&key) {
                    entry.touched_at = now;
                }
                Some(value)
            }
            None => {
                guard.misses += 1;
                guard.entries.remove(&key);
                None
            }
        }
    }

    /// Caches a permission set for a (tenant, subject) pair.
    pub fn set(&self, tenant: &TenantId, subject: &SubjectId, value: Arc<PermissionSet>) {
        if self.capacity == 0 {
            return;
        }
        let key = Self::key(tenant, subject);
        let now = Instant::now();
        let mut guard = self.inner.lock().expect("poisoned lock");

        if !guard.entries.contains_key(&key) && guard.entries.len() >= self.capacity {
            Self::evict_one(&mut guard, self.strategy, now);
        }

        let version = Self::current_version(&guard, tenant);
        guard.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                touched_at: now,
                expires_at: now + self.ttl,
                version,
            },
        );
    }

    fn evict_one(state: &mut CacheState, strategy: EvictionStrategy, now: Instant) {
        if strategy == EvictionStrategy::Ttl {
            let before = state.entries.len();
            state.entries.retain(|_, entry| entry.expires_at > now);
            if state.entries.len() < before {
                return;
            }
        }
        let victim = match strategy {
            EvictionStrategy::Fifo => state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at),
            // Ttl with nothing expired falls back to LRU.
            EvictionStrategy::Lru | EvictionStrategy::Ttl => state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.touched_at),
        };
        if let Some((key, _)) = victim {
            let key = key.clone();
            state.entries.remove(&key);
        }
    }

    /// Cache-aside read: returns the cached set or invokes the resolver,
    /// caching its output.
    ///
    /// A resolver failure yields an empty set and caches nothing, so the
    /// next call retries instead of pinning the failure. This is the
    /// fail-safe default-deny path.
    pub async fn get_or_load<R: EffectiveResolver + ?Sized>(
        &self,
        tenant: &TenantId,
        subject: &SubjectId,
        resolver: &R,
    ) -> Arc<PermissionSet> {
        if let Some(cached) = self.get(tenant, subject) {
            return cached;
        }
        match resolver.resolve(tenant, subject).await {
            Ok(permissions) => {
                let value = Arc::new(permissions);
                self.set(tenant, subject, value.clone());
                value
            }
            Err(error) => {
                warn!(
                    tenant = %tenant,
                    subject = %subject,
                    %error,
                    "permission resolution failed, treating as empty set"
                );
                Arc::new(PermissionSet::new())
            }
        }
    }

    /// Deletes exactly the entry for one (tenant, subject) pair.
    pub fn invalidate_subject(&self, tenant: &TenantId, subject: &SubjectId) {
        let key = Self::key(tenant, subject);
        let mut guard = self.inner.lock().expect("poisoned lock");
        guard.entries.remove(&key);
    }

    /// Deletes every entry belonging to a tenant; returns the count
    /// removed. Entries of other tenants are never touched.
    pub fn invalidate_tenant(&self, tenant: &TenantId) -> usize {
        let mut guard = self.inner.lock().expect("poisoned lock");
        let before = guard.entries.len();
        guard.entries.retain(|key, _| &key.tenant != tenant);
        let removed = before - guard.entries.len();
        debug!(tenant = %tenant, removed, "invalidated tenant cache entries");
        removed
    }

    /// Increments the tenant's invalidation epoch and returns the new
    /// counter. Entries recorded under older versions become misses.
    pub fn bump_version(&self, tenant: &TenantId) -> u64 {
        let mut guard = self.inner.lock().expect("poisoned lock");
        let info = guard
            .versions
            .entry(tenant.clone())
            .or_insert_with(|| VersionInfo {
                tenant: tenant.clone(),
                version: 0,
                updated_at: Utc::now(),
            });
        info.version += 1;
        info.updated_at = Utc::now();
        info.version
    }

    /// Returns the tenant's current invalidation epoch.
    pub fn version(&self, tenant: &TenantId) -> Option<VersionInfo> {
        let guard = self.inner.lock().expect("poisoned lock");
        guard.versions.get(tenant).cloned()
    }

    /// Returns hit/miss statistics.
    pub fn stats(&self) -> CacheStats {
        let guard = self.inner.lock().expect("poisoned lock");
        CacheStats {
            hits: guard.hits,
            misses: guard.misses,
        }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("poisoned lock").entries.len()
    }

    /// Returns true when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired entry; returns the count removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.inner.lock().expect("poisoned lock");
        let before = guard.entries.len();
        guard.entries.retain(|_, entry| entry.expires_at > now);
        before - guard.entries.len()
    }
}
