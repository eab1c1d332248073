use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::cache::PermissionCache;
use crate::error::{Error, Result};
use crate::permission::{GLOBAL_WILDCARD, MatchKind, Permission, match_permission};
use crate::resolver::EffectiveResolver;
use crate::types::{SubjectContext, SubjectKind, TenantContext};

/// Default permit count for concurrent batch evaluation.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// One permission check request: who is asking to do what, where.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// Tenant boundary for the check.
    pub tenant: TenantContext,
    /// Acting subject.
    pub subject: SubjectContext,
    /// Required permission code.
    pub permission: Permission,
}

impl CheckContext {
    /// Builds a check context.
    pub fn new(tenant: TenantContext, subject: SubjectContext, permission: Permission) -> Self {
        Self {
            tenant,
            subject,
            permission,
        }
    }
}

/// Machine-readable explanation of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// System subjects bypass permission checks.
    SystemSubject,
    /// Granted by a permission attached directly to the subject.
    DirectPermission,
    /// Granted by the global wildcard `*`.
    GlobalWildcard,
    /// Granted by a `resource:*` wildcard.
    ResourceWildcard,
    /// Granted by the exact permission code.
    ExactMatch,
    /// No grant matched.
    NotGranted,
}

impl Reason {
    /// Stable string form for logs and error payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::SystemSubject => "system subject",
            Reason::DirectPermission => "direct permission",
            Reason::GlobalWildcard => "global wildcard",
            Reason::ResourceWildcard => "resource wildcard",
            Reason::ExactMatch => "exact match",
            Reason::NotGranted => "permission not granted",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MatchKind> for Reason {
    fn from(kind: MatchKind) -> Self {
        match kind {
            MatchKind::GlobalWildcard => Reason::GlobalWildcard,
            MatchKind::ResourceWildcard => Reason::ResourceWildcard,
            MatchKind::Exact => Reason::ExactMatch,
        }
    }
}

/// Outcome of a single permission check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Verdict.
    pub allowed: bool,
    /// Permission code that was checked.
    pub permission: Permission,
    /// Why the verdict was reached.
    pub reason: Reason,
    /// Wall-clock evaluation time in milliseconds.
    pub evaluation_time_ms: f64,
}

/// Options for [`Checker::check_many`].
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Evaluate concurrently instead of sequentially.
    pub parallel: bool,
    /// Upper bound on simultaneous in-flight resolutions.
    pub max_concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Outcome of a batch check, keyed by permission code.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Per-code results; duplicate codes in the input collapse to one entry.
    pub results: HashMap<Permission, CheckResult>,
    /// True when every result allowed (vacuously true for empty input).
    pub all_allowed: bool,
    /// True when at least one result allowed.
    pub any_allowed: bool,
}

/// Request-facing permission decision engine.
///
/// Stateless per call and safe for unlimited concurrent reuse; the cache
/// and the resolver behind it are the only shared state. Hold one instance
/// per application scope, there is no process-wide singleton.
#[derive(Clone)]
pub struct Checker {
    resolver: Arc<dyn EffectiveResolver>,
    cache: PermissionCache,
}

impl Checker {
    /// Creates a checker over an injected resolver and cache.
    pub fn new(resolver: Arc<dyn EffectiveResolver>, cache: PermissionCache) -> Self {
        Self { resolver, cache }
    }

    /// Swaps the resolver, e.g. for an allow-all test double.
    pub fn set_resolver(&mut self, resolver: Arc<dyn EffectiveResolver>) {
        self.resolver = resolver;
    }

    /// Returns a handle to the backing cache for invalidation hooks.
    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Decides whether the context's subject holds the required permission.
    ///
    /// Evaluation order: tenant validation, system-subject bypass, direct
    /// grants, then the cache-backed effective set with wildcard precedence
    /// global `*` over `resource:*` over exact. A resolver failure is
    /// folded into an empty set by the cache, so every unknown failure
    /// mode resolves to deny, never allow.
    pub async fn check(&self, context: &CheckContext) -> Result<CheckResult> {
        let started = Instant::now();
        context.tenant.validate()?;

        if context.subject.kind == SubjectKind::System {
            return Ok(Self::verdict(context, true, Reason::SystemSubject, started));
        }

        if context
            .subject
            .direct_permissions
            .contains(context.permission.as_str())
            || context.subject.direct_permissions.contains(GLOBAL_WILDCARD)
        {
            return Ok(Self::verdict(
                context,
                true,
                Reason::DirectPermission,
                started,
            ));
        }

        let effective = self
            .cache
            .get_or_load(
                &context.tenant.id,
                &context.subject.id,
                self.resolver.as_ref(),
            )
            .await;

        let result = match match_permission(&effective, &context.permission) {
            Some(kind) => Self::verdict(context, true, kind.into(), started),
            None => Self::verdict(context, false, Reason::NotGranted, started),
        };
        debug!(
            tenant = %context.tenant.id,
            subject = %context.subject.id,
            permission = %context.permission,
            allowed = result.allowed,
            reason = %result.reason,
            "permission check"
        );
        Ok(result)
    }

    fn verdict(
        context: &CheckContext,
        allowed: bool,
        reason: Reason,
        started: Instant,
    ) -> CheckResult {
        CheckResult {
            allowed,
            permission: context.permission.clone(),
            reason,
            evaluation_time_ms: started.elapsed().as_secs_f64() * 1_000.0,
        }
    }

    /// Like [`Checker::check`] but raises a structured
    /// [`Error::PermissionDenied`] when not allowed.
    pub async fn check_or_deny(&self, context: &CheckContext) -> Result<CheckResult> {
        let result = self.check(context).await?;
        if result.allowed {
            Ok(result)
        } else {
            Err(Error::PermissionDenied {
                permission: context.permission.as_str().to_string(),
                tenant: context.tenant.id.clone(),
                subject: context.subject.id.clone(),
                reason: result.reason.as_str().to_string(),
            })
        }
    }

    /// Evaluates a batch of checks, sequentially or with bounded
    /// concurrency.
    ///
    /// The concurrent mode gates in-flight resolutions with a counting
    /// semaphore so a large batch cannot overwhelm the permission data
    /// source; permits are released when their futures drop, including on
    /// cancellation. Sequential and concurrent modes produce identical
    /// verdicts. An empty batch is vacuously `all_allowed`.
    pub async fn check_many(
        &self,
        contexts: &[CheckContext],
        options: &BatchOptions,
    ) -> Result<BatchResult> {
        let mut results: HashMap<Permission, CheckResult> = HashMap::new();

        if options.parallel && contexts.len() > 1 {
            let semaphore = Semaphore::new(options.max_concurrency.max(1));
            let checks = contexts.iter().map(|context| {
                let semaphore = &semaphore;
                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");
                    let result = self.check(context).await;
                    (context.permission.clone(), result)
                }
            });
            for (permission, result) in futures::future::join_all(checks).await {
                results.insert(permission, result?);
            }
        } else {
            for context in contexts {
                let result = self.check(context).await?;
                results.insert(context.permission.clone(), result);
            }
        }

        let all_allowed = results.values().all(|result| result.allowed);
        let any_allowed = results.values().any(|result| result.allowed);
        Ok(BatchResult {
            results,
            all_allowed,
            any_allowed,
        })
    }

    /// Returns true when the subject holds at least one of the given codes.
    ///
    /// Best-effort: malformed codes are skipped rather than failing the
    /// whole call.
    pub async fn has_any(
        &self,
        tenant: &TenantContext,
        subject: &SubjectContext,
        codes: &[&str],
    ) -> Result<bool> {
        for code in codes {
            let Ok(permission) = Permission::new(code) else {
                continue;
            };
            let context = CheckContext::new(tenant.clone(), subject.clone(), permission);
            if self.check(&context).await?.allowed {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns true when the subject holds every one of the given codes.
    ///
    /// Strict: a malformed code fails the call, because a missing
    /// permission in an AND-list must never silently count as satisfied.
    pub async fn has_all(
        &self,
        tenant: &TenantContext,
        subject: &SubjectContext,
        codes: &[&str],
    ) -> Result<bool> {
        for code in codes {
            let permission = Permission::new(code)?;
            let context = CheckContext::new(tenant.clone(), subject.clone(), permission);
            if !self.check(&context).await?.allowed {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
