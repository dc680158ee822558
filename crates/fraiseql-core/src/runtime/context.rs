//! Per-request context.
//!
//! Passed by reference through the task; never a global. Carries the
//! authenticated claims the authorization binders read, the trace context,
//! the cancellation token and the request deadline.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::observability::TraceContext;

/// Request-scoped execution context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Tenant identifier, when multi-tenancy is active.
    pub tenant_id: Option<String>,

    /// Authenticated claims; authorization row-filter binders pull values
    /// from here by key (`tenant_id`, `user_id`, ...).
    pub claims: HashMap<String, serde_json::Value>,

    /// Permissions granted to the caller (field-permission checks).
    pub permissions: Vec<String>,

    /// W3C trace context for this request.
    pub trace: TraceContext,

    /// Cooperative cancellation token; cancelling it aborts in-flight
    /// database queries and subgraph calls.
    pub cancel: CancellationToken,

    /// Absolute request deadline.
    pub deadline: Option<Instant>,
}

impl RequestContext {
    /// Build a context with a fresh trace and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tenant_id:   None,
            claims:      HashMap::new(),
            permissions: Vec::new(),
            trace:       TraceContext::generate(),
            cancel:      CancellationToken::new(),
            deadline:    None,
        }
    }

    /// Set the tenant; also exposes it as the `tenant_id` claim.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        let tenant = tenant_id.into();
        self.claims
            .insert("tenant_id".to_string(), serde_json::Value::String(tenant.clone()));
        self.tenant_id = Some(tenant);
        self
    }

    /// Add a claim.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.claims.insert(key.into(), value);
        self
    }

    /// Set the request deadline relative to now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Budget remaining before the request deadline, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Value for an authorization binder key.
    #[must_use]
    pub fn claim(&self, key: &str) -> Option<&serde_json::Value> {
        self.claims.get(key)
    }

    /// Whether the caller holds a permission.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
