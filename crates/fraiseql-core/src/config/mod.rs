//! Runtime configuration.
//!
//! One explicit struct, deserialized from TOML and threaded through
//! construction. Environment variables override the operational knobs
//! (rate limiting, audit level, error sanitization); everything else is
//! file-only. There are no global singletons.

use std::collections::HashMap;
use std::time::Duration;

use fraiseql_error::{FraiseQLError, Result, SanitizationLevel};
use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraiseQLConfig {
    /// Database target identifier (must match the compiled schema).
    pub target: String,

    /// Primary database connection URL.
    pub database_url: String,

    /// Path to the compiled schema artifact.
    pub schema_path: String,

    /// Connection pool tuning.
    #[serde(default)]
    pub pool: PoolConfig,

    /// APQ cache tuning.
    #[serde(default)]
    pub apq: ApqConfig,

    /// Pagination tuning.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Full-request deadline in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// External error sanitization level.
    #[serde(default)]
    pub error_sanitization: SanitizationLevel,

    /// Audit logging level.
    #[serde(default)]
    pub audit_level: AuditLevel,

    /// Requests per second per client before `RateLimited`.
    #[serde(default = "default_rate_limit_rps")]
    pub rate_limit_rps: u32,

    /// Named peer database connections for `peer_database` strategies.
    #[serde(default)]
    pub peers: HashMap<String, String>,

    /// HTTP subgraph retry/breaker tuning.
    #[serde(default)]
    pub federation: FederationConfig,
}

/// Connection pool tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum pooled connections.
    pub max_connections: usize,
    /// Pool acquisition deadline (ms).
    pub acquire_timeout_ms: u64,
    /// Per-query deadline (ms).
    pub query_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections:    16,
            acquire_timeout_ms: 2_000,
            query_timeout_ms:   10_000,
        }
    }
}

/// APQ cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApqConfig {
    /// Entry TTL in seconds.
    pub ttl_secs: u64,
}

impl Default for ApqConfig {
    fn default() -> Self {
        Self { ttl_secs: 3_600 }
    }
}

/// Pagination tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when `first` is absent.
    pub default_page_size: usize,
    /// Hard cap on `first`.
    pub max_page_size: usize,
    /// OFFSET values above this are rejected (keyset is canonical).
    pub offset_warn_threshold: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size:     100,
            max_page_size:         1_000,
            offset_warn_threshold: 1_000,
        }
    }
}

/// HTTP subgraph retry/breaker tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Per-request subgraph timeout (ms).
    pub subgraph_timeout_ms: u64,
    /// Total attempts per subgraph call.
    pub max_attempts: u32,
    /// Base retry backoff (ms).
    pub base_backoff_ms: u64,
    /// Backoff cap (ms).
    pub max_backoff_ms: u64,
    /// Consecutive failures opening the circuit breaker.
    pub breaker_threshold: u32,
    /// Breaker cooldown (ms).
    pub breaker_cooldown_ms: u64,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            subgraph_timeout_ms: 5_000,
            max_attempts:        3,
            base_backoff_ms:     100,
            max_backoff_ms:      2_000,
            breaker_threshold:   5,
            breaker_cooldown_ms: 30_000,
        }
    }
}

/// Audit logging levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    /// No audit events.
    None,
    /// Mutations only.
    #[default]
    Writes,
    /// Every operation.
    All,
}

impl AuditLevel {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "writes" => Some(Self::Writes),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

const fn default_rate_limit_rps() -> u32 {
    100
}

impl FraiseQLConfig {
    /// Parse from TOML text and apply environment overrides.
    pub fn from_toml(toml_text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(toml_text)
            .map_err(|e| FraiseQLError::config(format!("invalid configuration: {e}")))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a TOML file and apply environment overrides.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Apply `FRAISEQL_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(rps) = std::env::var("FRAISEQL_RATE_LIMIT_RPS") {
            if let Ok(rps) = rps.parse() {
                self.rate_limit_rps = rps;
            }
        }
        if let Ok(level) = std::env::var("FRAISEQL_AUDIT_LEVEL") {
            if let Some(level) = AuditLevel::parse(&level) {
                self.audit_level = level;
            }
        }
        if let Ok(level) = std::env::var("FRAISEQL_ERROR_SANITIZATION") {
            if let Some(level) = SanitizationLevel::parse(&level) {
                self.error_sanitization = level;
            }
        }
    }

    /// Request deadline as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Subgraph client config derived from the federation block.
    #[must_use]
    pub fn subgraph_client_config(&self) -> crate::federation::SubgraphClientConfig {
        crate::federation::SubgraphClientConfig {
            request_timeout:   Duration::from_millis(self.federation.subgraph_timeout_ms),
            max_attempts:      self.federation.max_attempts,
            base_backoff:      Duration::from_millis(self.federation.base_backoff_ms),
            max_backoff:       Duration::from_millis(self.federation.max_backoff_ms),
            breaker_threshold: self.federation.breaker_threshold,
            breaker_cooldown:  Duration::from_millis(self.federation.breaker_cooldown_ms),
        }
    }
}
