//! Shared server state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fraiseql_arrow::ArrowPlaneExecutor;
use fraiseql_core::apq::ApqCache;
use fraiseql_core::db::{DatabaseAdapter, PostgresAdapter};
use fraiseql_core::federation::EntityResolver;
use fraiseql_core::runtime::Executor;
use fraiseql_core::schema::CompiledSchema;
use fraiseql_core::FraiseQLConfig;
use fraiseql_error::Result;

use crate::rate_limit::RateLimiter;

/// Everything a request handler needs; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// JSON-plane executor.
    pub executor: Arc<Executor>,

    /// Arrow-plane executor.
    pub arrow: Arc<ArrowPlaneExecutor>,

    /// Compiled schema (read-only after load).
    pub schema: Arc<CompiledSchema>,

    /// Runtime configuration.
    pub config: Arc<FraiseQLConfig>,

    /// Local database adapter (delta-plane polling).
    pub adapter: Arc<dyn DatabaseAdapter>,

    /// Process-wide rate limiter.
    pub limiter: Arc<RateLimiter>,

    /// APQ cache (exposed for maintenance sweeps).
    pub apq: Arc<ApqCache>,
}

impl AppState {
    /// Wire the full pipeline from configuration: schema artifact, pool,
    /// APQ cache, federation resolver, executors.
    pub fn from_config(config: FraiseQLConfig) -> Result<Self> {
        let schema = Arc::new(CompiledSchema::from_file(std::path::Path::new(
            &config.schema_path,
        ))?);

        let adapter: Arc<dyn DatabaseAdapter> = Arc::new(PostgresAdapter::connect(
            &config.database_url,
            config.pool.max_connections,
            Duration::from_millis(config.pool.acquire_timeout_ms),
            Duration::from_millis(config.pool.query_timeout_ms),
        )?);

        let mut peers: HashMap<String, Arc<dyn DatabaseAdapter>> = HashMap::new();
        for (name, url) in &config.peers {
            peers.insert(
                name.clone(),
                Arc::new(PostgresAdapter::connect(
                    url,
                    config.pool.max_connections,
                    Duration::from_millis(config.pool.acquire_timeout_ms),
                    Duration::from_millis(config.pool.query_timeout_ms),
                )?),
            );
        }

        let apq = Arc::new(ApqCache::new(
            Duration::from_secs(config.apq.ttl_secs),
            schema.schema_hash.clone(),
        ));

        let resolver = schema.federation.enabled.then(|| {
            Arc::new(EntityResolver::new(
                Arc::clone(&schema),
                Arc::clone(&adapter),
                peers,
                config.subgraph_client_config(),
                config.error_sanitization,
            ))
        });

        let executor = Arc::new(Executor::new(
            Arc::clone(&schema),
            Arc::clone(&adapter),
            Arc::clone(&apq),
            resolver,
            &config,
        )?);

        let arrow = Arc::new(ArrowPlaneExecutor::new(Arc::clone(&adapter)));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_rps));

        Ok(Self {
            executor,
            arrow,
            schema,
            config: Arc::new(config),
            adapter,
            limiter,
            apq,
        })
    }

    /// Build state over an existing adapter (tests, embedded use).
    pub fn with_adapter(
        config: FraiseQLConfig,
        schema: Arc<CompiledSchema>,
        adapter: Arc<dyn DatabaseAdapter>,
    ) -> Result<Self> {
        let apq = Arc::new(ApqCache::new(
            Duration::from_secs(config.apq.ttl_secs),
            schema.schema_hash.clone(),
        ));
        let resolver = schema.federation.enabled.then(|| {
            Arc::new(EntityResolver::new(
                Arc::clone(&schema),
                Arc::clone(&adapter),
                HashMap::new(),
                config.subgraph_client_config(),
                config.error_sanitization,
            ))
        });
        let executor = Arc::new(Executor::new(
            Arc::clone(&schema),
            Arc::clone(&adapter),
            Arc::clone(&apq),
            resolver,
            &config,
        )?);
        let arrow = Arc::new(ArrowPlaneExecutor::new(Arc::clone(&adapter)));
        let limiter = Arc::new(RateLimiter::new(config.rate_limit_rps));

        Ok(Self {
            executor,
            arrow,
            schema,
            config: Arc::new(config),
            adapter,
            limiter,
            apq,
        })
    }
}
