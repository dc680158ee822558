//! HTTP subgraph client.
//!
//! One batched `_entities` request per subgraph per `_entities` call. The
//! batch is read-only and therefore idempotent: retries resend the identical
//! body. Each subgraph gets its own circuit breaker so one flapping peer
//! cannot consume the whole retry budget of every request.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use fraiseql_error::{ExecutionError, FederationError, Result};
use rand::Rng;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::observability::TraceContext;

/// Tunables for subgraph calls.
#[derive(Debug, Clone)]
pub struct SubgraphClientConfig {
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Total attempts (first try + retries).
    pub max_attempts: u32,
    /// Base backoff; doubles per attempt with jitter.
    pub base_backoff: Duration,
    /// Backoff cap.
    pub max_backoff: Duration,
    /// Consecutive failures that open the breaker.
    pub breaker_threshold: u32,
    /// How long an open breaker rejects before allowing a probe.
    pub breaker_cooldown: Duration,
}

impl Default for SubgraphClientConfig {
    fn default() -> Self {
        Self {
            request_timeout:   Duration::from_secs(5),
            max_attempts:      3,
            base_backoff:      Duration::from_millis(100),
            max_backoff:       Duration::from_secs(2),
            breaker_threshold: 5,
            breaker_cooldown:  Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at:            Option<Instant>,
}

/// Reqwest-backed subgraph client with retries and circuit breaking.
pub struct HttpSubgraphClient {
    client:   reqwest::Client,
    config:   SubgraphClientConfig,
    breakers: DashMap<String, BreakerState>,
}

impl HttpSubgraphClient {
    /// Build a client.
    #[must_use]
    pub fn new(config: SubgraphClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            breakers: DashMap::new(),
        }
    }

    /// Resolve a batch of representations against one subgraph.
    ///
    /// `selection` is the GraphQL selection applied under `_entities`
    /// (e.g. `{ __typename id name }`). Returns one entry per
    /// representation, in order.
    pub async fn resolve_entities(
        &self,
        url: &str,
        representations: &[Value],
        selection: &str,
        trace: &TraceContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Value>>> {
        self.check_breaker(url)?;

        let query = format!(
            "query($representations:[_Any!]!){{_entities(representations:$representations){selection}}}"
        );
        let body = json!({
            "query": query,
            "variables": {"representations": representations},
        });

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                let backoff = self.backoff_for(attempt);
                tokio::select! {
                    () = cancel.cancelled() => {
                        return Err(ExecutionError::cancelled("request cancelled").into());
                    },
                    () = tokio::time::sleep(backoff) => {},
                }
            }

            let request = self
                .client
                .post(url)
                .header("traceparent", trace.child().to_header())
                .timeout(self.config.request_timeout)
                .json(&body)
                .send();

            let outcome = tokio::select! {
                () = cancel.cancelled() => {
                    return Err(ExecutionError::cancelled("request cancelled").into());
                },
                outcome = request => outcome,
            };

            match outcome {
                Ok(response) if response.status().is_success() => {
                    match parse_entities_body(response.json::<Value>().await, representations.len())
                    {
                        Ok(entities) => {
                            self.record_success(url);
                            return Ok(entities);
                        },
                        Err(cause) => last_error = cause,
                    }
                },
                Ok(response) => {
                    last_error = format!("subgraph returned HTTP {}", response.status());
                },
                Err(e) => {
                    last_error = e.to_string();
                },
            }
            self.record_failure(url);
            tracing::warn!(
                target: "fraiseql::federation",
                url,
                attempt,
                error = %last_error,
                "subgraph attempt failed"
            );
        }

        Err(FederationError::SubgraphUnreachable {
            subgraph: url.to_string(),
            attempts: self.config.max_attempts,
            cause:    last_error,
        }
        .into())
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .base_backoff
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(2)))
            .min(self.config.max_backoff);
        // Full jitter: uniform in [exp/2, exp].
        let millis = u64::try_from(exp.as_millis()).unwrap_or(u64::MAX);
        let jittered = rand::thread_rng().gen_range(millis / 2..=millis.max(1));
        Duration::from_millis(jittered)
    }

    fn check_breaker(&self, url: &str) -> Result<()> {
        if let Some(mut state) = self.breakers.get_mut(url) {
            if let Some(opened_at) = state.opened_at {
                if opened_at.elapsed() < self.config.breaker_cooldown {
                    return Err(FederationError::SubgraphUnreachable {
                        subgraph: url.to_string(),
                        attempts: 0,
                        cause:    "circuit breaker open".to_string(),
                    }
                    .into());
                }
                // Half-open: allow one probe.
                state.opened_at = None;
            }
        }
        Ok(())
    }

    fn record_success(&self, url: &str) {
        if let Some(mut state) = self.breakers.get_mut(url) {
            state.consecutive_failures = 0;
            state.opened_at = None;
        }
    }

    fn record_failure(&self, url: &str) {
        let mut state = self.breakers.entry(url.to_string()).or_default();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.config.breaker_threshold {
            state.opened_at = Some(Instant::now());
        }
    }
}

fn parse_entities_body(
    body: std::result::Result<Value, reqwest::Error>,
    expected: usize,
) -> std::result::Result<Vec<Option<Value>>, String> {
    let body = body.map_err(|e| format!("invalid subgraph response body: {e}"))?;
    let Some(entities) = body.pointer("/data/_entities").and_then(Value::as_array) else {
        return Err("subgraph response missing data._entities".to_string());
    };
    if entities.len() != expected {
        return Err(format!(
            "subgraph returned {} entities for {expected} representations",
            entities.len()
        ));
    }
    Ok(entities
        .iter()
        .map(|e| if e.is_null() { None } else { Some(e.clone()) })
        .collect())
}
