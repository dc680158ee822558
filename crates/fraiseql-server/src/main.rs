//! FraiseQL server binary.
//!
//! Loads the runtime configuration (path from `FRAISEQL_CONFIG` or the
//! first argument, default `fraiseql.toml`), wires the pipeline and serves
//! until SIGINT.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::path::PathBuf;

use fraiseql_core::FraiseQLConfig;
use fraiseql_server::{router, AppState};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info,fraiseql_core=info,fraiseql_server=info")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> fraiseql_error::Result<()> {
    let config_path: PathBuf = std::env::var("FRAISEQL_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .unwrap_or_else(|| "fraiseql.toml".to_string())
        .into();

    let config = FraiseQLConfig::from_file(&config_path)?;
    let bind_addr =
        std::env::var("FRAISEQL_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

    let state = AppState::from_config(config)?;
    tracing::info!(
        schema_hash = %state.schema.schema_hash,
        target = %state.schema.target,
        addr = %bind_addr,
        "fraiseql server starting"
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
