// ABOUTME: Server binary for the Monay tenant gateway
// ABOUTME: Wires storage backends into the gateway middleware and serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Result;
use axum::{middleware, Router};
use monay_tenant_gateway::config::environment::ServerConfig;
use monay_tenant_gateway::counters::{CounterStore, MemoryCounterStore, RedisCounterStore};
use monay_tenant_gateway::db_context::PostgresIsolation;
use monay_tenant_gateway::directory::PostgresDirectory;
use monay_tenant_gateway::gateway::{tenant_context_layer, TenantGateway};
use monay_tenant_gateway::{logging, routes};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = ServerConfig::from_env()?;

    let directory = Arc::new(PostgresDirectory::connect(&config.database_url).await?);
    let isolation = Arc::new(PostgresIsolation::connect(&config.database_url).await?);

    let counters: Arc<dyn CounterStore> = match config.redis_url.as_deref() {
        Some(redis_url) => Arc::new(RedisCounterStore::connect(redis_url).await?),
        None => {
            warn!("REDIS_URL not set, rate-limit counters are process-local");
            Arc::new(MemoryCounterStore::new())
        }
    };

    let gateway = Arc::new(TenantGateway::from_config(
        &config, directory, counters, isolation,
    ));

    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::tenants::router())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&gateway),
            tenant_context_layer,
        ))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.http_port)).await?;
    info!(port = config.http_port, "tenant gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
