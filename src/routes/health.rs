// ABOUTME: Health check route handlers
// ABOUTME: Public liveness endpoint served without tenant context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Liveness response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process can serve requests
    pub status: &'static str,
    /// Service identifier
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Server-side timestamp
    pub timestamp: DateTime<Utc>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "monay-tenant-gateway",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Router for the health endpoint
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}
