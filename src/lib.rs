// ABOUTME: Main library entry point for the Monay tenant gateway
// ABOUTME: Request-time tenant resolution, isolation, and quota enforcement middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

#![deny(unsafe_code)]

//! # Monay Tenant Gateway
//!
//! Request-time tenant context resolution and enforcement for the Monay
//! platform. The gateway sits in front of all tenant-scoped API handlers
//! and, for every inbound request: resolves the calling tenant from one of
//! four credential sources, gates on tenant status, derives per-request
//! vault key material for downstream signing, tracks billable operations
//! off the request path, enforces per-tenant rate limits, and scopes the
//! database session to the tenant's isolation level.
//!
//! ## Resolution sources
//!
//! In fixed priority order: `mk_`-prefixed API keys (`x-api-key` or bearer
//! slot), bearer JWTs mapped through tenant membership, the internal
//! service header pair, and registered `Host` subdomains. A source that
//! does not match falls through to the next.
//!
//! ## Architecture
//!
//! - **Credentials**: header parsing and source priority
//! - **Directory**: read-only tenant, membership, and limit lookups
//! - **Vault**: per-request AEAD wrapping of tenant vault keys
//! - **Rate limiting**: dual fixed windows over an atomic counter store
//! - **Billing**: fire-and-forget usage recording
//! - **DB context**: session-scoped row/schema isolation with RAII release
//! - **Gateway**: the orchestrator wiring the steps into Axum middleware
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use monay_tenant_gateway::auth::AuthManager;
//! use monay_tenant_gateway::config::environment::RateLimitConfig;
//! use monay_tenant_gateway::counters::MemoryCounterStore;
//! use monay_tenant_gateway::db_context::RecordingIsolation;
//! use monay_tenant_gateway::directory::MemoryDirectory;
//! use monay_tenant_gateway::gateway::TenantGateway;
//!
//! let gateway = TenantGateway::new(
//!     Arc::new(MemoryDirectory::new()),
//!     Arc::new(MemoryCounterStore::new()),
//!     Arc::new(RecordingIsolation::new()),
//!     AuthManager::new("dev-secret"),
//!     None,
//!     RateLimitConfig::default(),
//! );
//! ```

/// Token verification primitives: bearer JWTs and API key hashing
pub mod auth;

/// Billable operation classification and asynchronous usage tracking
pub mod billing;

/// Configuration management and environment loading
pub mod config;

/// Counter store abstraction backing the rate limiter
pub mod counters;

/// Credential extraction across the four resolution sources
pub mod credentials;

/// Session-scoped database isolation for tenant requests
pub mod db_context;

/// Tenant directory lookups over Postgres or in-memory state
pub mod directory;

/// Unified error handling with standard error codes and HTTP responses
pub mod errors;

/// Middleware orchestrator sequencing resolution and enforcement
pub mod gateway;

/// Production logging and structured output
pub mod logging;

/// Core data models for tenant resolution and request context
pub mod models;

/// Per-tenant fixed-window rate limiting
pub mod rate_limiting;

/// HTTP routes served by the gateway itself
pub mod routes;

/// Per-request vault context derivation for downstream signing
pub mod vault;
