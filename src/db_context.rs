// ABOUTME: Session-scoped database isolation for tenant requests
// ABOUTME: Dedicated connection with RLS variable and schema search path, released by RAII
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Database Context Setter
//!
//! Tenants with row or schema isolation get a dedicated connection for the
//! lifetime of their request. The connection carries a session variable
//! (`app.current_tenant_id`) that the storage layer's row-level-security
//! policies key on; schema-isolated tenants additionally get their own
//! schema placed ahead of `public` in the search path.
//!
//! The session guard owns the connection and returns it to the pool on Drop.
//! Releasing exactly once on every exit path (success, error, client abort)
//! is a correctness requirement here, not a tuning concern, which is why the
//! guard is the only way to hold the connection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use tracing::debug;

use crate::errors::AppResult;
use crate::models::{IsolationLevel, Tenant};

/// Guard over a request's isolation session
///
/// Dropping the guard releases whatever the backend acquired; for Postgres
/// that returns the dedicated connection to its pool.
pub trait TenantSession: Send {}

/// Opens isolation sessions for resolved tenants
#[async_trait]
pub trait IsolationBackend: Send + Sync {
    /// Open a session for the tenant, `None` when its isolation level
    /// requires no session context
    async fn open_session(&self, tenant: &Tenant) -> AppResult<Option<Box<dyn TenantSession>>>;
}

/// Postgres-backed isolation using RLS session variables and search paths
#[derive(Clone)]
pub struct PostgresIsolation {
    pool: PgPool,
}

struct PgTenantSession {
    _conn: PoolConnection<Postgres>,
}

impl TenantSession for PgTenantSession {}

impl PostgresIsolation {
    /// Connect a dedicated pool for isolation sessions
    ///
    /// Connections reset their session state (`RESET ALL`) when they return
    /// to the pool, so a tenant variable can never leak into another
    /// request's session.
    ///
    /// # Errors
    ///
    /// Returns an error when the pool cannot be established.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("RESET ALL").execute(&mut *conn).await?;
                    Ok(true)
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Build over an existing pool
    ///
    /// The pool must reset session state on release; prefer
    /// [`PostgresIsolation::connect`] unless the caller already configures
    /// that.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IsolationBackend for PostgresIsolation {
    async fn open_session(&self, tenant: &Tenant) -> AppResult<Option<Box<dyn TenantSession>>> {
        if tenant.isolation_level == IsolationLevel::None {
            return Ok(None);
        }

        // Acquired before the SET calls; if either fails the connection
        // drops here and goes back to the pool before the error propagates.
        let mut conn = self.pool.acquire().await?;

        sqlx::query("SELECT set_config('app.current_tenant_id', $1, false)")
            .bind(tenant.id.to_string())
            .execute(&mut *conn)
            .await?;

        if tenant.isolation_level == IsolationLevel::Schema {
            sqlx::query("SELECT set_config('search_path', $1, false)")
                .bind(format!("tenant_{}, public", tenant.code))
                .execute(&mut *conn)
                .await?;
        }

        debug!(
            tenant_id = %tenant.id,
            isolation = tenant.isolation_level.as_str(),
            "opened tenant isolation session"
        );

        Ok(Some(Box::new(PgTenantSession { _conn: conn })))
    }
}

/// Isolation backend that only counts acquire/release pairs
///
/// Stands in for Postgres in tests asserting that every opened session is
/// released exactly once on every response path.
#[derive(Default)]
pub struct RecordingIsolation {
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
}

struct RecordingSession {
    released: Arc<AtomicUsize>,
}

impl TenantSession for RecordingSession {}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl RecordingIsolation {
    /// Create a backend with zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions opened so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of sessions released so far
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IsolationBackend for RecordingIsolation {
    async fn open_session(&self, tenant: &Tenant) -> AppResult<Option<Box<dyn TenantSession>>> {
        if tenant.isolation_level == IsolationLevel::None {
            return Ok(None);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(RecordingSession {
            released: Arc::clone(&self.released),
        })))
    }
}
