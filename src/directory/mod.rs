// ABOUTME: Tenant directory abstraction for identity, membership, and limit lookups
// ABOUTME: Read-only storage interface with Postgres and in-memory backends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Tenant Directory
//!
//! All persistent reads the gateway performs go through [`TenantDirectory`]:
//! tenant records, API key verification, user memberships, subdomain
//! lookups, feature maps, usage limits, and vault key material. The gateway
//! never mutates tenant state; the single write operation is the append-only
//! billable-operation sink.
//!
//! Implementations are injected at startup, which keeps the orchestrator
//! free of storage assumptions and lets tests run against the in-memory
//! backend.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{
    BillableOperation, Tenant, TenantId, TenantMembership, UsageLimits, VaultKeyMaterial,
};

/// PostgreSQL directory implementation
pub mod postgres;

/// Seedable in-memory directory for tests and single-node tooling
pub mod memory;

pub use memory::MemoryDirectory;
pub use postgres::PostgresDirectory;

/// Read interface over tenant identity and billing state
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Resolve an API key to its owning tenant, `None` when unknown
    async fn verify_api_key(&self, key: &str) -> AppResult<Option<Tenant>>;

    /// Fetch a tenant by id
    async fn get_tenant(&self, tenant_id: TenantId) -> AppResult<Option<Tenant>>;

    /// Active tenant membership for a user, `None` when the user belongs
    /// to no tenant
    async fn get_membership(&self, user_id: Uuid) -> AppResult<Option<TenantMembership>>;

    /// Fetch a tenant by its registered subdomain
    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> AppResult<Option<Tenant>>;

    /// Feature flag map for a tenant; empty object when none configured
    async fn get_features(&self, tenant_id: TenantId) -> AppResult<serde_json::Value>;

    /// Current-month usage against the billing tier's limits
    async fn get_limits(&self, tenant_id: TenantId, billing_tier: &str) -> AppResult<UsageLimits>;

    /// Active vault key material, `None` when the tenant has no active key
    async fn get_vault_material(&self, tenant_id: TenantId)
        -> AppResult<Option<VaultKeyMaterial>>;

    /// Append one billable operation record
    async fn record_billable_operation(&self, operation: &BillableOperation) -> AppResult<()>;
}
