// ABOUTME: Seedable in-memory tenant directory
// ABOUTME: Backs integration tests and local tooling without a database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::TenantDirectory;
use crate::auth::hash_api_key;
use crate::errors::{AppError, AppResult};
use crate::models::{
    BillableOperation, Tenant, TenantId, TenantMembership, UsageLimits, VaultKeyMaterial,
};

/// In-memory [`TenantDirectory`] seeded through builder-style setters
#[derive(Default)]
pub struct MemoryDirectory {
    tenants: DashMap<TenantId, Tenant>,
    subdomains: DashMap<String, TenantId>,
    api_key_hashes: DashMap<String, TenantId>,
    memberships: DashMap<Uuid, TenantMembership>,
    vault_materials: DashMap<TenantId, VaultKeyMaterial>,
    limits: DashMap<TenantId, UsageLimits>,
    operations: Mutex<Vec<BillableOperation>>,
    fail_recording: AtomicBool,
}

impl MemoryDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant record
    pub fn insert_tenant(&self, tenant: Tenant) {
        self.tenants.insert(tenant.id, tenant);
    }

    /// Map a subdomain to a tenant
    pub fn set_subdomain(&self, subdomain: &str, tenant_id: TenantId) {
        self.subdomains.insert(subdomain.to_owned(), tenant_id);
    }

    /// Register a plaintext API key for a tenant (stored hashed)
    pub fn insert_api_key(&self, key: &str, tenant_id: TenantId) {
        self.api_key_hashes.insert(hash_api_key(key), tenant_id);
    }

    /// Register a user's active tenant membership
    pub fn insert_membership(&self, membership: TenantMembership) {
        self.memberships.insert(membership.user_id, membership);
    }

    /// Set the active vault key material for a tenant
    pub fn set_vault_material(&self, tenant_id: TenantId, material: VaultKeyMaterial) {
        self.vault_materials.insert(tenant_id, material);
    }

    /// Set the monthly usage limits reported for a tenant
    pub fn set_limits(&self, tenant_id: TenantId, limits: UsageLimits) {
        self.limits.insert(tenant_id, limits);
    }

    /// Make every subsequent `record_billable_operation` call fail
    pub fn fail_billing_recording(&self, fail: bool) {
        self.fail_recording.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every recorded billable operation
    #[must_use]
    pub fn recorded_operations(&self) -> Vec<BillableOperation> {
        self.operations
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    async fn verify_api_key(&self, key: &str) -> AppResult<Option<Tenant>> {
        let tenant_id = self.api_key_hashes.get(&hash_api_key(key)).map(|id| *id);
        Ok(tenant_id.and_then(|id| self.tenants.get(&id).map(|t| t.clone())))
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> AppResult<Option<Tenant>> {
        Ok(self.tenants.get(&tenant_id).map(|t| t.clone()))
    }

    async fn get_membership(&self, user_id: Uuid) -> AppResult<Option<TenantMembership>> {
        Ok(self.memberships.get(&user_id).map(|m| m.clone()))
    }

    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> AppResult<Option<Tenant>> {
        let tenant_id = self.subdomains.get(subdomain).map(|id| *id);
        Ok(tenant_id.and_then(|id| self.tenants.get(&id).map(|t| t.clone())))
    }

    async fn get_features(&self, tenant_id: TenantId) -> AppResult<serde_json::Value> {
        Ok(self
            .tenants
            .get(&tenant_id)
            .map_or_else(|| serde_json::json!({}), |t| t.features.clone()))
    }

    async fn get_limits(&self, tenant_id: TenantId, _billing_tier: &str) -> AppResult<UsageLimits> {
        Ok(self
            .limits
            .get(&tenant_id)
            .map_or_else(UsageLimits::default, |l| *l))
    }

    async fn get_vault_material(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<Option<VaultKeyMaterial>> {
        Ok(self.vault_materials.get(&tenant_id).map(|m| m.clone()))
    }

    async fn record_billable_operation(&self, operation: &BillableOperation) -> AppResult<()> {
        if self.fail_recording.load(Ordering::SeqCst) {
            return Err(AppError::database("billable operation sink unavailable"));
        }
        self.operations
            .lock()
            .map_err(|_| AppError::internal("operation log lock poisoned"))?
            .push(operation.clone());
        Ok(())
    }
}
