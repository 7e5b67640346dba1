// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Seeded in-memory backends, gateway construction, and request drivers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(dead_code)]

//! Shared test utilities for `monay_tenant_gateway`
//!
//! Builds gateways over the in-memory directory, counter store, and
//! recording isolation backend, plus an Axum app with sample product routes
//! so requests can be driven end-to-end through the middleware.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::Utc;
use http::{Request, Response};
use monay_tenant_gateway::auth::AuthManager;
use monay_tenant_gateway::config::environment::RateLimitConfig;
use monay_tenant_gateway::counters::MemoryCounterStore;
use monay_tenant_gateway::db_context::{IsolationBackend, RecordingIsolation};
use monay_tenant_gateway::directory::{MemoryDirectory, TenantDirectory};
use monay_tenant_gateway::errors::{AppError, AppResult};
use monay_tenant_gateway::gateway::{tenant_context_layer, TenantGateway};
use monay_tenant_gateway::models::{
    BillableOperation, IsolationLevel, Tenant, TenantId, TenantMembership, TenantStatus,
    UsageLimits, VaultKeyMaterial,
};
use monay_tenant_gateway::routes;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_INTERNAL_SECRET: &str = "test-internal-secret";

/// Everything a test needs to drive the gateway end-to-end
pub struct TestHarness {
    pub directory: Arc<MemoryDirectory>,
    pub isolation: Arc<RecordingIsolation>,
    pub gateway: Arc<TenantGateway>,
    pub auth: AuthManager,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_quotas(RateLimitConfig::default())
    }

    pub fn with_quotas(quotas: RateLimitConfig) -> Self {
        let directory = Arc::new(MemoryDirectory::new());
        let isolation = Arc::new(RecordingIsolation::new());
        let gateway = Arc::new(TenantGateway::new(
            Arc::clone(&directory) as Arc<dyn TenantDirectory>,
            Arc::new(MemoryCounterStore::new()),
            Arc::clone(&isolation) as Arc<dyn IsolationBackend>,
            AuthManager::new(TEST_JWT_SECRET),
            Some(TEST_INTERNAL_SECRET.to_owned()),
            quotas,
        ));

        Self {
            directory,
            isolation,
            gateway,
            auth: AuthManager::new(TEST_JWT_SECRET),
        }
    }

    /// Seed an active enterprise tenant with row isolation
    pub fn seed_tenant(&self) -> Tenant {
        self.seed_tenant_with(TenantStatus::Active, "enterprise", IsolationLevel::Row)
    }

    pub fn seed_tenant_with(
        &self,
        status: TenantStatus,
        billing_tier: &str,
        isolation_level: IsolationLevel,
    ) -> Tenant {
        let tenant = Tenant {
            id: TenantId::new(),
            code: "acme".to_owned(),
            name: "Acme Corp".to_owned(),
            tenant_type: "enterprise".to_owned(),
            status,
            billing_tier: billing_tier.to_owned(),
            isolation_level,
            features: serde_json::json!({"cross_chain": true, "invoicing": true}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.directory.insert_tenant(tenant.clone());
        tenant
    }

    pub fn seed_membership(&self, tenant_id: TenantId) -> Uuid {
        let user_id = Uuid::new_v4();
        self.directory.insert_membership(TenantMembership {
            user_id,
            tenant_id,
            role: monay_tenant_gateway::models::TenantRole::Member,
            permissions: vec!["transactions:write".to_owned()],
        });
        user_id
    }

    pub fn seed_vault_key(&self, tenant_id: TenantId) -> Vec<u8> {
        let master_key = (0u8..32).collect::<Vec<u8>>();
        self.directory.set_vault_material(
            tenant_id,
            VaultKeyMaterial {
                derivation_path: "m/44'/60'/0'/0".to_owned(),
                master_key: master_key.clone(),
            },
        );
        master_key
    }

    /// Axum app with the gateway layered over sample product routes
    pub fn app(&self) -> Router {
        Router::new()
            .merge(routes::health::router())
            .merge(routes::tenants::router())
            .route("/api/transactions", post(accepted))
            .route("/api/transfers/wire", post(accepted))
            .route("/api/reports", get(accepted))
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.gateway),
                tenant_context_layer,
            ))
    }
}

async fn accepted() -> Json<Value> {
    Json(serde_json::json!({"accepted": true}))
}

/// Drive one request through the app
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn get_request(path: &str) -> http::request::Builder {
    Request::builder().method("GET").uri(path)
}

pub fn post_request(path: &str) -> http::request::Builder {
    Request::builder().method("POST").uri(path)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Directory whose tenant lookups always fail, for internal-error paths
pub struct FailingDirectory;

#[async_trait]
impl TenantDirectory for FailingDirectory {
    async fn verify_api_key(&self, _key: &str) -> AppResult<Option<Tenant>> {
        Err(AppError::database("directory offline"))
    }

    async fn get_tenant(&self, _tenant_id: TenantId) -> AppResult<Option<Tenant>> {
        Err(AppError::database("directory offline"))
    }

    async fn get_membership(&self, _user_id: Uuid) -> AppResult<Option<TenantMembership>> {
        Err(AppError::database("directory offline"))
    }

    async fn get_tenant_by_subdomain(&self, _subdomain: &str) -> AppResult<Option<Tenant>> {
        Err(AppError::database("directory offline"))
    }

    async fn get_features(&self, _tenant_id: TenantId) -> AppResult<Value> {
        Err(AppError::database("directory offline"))
    }

    async fn get_limits(
        &self,
        _tenant_id: TenantId,
        _billing_tier: &str,
    ) -> AppResult<UsageLimits> {
        Err(AppError::database("directory offline"))
    }

    async fn get_vault_material(
        &self,
        _tenant_id: TenantId,
    ) -> AppResult<Option<VaultKeyMaterial>> {
        Err(AppError::database("directory offline"))
    }

    async fn record_billable_operation(&self, _operation: &BillableOperation) -> AppResult<()> {
        Err(AppError::database("directory offline"))
    }
}
