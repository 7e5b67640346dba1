// ABOUTME: Integration tests for credential resolution and the rejection taxonomy
// ABOUTME: Covers API key, JWT, internal, and subdomain sources plus 401/403/404/500 paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use axum::body::Body;
use chrono::Duration;
use common::{body_json, get_request, post_request, send, TestHarness};
use http::StatusCode;
use monay_tenant_gateway::auth::AuthManager;
use monay_tenant_gateway::config::environment::RateLimitConfig;
use monay_tenant_gateway::counters::MemoryCounterStore;
use monay_tenant_gateway::db_context::{IsolationBackend, RecordingIsolation};
use monay_tenant_gateway::gateway::TenantGateway;
use monay_tenant_gateway::models::{IsolationLevel, TenantId, TenantStatus};

#[tokio::test]
async fn health_passes_through_without_credentials() {
    let harness = TestHarness::new();
    let app = harness.app();

    let response = send(&app, get_request("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_path_without_credentials_is_401() {
    let harness = TestHarness::new();
    let app = harness.app();

    let response = send(
        &app,
        post_request("/api/transactions").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "authentication_required");
}

#[tokio::test]
async fn api_key_resolves_active_enterprise_tenant() {
    let harness = TestHarness::new();
    let tenant = harness.seed_tenant();
    harness.directory.insert_api_key("mk_abc123", tenant.id);
    let app = harness.app();

    let response = send(
        &app,
        get_request("/api/tenants/current")
            .header("x-api-key", "mk_abc123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["tenant"]["id"], tenant.id.to_string());
    assert_eq!(body["tenant"]["billing_tier"], "enterprise");
    assert_eq!(body["context"]["features"]["cross_chain"], true);
}

#[tokio::test]
async fn jwt_resolution_attaches_caller_identity() {
    let harness = TestHarness::new();
    let tenant = harness.seed_tenant();
    let user_id = harness.seed_membership(tenant.id);
    let token = harness
        .auth
        .generate_token(user_id, Duration::hours(1))
        .unwrap();
    let app = harness.app();

    let response = send(
        &app,
        get_request("/api/tenants/current")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], user_id.to_string());
    assert_eq!(body["user"]["role"], "member");
}

#[tokio::test]
async fn expired_jwt_with_no_other_credentials_is_401() {
    let harness = TestHarness::new();
    let tenant = harness.seed_tenant();
    let user_id = harness.seed_membership(tenant.id);
    let token = harness
        .auth
        .generate_token(user_id, Duration::hours(-2))
        .unwrap();
    let app = harness.app();

    let response = send(
        &app,
        post_request("/api/transactions")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn jwt_signed_with_wrong_secret_is_401() {
    let harness = TestHarness::new();
    let tenant = harness.seed_tenant();
    let user_id = harness.seed_membership(tenant.id);
    let token = AuthManager::new("some-other-secret")
        .generate_token(user_id, Duration::hours(1))
        .unwrap();
    let app = harness.app();

    let response = send(
        &app,
        post_request("/api/transactions")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inactive_tenant_is_403_with_status_string() {
    for status in [
        TenantStatus::Pending,
        TenantStatus::Suspended,
        TenantStatus::Terminated,
    ] {
        let harness = TestHarness::new();
        let tenant = harness.seed_tenant_with(status, "enterprise", IsolationLevel::Row);
        harness.directory.insert_api_key("mk_inactive", tenant.id);
        let app = harness.app();

        let response = send(
            &app,
            get_request("/api/tenants/current")
                .header("x-api-key", "mk_inactive")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["error"], "tenant_inactive");
        assert!(
            body["message"].as_str().unwrap().contains(status.as_str()),
            "message should carry the {status} status"
        );
    }
}

#[tokio::test]
async fn internal_header_with_unknown_tenant_is_404() {
    let harness = TestHarness::new();
    let app = harness.app();

    let response = send(
        &app,
        get_request("/api/tenants/current")
            .header("x-internal-key", common::TEST_INTERNAL_SECRET)
            .header("x-tenant-id", TenantId::new().to_string())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "tenant_not_found");
}

#[tokio::test]
async fn internal_header_with_wrong_secret_is_401() {
    let harness = TestHarness::new();
    let tenant = harness.seed_tenant();
    let app = harness.app();

    let response = send(
        &app,
        post_request("/api/transactions")
            .header("x-internal-key", "not-the-secret")
            .header("x-tenant-id", tenant.id.to_string())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subdomain_host_resolves_tenant() {
    let harness = TestHarness::new();
    let tenant = harness.seed_tenant();
    harness.directory.set_subdomain("acme", tenant.id);
    let app = harness.app();

    let response = send(
        &app,
        get_request("/api/tenants/current")
            .header("host", "acme.monay.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["tenant"]["id"], tenant.id.to_string());
}

#[tokio::test]
async fn bare_domain_host_does_not_resolve() {
    let harness = TestHarness::new();
    let tenant = harness.seed_tenant();
    harness.directory.set_subdomain("acme", tenant.id);
    let app = harness.app();

    let response = send(
        &app,
        post_request("/api/transactions")
            .header("host", "monay.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn directory_failure_surfaces_generic_internal_error() {
    let gateway = Arc::new(TenantGateway::new(
        Arc::new(common::FailingDirectory),
        Arc::new(MemoryCounterStore::new()),
        Arc::new(RecordingIsolation::new()) as Arc<dyn IsolationBackend>,
        AuthManager::new(common::TEST_JWT_SECRET),
        Some(common::TEST_INTERNAL_SECRET.to_owned()),
        RateLimitConfig::default(),
    ));
    let app = axum::Router::new()
        .merge(monay_tenant_gateway::routes::tenants::router())
        .layer(axum::middleware::from_fn_with_state(
            gateway,
            monay_tenant_gateway::gateway::tenant_context_layer,
        ));

    let response = send(
        &app,
        get_request("/api/tenants/current")
            .header("x-api-key", "mk_whatever")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "database_error");
    assert_eq!(body["message"], "An internal error occurred");
    // Backend detail must never reach the caller
    assert!(!body.to_string().contains("offline"));
}
