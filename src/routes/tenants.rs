// ABOUTME: Current-tenant context introspection routes
// ABOUTME: Exposes the resolved tenant, limits, and vault context to downstream callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{AuthenticatedUser, Tenant, TenantContext, UsageLimits, VaultContext};

/// Context portion of the current-tenant response
#[derive(Debug, Serialize)]
pub struct TenantContextBody {
    /// Feature flag map
    pub features: serde_json::Value,
    /// Current-month usage limits
    pub limits: UsageLimits,
    /// Vault material, absent when the tenant has no active key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_context: Option<VaultContext>,
}

/// Response body for `GET /api/tenants/current`
#[derive(Debug, Serialize)]
pub struct CurrentTenantResponse {
    /// The resolved tenant record
    pub tenant: Tenant,
    /// Request-scoped context derived for the tenant
    pub context: TenantContextBody,
    /// Caller identity when the resolution source carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthenticatedUser>,
}

async fn current_tenant(
    context: Option<Extension<Arc<TenantContext>>>,
    user: Option<Extension<AuthenticatedUser>>,
) -> Response {
    let Some(Extension(context)) = context else {
        return AppError::not_found("Tenant context").into_response();
    };

    Json(CurrentTenantResponse {
        tenant: context.tenant.clone(),
        context: TenantContextBody {
            features: context.features.clone(),
            limits: context.limits,
            vault_context: context.vault_context.clone(),
        },
        user: user.map(|Extension(user)| user),
    })
    .into_response()
}

/// Router for tenant context introspection
pub fn router() -> Router {
    Router::new().route("/api/tenants/current", get(current_tenant))
}
