// ABOUTME: Middleware orchestrator sequencing tenant resolution and enforcement
// ABOUTME: Extraction, status gate, context assembly, billing, rate limit, isolation session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Tenant Gateway
//!
//! One explicitly constructed service object runs in front of every
//! tenant-scoped handler. Its dependencies (directory, counter store,
//! isolation backend, token verifier) are injected at startup, so tests can
//! swap any of them for fakes.
//!
//! Per request, strictly in order: resolve credentials; let public paths
//! through unauthenticated; load and status-gate the tenant; assemble the
//! request context (features, limits, vault material); attach caller
//! identity; fire billing tracking without joining it; enforce the rate
//! limit; open the isolation session. The session guard lives until the
//! response completes, releasing its connection on every exit path.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use http::{header, HeaderMap, HeaderValue, Method};
use tracing::{debug, warn};

use crate::auth::AuthManager;
use crate::billing::{self, UsageTracker};
use crate::config::environment::{RateLimitConfig, ServerConfig};
use crate::counters::CounterStore;
use crate::credentials::CredentialExtractor;
use crate::db_context::{IsolationBackend, TenantSession};
use crate::directory::TenantDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::{AuthenticatedUser, BillableOperation, TenantContext};
use crate::rate_limiting::{RateLimitStatus, RateLimiter};
use crate::vault::VaultContextBuilder;

/// Paths served without tenant context
pub const PUBLIC_PATHS: [&str; 4] = [
    "/health",
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/password-reset",
];

/// Prefix under which everything is public
pub const PUBLIC_PREFIX: &str = "/api/public";

/// Whether a path may be served without tenant context
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
        || path == PUBLIC_PREFIX
        || path
            .strip_prefix(PUBLIC_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Everything the gateway resolved for one request
pub struct ResolvedRequest {
    /// Tenant identity, limits, and vault material
    pub context: TenantContext,
    /// Caller identity when the resolution source carried one
    pub user: Option<AuthenticatedUser>,
    /// Rate-limit accounting for the admitted request
    pub rate: RateLimitStatus,
    /// Isolation session guard; dropping it releases the connection
    pub session: Option<Box<dyn TenantSession>>,
}

/// Request-time tenant resolution and enforcement service
pub struct TenantGateway {
    extractor: CredentialExtractor,
    directory: Arc<dyn TenantDirectory>,
    vault: VaultContextBuilder,
    limiter: RateLimiter,
    tracker: UsageTracker,
    isolation: Arc<dyn IsolationBackend>,
}

impl TenantGateway {
    /// Assemble the gateway from its injected dependencies
    #[must_use]
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        counters: Arc<dyn CounterStore>,
        isolation: Arc<dyn IsolationBackend>,
        auth: AuthManager,
        internal_service_secret: Option<String>,
        rate_limits: RateLimitConfig,
    ) -> Self {
        Self {
            extractor: CredentialExtractor::new(
                Arc::clone(&directory),
                auth,
                internal_service_secret,
            ),
            vault: VaultContextBuilder::new(Arc::clone(&directory)),
            limiter: RateLimiter::new(counters, rate_limits),
            tracker: UsageTracker::new(Arc::clone(&directory)),
            directory,
            isolation,
        }
    }

    /// Assemble the gateway from server configuration plus storage backends
    #[must_use]
    pub fn from_config(
        config: &ServerConfig,
        directory: Arc<dyn TenantDirectory>,
        counters: Arc<dyn CounterStore>,
        isolation: Arc<dyn IsolationBackend>,
    ) -> Self {
        Self::new(
            directory,
            counters,
            isolation,
            AuthManager::new(&config.jwt_secret),
            config.internal_service_secret.clone(),
            config.rate_limits,
        )
    }

    /// Run the full resolution pipeline for one request
    ///
    /// `Ok(None)` means a public path continuing unauthenticated. Every
    /// rejection comes back as the matching [`AppError`] from the 401, 403,
    /// 404, 429, 500 taxonomy.
    ///
    /// # Errors
    ///
    /// Returns the rejection to surface to the caller.
    pub async fn resolve_request(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> AppResult<Option<ResolvedRequest>> {
        let Some(resolution) = self.extractor.resolve(headers).await? else {
            if is_public_path(path) {
                return Ok(None);
            }
            return Err(AppError::auth_required(
                "No tenant context could be resolved for this request",
            ));
        };

        let tenant = self
            .directory
            .get_tenant(resolution.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Tenant"))?;

        if !tenant.status.is_active() {
            debug!(tenant_id = %tenant.id, status = %tenant.status, "rejecting inactive tenant");
            return Err(AppError::tenant_inactive(tenant.status.as_str()));
        }

        let features = self.directory.get_features(tenant.id).await?;
        let limits = self
            .directory
            .get_limits(tenant.id, &tenant.billing_tier)
            .await?;

        // Vault failures degrade: requests that never sign anything must not
        // die over missing or unreadable key material.
        let vault_context = match self.vault.build(&tenant).await {
            Ok(context) => context,
            Err(e) => {
                warn!(tenant_id = %tenant.id, error = %e, "vault context unavailable");
                None
            }
        };

        if let Some(operation_type) = billing::classify(method, path) {
            self.tracker.record_detached(BillableOperation {
                tenant_id: tenant.id,
                operation_type: operation_type.to_owned(),
                method: method.to_string(),
                path: path.to_owned(),
                user_agent: header_value(headers, header::USER_AGENT.as_str()),
                ip_address: forwarded_ip(headers),
                recorded_at: Utc::now(),
            });
        }

        let rate = self
            .limiter
            .check(tenant.id, &tenant.billing_tier, path)
            .await?;
        if rate.is_rate_limited {
            return Err(AppError::rate_limited(
                rate.limit,
                rate.window_seconds,
                rate.retry_after_seconds.unwrap_or(rate.window_seconds),
            ));
        }

        let session = self.isolation.open_session(&tenant).await?;

        Ok(Some(ResolvedRequest {
            context: TenantContext {
                tenant,
                features,
                limits,
                vault_context,
            },
            user: resolution.user,
            rate,
            session,
        }))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|raw| raw.split(',').next().map(|ip| ip.trim().to_owned()))
}

/// Axum middleware entry point for the gateway
///
/// On resolution the tenant context and caller identity are inserted as
/// request extensions; the isolation session guard is held across the inner
/// handler and dropped when the response is produced, releasing its
/// connection on success, error, and client abort alike.
pub async fn tenant_context_layer(
    State(gateway): State<Arc<TenantGateway>>,
    mut request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let headers = request.headers().clone();

    match gateway.resolve_request(&method, &path, &headers).await {
        Ok(None) => next.run(request).await,
        Ok(Some(resolved)) => {
            let rate = resolved.rate;
            request
                .extensions_mut()
                .insert(Arc::new(resolved.context));
            if let Some(user) = resolved.user {
                request.extensions_mut().insert(user);
            }

            // Owns the isolation session until the inner handler finishes.
            let _session = resolved.session;

            let mut response = next.run(request).await;
            let limit_headers = [
                ("x-ratelimit-limit", rate.limit),
                ("x-ratelimit-remaining", rate.remaining),
            ];
            for (name, value) in limit_headers {
                if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
                    response.headers_mut().insert(name, value);
                }
            }
            response
        }
        Err(error) => error.into_response(),
    }
}
