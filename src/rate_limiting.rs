// ABOUTME: Fixed-window rate limiting per tenant and route
// ABOUTME: Dual 60s/3600s windows with tier quotas and retry-after hints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Tenant Rate Limiting
//!
//! Each `(tenant, route)` pair is tracked in two fixed windows, one minute
//! and one hour, bucketed by integer-divided timestamp so buckets roll over
//! without reset logic. A request is rejected when either counter meets or
//! exceeds the tier quota; the boundary is inclusive, so the request that
//! would land exactly on the quota is refused. Admitted requests increment
//! both counters with a TTL equal to their window, which lets stale buckets
//! age out of the store on their own.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::config::environment::RateLimitConfig;
use crate::counters::CounterStore;
use crate::errors::AppResult;
use crate::models::TenantId;

/// Length of the short quota window in seconds
pub const MINUTE_WINDOW_SECONDS: u64 = 60;
/// Length of the long quota window in seconds
pub const HOUR_WINDOW_SECONDS: u64 = 3600;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    /// Whether the request was refused
    pub is_rate_limited: bool,
    /// Quota of the governing window (the minute window when admitted,
    /// the tripped window when rejected)
    pub limit: u64,
    /// Requests left in the minute window after this one
    pub remaining: u64,
    /// Length of the governing window in seconds
    pub window_seconds: u64,
    /// Seconds until the tripped window boundary, present only on rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// Per-tenant, per-route request throttle over a [`CounterStore`]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Build a limiter over the given counter store and tier quotas
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Check and account the current request against both windows
    ///
    /// # Errors
    ///
    /// Returns an error when the counter store is unreachable.
    pub async fn check(
        &self,
        tenant_id: TenantId,
        billing_tier: &str,
        route: &str,
    ) -> AppResult<RateLimitStatus> {
        self.check_at(tenant_id, billing_tier, route, Utc::now().timestamp())
            .await
    }

    /// Check against both windows at an explicit timestamp
    ///
    /// Window math is pure in `now_ts`, which keeps boundary behavior
    /// deterministic for callers that pin the clock.
    ///
    /// # Errors
    ///
    /// Returns an error when the counter store is unreachable.
    pub async fn check_at(
        &self,
        tenant_id: TenantId,
        billing_tier: &str,
        route: &str,
        now_ts: i64,
    ) -> AppResult<RateLimitStatus> {
        let quotas = self.config.quotas_for_tier(billing_tier);

        let minute_key = window_key(tenant_id, route, MINUTE_WINDOW_SECONDS, now_ts);
        let hour_key = window_key(tenant_id, route, HOUR_WINDOW_SECONDS, now_ts);

        let minute_count = self.store.get(&minute_key).await?;
        if minute_count >= quotas.per_minute {
            return Ok(rejected(quotas.per_minute, MINUTE_WINDOW_SECONDS, now_ts));
        }

        let hour_count = self.store.get(&hour_key).await?;
        if hour_count >= quotas.per_hour {
            return Ok(rejected(quotas.per_hour, HOUR_WINDOW_SECONDS, now_ts));
        }

        let minute_total = self
            .store
            .increment(&minute_key, Duration::from_secs(MINUTE_WINDOW_SECONDS))
            .await?;
        self.store
            .increment(&hour_key, Duration::from_secs(HOUR_WINDOW_SECONDS))
            .await?;

        Ok(RateLimitStatus {
            is_rate_limited: false,
            limit: quotas.per_minute,
            remaining: quotas.per_minute.saturating_sub(minute_total),
            window_seconds: MINUTE_WINDOW_SECONDS,
            retry_after_seconds: None,
        })
    }
}

fn window_key(tenant_id: TenantId, route: &str, window: u64, now_ts: i64) -> String {
    let bucket = now_ts.div_euclid(window as i64);
    format!("ratelimit:{tenant_id}:{route}:{window}:{bucket}")
}

fn rejected(limit: u64, window: u64, now_ts: i64) -> RateLimitStatus {
    let elapsed = now_ts.rem_euclid(window as i64) as u64;
    RateLimitStatus {
        is_rate_limited: true,
        limit,
        remaining: 0,
        window_seconds: window,
        retry_after_seconds: Some(window - elapsed),
    }
}
