// ABOUTME: Environment-based configuration for the tenant gateway
// ABOUTME: Server settings, secrets, and per-tier rate limit quotas from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Environment Configuration
//!
//! All configuration is loaded from environment variables at startup; there
//! are no configuration files. Quota defaults can be overridden per billing
//! tier with `MONAY_RATE_LIMIT_<TIER>_PER_MINUTE` / `_PER_HOUR`.

use std::env;
use std::str::FromStr;

use crate::errors::{AppError, AppResult};

/// Requests-per-window quotas for one billing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierQuotas {
    /// Requests allowed per fixed 60-second window
    pub per_minute: u64,
    /// Requests allowed per fixed 3600-second window
    pub per_hour: u64,
}

/// Default quotas for the free tier
pub const FREE_TIER_QUOTAS: TierQuotas = TierQuotas {
    per_minute: 60,
    per_hour: 1_000,
};

/// Default quotas for the small-business tier
pub const SMALL_BUSINESS_QUOTAS: TierQuotas = TierQuotas {
    per_minute: 300,
    per_hour: 10_000,
};

/// Default quotas for the enterprise tier
pub const ENTERPRISE_QUOTAS: TierQuotas = TierQuotas {
    per_minute: 2_000,
    per_hour: 100_000,
};

/// Default quotas for custom-contract tenants
pub const CUSTOM_QUOTAS: TierQuotas = TierQuotas {
    per_minute: 2_000,
    per_hour: 100_000,
};

/// Per-tier rate limit configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Free tier quotas (also the fallback for unknown tiers)
    pub free: TierQuotas,
    /// Small business tier quotas
    pub small_business: TierQuotas,
    /// Enterprise tier quotas
    pub enterprise: TierQuotas,
    /// Custom contract quotas
    pub custom: TierQuotas,
}

impl RateLimitConfig {
    /// Load quotas from the environment, falling back to tier defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            free: tier_from_env("FREE", FREE_TIER_QUOTAS),
            small_business: tier_from_env("SMALL_BUSINESS", SMALL_BUSINESS_QUOTAS),
            enterprise: tier_from_env("ENTERPRISE", ENTERPRISE_QUOTAS),
            custom: tier_from_env("CUSTOM", CUSTOM_QUOTAS),
        }
    }

    /// Quotas for a billing tier string
    ///
    /// Unknown tiers fall back to the most restrictive (free) quotas.
    #[must_use]
    pub fn quotas_for_tier(&self, tier: &str) -> TierQuotas {
        match tier {
            "small_business" => self.small_business,
            "enterprise" => self.enterprise,
            "custom" => self.custom,
            _ => self.free,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            free: FREE_TIER_QUOTAS,
            small_business: SMALL_BUSINESS_QUOTAS,
            enterprise: ENTERPRISE_QUOTAS,
            custom: CUSTOM_QUOTAS,
        }
    }
}

fn tier_from_env(tier: &str, defaults: TierQuotas) -> TierQuotas {
    TierQuotas {
        per_minute: env_or(
            &format!("MONAY_RATE_LIMIT_{tier}_PER_MINUTE"),
            defaults.per_minute,
        ),
        per_hour: env_or(&format!("MONAY_RATE_LIMIT_{tier}_PER_HOUR"), defaults.per_hour),
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Complete server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Postgres connection string for the tenant directory
    pub database_url: String,
    /// Redis connection string for rate-limit counters, when deployed multi-node
    pub redis_url: Option<String>,
    /// HMAC secret for bearer JWT verification
    pub jwt_secret: String,
    /// Shared secret authorizing `x-internal-key` service-to-service calls
    pub internal_service_secret: Option<String>,
    /// Per-tier rate limit quotas
    pub rate_limits: RateLimitConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `DATABASE_URL` or
    /// `MONAY_JWT_SECRET` is missing.
    pub fn from_env() -> AppResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::config("DATABASE_URL must be set"))?;
        let jwt_secret = env::var("MONAY_JWT_SECRET")
            .map_err(|_| AppError::config("MONAY_JWT_SECRET must be set"))?;

        Ok(Self {
            http_port: env_or("MONAY_HTTP_PORT", 3001),
            database_url,
            redis_url: env::var("REDIS_URL").ok(),
            jwt_secret,
            internal_service_secret: env::var("MONAY_INTERNAL_SERVICE_SECRET").ok(),
            rate_limits: RateLimitConfig::from_env(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn unknown_tier_falls_back_to_free() {
        let config = RateLimitConfig::default();
        assert_eq!(config.quotas_for_tier("platinum"), FREE_TIER_QUOTAS);
        assert_eq!(config.quotas_for_tier(""), FREE_TIER_QUOTAS);
        assert_eq!(config.quotas_for_tier("enterprise"), ENTERPRISE_QUOTAS);
    }

    #[test]
    #[serial]
    fn server_config_requires_database_url_and_jwt_secret() {
        env::remove_var("DATABASE_URL");
        env::remove_var("MONAY_JWT_SECRET");
        assert!(ServerConfig::from_env().is_err());

        env::set_var("DATABASE_URL", "postgres://localhost/monay");
        assert!(ServerConfig::from_env().is_err());

        env::set_var("MONAY_JWT_SECRET", "secret");
        assert!(ServerConfig::from_env().is_ok());

        env::remove_var("DATABASE_URL");
        env::remove_var("MONAY_JWT_SECRET");
    }

    #[test]
    #[serial]
    fn tier_quotas_can_be_overridden_from_env() {
        env::set_var("MONAY_RATE_LIMIT_FREE_PER_MINUTE", "5");
        let config = RateLimitConfig::from_env();
        assert_eq!(config.free.per_minute, 5);
        assert_eq!(config.free.per_hour, FREE_TIER_QUOTAS.per_hour);
        env::remove_var("MONAY_RATE_LIMIT_FREE_PER_MINUTE");
    }
}
