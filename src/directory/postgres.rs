// ABOUTME: PostgreSQL tenant directory for production deployments
// ABOUTME: Runtime-bound queries over tenants, memberships, usage, and vault keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::TenantDirectory;
use crate::auth::hash_api_key;
use crate::errors::AppResult;
use crate::models::{
    BillableOperation, IsolationLevel, ResourceBudget, Tenant, TenantId, TenantMembership,
    TenantRole, TenantStatus, UsageLimits, VaultKeyMaterial,
};

const TENANT_COLUMNS: &str = "id, tenant_code, name, tenant_type, status, billing_tier, \
     isolation_level, features, created_at, updated_at";

/// PostgreSQL-backed [`TenantDirectory`]
#[derive(Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    /// Connect to the directory database
    ///
    /// # Errors
    ///
    /// Returns an error when the pool cannot be established.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Build a directory over an existing pool
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool, shared with the isolation backend
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn tenant_from_row(row: &PgRow) -> AppResult<Tenant> {
        let status: String = row.try_get("status")?;
        let isolation: String = row.try_get("isolation_level")?;
        Ok(Tenant {
            id: TenantId::from_uuid(row.try_get("id")?),
            code: row.try_get("tenant_code")?,
            name: row.try_get("name")?,
            tenant_type: row.try_get("tenant_type")?,
            status: TenantStatus::from_db_string(&status),
            billing_tier: row.try_get("billing_tier")?,
            isolation_level: IsolationLevel::from_db_string(&isolation),
            features: row
                .try_get::<Option<serde_json::Value>, _>("features")?
                .unwrap_or_else(|| serde_json::json!({})),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn permissions_from_value(value: Option<serde_json::Value>) -> Vec<String> {
        value
            .and_then(|v| v.as_array().cloned())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TenantDirectory for PostgresDirectory {
    async fn verify_api_key(&self, key: &str) -> AppResult<Option<Tenant>> {
        let key_hash = hash_api_key(key);
        let row = sqlx::query(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE api_key_hash = $1"
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::tenant_from_row).transpose()
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> AppResult<Option<Tenant>> {
        let row = sqlx::query(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::tenant_from_row).transpose()
    }

    async fn get_membership(&self, user_id: Uuid) -> AppResult<Option<TenantMembership>> {
        // Owner memberships win over admin/member when a user belongs to
        // several tenants; ties break on the oldest membership.
        let row = sqlx::query(
            "SELECT tenant_id, role, permissions
             FROM tenant_users
             WHERE user_id = $1 AND status = 'active'
             ORDER BY
                CASE WHEN role = 'owner' THEN 0
                     WHEN role = 'admin' THEN 1
                     ELSE 2 END,
                joined_at ASC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let role: String = row.try_get("role")?;
            Ok(TenantMembership {
                user_id,
                tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
                role: TenantRole::from_db_string(&role),
                permissions: Self::permissions_from_value(
                    row.try_get::<Option<serde_json::Value>, _>("permissions")?,
                ),
            })
        })
        .transpose()
    }

    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> AppResult<Option<Tenant>> {
        let row = sqlx::query(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE subdomain = $1"
        ))
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::tenant_from_row).transpose()
    }

    async fn get_features(&self, tenant_id: TenantId) -> AppResult<serde_json::Value> {
        let row = sqlx::query("SELECT features FROM tenants WHERE id = $1")
            .bind(tenant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .and_then(|row| {
                row.try_get::<Option<serde_json::Value>, _>("features")
                    .ok()
                    .flatten()
            })
            .unwrap_or_else(|| serde_json::json!({})))
    }

    async fn get_limits(&self, tenant_id: TenantId, billing_tier: &str) -> AppResult<UsageLimits> {
        let row = sqlx::query(
            "SELECT
                l.transactions_limit, l.compute_units_limit,
                l.api_calls_limit, l.storage_mb_limit,
                COALESCE(u.transactions_used, 0) AS transactions_used,
                COALESCE(u.compute_units_used, 0) AS compute_units_used,
                COALESCE(u.api_calls_used, 0) AS api_calls_used,
                COALESCE(u.storage_mb_used, 0) AS storage_mb_used
             FROM billing_tier_limits l
             LEFT JOIN tenant_usage_monthly u
                ON u.tenant_id = $1 AND u.month = date_trunc('month', now())
             WHERE l.tier = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(billing_tier)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            tracing::warn!(
                tenant_id = %tenant_id,
                billing_tier,
                "no limit configuration for billing tier, reporting zero budgets"
            );
            return Ok(UsageLimits::default());
        };

        let budget = |limit_col: &str, used_col: &str| -> AppResult<ResourceBudget> {
            let limit: i64 = row.try_get(limit_col)?;
            let used: i64 = row.try_get(used_col)?;
            Ok(ResourceBudget::new(limit.max(0) as u64, used.max(0) as u64))
        };

        Ok(UsageLimits {
            transactions: budget("transactions_limit", "transactions_used")?,
            compute_units: budget("compute_units_limit", "compute_units_used")?,
            api_calls: budget("api_calls_limit", "api_calls_used")?,
            storage_mb: budget("storage_mb_limit", "storage_mb_used")?,
        })
    }

    async fn get_vault_material(
        &self,
        tenant_id: TenantId,
    ) -> AppResult<Option<VaultKeyMaterial>> {
        let row = sqlx::query(
            "SELECT derivation_path, key_material
             FROM tenant_vault_keys
             WHERE tenant_id = $1 AND status = 'active'
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(VaultKeyMaterial {
                derivation_path: row.try_get("derivation_path")?,
                master_key: row.try_get::<Vec<u8>, _>("key_material")?,
            })
        })
        .transpose()
    }

    async fn record_billable_operation(&self, operation: &BillableOperation) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO billable_operations
                (tenant_id, operation_type, method, path, user_agent, ip_address, recorded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(operation.tenant_id.as_uuid())
        .bind(&operation.operation_type)
        .bind(&operation.method)
        .bind(&operation.path)
        .bind(operation.user_agent.as_deref())
        .bind(operation.ip_address.as_deref())
        .bind(operation.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
