// ABOUTME: Core data models for tenant resolution and request context
// ABOUTME: Tenant identity, membership, usage limits, and per-request vault context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strongly-typed tenant identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Generate a fresh random tenant id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID value
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Tenant lifecycle status
///
/// Only `Active` tenants are served; every other status rejects with 403
/// carrying the status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    /// Provisioned but not yet activated
    Pending,
    /// Serving traffic
    Active,
    /// Temporarily disabled by an operator
    Suspended,
    /// Permanently closed
    Terminated,
}

impl TenantStatus {
    /// Parse a status stored in the directory; unknown strings map to `Suspended`
    /// so an unrecognized state never serves traffic.
    #[must_use]
    pub fn from_db_string(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "active" => Self::Active,
            "terminated" => Self::Terminated,
            _ => Self::Suspended,
        }
    }

    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Terminated => "terminated",
        }
    }

    /// Whether requests for this tenant may be served
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage isolation applied while serving a tenant's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// Shared tables, no session context
    None,
    /// Row-level-security variable on a dedicated connection
    Row,
    /// Row context plus a tenant-specific schema ahead of public
    Schema,
}

impl IsolationLevel {
    /// Parse an isolation level stored in the directory; unknown maps to `None`
    #[must_use]
    pub fn from_db_string(s: &str) -> Self {
        match s {
            "row" => Self::Row,
            "schema" => Self::Schema,
            _ => Self::None,
        }
    }

    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Row => "row",
            Self::Schema => "schema",
        }
    }
}

/// Role a user holds within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    /// Full control including membership management
    Owner,
    /// Administrative operations
    Admin,
    /// Regular member
    Member,
}

impl TenantRole {
    /// Parse a role stored in the membership table; unknown maps to `Member`
    #[must_use]
    pub fn from_db_string(s: &str) -> Self {
        match s {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }

    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

/// Tenant identity record, read-only to the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant identifier
    pub id: TenantId,
    /// URL-safe tenant code (also the schema suffix under schema isolation)
    pub code: String,
    /// Display name
    pub name: String,
    /// Organization category (individual, small_business, enterprise, ...)
    pub tenant_type: String,
    /// Lifecycle status; only `active` is served
    pub status: TenantStatus,
    /// Billing tier driving quota and limit lookups
    pub billing_tier: String,
    /// Storage isolation applied per request
    pub isolation_level: IsolationLevel,
    /// Feature flag map
    pub features: serde_json::Value,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Binding of a user to a tenant with role and permissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMembership {
    /// Member user id
    pub user_id: Uuid,
    /// Tenant the user belongs to
    pub tenant_id: TenantId,
    /// Role within the tenant
    pub role: TenantRole,
    /// Fine-grained permission strings
    pub permissions: Vec<String>,
}

/// Caller identity attached to the request when resolution carried one
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// User id from the verified token
    pub id: Uuid,
    /// Role within the resolved tenant
    pub role: TenantRole,
    /// Fine-grained permission strings
    pub permissions: Vec<String>,
}

/// Limit/usage pair for one resource class
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceBudget {
    /// Tier limit for the current month
    pub limit: u64,
    /// Recorded usage for the current month
    pub used: u64,
    /// `max(0, limit - used)`, never negative
    pub remaining: u64,
}

impl ResourceBudget {
    /// Build a budget; `remaining` saturates at zero when usage exceeds the limit
    #[must_use]
    pub const fn new(limit: u64, used: u64) -> Self {
        Self {
            limit,
            used,
            remaining: limit.saturating_sub(used),
        }
    }
}

/// Current-month usage breakdown per resource class
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageLimits {
    /// Ledger transactions
    pub transactions: ResourceBudget,
    /// Computation units (contract execution, batch jobs)
    pub compute_units: ResourceBudget,
    /// API calls
    pub api_calls: ResourceBudget,
    /// Storage in megabytes
    pub storage_mb: ResourceBudget,
}

/// Tenant vault key material as stored in the directory
///
/// The master key never leaves the vault context builder in the clear; it is
/// only handed out wrapped under a per-request session key.
#[derive(Debug, Clone)]
pub struct VaultKeyMaterial {
    /// BIP44-style wallet derivation path for this tenant
    pub derivation_path: String,
    /// Active vault master key bytes
    pub master_key: Vec<u8>,
}

/// Per-request cryptographic isolation material
///
/// All byte fields are base64-encoded for transport to the downstream
/// signing component. Fresh session key and IV are generated per request and
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct VaultContext {
    /// BIP44-style wallet derivation path
    pub derivation_path: String,
    /// Vault master key wrapped under the session key (ciphertext + tag)
    pub wrapped_key: String,
    /// Fresh 256-bit session key
    pub session_key: String,
    /// Fresh 128-bit initialization vector
    pub iv: String,
    /// Isolation level of the owning tenant
    pub isolation_level: IsolationLevel,
}

/// Append-only record of a billable operation
#[derive(Debug, Clone, Serialize)]
pub struct BillableOperation {
    /// Tenant the operation bills to
    pub tenant_id: TenantId,
    /// Operation type from the classification table
    pub operation_type: String,
    /// HTTP method of the triggering request
    pub method: String,
    /// Request path
    pub path: String,
    /// Caller user agent, when present
    pub user_agent: Option<String>,
    /// Caller IP, when present
    pub ip_address: Option<String>,
    /// When the operation was observed
    pub recorded_at: DateTime<Utc>,
}

/// Fully resolved tenant context attached to a request
#[derive(Debug, Clone, Serialize)]
pub struct TenantContext {
    /// The resolved tenant record
    pub tenant: Tenant,
    /// Feature flag map from the directory
    pub features: serde_json::Value,
    /// Current-month usage limits
    pub limits: UsageLimits,
    /// Per-request vault material, absent when the tenant has no active key
    pub vault_context: Option<VaultContext>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn remaining_saturates_at_zero() {
        let budget = ResourceBudget::new(100, 250);
        assert_eq!(budget.remaining, 0);

        let budget = ResourceBudget::new(100, 40);
        assert_eq!(budget.remaining, 60);
    }

    #[test]
    fn unknown_status_never_serves() {
        assert!(!TenantStatus::from_db_string("archived").is_active());
        assert!(TenantStatus::from_db_string("active").is_active());
    }

    #[test]
    fn tenant_id_round_trips_through_display() {
        let id = TenantId::new();
        let parsed: TenantId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
