// ABOUTME: Billable operation classification and asynchronous usage tracking
// ABOUTME: Path-prefix tables map mutations to operation types, recorded off the request path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Billing Usage Tracker
//!
//! A request is billable when its method mutates state (POST/PUT/DELETE) and
//! its path falls under one of the billable product areas. The operation
//! type comes from a second, finer-grained prefix table; anything billable
//! that matches no specific entry records as a generic `api_call`.
//!
//! Recording is strictly fire-and-forget: the write is spawned and never
//! joined, and a failing sink is logged and swallowed so it cannot change
//! the response already being produced for the caller.

use std::sync::Arc;

use http::Method;
use tracing::warn;

use crate::directory::TenantDirectory;
use crate::models::BillableOperation;

/// Operation type recorded when no specific table entry matches
pub const DEFAULT_OPERATION_TYPE: &str = "api_call";

/// Product areas whose mutations bill to the tenant, matched in order
const BILLABLE_PREFIXES: [&str; 7] = [
    "/api/transactions",
    "/api/transfers",
    "/api/invoices",
    "/api/contracts",
    "/api/kyc",
    "/api/cards",
    "/api/cross-chain",
];

/// Specific operation types, matched in order; longest prefixes first so
/// `/api/transfers/wire` wins over `/api/transfers`
const OPERATION_TYPES: [(&str, &str); 8] = [
    ("/api/transfers/wire", "wire_transfer"),
    ("/api/transfers/ach", "ach_transfer"),
    ("/api/transactions", "transaction"),
    ("/api/invoices", "invoice_operation"),
    ("/api/contracts", "contract_execution"),
    ("/api/kyc", "kyc_verification"),
    ("/api/cards", "card_operation"),
    ("/api/cross-chain", "cross_chain_transfer"),
];

/// Classify a request, returning its billable operation type
///
/// `None` means the request does not bill: either the method is a read or
/// the path is outside every billable product area.
#[must_use]
pub fn classify(method: &Method, path: &str) -> Option<&'static str> {
    let is_mutation = matches!(*method, Method::POST | Method::PUT | Method::DELETE);
    if !is_mutation {
        return None;
    }

    let billable = BILLABLE_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix));
    if !billable {
        return None;
    }

    Some(
        OPERATION_TYPES
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix))
            .map_or(DEFAULT_OPERATION_TYPE, |(_, op)| op),
    )
}

/// Records billable operations against the directory, detached from the
/// request path
pub struct UsageTracker {
    directory: Arc<dyn TenantDirectory>,
}

impl UsageTracker {
    /// Build over the given directory
    #[must_use]
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self { directory }
    }

    /// Spawn the record write and return immediately
    ///
    /// The spawned task owns the operation; a sink failure is logged at warn
    /// level and otherwise ignored.
    pub fn record_detached(&self, operation: BillableOperation) {
        let directory = Arc::clone(&self.directory);
        tokio::spawn(async move {
            if let Err(e) = directory.record_billable_operation(&operation).await {
                warn!(
                    tenant_id = %operation.tenant_id,
                    operation_type = %operation.operation_type,
                    error = %e,
                    "failed to record billable operation"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_never_billable() {
        assert_eq!(classify(&Method::GET, "/api/transactions"), None);
        assert_eq!(classify(&Method::HEAD, "/api/cards/123"), None);
    }

    #[test]
    fn mutations_outside_billable_areas_do_not_bill() {
        assert_eq!(classify(&Method::POST, "/api/profile"), None);
        assert_eq!(classify(&Method::DELETE, "/api/sessions/7"), None);
    }

    #[test]
    fn specific_prefixes_win_over_the_generic_family() {
        assert_eq!(
            classify(&Method::POST, "/api/transfers/wire"),
            Some("wire_transfer")
        );
        assert_eq!(
            classify(&Method::POST, "/api/transfers/ach"),
            Some("ach_transfer")
        );
        // The transfers family bills even without a specific entry
        assert_eq!(
            classify(&Method::POST, "/api/transfers/internal"),
            Some(DEFAULT_OPERATION_TYPE)
        );
    }

    #[test]
    fn each_billable_area_maps_to_its_operation_type() {
        assert_eq!(
            classify(&Method::POST, "/api/transactions"),
            Some("transaction")
        );
        assert_eq!(
            classify(&Method::PUT, "/api/invoices/42"),
            Some("invoice_operation")
        );
        assert_eq!(
            classify(&Method::POST, "/api/contracts/deploy"),
            Some("contract_execution")
        );
        assert_eq!(
            classify(&Method::POST, "/api/kyc/submit"),
            Some("kyc_verification")
        );
        assert_eq!(
            classify(&Method::DELETE, "/api/cards/9"),
            Some("card_operation")
        );
        assert_eq!(
            classify(&Method::POST, "/api/cross-chain/swap"),
            Some("cross_chain_transfer")
        );
    }
}
