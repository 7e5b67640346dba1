// ABOUTME: Route module organization for the tenant gateway HTTP surface
// ABOUTME: Health checks plus tenant context introspection behind the gateway
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! Route modules for the gateway's own HTTP surface
//!
//! The gateway fronts tenant-scoped product APIs; the routes it serves
//! itself are deliberately small: liveness checks and context introspection
//! for resolved tenants.

/// Health check and system status routes
pub mod health;

/// Current-tenant context introspection routes
pub mod tenants;
