// ABOUTME: Configuration management for the tenant gateway
// ABOUTME: Environment-only configuration loading, no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

/// Environment-based server configuration
pub mod environment;
