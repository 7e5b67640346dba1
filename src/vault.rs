// ABOUTME: Per-request vault context derivation for downstream signing
// ABOUTME: Wraps the tenant vault key under a fresh AEAD session key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Vault Context Builder
//!
//! Signing operations downstream of the gateway need the tenant's vault key,
//! but the raw key must never cross the middleware boundary in the clear.
//! For each request that resolves a tenant, the builder generates a fresh
//! 256-bit session key and 128-bit IV, wraps the vault master key with
//! AES-256-GCM (ciphertext carries the integrity tag), and hands out the
//! wrapped key plus the session material, base64-encoded for transport.
//! Tenants without an active vault key simply get no vault context;
//! non-signing operations proceed without one.

use std::sync::Arc;

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroize;

use crate::directory::TenantDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::{Tenant, VaultContext};

/// AES-256-GCM parameterized to the 16-byte IV the signing service expects
type VaultKeyCipher = AesGcm<Aes256, U16>;

const SESSION_KEY_BYTES: usize = 32;
const IV_BYTES: usize = 16;

/// Builds per-request [`VaultContext`] values from directory key material
pub struct VaultContextBuilder {
    directory: Arc<dyn TenantDirectory>,
}

impl VaultContextBuilder {
    /// Build over the given directory
    #[must_use]
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self { directory }
    }

    /// Derive a fresh vault context for the tenant
    ///
    /// Returns `None` when the tenant has no active vault key; requests that
    /// never sign anything must not fail over missing key material.
    ///
    /// # Errors
    ///
    /// Returns an error when key material lookup or wrapping fails.
    pub async fn build(&self, tenant: &Tenant) -> AppResult<Option<VaultContext>> {
        let Some(mut material) = self.directory.get_vault_material(tenant.id).await? else {
            debug!(tenant_id = %tenant.id, "tenant has no active vault key");
            return Ok(None);
        };

        let mut session_key = [0u8; SESSION_KEY_BYTES];
        let mut iv = [0u8; IV_BYTES];
        OsRng.fill_bytes(&mut session_key);
        OsRng.fill_bytes(&mut iv);

        let cipher = VaultKeyCipher::new_from_slice(&session_key)
            .map_err(|e| AppError::internal(format!("Failed to build wrapping cipher: {e}")))?;
        let wrapped = cipher
            .encrypt(GenericArray::from_slice(&iv), material.master_key.as_slice())
            .map_err(|_| AppError::internal("Vault key wrapping failed"))?;

        let context = VaultContext {
            derivation_path: material.derivation_path.clone(),
            wrapped_key: BASE64.encode(&wrapped),
            session_key: BASE64.encode(session_key),
            iv: BASE64.encode(iv),
            isolation_level: tenant.isolation_level,
        };

        material.master_key.zeroize();
        session_key.zeroize();

        Ok(Some(context))
    }
}

/// Recover vault key bytes from a wrapped context
///
/// This is the receiving half of the wrap performed by
/// [`VaultContextBuilder::build`], used by the signing component after the
/// context crosses the service boundary.
///
/// # Errors
///
/// Returns an error when decoding fails or the ciphertext does not
/// authenticate under the session key and IV.
pub fn unwrap_vault_key(wrapped_key: &str, session_key: &str, iv: &str) -> AppResult<Vec<u8>> {
    let wrapped = BASE64
        .decode(wrapped_key)
        .map_err(|e| AppError::invalid_input(format!("Invalid wrapped key encoding: {e}")))?;
    let key = BASE64
        .decode(session_key)
        .map_err(|e| AppError::invalid_input(format!("Invalid session key encoding: {e}")))?;
    let iv = BASE64
        .decode(iv)
        .map_err(|e| AppError::invalid_input(format!("Invalid IV encoding: {e}")))?;

    if key.len() != SESSION_KEY_BYTES || iv.len() != IV_BYTES {
        return Err(AppError::invalid_input(
            "Session key or IV has the wrong length",
        ));
    }

    let cipher = VaultKeyCipher::new_from_slice(&key)
        .map_err(|e| AppError::internal(format!("Failed to build unwrapping cipher: {e}")))?;
    cipher
        .decrypt(GenericArray::from_slice(&iv), wrapped.as_slice())
        .map_err(|_| AppError::invalid_input("Vault key ciphertext failed authentication"))
}
