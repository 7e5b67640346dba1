// ABOUTME: Credential extraction and tenant candidate resolution
// ABOUTME: API key, bearer JWT, internal service header, and subdomain sources in fixed priority
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Monay Platform Engineering

//! # Credential Extractor
//!
//! Four mutually exclusive resolution sources, tried in fixed priority
//! order: API key, bearer JWT, internal service header, `Host` subdomain.
//! A source that fails to match falls through to the next one; in
//! particular a malformed or expired JWT is deliberately swallowed so the
//! remaining sources still get their chance. Only when every source comes
//! up empty does the request carry no tenant context, and the orchestrator
//! decides whether that is acceptable for the path.

use std::sync::Arc;

use http::{header, HeaderMap};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{AuthManager, API_KEY_PREFIX};
use crate::directory::TenantDirectory;
use crate::errors::AppResult;
use crate::models::{AuthenticatedUser, TenantId};

/// Which source produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// `mk_`-prefixed API key in `x-api-key` or the bearer slot
    ApiKey,
    /// Verified bearer JWT mapped through the user's membership
    UserToken,
    /// Internal service header pair, service-to-service only
    InternalService,
    /// Registered subdomain of the `Host` header
    Subdomain,
}

/// A resolved tenant candidate plus any caller identity it carried
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Candidate tenant id, still to be loaded and status-checked
    pub tenant_id: TenantId,
    /// Caller identity, present only for user-token resolutions
    pub user: Option<AuthenticatedUser>,
    /// Which source matched
    pub source: ResolutionSource,
}

/// Parses request headers into a tenant candidate
pub struct CredentialExtractor {
    directory: Arc<dyn TenantDirectory>,
    auth: AuthManager,
    internal_service_secret: Option<String>,
}

impl CredentialExtractor {
    /// Build an extractor over the given directory and verifier
    #[must_use]
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        auth: AuthManager,
        internal_service_secret: Option<String>,
    ) -> Self {
        Self {
            directory,
            auth,
            internal_service_secret,
        }
    }

    /// Try every resolution source in priority order
    ///
    /// Returns `None` when no source matches. Soft failures (unknown API
    /// key, invalid JWT, unregistered subdomain) fall through; only storage
    /// errors propagate.
    ///
    /// # Errors
    ///
    /// Returns an error when a directory lookup fails.
    pub async fn resolve(&self, headers: &HeaderMap) -> AppResult<Option<Resolution>> {
        if let Some(resolution) = self.try_api_key(headers).await? {
            return Ok(Some(resolution));
        }
        if let Some(resolution) = self.try_bearer_jwt(headers).await? {
            return Ok(Some(resolution));
        }
        if let Some(resolution) = self.try_internal_service(headers) {
            return Ok(Some(resolution));
        }
        if let Some(resolution) = self.try_subdomain(headers).await? {
            return Ok(Some(resolution));
        }
        Ok(None)
    }

    async fn try_api_key(&self, headers: &HeaderMap) -> AppResult<Option<Resolution>> {
        let candidate = header_str(headers, "x-api-key")
            .or_else(|| bearer_token(headers))
            .filter(|key| key.starts_with(API_KEY_PREFIX));

        let Some(key) = candidate else {
            return Ok(None);
        };

        match self.directory.verify_api_key(key).await? {
            Some(tenant) => Ok(Some(Resolution {
                tenant_id: tenant.id,
                user: None,
                source: ResolutionSource::ApiKey,
            })),
            None => {
                debug!("presented API key matched no tenant");
                Ok(None)
            }
        }
    }

    async fn try_bearer_jwt(&self, headers: &HeaderMap) -> AppResult<Option<Resolution>> {
        let Some(token) = bearer_token(headers).filter(|t| !t.starts_with(API_KEY_PREFIX)) else {
            return Ok(None);
        };

        let claims = match self.auth.validate_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                // Not a hard failure: an expired or malformed JWT just means
                // this source did not match.
                debug!(error = %e, "bearer JWT rejected, trying next resolution source");
                return Ok(None);
            }
        };

        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            debug!(sub = %claims.sub, "JWT subject is not a user id");
            return Ok(None);
        };

        match self.directory.get_membership(user_id).await? {
            Some(membership) => Ok(Some(Resolution {
                tenant_id: membership.tenant_id,
                user: Some(AuthenticatedUser {
                    id: user_id,
                    role: membership.role,
                    permissions: membership.permissions,
                }),
                source: ResolutionSource::UserToken,
            })),
            None => {
                debug!(user_id = %user_id, "user has no active tenant membership");
                Ok(None)
            }
        }
    }

    fn try_internal_service(&self, headers: &HeaderMap) -> Option<Resolution> {
        let secret = self.internal_service_secret.as_deref()?;
        let provided = header_str(headers, "x-internal-key")?;

        if !bool::from(provided.as_bytes().ct_eq(secret.as_bytes())) {
            warn!("x-internal-key did not match the configured service secret");
            return None;
        }

        let tenant_header = header_str(headers, "x-tenant-id")?;
        match tenant_header.parse::<TenantId>() {
            Ok(tenant_id) => Some(Resolution {
                tenant_id,
                user: None,
                source: ResolutionSource::InternalService,
            }),
            Err(e) => {
                warn!(error = %e, "internal service call carried an unparseable x-tenant-id");
                None
            }
        }
    }

    async fn try_subdomain(&self, headers: &HeaderMap) -> AppResult<Option<Resolution>> {
        let Some(host) = header_str(headers, header::HOST.as_str()) else {
            return Ok(None);
        };
        let host = host.split(':').next().unwrap_or(host);

        // Only `tenant.example.com`-shaped hosts qualify; bare domains have
        // no subdomain label to resolve.
        if host.split('.').count() < 3 {
            return Ok(None);
        }
        let Some(subdomain) = host.split('.').next() else {
            return Ok(None);
        };

        match self.directory.get_tenant_by_subdomain(subdomain).await? {
            Some(tenant) => Ok(Some(Resolution {
                tenant_id: tenant.id,
                user: None,
                source: ResolutionSource::Subdomain,
            })),
            None => Ok(None),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, header::AUTHORIZATION.as_str())
        .and_then(|value| value.strip_prefix("Bearer "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{
        IsolationLevel, Tenant, TenantMembership, TenantRole, TenantStatus,
    };
    use chrono::{Duration, Utc};

    fn seeded_directory() -> (Arc<MemoryDirectory>, TenantId) {
        let directory = Arc::new(MemoryDirectory::new());
        let id = TenantId::new();
        directory.insert_tenant(Tenant {
            id,
            code: "acme".to_owned(),
            name: "Acme Corp".to_owned(),
            tenant_type: "enterprise".to_owned(),
            status: TenantStatus::Active,
            billing_tier: "enterprise".to_owned(),
            isolation_level: IsolationLevel::Row,
            features: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        (directory, id)
    }

    use crate::directory::MemoryDirectory;

    fn extractor(directory: Arc<MemoryDirectory>) -> CredentialExtractor {
        CredentialExtractor::new(
            directory,
            AuthManager::new("test-secret"),
            Some("internal-secret".to_owned()),
        )
    }

    #[tokio::test]
    async fn api_key_header_resolves_tenant() {
        let (directory, id) = seeded_directory();
        directory.insert_api_key("mk_abc123", id);
        let extractor = extractor(directory);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "mk_abc123".parse().unwrap());

        let resolution = extractor.resolve(&headers).await.unwrap().unwrap();
        assert_eq!(resolution.tenant_id, id);
        assert_eq!(resolution.source, ResolutionSource::ApiKey);
        assert!(resolution.user.is_none());
    }

    #[tokio::test]
    async fn api_key_as_bearer_token_resolves_tenant() {
        let (directory, id) = seeded_directory();
        directory.insert_api_key("mk_bearer9", id);
        let extractor = extractor(directory);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer mk_bearer9".parse().unwrap());

        let resolution = extractor.resolve(&headers).await.unwrap().unwrap();
        assert_eq!(resolution.source, ResolutionSource::ApiKey);
    }

    #[tokio::test]
    async fn jwt_maps_user_to_membership_tenant() {
        let (directory, id) = seeded_directory();
        let user_id = Uuid::new_v4();
        directory.insert_membership(TenantMembership {
            user_id,
            tenant_id: id,
            role: TenantRole::Admin,
            permissions: vec!["invoices:write".to_owned()],
        });

        let auth = AuthManager::new("test-secret");
        let token = auth.generate_token(user_id, Duration::hours(1)).unwrap();
        let extractor = extractor(directory);

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {token}").parse().unwrap(),
        );

        let resolution = extractor.resolve(&headers).await.unwrap().unwrap();
        assert_eq!(resolution.source, ResolutionSource::UserToken);
        let user = resolution.user.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, TenantRole::Admin);
    }

    #[tokio::test]
    async fn expired_jwt_falls_through_to_no_match() {
        let (directory, _) = seeded_directory();
        let auth = AuthManager::new("test-secret");
        let token = auth
            .generate_token(Uuid::new_v4(), Duration::hours(-2))
            .unwrap();
        let extractor = extractor(directory);

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {token}").parse().unwrap(),
        );

        assert!(extractor.resolve(&headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn internal_header_requires_matching_secret() {
        let (directory, id) = seeded_directory();
        let extractor = extractor(directory);

        let mut headers = HeaderMap::new();
        headers.insert("x-internal-key", "wrong-secret".parse().unwrap());
        headers.insert("x-tenant-id", id.to_string().parse().unwrap());
        assert!(extractor.resolve(&headers).await.unwrap().is_none());

        let mut headers = HeaderMap::new();
        headers.insert("x-internal-key", "internal-secret".parse().unwrap());
        headers.insert("x-tenant-id", id.to_string().parse().unwrap());
        let resolution = extractor.resolve(&headers).await.unwrap().unwrap();
        assert_eq!(resolution.source, ResolutionSource::InternalService);
        assert_eq!(resolution.tenant_id, id);
    }

    #[tokio::test]
    async fn subdomain_resolves_only_with_three_labels() {
        let (directory, id) = seeded_directory();
        directory.set_subdomain("acme", id);
        let extractor = extractor(directory);

        let mut headers = HeaderMap::new();
        headers.insert("host", "acme.monay.com".parse().unwrap());
        let resolution = extractor.resolve(&headers).await.unwrap().unwrap();
        assert_eq!(resolution.source, ResolutionSource::Subdomain);

        let mut headers = HeaderMap::new();
        headers.insert("host", "monay.com".parse().unwrap());
        assert!(extractor.resolve(&headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn no_credentials_resolve_to_none() {
        let (directory, _) = seeded_directory();
        let extractor = extractor(directory);
        assert!(extractor.resolve(&HeaderMap::new()).await.unwrap().is_none());
    }
}
