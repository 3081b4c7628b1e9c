//! Tenant enumeration and endpoint resolution.

use crate::error::{ClientError, Result};
use crate::headers::{expect_success, AUTH_TOKEN};
use crate::types::{
    PasswordCredentials, SwiftConfig, TenantsResponse, TokenRequest, TokenRequestAuth,
    TokenResponse,
};
use async_trait::async_trait;
use objsync_core::{ClusterSide, EndpointResolver, StorageEndpoint, SyncError, Tenant};
use reqwest::Client;
use std::fmt;
use std::str::FromStr;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Marker that separates the cluster prefix from the account id in storage URLs.
const ACCOUNT_PREFIX: &str = "AUTH_";

/// Admin credentials in `tenant:user:password` form.
#[derive(Clone, PartialEq, Eq)]
pub struct KeystoneCredentials {
    pub tenant_name: String,
    pub username: String,
    pub password: String,
}

impl FromStr for KeystoneCredentials {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(tenant), Some(user), Some(password))
                if !tenant.is_empty() && !user.is_empty() =>
            {
                Ok(Self {
                    tenant_name: tenant.to_string(),
                    username: user.to_string(),
                    password: password.to_string(),
                })
            }
            _ => Err(ClientError::InvalidCredentials(
                "expected tenant:user:password".to_string(),
            )),
        }
    }
}

impl fmt::Debug for KeystoneCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoneCredentials")
            .field("tenant_name", &self.tenant_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity service of one cluster side.
#[derive(Debug, Clone)]
pub struct KeystoneSide {
    /// Keystone v2.0 URL, e.g. `http://keystone:5000/v2.0`
    pub auth_url: String,
    pub credentials: KeystoneCredentials,
}

impl KeystoneSide {
    pub fn new(auth_url: impl Into<String>, credentials: KeystoneCredentials) -> Self {
        Self {
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

/// Admin token plus the URLs derived from the service catalog.
#[derive(Debug, Clone)]
struct AdminSession {
    token: String,
    /// Storage URL up to and including `AUTH_`
    storage_prefix: String,
    identity_admin_url: String,
}

/// Resolver backed by Keystone v2.0 on both clusters.
///
/// The reseller admin of each side is authenticated once per resolver; the
/// admin token then addresses every tenant's account on that side. Tenants
/// are enumerated from the origin identity service only.
pub struct KeystoneResolver {
    http: Client,
    origin: KeystoneSide,
    destination: KeystoneSide,
    origin_session: OnceCell<AdminSession>,
    destination_session: OnceCell<AdminSession>,
}

impl KeystoneResolver {
    pub fn new(
        origin: KeystoneSide,
        destination: KeystoneSide,
        config: &SwiftConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            http,
            origin,
            destination,
            origin_session: OnceCell::new(),
            destination_session: OnceCell::new(),
        })
    }

    async fn session(&self, side: ClusterSide) -> Result<&AdminSession> {
        let (cell, keystone) = match side {
            ClusterSide::Origin => (&self.origin_session, &self.origin),
            ClusterSide::Destination => (&self.destination_session, &self.destination),
        };
        cell.get_or_try_init(|| self.authenticate(side, keystone))
            .await
    }

    async fn authenticate(
        &self,
        side: ClusterSide,
        keystone: &KeystoneSide,
    ) -> Result<AdminSession> {
        let url = format!("{}/tokens", keystone.auth_url);
        debug!(url = %url, side = %side, tenant = %keystone.credentials.tenant_name, "Authenticating admin");

        let body = TokenRequest {
            auth: TokenRequestAuth {
                tenant_name: &keystone.credentials.tenant_name,
                password_credentials: PasswordCredentials {
                    username: &keystone.credentials.username,
                    password: &keystone.credentials.password,
                },
            },
        };

        let response = self.http.post(&url).json(&body).send().await?;
        let response = match expect_success(response).await {
            Err(ClientError::ServerError { status: 401 | 403, message }) => {
                return Err(ClientError::AuthFailed(format!("{side} keystone: {message}")));
            }
            other => other?,
        };

        let token: TokenResponse = response.json().await.map_err(|e| {
            ClientError::ParseError(format!("Failed to parse token response: {}", e))
        })?;

        let storage_url = catalog_url(&token, "object-store", |e| e.public_url.clone())
            .ok_or_else(|| {
                ClientError::AuthFailed(format!("{side} catalog has no object-store endpoint"))
            })?;
        let storage_prefix = storage_prefix(&storage_url).ok_or_else(|| {
            ClientError::AuthFailed(format!(
                "{side} storage URL {storage_url} has no {ACCOUNT_PREFIX} account part"
            ))
        })?;
        let identity_admin_url = catalog_url(&token, "identity", |e| e.admin_url.clone())
            .unwrap_or_else(|| keystone.auth_url.clone());

        info!(side = %side, storage_prefix = %storage_prefix, "Admin session established");

        Ok(AdminSession {
            token: token.access.token.id,
            storage_prefix,
            identity_admin_url: identity_admin_url.trim_end_matches('/').to_string(),
        })
    }
}

fn catalog_url(
    token: &TokenResponse,
    service_type: &str,
    pick: impl Fn(&crate::types::CatalogEndpoint) -> Option<String>,
) -> Option<String> {
    token
        .access
        .service_catalog
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .flat_map(|entry| entry.endpoints.iter())
        .find_map(pick)
}

/// `http://p:8080/v1/AUTH_abc` -> `http://p:8080/v1/AUTH_`
fn storage_prefix(storage_url: &str) -> Option<String> {
    storage_url
        .find(ACCOUNT_PREFIX)
        .map(|idx| storage_url[..idx + ACCOUNT_PREFIX.len()].to_string())
}

#[async_trait]
impl EndpointResolver for KeystoneResolver {
    async fn list_tenants(&self) -> objsync_core::Result<Vec<Tenant>> {
        let session = self.session(ClusterSide::Origin).await?;
        let url = format!("{}/tenants", session.identity_admin_url);
        debug!(url = %url, "Listing tenants");

        let response = self
            .http
            .get(&url)
            .header(AUTH_TOKEN, &session.token)
            .send()
            .await
            .map_err(|e| ClientError::Request(e).into_sync_error("Tenants", &url))?;
        let response = expect_success(response)
            .await
            .map_err(|e| e.into_sync_error("Tenants", &url))?;

        let tenants: TenantsResponse = response.json().await.map_err(|e| {
            SyncError::transport(format!("Failed to parse tenant listing: {}", e))
        })?;

        Ok(tenants
            .tenants
            .into_iter()
            .filter(|t| t.enabled)
            .map(|t| Tenant::new(t.id, t.name))
            .collect())
    }

    async fn endpoint(
        &self,
        tenant: &Tenant,
        side: ClusterSide,
    ) -> objsync_core::Result<StorageEndpoint> {
        let session = self.session(side).await.map_err(|e| match e {
            ClientError::Request(err) => {
                SyncError::auth(format!("{side} keystone unreachable: {err}"))
            }
            other => other.into_sync_error("Keystone", side.as_str()),
        })?;

        Ok(StorageEndpoint::new(
            side,
            format!("{}{}", session.storage_prefix, tenant.id),
            session.token.clone(),
        ))
    }
}

/// Storage URL prefix and token for one side of a [`StaticResolver`].
#[derive(Clone)]
pub struct StaticSide {
    /// Storage URL up to the account id, e.g. `http://proxy:8080/v1/AUTH_`
    pub storage_prefix: String,
    pub token: String,
}

impl StaticSide {
    pub fn new(storage_prefix: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            storage_prefix: storage_prefix.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSide")
            .field("storage_prefix", &self.storage_prefix)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Resolver with a fixed tenant list and pre-issued reseller tokens.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    tenants: Vec<Tenant>,
    origin: StaticSide,
    destination: StaticSide,
}

impl StaticResolver {
    pub fn new(tenants: Vec<Tenant>, origin: StaticSide, destination: StaticSide) -> Self {
        Self {
            tenants,
            origin,
            destination,
        }
    }
}

#[async_trait]
impl EndpointResolver for StaticResolver {
    async fn list_tenants(&self) -> objsync_core::Result<Vec<Tenant>> {
        Ok(self.tenants.clone())
    }

    async fn endpoint(
        &self,
        tenant: &Tenant,
        side: ClusterSide,
    ) -> objsync_core::Result<StorageEndpoint> {
        let config = match side {
            ClusterSide::Origin => &self.origin,
            ClusterSide::Destination => &self.destination,
        };
        if config.token.is_empty() {
            return Err(SyncError::auth(format!("no {side} token configured")));
        }

        Ok(StorageEndpoint::new(
            side,
            format!("{}{}", config.storage_prefix, tenant.id),
            config.token.clone(),
        ))
    }
}
