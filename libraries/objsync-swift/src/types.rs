//! Types for Swift and Keystone requests and responses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP settings shared by every request of a [`crate::SwiftClient`].
#[derive(Debug, Clone)]
pub struct SwiftConfig {
    /// Whole-request timeout of account and container calls
    pub timeout: Duration,
    /// Whole-request timeout of object GET and PUT, body transfer included.
    /// Never below `timeout`.
    pub transfer_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

/// Default deadline for moving one object body
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(3600);

impl SwiftConfig {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("objsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.transfer_timeout = self.transfer_timeout.max(timeout);
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout.max(self.timeout);
        self
    }
}

impl Default for SwiftConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Listing Types
// =============================================================================

/// Row of `GET <account>?format=json`.
#[derive(Debug, Deserialize)]
pub(crate) struct ContainerListingEntry {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub bytes: u64,
}

/// Row of `GET <container>?format=json`.
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectListingEntry {
    pub name: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    /// `2013-03-05T09:12:25.123450`, UTC without offset
    #[serde(default)]
    pub last_modified: Option<String>,
}

// =============================================================================
// Keystone v2.0 Types
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub auth: TokenRequestAuth<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequestAuth<'a> {
    pub tenant_name: &'a str,
    pub password_credentials: PasswordCredentials<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordCredentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access: Access,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Access {
    pub token: TokenInfo,
    #[serde(default)]
    pub service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenInfo {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogEndpoint {
    #[serde(rename = "publicURL")]
    pub public_url: Option<String>,
    #[serde(rename = "adminURL")]
    pub admin_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TenantsResponse {
    pub tenants: Vec<KeystoneTenant>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeystoneTenant {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
