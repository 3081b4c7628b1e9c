//! Tenant and endpoint types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tenant (account owner) known to the identity service.
///
/// The same `id` must exist on both clusters; provisioning is external.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
}

impl Tenant {
    /// Create a tenant from its identifier and display name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Which cluster an endpoint points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterSide {
    /// Source cluster, never mutated
    Origin,
    /// Target cluster, the only one written to
    Destination,
}

impl ClusterSide {
    pub fn is_origin(self) -> bool {
        matches!(self, Self::Origin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Destination => "destination",
        }
    }
}

impl fmt::Display for ClusterSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage account URL plus the token used to reach it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEndpoint {
    pub side: ClusterSide,
    /// Account URL, e.g. `http://proxy:8080/v1/AUTH_<tenant id>`
    pub base_url: String,
    pub token: String,
}

impl StorageEndpoint {
    pub fn new(side: ClusterSide, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            side,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for StorageEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEndpoint")
            .field("side", &self.side)
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Both endpoints of one tenant, resolved for the duration of a run.
#[derive(Debug, Clone)]
pub struct TenantSession {
    pub tenant: Tenant,
    pub origin: StorageEndpoint,
    pub destination: StorageEndpoint,
}

impl TenantSession {
    pub fn new(tenant: Tenant, origin: StorageEndpoint, destination: StorageEndpoint) -> Self {
        Self {
            tenant,
            origin,
            destination,
        }
    }
}
