/// Application configuration
use crate::error::{AppError, Result};
use objsync_core::{EndpointResolver, StorageClient, Tenant};
use objsync_engine::{
    MemoryStateStore, SqliteStateStore, SyncConfig, SyncStateStore, DEFAULT_CHANGE_SIGNAL_KEY,
    DEFAULT_STORAGE_CONCURRENCY, DEFAULT_TENANT_CONCURRENCY, DEFAULT_TRANSFER_TIMEOUT,
};
use objsync_swift::{
    KeystoneCredentials, KeystoneResolver, KeystoneSide, StaticResolver, StaticSide,
    SwiftClient, SwiftConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Prefix of environment overrides, e.g. `OBJSYNC_ORIGIN__TOKEN`
pub const ENV_PREFIX: &str = "OBJSYNC";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub origin: ClusterSettings,

    #[serde(default)]
    pub destination: ClusterSettings,

    #[serde(default)]
    pub identity: IdentitySettings,

    #[serde(default = "default_concurrency")]
    pub concurrency: ConcurrencySettings,

    #[serde(default = "default_sync")]
    pub sync: SyncSettings,
}

/// Where and how to reach one cluster.
///
/// The Keystone resolver needs `auth_url` and `admin_credentials`; the
/// static resolver needs `storage_url` and `token`.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct ClusterSettings {
    pub auth_url: Option<String>,

    /// `tenant:user:password` of the reseller admin
    pub admin_credentials: Option<String>,

    /// Storage URL up to the account id, e.g. `http://proxy:8080/v1/AUTH_`
    pub storage_url: Option<String>,

    pub token: Option<String>,
}

impl std::fmt::Debug for ClusterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSettings")
            .field("auth_url", &self.auth_url)
            .field("admin_credentials", &self.admin_credentials.as_ref().map(|_| "<redacted>"))
            .field("storage_url", &self.storage_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    #[default]
    Keystone,
    Static,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IdentitySettings {
    #[serde(default)]
    pub resolver: ResolverKind,

    /// Tenants to replicate with the static resolver
    #[serde(default)]
    pub tenants: Vec<TenantEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TenantEntry {
    pub id: String,
    pub name: Option<String>,
}

impl TenantEntry {
    fn to_tenant(&self) -> Tenant {
        Tenant::new(
            self.id.clone(),
            self.name.clone().unwrap_or_else(|| self.id.clone()),
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConcurrencySettings {
    #[serde(default = "default_tenant_concurrency")]
    pub tenants: usize,

    #[serde(default = "default_storage_concurrency")]
    pub storage: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    #[serde(default = "default_change_signal_key")]
    pub change_signal_key: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Deadline of one object GET or PUT, body included
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,

    /// SQLite file holding sync marks; marks live for one run when unset
    #[serde(default)]
    pub state_database: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from `path` (if it exists) and the environment
    pub fn load(path: &Path) -> Result<Self> {
        Self::build(path, None)
    }

    fn build(path: &Path, vars: Option<config::Map<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if path.exists() {
            settings = settings.add_source(config::File::from(path.to_path_buf()));
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        }

        // Override with environment variables (OBJSYNC_SECTION__KEY)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(vars),
        );

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.sync_config().validate()?;

        match self.identity.resolver {
            ResolverKind::Keystone => {
                for (side, settings) in self.sides() {
                    require(side, "auth_url", settings.auth_url.as_deref())?;
                    let credentials =
                        require(side, "admin_credentials", settings.admin_credentials.as_deref())?;
                    credentials.parse::<KeystoneCredentials>().map_err(|e| {
                        AppError::Config(format!("[{side}] admin_credentials: {e}"))
                    })?;
                }
            }
            ResolverKind::Static => {
                for (side, settings) in self.sides() {
                    require(side, "storage_url", settings.storage_url.as_deref())?;
                    require(side, "token", settings.token.as_deref())?;
                }
                if self.identity.tenants.is_empty() {
                    return Err(AppError::Config(
                        "the static resolver needs at least one [[identity.tenants]] entry"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    fn sides(&self) -> [(&'static str, &ClusterSettings); 2] {
        [("origin", &self.origin), ("destination", &self.destination)]
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.request_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.transfer_timeout_secs)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new()
            .with_tenant_concurrency(self.concurrency.tenants)
            .with_storage_concurrency(self.concurrency.storage)
            .with_request_timeout(self.request_timeout())
            .with_transfer_timeout(self.transfer_timeout())
            .with_change_signal_key(self.sync.change_signal_key.clone())
    }

    pub fn swift_config(&self) -> SwiftConfig {
        SwiftConfig::new()
            .with_timeout(self.request_timeout())
            .with_transfer_timeout(self.transfer_timeout())
    }

    pub fn build_storage(&self) -> Result<Arc<dyn StorageClient>> {
        Ok(Arc::new(SwiftClient::new(self.swift_config())?))
    }

    pub fn build_resolver(&self) -> Result<Arc<dyn EndpointResolver>> {
        match self.identity.resolver {
            ResolverKind::Keystone => {
                let origin = keystone_side("origin", &self.origin)?;
                let destination = keystone_side("destination", &self.destination)?;
                Ok(Arc::new(KeystoneResolver::new(
                    origin,
                    destination,
                    &self.swift_config(),
                )?))
            }
            ResolverKind::Static => {
                let tenants = self
                    .identity
                    .tenants
                    .iter()
                    .map(TenantEntry::to_tenant)
                    .collect();
                Ok(Arc::new(StaticResolver::new(
                    tenants,
                    static_side("origin", &self.origin)?,
                    static_side("destination", &self.destination)?,
                )))
            }
        }
    }

    pub async fn open_state_store(&self) -> Result<Arc<dyn SyncStateStore>> {
        match &self.sync.state_database {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(Arc::new(SqliteStateStore::open(path).await?))
            }
            None => Ok(Arc::new(MemoryStateStore::new())),
        }
    }
}

fn require<'a>(side: &str, key: &str, value: Option<&'a str>) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("[{side}] {key} is required")))
}

fn keystone_side(side: &str, settings: &ClusterSettings) -> Result<KeystoneSide> {
    let auth_url = require(side, "auth_url", settings.auth_url.as_deref())?;
    let credentials = require(side, "admin_credentials", settings.admin_credentials.as_deref())?
        .parse::<KeystoneCredentials>()?;
    Ok(KeystoneSide::new(auth_url, credentials))
}

fn static_side(side: &str, settings: &ClusterSettings) -> Result<StaticSide> {
    let storage_url = require(side, "storage_url", settings.storage_url.as_deref())?;
    let token = require(side, "token", settings.token.as_deref())?;
    Ok(StaticSide::new(storage_url, token))
}

// Default values
fn default_concurrency() -> ConcurrencySettings {
    ConcurrencySettings {
        tenants: default_tenant_concurrency(),
        storage: default_storage_concurrency(),
    }
}

fn default_tenant_concurrency() -> usize {
    DEFAULT_TENANT_CONCURRENCY
}

fn default_storage_concurrency() -> usize {
    DEFAULT_STORAGE_CONCURRENCY
}

fn default_sync() -> SyncSettings {
    SyncSettings {
        change_signal_key: default_change_signal_key(),
        request_timeout_secs: default_request_timeout_secs(),
        transfer_timeout_secs: default_transfer_timeout_secs(),
        state_database: None,
    }
}

fn default_change_signal_key() -> String {
    DEFAULT_CHANGE_SIGNAL_KEY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_transfer_timeout_secs() -> u64 {
    DEFAULT_TRANSFER_TIMEOUT.as_secs()
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        default_concurrency()
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        default_sync()
    }
}
