/// Engine configuration
use objsync_core::{Result, SyncError};
use std::time::Duration;

/// Default number of tenants replicated at the same time
pub const DEFAULT_TENANT_CONCURRENCY: usize = 10;

/// Default number of storage calls in flight across the whole run
pub const DEFAULT_STORAGE_CONCURRENCY: usize = 10;

/// Default per-call timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline of an object GET or PUT, body transfer included
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default container metadata key carrying the change signal
pub const DEFAULT_CHANGE_SIGNAL_KEY: &str = "Last-Modified";

/// Settings handed to the synchronizers at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub tenant_concurrency: usize,
    pub storage_concurrency: usize,
    pub request_timeout: Duration,
    /// Deadline of object GET and PUT calls; not below `request_timeout`
    pub transfer_timeout: Duration,
    pub change_signal_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tenant_concurrency: DEFAULT_TENANT_CONCURRENCY,
            storage_concurrency: DEFAULT_STORAGE_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            change_signal_key: DEFAULT_CHANGE_SIGNAL_KEY.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant_concurrency(mut self, tenants: usize) -> Self {
        self.tenant_concurrency = tenants;
        self
    }

    pub fn with_storage_concurrency(mut self, calls: usize) -> Self {
        self.storage_concurrency = calls;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn with_change_signal_key(mut self, key: impl Into<String>) -> Self {
        self.change_signal_key = key.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.tenant_concurrency == 0 {
            return Err(SyncError::config("tenant concurrency must be at least 1"));
        }
        if self.storage_concurrency == 0 {
            return Err(SyncError::config("storage concurrency must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(SyncError::config("request timeout must be positive"));
        }
        if self.transfer_timeout < self.request_timeout {
            return Err(SyncError::config(
                "transfer timeout must not be shorter than the request timeout",
            ));
        }
        if self.change_signal_key.trim().is_empty() {
            return Err(SyncError::config("change signal key must not be empty"));
        }
        Ok(())
    }
}
