//! Account and container types

use super::Metadata;
use serde::{Deserialize, Serialize};

/// Account-level counters and metadata (HEAD on the account URL)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub container_count: u64,
    pub object_count: u64,
    pub bytes_used: u64,
    pub metadata: Metadata,
}

/// One row of an account's container listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub name: String,
    #[serde(default)]
    pub object_count: u64,
    #[serde(default)]
    pub bytes_used: u64,
}

impl ContainerRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_count: 0,
            bytes_used: 0,
        }
    }
}

/// Container counters, metadata and ACLs (HEAD on the container URL)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub object_count: u64,
    pub bytes_used: u64,
    pub metadata: Metadata,
    pub read_acl: Option<String>,
    pub write_acl: Option<String>,
}

impl ContainerInfo {
    /// Container description carrying only metadata, used for creation
    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }
}

/// One page of an account listing
#[derive(Debug, Clone, Default)]
pub struct ContainerPage {
    pub account: AccountInfo,
    pub containers: Vec<ContainerRecord>,
}

impl ContainerPage {
    /// Marker for the next page, `None` when this page is empty
    pub fn next_marker(&self) -> Option<&str> {
        self.containers.last().map(|c| c.name.as_str())
    }
}
