//! Per-item sync outcomes

use crate::error::{ErrorKind, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of visiting one item during a sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Created,
    Updated,
    Deleted,
    /// Already converged, or unchanged since the last pass
    Skipped,
    Failed { kind: ErrorKind, reason: String },
}

impl SyncOutcome {
    pub fn failed(error: &SyncError) -> Self {
        Self::Failed {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the destination was written to
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Deleted)
    }
}

/// What an outcome refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemRef {
    /// Tenant-level step (credential resolution, origin account listing)
    Tenant,
    /// Account-level step (metadata, destination listing)
    Account,
    Container { container: String },
    Object { container: String, object: String },
}

impl ItemRef {
    pub fn container(name: impl Into<String>) -> Self {
        Self::Container {
            container: name.into(),
        }
    }

    pub fn object(container: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Object {
            container: container.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenant => f.write_str("tenant"),
            Self::Account => f.write_str("account"),
            Self::Container { container } => write!(f, "{container}"),
            Self::Object { container, object } => write!(f, "{container}/{object}"),
        }
    }
}
