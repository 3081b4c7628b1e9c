//! User metadata maps

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User metadata keyed by the lowercase header suffix (`X-Container-Meta-<key>`).
pub type Metadata = BTreeMap<String, String>;

/// Changes to apply to an account or container's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    /// Keys to create or overwrite
    pub set: Metadata,
    /// Keys to remove
    pub remove: Vec<String>,
    /// New read ACL (containers only); `Some("")` clears it
    pub read_acl: Option<String>,
    /// New write ACL (containers only); `Some("")` clears it
    pub write_acl: Option<String>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.remove.is_empty()
            && self.read_acl.is_none()
            && self.write_acl.is_none()
    }
}
