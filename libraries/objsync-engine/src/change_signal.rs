//! Container change-signal consumer.
//!
//! A proxy filter on the origin stamps `X-Container-Meta-<key>` with the
//! current Unix time whenever a container or one of its objects is written.
//! The stamp is best effort: it may be stale or spurious, never authoritative.

use objsync_core::Metadata;

/// Reads the change-signal stamp out of container metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSignal {
    /// Lowercase metadata key, e.g. `last-modified`
    metadata_key: String,
}

impl ChangeSignal {
    /// Spaces in `key` become `-`, as the stamping filter does.
    pub fn new(key: &str) -> Self {
        Self {
            metadata_key: key.trim().replace(' ', "-").to_lowercase(),
        }
    }

    /// Key as it appears in a [`Metadata`] map.
    pub fn metadata_key(&self) -> &str {
        &self.metadata_key
    }

    /// Stamp value, when present and a finite epoch number.
    pub fn read(&self, metadata: &Metadata) -> Option<f64> {
        metadata
            .get(&self.metadata_key)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }

    /// A stamp not newer than the recorded mark means nothing changed since
    /// the last successful pass.
    pub fn is_unchanged(observed: f64, mark: Option<f64>) -> bool {
        mark.is_some_and(|mark| observed <= mark)
    }
}
