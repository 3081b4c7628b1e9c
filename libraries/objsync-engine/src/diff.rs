//! Listing and metadata comparison.

use objsync_core::{ContainerInfo, Metadata, MetadataUpdate, ObjectRecord};
use std::collections::BTreeMap;

/// Per-object actions for one container, computed once from one pair of
/// listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDiff {
    /// Origin-only objects
    pub create: Vec<ObjectRecord>,
    /// Objects on both sides whose content differs
    pub update: Vec<ObjectRecord>,
    /// Destination-only objects
    pub delete: Vec<ObjectRecord>,
    pub unchanged: Vec<ObjectRecord>,
}

impl ObjectDiff {
    /// Number of mutating actions
    pub fn pending(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }

    pub fn is_converged(&self) -> bool {
        self.pending() == 0
    }
}

/// Index both listings by name and classify every object.
///
/// Entries in `create` and `update` carry the origin record; entries in
/// `delete` carry the destination record.
pub fn diff_objects(origin: Vec<ObjectRecord>, destination: Vec<ObjectRecord>) -> ObjectDiff {
    let mut remaining: BTreeMap<String, ObjectRecord> = destination
        .into_iter()
        .map(|record| (record.name.clone(), record))
        .collect();

    let mut diff = ObjectDiff::default();
    for record in origin {
        match remaining.remove(&record.name) {
            None => diff.create.push(record),
            Some(existing) if content_differs(&record, &existing) => diff.update.push(record),
            Some(_) => diff.unchanged.push(record),
        }
    }
    diff.delete = remaining.into_values().collect();
    diff
}

/// Whether the destination copy must be replaced.
///
/// With a fingerprint on both sides, fingerprint and size decide. Otherwise
/// a size difference, or an origin copy newer than the destination copy,
/// means the object changed.
pub fn content_differs(origin: &ObjectRecord, destination: &ObjectRecord) -> bool {
    if origin.bytes != destination.bytes {
        return true;
    }
    match (&origin.etag, &destination.etag) {
        (Some(origin_etag), Some(destination_etag)) => {
            !origin_etag.eq_ignore_ascii_case(destination_etag)
        }
        _ => match (origin.last_modified, destination.last_modified) {
            (Some(origin_time), Some(destination_time)) => origin_time > destination_time,
            _ => false,
        },
    }
}

/// Changes that make `destination` equal to `origin`, leaving `ignored` keys
/// alone on both sides.
pub fn metadata_delta(
    origin: &Metadata,
    destination: &Metadata,
    ignored: &[&str],
) -> MetadataUpdate {
    let is_ignored = |key: &str| ignored.iter().any(|i| i.eq_ignore_ascii_case(key));

    let set = origin
        .iter()
        .filter(|(key, _)| !is_ignored(key.as_str()))
        .filter(|(key, value)| destination.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let remove = destination
        .keys()
        .filter(|key| !is_ignored(key.as_str()) && !origin.contains_key(*key))
        .cloned()
        .collect();

    MetadataUpdate {
        set,
        remove,
        ..MetadataUpdate::default()
    }
}

/// Metadata delta plus ACL changes for a container present on both sides.
pub fn container_delta(
    origin: &ContainerInfo,
    destination: &ContainerInfo,
    ignored: &[&str],
) -> MetadataUpdate {
    let mut update = metadata_delta(&origin.metadata, &destination.metadata, ignored);
    if origin.read_acl != destination.read_acl {
        update.read_acl = Some(origin.read_acl.clone().unwrap_or_default());
    }
    if origin.write_acl != destination.write_acl {
        update.write_acl = Some(origin.write_acl.clone().unwrap_or_default());
    }
    update
}

/// Container description used to create the destination copy.
pub fn creation_info(origin: &ContainerInfo, ignored: &[&str]) -> ContainerInfo {
    let metadata = origin
        .metadata
        .iter()
        .filter(|(key, _)| !ignored.iter().any(|i| i.eq_ignore_ascii_case(key.as_str())))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    ContainerInfo {
        read_acl: origin.read_acl.clone(),
        write_acl: origin.write_acl.clone(),
        ..ContainerInfo::with_metadata(metadata)
    }
}
