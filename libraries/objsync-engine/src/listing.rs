//! Full listings over marker-based pagination.

use objsync_core::{
    ContainerRecord, ObjectRecord, Result, StorageClient, StorageEndpoint, SyncError,
};
use tracing::debug;

/// Every container of the account at `endpoint`.
///
/// Pages are requested with the last name of the previous page as marker
/// until an empty page comes back. Any failure is wrapped in
/// [`SyncError::Listing`].
pub async fn list_all_containers(
    storage: &dyn StorageClient,
    endpoint: &StorageEndpoint,
) -> Result<Vec<ContainerRecord>> {
    let target = format!("{} account {}", endpoint.side, endpoint.base_url);
    let mut containers: Vec<ContainerRecord> = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let page = storage
            .list_containers(endpoint, marker.as_deref())
            .await
            .map_err(|e| SyncError::listing(&target, e))?;

        let Some(next) = page.next_marker().map(str::to_string) else {
            break;
        };
        ensure_progress(&target, marker.as_deref(), &next)?;

        containers.extend(page.containers);
        marker = Some(next);
    }

    debug!(target = %target, count = containers.len(), "Listed containers");
    Ok(containers)
}

/// Every object of `container` at `endpoint`.
pub async fn list_all_objects(
    storage: &dyn StorageClient,
    endpoint: &StorageEndpoint,
    container: &str,
) -> Result<Vec<ObjectRecord>> {
    let target = format!("{} container {}", endpoint.side, container);
    let mut objects: Vec<ObjectRecord> = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let page = storage
            .list_objects(endpoint, container, marker.as_deref())
            .await
            .map_err(|e| SyncError::listing(&target, e))?;

        let Some(next) = page.next_marker().map(str::to_string) else {
            break;
        };
        ensure_progress(&target, marker.as_deref(), &next)?;

        objects.extend(page.objects);
        marker = Some(next);
    }

    debug!(target = %target, count = objects.len(), "Listed objects");
    Ok(objects)
}

// Listings are sorted by name; a page that does not move past the marker
// would loop forever.
fn ensure_progress(target: &str, previous: Option<&str>, next: &str) -> Result<()> {
    match previous {
        Some(previous) if next <= previous => Err(SyncError::listing(
            target,
            SyncError::transport(format!("listing did not advance past marker {previous:?}")),
        )),
        _ => Ok(()),
    }
}
