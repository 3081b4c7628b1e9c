//! Single-object replication.

use objsync_core::{Result, StorageClient, StorageEndpoint};
use std::sync::Arc;
use tracing::debug;

/// Copies and deletes individual objects. Both operations are idempotent.
#[derive(Clone)]
pub struct ObjectSynchronizer {
    storage: Arc<dyn StorageClient>,
}

impl ObjectSynchronizer {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Copy `container/object` from `origin` onto `destination`, carrying
    /// content type, etag and user metadata along with the body.
    ///
    /// The body streams from the GET response into the PUT request.
    pub async fn sync_object(
        &self,
        origin: &StorageEndpoint,
        destination: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> Result<()> {
        let data = self.storage.get_object(origin, container, object).await?;
        let bytes = data.content_length;
        self.storage
            .put_object(destination, container, object, data)
            .await?;

        debug!(container, object, bytes = ?bytes, "Object copied");
        Ok(())
    }

    /// Remove `container/object` from `destination`. An object that is
    /// already gone counts as deleted.
    pub async fn delete_object(
        &self,
        destination: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> Result<()> {
        match self
            .storage
            .delete_object(destination, container, object)
            .await
        {
            Ok(()) => {
                debug!(container, object, "Object deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(container, object, "Object already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
