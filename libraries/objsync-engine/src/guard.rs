//! Bounded, time-limited, origin-safe storage access.

use async_trait::async_trait;
use objsync_core::{
    AccountInfo, ContainerInfo, ContainerPage, MetadataUpdate, ObjectPage, Result,
    StorageClient, StorageEndpoint, StoredObject, SyncError,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// [`StorageClient`] wrapper shared by a whole run.
///
/// Every call holds one permit of a single semaphore for its duration and is
/// cut off after `timeout` with a transport error. Object GET and PUT get
/// `transfer_timeout` instead; a GET returns once headers arrive, so its body
/// is paid for by the PUT that consumes it. Write calls addressed to an
/// origin endpoint are refused with a conflict error before reaching the
/// network.
pub struct GuardedStorage {
    inner: Arc<dyn StorageClient>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    transfer_timeout: Duration,
}

impl GuardedStorage {
    pub fn new(inner: Arc<dyn StorageClient>, max_in_flight: usize, timeout: Duration) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            timeout,
            transfer_timeout: timeout,
        }
    }

    /// Deadline of object GET and PUT, raised to `timeout` when shorter
    pub fn with_transfer_timeout(mut self, transfer_timeout: Duration) -> Self {
        self.transfer_timeout = transfer_timeout.max(self.timeout);
        self
    }

    /// Permits not currently held by a storage call
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    async fn guarded<T, F>(&self, operation: &str, endpoint: &StorageEndpoint, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        self.guarded_for(operation, endpoint, self.timeout, call)
            .await
    }

    async fn guarded_for<T, F>(
        &self,
        operation: &str,
        endpoint: &StorageEndpoint,
        deadline: Duration,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SyncError::internal("storage pool closed"))?;

        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    operation,
                    side = %endpoint.side,
                    url = %endpoint.base_url,
                    timeout_ms = deadline.as_millis() as u64,
                    "Storage call timed out"
                );
                Err(SyncError::transport(format!(
                    "{operation} on {} timed out after {:?}",
                    endpoint.base_url, deadline
                )))
            }
        }
    }

    fn ensure_writable(operation: &str, endpoint: &StorageEndpoint) -> Result<()> {
        if endpoint.side.is_origin() {
            error!(operation, url = %endpoint.base_url, "Refused write against origin");
            return Err(SyncError::conflict(format!(
                "refusing {operation} against origin {}",
                endpoint.base_url
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageClient for GuardedStorage {
    async fn head_account(&self, endpoint: &StorageEndpoint) -> Result<AccountInfo> {
        self.guarded("head_account", endpoint, self.inner.head_account(endpoint))
            .await
    }

    async fn post_account(
        &self,
        endpoint: &StorageEndpoint,
        update: &MetadataUpdate,
    ) -> Result<()> {
        Self::ensure_writable("post_account", endpoint)?;
        self.guarded("post_account", endpoint, self.inner.post_account(endpoint, update))
            .await
    }

    async fn list_containers(
        &self,
        endpoint: &StorageEndpoint,
        marker: Option<&str>,
    ) -> Result<ContainerPage> {
        self.guarded(
            "list_containers",
            endpoint,
            self.inner.list_containers(endpoint, marker),
        )
        .await
    }

    async fn head_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
    ) -> Result<ContainerInfo> {
        self.guarded(
            "head_container",
            endpoint,
            self.inner.head_container(endpoint, container),
        )
        .await
    }

    async fn put_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        info: &ContainerInfo,
    ) -> Result<()> {
        Self::ensure_writable("put_container", endpoint)?;
        self.guarded(
            "put_container",
            endpoint,
            self.inner.put_container(endpoint, container, info),
        )
        .await
    }

    async fn post_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        update: &MetadataUpdate,
    ) -> Result<()> {
        Self::ensure_writable("post_container", endpoint)?;
        self.guarded(
            "post_container",
            endpoint,
            self.inner.post_container(endpoint, container, update),
        )
        .await
    }

    async fn delete_container(&self, endpoint: &StorageEndpoint, container: &str) -> Result<()> {
        Self::ensure_writable("delete_container", endpoint)?;
        self.guarded(
            "delete_container",
            endpoint,
            self.inner.delete_container(endpoint, container),
        )
        .await
    }

    async fn list_objects(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        marker: Option<&str>,
    ) -> Result<ObjectPage> {
        self.guarded(
            "list_objects",
            endpoint,
            self.inner.list_objects(endpoint, container, marker),
        )
        .await
    }

    async fn get_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> Result<StoredObject> {
        self.guarded_for(
            "get_object",
            endpoint,
            self.transfer_timeout,
            self.inner.get_object(endpoint, container, object),
        )
        .await
    }

    async fn put_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
        data: StoredObject,
    ) -> Result<()> {
        Self::ensure_writable("put_object", endpoint)?;
        self.guarded_for(
            "put_object",
            endpoint,
            self.transfer_timeout,
            self.inner.put_object(endpoint, container, object, data),
        )
        .await
    }

    async fn delete_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> Result<()> {
        Self::ensure_writable("delete_object", endpoint)?;
        self.guarded(
            "delete_object",
            endpoint,
            self.inner.delete_object(endpoint, container, object),
        )
        .await
    }
}
