//! Capability traits injected into the synchronizers
//!
//! The engine never talks HTTP or identity directly; it receives these
//! traits at construction time so tests can swap in doubles.

use crate::error::Result;
use crate::types::{
    AccountInfo, ClusterSide, ContainerInfo, ContainerPage, MetadataUpdate, ObjectPage,
    StorageEndpoint, StoredObject, Tenant,
};
use async_trait::async_trait;

/// REST operations against one storage cluster.
///
/// Every call is addressed to an explicit endpoint; implementations keep no
/// per-tenant state. Listing calls return a single page: callers page with
/// the last name of the previous page as marker until an empty page comes
/// back.
#[async_trait]
pub trait StorageClient: Send + Sync {
    // ========================================================================
    // Accounts
    // ========================================================================

    /// Read account counters and metadata
    async fn head_account(&self, endpoint: &StorageEndpoint) -> Result<AccountInfo>;

    /// Apply a metadata update to the account
    async fn post_account(&self, endpoint: &StorageEndpoint, update: &MetadataUpdate)
        -> Result<()>;

    /// One page of the account's container listing, starting after `marker`
    async fn list_containers(
        &self,
        endpoint: &StorageEndpoint,
        marker: Option<&str>,
    ) -> Result<ContainerPage>;

    // ========================================================================
    // Containers
    // ========================================================================

    /// Read container counters, metadata and ACLs (`NotFound` when absent)
    async fn head_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
    ) -> Result<ContainerInfo>;

    /// Create a container with the given metadata and ACLs
    async fn put_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        info: &ContainerInfo,
    ) -> Result<()>;

    /// Apply a metadata update to an existing container
    async fn post_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        update: &MetadataUpdate,
    ) -> Result<()>;

    /// Delete an empty container
    async fn delete_container(&self, endpoint: &StorageEndpoint, container: &str) -> Result<()>;

    /// One page of the container's object listing, starting after `marker`
    async fn list_objects(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        marker: Option<&str>,
    ) -> Result<ObjectPage>;

    // ========================================================================
    // Objects
    // ========================================================================

    /// Fetch object headers; the body streams from the returned value
    async fn get_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> Result<StoredObject>;

    /// Create or overwrite an object, consuming its body
    async fn put_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
        data: StoredObject,
    ) -> Result<()>;

    /// Delete an object (`NotFound` when absent)
    async fn delete_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> Result<()>;
}

/// Identity-service lookups: tenant enumeration and endpoint resolution.
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    /// Every tenant to replicate
    async fn list_tenants(&self) -> Result<Vec<Tenant>>;

    /// Account URL and token for `tenant` on `side` (`Auth` error when no
    /// credentials can be issued)
    async fn endpoint(&self, tenant: &Tenant, side: ClusterSide) -> Result<StorageEndpoint>;
}
