//! Main Swift storage client.

use crate::account::AccountClient;
use crate::container::ContainerClient;
use crate::error::{ClientError, Result};
use crate::object::ObjectClient;
use crate::types::SwiftConfig;
use async_trait::async_trait;
use objsync_core::{
    AccountInfo, ContainerInfo, ContainerPage, MetadataUpdate, ObjectPage, StorageClient,
    StorageEndpoint, StoredObject,
};
use reqwest::Client;
use std::time::Duration;

/// Client for Swift-compatible storage clusters.
///
/// One instance serves every tenant and both cluster sides: each call is
/// addressed to the endpoint it receives, and no credentials are stored.
///
/// # Example
///
/// ```ignore
/// use objsync_swift::{SwiftClient, SwiftConfig};
///
/// let client = SwiftClient::new(SwiftConfig::default())?;
/// let page = client.account(&endpoint).list_containers(None).await?;
/// println!("{} containers on first page", page.containers.len());
/// ```
#[derive(Clone)]
pub struct SwiftClient {
    http: Client,
    transfer_timeout: Duration,
}

impl SwiftClient {
    /// Create a new client with the given configuration.
    pub fn new(config: SwiftConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            http,
            transfer_timeout: config.transfer_timeout,
        })
    }

    /// Account operations on `endpoint`.
    pub fn account<'a>(&'a self, endpoint: &'a StorageEndpoint) -> AccountClient<'a> {
        AccountClient::new(&self.http, endpoint)
    }

    /// Container operations on `endpoint`.
    pub fn container<'a>(
        &'a self,
        endpoint: &'a StorageEndpoint,
        container: &'a str,
    ) -> ContainerClient<'a> {
        ContainerClient::new(&self.http, endpoint, container)
    }

    /// Object operations on `endpoint`.
    pub fn object<'a>(
        &'a self,
        endpoint: &'a StorageEndpoint,
        container: &'a str,
        object: &'a str,
    ) -> ObjectClient<'a> {
        ObjectClient::new(&self.http, endpoint, container, object, self.transfer_timeout)
    }
}

fn object_name(container: &str, object: &str) -> String {
    format!("{container}/{object}")
}

#[async_trait]
impl StorageClient for SwiftClient {
    async fn head_account(&self, endpoint: &StorageEndpoint) -> objsync_core::Result<AccountInfo> {
        self.account(endpoint)
            .head()
            .await
            .map_err(|e| e.into_sync_error("Account", &endpoint.base_url))
    }

    async fn post_account(
        &self,
        endpoint: &StorageEndpoint,
        update: &MetadataUpdate,
    ) -> objsync_core::Result<()> {
        self.account(endpoint)
            .post(update)
            .await
            .map_err(|e| e.into_sync_error("Account", &endpoint.base_url))
    }

    async fn list_containers(
        &self,
        endpoint: &StorageEndpoint,
        marker: Option<&str>,
    ) -> objsync_core::Result<ContainerPage> {
        self.account(endpoint)
            .list_containers(marker)
            .await
            .map_err(|e| e.into_sync_error("Account", &endpoint.base_url))
    }

    async fn head_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
    ) -> objsync_core::Result<ContainerInfo> {
        self.container(endpoint, container)
            .head()
            .await
            .map_err(|e| e.into_sync_error("Container", container))
    }

    async fn put_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        info: &ContainerInfo,
    ) -> objsync_core::Result<()> {
        self.container(endpoint, container)
            .put(info)
            .await
            .map_err(|e| e.into_sync_error("Container", container))
    }

    async fn post_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        update: &MetadataUpdate,
    ) -> objsync_core::Result<()> {
        self.container(endpoint, container)
            .post(update)
            .await
            .map_err(|e| e.into_sync_error("Container", container))
    }

    async fn delete_container(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
    ) -> objsync_core::Result<()> {
        self.container(endpoint, container)
            .delete()
            .await
            .map_err(|e| e.into_sync_error("Container", container))
    }

    async fn list_objects(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        marker: Option<&str>,
    ) -> objsync_core::Result<ObjectPage> {
        self.container(endpoint, container)
            .list_objects(marker)
            .await
            .map_err(|e| e.into_sync_error("Container", container))
    }

    async fn get_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> objsync_core::Result<StoredObject> {
        self.object(endpoint, container, object)
            .get()
            .await
            .map_err(|e| e.into_sync_error("Object", &object_name(container, object)))
    }

    async fn put_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
        data: StoredObject,
    ) -> objsync_core::Result<()> {
        self.object(endpoint, container, object)
            .put(data)
            .await
            .map_err(|e| e.into_sync_error("Object", &object_name(container, object)))
    }

    async fn delete_object(
        &self,
        endpoint: &StorageEndpoint,
        container: &str,
        object: &str,
    ) -> objsync_core::Result<()> {
        self.object(endpoint, container, object)
            .delete()
            .await
            .map_err(|e| e.into_sync_error("Object", &object_name(container, object)))
    }
}
