//! Account operations.

use crate::error::{ClientError, Result};
use crate::headers::{
    expect_success, header_u64, item_url, listing_url, metadata_from_headers,
    with_metadata_update, AUTH_TOKEN,
};
use crate::types::ContainerListingEntry;
use objsync_core::{AccountInfo, ContainerPage, ContainerRecord, MetadataUpdate, StorageEndpoint};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Account client bound to one endpoint.
pub struct AccountClient<'a> {
    http: &'a Client,
    endpoint: &'a StorageEndpoint,
}

impl<'a> AccountClient<'a> {
    pub(crate) fn new(http: &'a Client, endpoint: &'a StorageEndpoint) -> Self {
        Self { http, endpoint }
    }

    /// Read account counters and metadata.
    pub async fn head(&self) -> Result<AccountInfo> {
        let url = item_url(&self.endpoint.base_url, &[])?;
        debug!(url = %url, side = %self.endpoint.side, "HEAD account");

        let response = self
            .http
            .head(url)
            .header(AUTH_TOKEN, &self.endpoint.token)
            .send()
            .await?;
        let response = expect_success(response).await?;

        Ok(account_info(response.headers()))
    }

    /// Apply a metadata update.
    pub async fn post(&self, update: &MetadataUpdate) -> Result<()> {
        let url = item_url(&self.endpoint.base_url, &[])?;
        debug!(
            url = %url,
            set = update.set.len(),
            remove = update.remove.len(),
            "POST account metadata"
        );

        let request = self.http.post(url).header(AUTH_TOKEN, &self.endpoint.token);
        let response = with_metadata_update(request, "Account", update).send().await?;
        expect_success(response).await?;

        Ok(())
    }

    /// One page of the container listing.
    pub async fn list_containers(&self, marker: Option<&str>) -> Result<ContainerPage> {
        let url = listing_url(&self.endpoint.base_url, &[], marker)?;
        debug!(url = %url, "Listing containers");

        let response = self
            .http
            .get(url)
            .header(AUTH_TOKEN, &self.endpoint.token)
            .send()
            .await?;
        let response = expect_success(response).await?;

        let account = account_info(response.headers());
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(ContainerPage {
                account,
                containers: Vec::new(),
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(ContainerPage {
                account,
                containers: Vec::new(),
            });
        }

        let entries: Vec<ContainerListingEntry> = serde_json::from_slice(&body).map_err(|e| {
            ClientError::ParseError(format!("Failed to parse container listing: {}", e))
        })?;

        let containers = entries
            .into_iter()
            .map(|entry| ContainerRecord {
                name: entry.name,
                object_count: entry.count,
                bytes_used: entry.bytes,
            })
            .collect();

        Ok(ContainerPage {
            account,
            containers,
        })
    }
}

fn account_info(headers: &HeaderMap) -> AccountInfo {
    AccountInfo {
        container_count: header_u64(headers, "x-account-container-count"),
        object_count: header_u64(headers, "x-account-object-count"),
        bytes_used: header_u64(headers, "x-account-bytes-used"),
        metadata: metadata_from_headers(headers, "x-account-meta-"),
    }
}
