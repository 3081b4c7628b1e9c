//! Container operations.

use crate::error::{ClientError, Result};
use crate::headers::{
    expect_success, header_str, header_u64, item_url, listing_url, metadata_from_headers,
    with_metadata, with_metadata_update, AUTH_TOKEN,
};
use crate::types::ObjectListingEntry;
use chrono::{DateTime, NaiveDateTime, Utc};
use objsync_core::{ContainerInfo, MetadataUpdate, ObjectPage, ObjectRecord, StorageEndpoint};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Container client bound to one endpoint and container.
pub struct ContainerClient<'a> {
    http: &'a Client,
    endpoint: &'a StorageEndpoint,
    container: &'a str,
}

impl<'a> ContainerClient<'a> {
    pub(crate) fn new(http: &'a Client, endpoint: &'a StorageEndpoint, container: &'a str) -> Self {
        Self {
            http,
            endpoint,
            container,
        }
    }

    /// Read container counters, metadata and ACLs.
    pub async fn head(&self) -> Result<ContainerInfo> {
        let url = item_url(&self.endpoint.base_url, &[self.container])?;
        debug!(url = %url, side = %self.endpoint.side, "HEAD container");

        let response = self
            .http
            .head(url)
            .header(AUTH_TOKEN, &self.endpoint.token)
            .send()
            .await?;
        let response = expect_success(response).await?;

        Ok(container_info(response.headers()))
    }

    /// Create the container with the metadata and ACLs of `info`.
    pub async fn put(&self, info: &ContainerInfo) -> Result<()> {
        let url = item_url(&self.endpoint.base_url, &[self.container])?;
        debug!(url = %url, metadata = info.metadata.len(), "PUT container");

        let mut request = self.http.put(url).header(AUTH_TOKEN, &self.endpoint.token);
        request = with_metadata(request, "Container", &info.metadata);
        if let Some(acl) = &info.read_acl {
            request = request.header("X-Container-Read", acl.as_str());
        }
        if let Some(acl) = &info.write_acl {
            request = request.header("X-Container-Write", acl.as_str());
        }

        let response = request.send().await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Apply a metadata update.
    pub async fn post(&self, update: &MetadataUpdate) -> Result<()> {
        let url = item_url(&self.endpoint.base_url, &[self.container])?;
        debug!(url = %url, "POST container metadata");

        let request = self.http.post(url).header(AUTH_TOKEN, &self.endpoint.token);
        let response = with_metadata_update(request, "Container", update)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Delete the container. Swift refuses with 409 while objects remain.
    pub async fn delete(&self) -> Result<()> {
        let url = item_url(&self.endpoint.base_url, &[self.container])?;
        debug!(url = %url, "DELETE container");

        let response = self
            .http
            .delete(url)
            .header(AUTH_TOKEN, &self.endpoint.token)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// One page of the object listing.
    pub async fn list_objects(&self, marker: Option<&str>) -> Result<ObjectPage> {
        let url = listing_url(&self.endpoint.base_url, &[self.container], marker)?;
        debug!(url = %url, "Listing objects");

        let response = self
            .http
            .get(url)
            .header(AUTH_TOKEN, &self.endpoint.token)
            .send()
            .await?;
        let response = expect_success(response).await?;

        let container = container_info(response.headers());
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(ObjectPage {
                container,
                objects: Vec::new(),
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(ObjectPage {
                container,
                objects: Vec::new(),
            });
        }

        let entries: Vec<ObjectListingEntry> = serde_json::from_slice(&body).map_err(|e| {
            ClientError::ParseError(format!("Failed to parse object listing: {}", e))
        })?;

        let objects = entries
            .into_iter()
            .map(|entry| ObjectRecord {
                last_modified: entry.last_modified.as_deref().and_then(parse_listing_time),
                name: entry.name,
                bytes: entry.bytes,
                etag: entry.hash,
                content_type: entry.content_type,
            })
            .collect();

        Ok(ObjectPage { container, objects })
    }
}

fn container_info(headers: &HeaderMap) -> ContainerInfo {
    ContainerInfo {
        object_count: header_u64(headers, "x-container-object-count"),
        bytes_used: header_u64(headers, "x-container-bytes-used"),
        metadata: metadata_from_headers(headers, "x-container-meta-"),
        read_acl: header_str(headers, "x-container-read"),
        write_acl: header_str(headers, "x-container-write"),
    }
}

/// Listing timestamps carry no offset and are UTC.
fn parse_listing_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
