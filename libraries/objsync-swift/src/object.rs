//! Object operations.

use crate::error::Result;
use crate::headers::{
    expect_success, header_etag, header_str, item_url, metadata_from_headers, with_metadata,
    AUTH_TOKEN,
};
use futures_util::StreamExt;
use objsync_core::{ObjectBody, StorageEndpoint, StoredObject, SyncError};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use std::time::Duration;
use tracing::debug;

/// Object client bound to one endpoint, container and object.
///
/// GET and PUT run under the transfer timeout so a large body is not cut off
/// by the per-call deadline.
pub struct ObjectClient<'a> {
    http: &'a Client,
    endpoint: &'a StorageEndpoint,
    container: &'a str,
    object: &'a str,
    transfer_timeout: Duration,
}

impl<'a> ObjectClient<'a> {
    pub(crate) fn new(
        http: &'a Client,
        endpoint: &'a StorageEndpoint,
        container: &'a str,
        object: &'a str,
        transfer_timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoint,
            container,
            object,
            transfer_timeout,
        }
    }

    /// Read the object headers; the body streams from the returned value.
    pub async fn get(&self) -> Result<StoredObject> {
        let url = item_url(&self.endpoint.base_url, &[self.container, self.object])?;
        debug!(url = %url, side = %self.endpoint.side, "GET object");

        let response = self
            .http
            .get(url)
            .timeout(self.transfer_timeout)
            .header(AUTH_TOKEN, &self.endpoint.token)
            .send()
            .await?;
        let response = expect_success(response).await?;

        let headers = response.headers();
        let content_type = header_str(headers, CONTENT_TYPE.as_str());
        let etag = header_etag(headers);
        let metadata = metadata_from_headers(headers, "x-object-meta-");
        let content_length = response.content_length();

        let name = format!("{}/{}", self.container, self.object);
        let chunks = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| SyncError::transport(format!("Object {name}: body transfer: {e}")))
        });

        Ok(StoredObject {
            content_type,
            etag,
            metadata,
            ..StoredObject::streaming(chunks, content_length)
        })
    }

    /// Upload (create or overwrite) the object, consuming its body.
    ///
    /// The etag is sent along so the cluster rejects a corrupted body.
    pub async fn put(&self, data: StoredObject) -> Result<()> {
        let url = item_url(&self.endpoint.base_url, &[self.container, self.object])?;
        debug!(url = %url, bytes = ?data.content_length, "PUT object");

        let mut request = self
            .http
            .put(url)
            .timeout(self.transfer_timeout)
            .header(AUTH_TOKEN, &self.endpoint.token);
        if let Some(content_type) = &data.content_type {
            request = request.header(CONTENT_TYPE, content_type.as_str());
        }
        if let Some(etag) = &data.etag {
            request = request.header("ETag", etag.as_str());
        }
        request = with_metadata(request, "Object", &data.metadata);

        request = match data.body {
            ObjectBody::Full(bytes) => request.body(bytes),
            ObjectBody::Streaming(stream) => {
                if let Some(length) = data.content_length {
                    request = request.header(CONTENT_LENGTH, length);
                }
                request.body(Body::wrap_stream(stream))
            }
        };

        let response = request.send().await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Delete the object.
    pub async fn delete(&self) -> Result<()> {
        let url = item_url(&self.endpoint.base_url, &[self.container, self.object])?;
        debug!(url = %url, "DELETE object");

        let response = self
            .http
            .delete(url)
            .header(AUTH_TOKEN, &self.endpoint.token)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }
}
