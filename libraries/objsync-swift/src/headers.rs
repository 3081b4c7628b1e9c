//! Header and URL helpers shared by the sub-clients.

use crate::error::{ClientError, Result};
use objsync_core::{Metadata, MetadataUpdate};
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response};
use url::Url;

pub(crate) const AUTH_TOKEN: &str = "X-Auth-Token";

/// Collect `<prefix><key>` headers into a metadata map keyed by lowercase `key`.
pub(crate) fn metadata_from_headers(headers: &HeaderMap, prefix: &str) -> Metadata {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(prefix)?;
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            Some((key.to_string(), value))
        })
        .collect()
}

pub(crate) fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
    header_str(headers, name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

pub(crate) fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Etags come back quoted from some proxies.
pub(crate) fn header_etag(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "etag").map(|v| v.trim_matches('"').to_string())
}

/// Add `X-<kind>-Meta-*` headers for every entry of `metadata`.
pub(crate) fn with_metadata(
    mut request: RequestBuilder,
    kind: &str,
    metadata: &Metadata,
) -> RequestBuilder {
    for (key, value) in metadata {
        request = request.header(format!("X-{kind}-Meta-{key}"), value.as_str());
    }
    request
}

/// Add set and remove headers for a metadata update.
pub(crate) fn with_metadata_update(
    request: RequestBuilder,
    kind: &str,
    update: &MetadataUpdate,
) -> RequestBuilder {
    let mut request = with_metadata(request, kind, &update.set);
    for key in &update.remove {
        request = request.header(format!("X-Remove-{kind}-Meta-{key}"), "x");
    }
    if let Some(acl) = &update.read_acl {
        request = request.header("X-Container-Read", acl.as_str());
    }
    if let Some(acl) = &update.write_acl {
        request = request.header("X-Container-Write", acl.as_str());
    }
    request
}

/// Append path segments to an account URL, percent-encoding each one.
pub(crate) fn item_url(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url =
        Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidUrl(format!("{base_url}: cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// JSON listing URL starting after `marker`.
pub(crate) fn listing_url(base_url: &str, segments: &[&str], marker: Option<&str>) -> Result<Url> {
    let mut url = item_url(base_url, segments)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("format", "json");
        if let Some(marker) = marker {
            query.append_pair("marker", marker);
        }
    }
    Ok(url)
}

/// Pass successful responses through, turn the rest into `ServerError`.
pub(crate) async fn expect_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(ClientError::ServerError {
            status: status.as_u16(),
            message,
        })
    }
}
