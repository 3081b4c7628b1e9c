//! Object types

use super::Metadata;
use crate::error::Result;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// One row of a container's object listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    pub bytes: u64,
    /// Content fingerprint (MD5 etag), when the cluster reports one
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
}

impl ObjectRecord {
    pub fn new(name: impl Into<String>, bytes: u64, etag: Option<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            etag,
            last_modified: None,
            content_type: None,
        }
    }
}

/// Boxed stream of body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + Sync>>;

/// Object content, either held in memory or still arriving from the origin.
///
/// A streamed body is read once: it moves from the GET response into the
/// PUT request chunk by chunk.
pub enum ObjectBody {
    Full(Bytes),
    Streaming(ByteStream),
}

impl ObjectBody {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + Sync + 'static,
    {
        Self::Streaming(Box::pin(stream))
    }

    pub fn into_stream(self) -> ByteStream {
        match self {
            Self::Full(bytes) => Box::pin(stream::iter(std::iter::once(Ok(bytes)))),
            Self::Streaming(stream) => stream,
        }
    }

    /// Read the whole body into memory
    pub async fn collect(self) -> Result<Bytes> {
        match self {
            Self::Full(bytes) => Ok(bytes),
            Self::Streaming(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                Ok(buffer.freeze())
            }
        }
    }
}

impl Default for ObjectBody {
    fn default() -> Self {
        Self::Full(Bytes::new())
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

impl From<Bytes> for ObjectBody {
    fn from(bytes: Bytes) -> Self {
        Self::Full(bytes)
    }
}

/// Object body and the headers replicated with it
#[derive(Debug, Default)]
pub struct StoredObject {
    pub body: ObjectBody,
    /// Body length announced by the origin, when known
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub metadata: Metadata,
}

impl StoredObject {
    /// In-memory object of `content`
    pub fn new(content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            content_length: Some(content.len() as u64),
            body: ObjectBody::Full(content),
            ..Self::default()
        }
    }

    /// Object whose body is read from `stream`
    pub fn streaming<S>(stream: S, content_length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + Sync + 'static,
    {
        Self {
            body: ObjectBody::from_stream(stream),
            content_length,
            ..Self::default()
        }
    }
}

/// One page of a container listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub container: super::ContainerInfo,
    pub objects: Vec<ObjectRecord>,
}

impl ObjectPage {
    /// Marker for the next page, `None` when this page is empty
    pub fn next_marker(&self) -> Option<&str> {
        self.objects.last().map(|o| o.name.as_str())
    }
}
