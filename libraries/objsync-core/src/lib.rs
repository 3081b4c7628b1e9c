//! objsync Core
//!
//! Cluster-agnostic types, traits, and error handling shared by the objsync
//! storage client, the reconciliation engine and the command line tool.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Tenant`, `StorageEndpoint`, `ContainerRecord`, `ObjectRecord`, `SyncOutcome`
//! - **Core Traits**: `StorageClient` (per-cluster REST operations), `EndpointResolver` (identity lookup)
//! - **Error Handling**: Unified `SyncError` taxonomy and `Result` type
//!
//! # Example
//!
//! ```rust
//! use objsync_core::types::{ClusterSide, StorageEndpoint, Tenant};
//!
//! let tenant = Tenant::new("0f1e2d", "acme");
//! let origin = StorageEndpoint::new(
//!     ClusterSide::Origin,
//!     "http://origin:8080/v1/AUTH_0f1e2d",
//!     "token",
//! );
//! assert!(origin.side.is_origin());
//! assert_eq!(tenant.name, "acme");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, Result, SyncError};
pub use traits::{EndpointResolver, StorageClient};

pub use types::{
    // Identity
    ClusterSide, StorageEndpoint, Tenant, TenantSession,
    // Listings and payloads
    AccountInfo, ContainerInfo, ContainerPage, ContainerRecord, ObjectPage, ObjectRecord,
    ByteStream, ObjectBody, StoredObject,
    // Metadata
    Metadata, MetadataUpdate,
    // Outcomes
    ItemRef, SyncOutcome,
};
