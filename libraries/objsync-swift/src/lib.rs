//! objsync Swift client
//!
//! HTTP adapters for the two external boundaries of the reconciliation
//! engine: the Swift-style storage REST API and the identity service.
//!
//! # Features
//!
//! - **Storage**: `SwiftClient` implements [`objsync_core::StorageClient`]
//!   (account, container and object calls, marker-based listings)
//! - **Identity**: `KeystoneResolver` (Keystone v2.0 admin credentials) and
//!   `StaticResolver` (tenants and tokens from configuration) implement
//!   [`objsync_core::EndpointResolver`]
//!
//! # Example
//!
//! ```ignore
//! use objsync_core::{ClusterSide, StorageClient, StorageEndpoint};
//! use objsync_swift::{SwiftClient, SwiftConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SwiftClient::new(SwiftConfig::default())?;
//!     let endpoint = StorageEndpoint::new(
//!         ClusterSide::Origin,
//!         "http://proxy:8080/v1/AUTH_0f1e2d",
//!         "AUTH_tk...",
//!     );
//!
//!     let account = client.head_account(&endpoint).await?;
//!     println!("{} containers", account.container_count);
//!     Ok(())
//! }
//! ```

mod account;
mod client;
mod container;
mod error;
mod headers;
mod identity;
mod object;
mod types;

// Re-export main types
pub use client::SwiftClient;
pub use error::{ClientError, Result};
pub use identity::{
    KeystoneCredentials, KeystoneResolver, KeystoneSide, StaticResolver, StaticSide,
};
pub use types::{SwiftConfig, DEFAULT_TRANSFER_TIMEOUT};

// Re-export sub-clients for direct use if needed
pub use account::AccountClient;
pub use container::ContainerClient;
pub use object::ObjectClient;
