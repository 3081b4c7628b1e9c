//! Domain types shared across objsync crates

mod container;
mod metadata;
mod object;
mod outcome;
mod tenant;

pub use container::{AccountInfo, ContainerInfo, ContainerPage, ContainerRecord};
pub use metadata::{Metadata, MetadataUpdate};
pub use object::{ByteStream, ObjectBody, ObjectPage, ObjectRecord, StoredObject};
pub use outcome::{ItemRef, SyncOutcome};
pub use tenant::{ClusterSide, StorageEndpoint, Tenant, TenantSession};
