//! objsync Engine
//!
//! Reconciles a destination storage cluster against an origin cluster,
//! tenant by tenant.
//!
//! # Architecture
//!
//! - **AccountSynchronizer**: enumerates tenants and replicates them under a
//!   bounded tenant pool, aggregating every outcome into a [`SyncReport`]
//! - **ContainerSynchronizer**: creates, updates and skips containers, and
//!   removes destination-only containers
//! - **ObjectSynchronizer**: copies and deletes single objects
//! - **GuardedStorage**: run-wide bound on in-flight storage calls, per-call
//!   timeout, origin write protection
//! - **SyncStateStore**: per-container sync marks used with the origin
//!   change signal to skip unchanged containers
//!
//! Work flows down from accounts to objects; outcomes flow up into the
//! shared [`OutcomeLog`]. A failure never cancels sibling work.

mod accounts;
mod change_signal;
mod config;
mod containers;
mod guard;
mod objects;
mod report;
mod state;
mod usage;

pub mod diff;
pub mod listing;

// Public exports
pub use accounts::AccountSynchronizer;
pub use change_signal::ChangeSignal;
pub use config::{
    SyncConfig, DEFAULT_CHANGE_SIGNAL_KEY, DEFAULT_REQUEST_TIMEOUT, DEFAULT_STORAGE_CONCURRENCY,
    DEFAULT_TENANT_CONCURRENCY, DEFAULT_TRANSFER_TIMEOUT,
};
pub use containers::ContainerSynchronizer;
pub use diff::{diff_objects, metadata_delta, ObjectDiff};
pub use guard::GuardedStorage;
pub use listing::{list_all_containers, list_all_objects};
pub use objects::ObjectSynchronizer;
pub use report::{FailureRecord, OutcomeLog, SyncReport, TenantSummary};
pub use state::{MemoryStateStore, SqliteStateStore, SyncStateStore};
pub use usage::{collect_usage, UsageReport};
