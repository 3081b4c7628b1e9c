//! Outcome collection and the per-run report.

use chrono::{DateTime, Utc};
use objsync_core::{ErrorKind, ItemRef, SyncOutcome, Tenant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Outcome counts for one tenant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSummary {
    pub name: String,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TenantSummary {
    fn count(&mut self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Deleted => self.deleted += 1,
            SyncOutcome::Skipped => self.skipped += 1,
            SyncOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Number of outcomes that wrote to the destination
    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn total(&self) -> usize {
        self.mutations() + self.skipped + self.failed
    }

    fn absorb(&mut self, other: &TenantSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// One failed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub tenant: String,
    pub item: ItemRef,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Default)]
struct LogState {
    tenants: BTreeMap<String, TenantSummary>,
    failures: Vec<FailureRecord>,
}

/// Sink shared by every task of a run.
///
/// Outcomes are counted per tenant; only failures are kept, in arrival order.
#[derive(Debug, Default)]
pub struct OutcomeLog {
    state: Mutex<LogState>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `tenant` appear in the report even if it records nothing.
    pub async fn register(&self, tenant: &Tenant) {
        let mut state = self.state.lock().await;
        state
            .tenants
            .entry(tenant.id.clone())
            .or_insert_with(|| TenantSummary {
                name: tenant.name.clone(),
                ..TenantSummary::default()
            });
    }

    pub async fn record(&self, tenant: &Tenant, item: ItemRef, outcome: SyncOutcome) {
        let mut state = self.state.lock().await;
        state
            .tenants
            .entry(tenant.id.clone())
            .or_insert_with(|| TenantSummary {
                name: tenant.name.clone(),
                ..TenantSummary::default()
            })
            .count(&outcome);

        if let SyncOutcome::Failed { kind, reason } = &outcome {
            warn!(tenant = %tenant.id, item = %item, kind = ?kind, reason = %reason, "Sync failure");
            state.failures.push(FailureRecord {
                tenant: tenant.id.clone(),
                item,
                kind: *kind,
                reason: reason.clone(),
            });
        }
    }

    pub async fn summary(&self, tenant_id: &str) -> Option<TenantSummary> {
        self.state.lock().await.tenants.get(tenant_id).cloned()
    }

    pub async fn failures(&self) -> Vec<FailureRecord> {
        self.state.lock().await.failures.clone()
    }

    /// Snapshot the log into a report finished now.
    pub async fn report(&self, run_id: Uuid, started_at: DateTime<Utc>) -> SyncReport {
        let state = self.state.lock().await;
        SyncReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            tenants: state.tenants.clone(),
            failures: state.failures.clone(),
        }
    }
}

/// Aggregate result of one replication run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Keyed by tenant id
    pub tenants: BTreeMap<String, TenantSummary>,
    pub failures: Vec<FailureRecord>,
}

impl SyncReport {
    /// Counts summed over every tenant
    pub fn totals(&self) -> TenantSummary {
        let mut totals = TenantSummary {
            name: "all".to_string(),
            ..TenantSummary::default()
        };
        for summary in self.tenants.values() {
            totals.absorb(summary);
        }
        totals
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
