//! Run driver: tenant enumeration, per-tenant replication, aggregation.

use crate::config::SyncConfig;
use crate::containers::ContainerSynchronizer;
use crate::diff::metadata_delta;
use crate::guard::GuardedStorage;
use crate::listing::list_all_containers;
use crate::report::{OutcomeLog, SyncReport};
use crate::state::SyncStateStore;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use objsync_core::{
    ClusterSide, EndpointResolver, ItemRef, Result, StorageClient, SyncError, SyncOutcome,
    Tenant, TenantSession,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Replicates every tenant known to the resolver.
///
/// All storage calls of a run go through one [`GuardedStorage`], so
/// `storage_concurrency` bounds the calls in flight across every tenant.
/// Failures are recorded and the run continues; only a failure to list the
/// tenants ends it early.
///
/// # Example
///
/// ```ignore
/// let synchronizer = AccountSynchronizer::new(resolver, client, state, SyncConfig::default());
/// let report = synchronizer.process().await?;
/// println!("{} failures", report.failures.len());
/// ```
pub struct AccountSynchronizer {
    worker: TenantWorker,
    tenant_concurrency: usize,
}

#[derive(Clone)]
struct TenantWorker {
    resolver: Arc<dyn EndpointResolver>,
    storage: Arc<dyn StorageClient>,
    containers: Arc<ContainerSynchronizer>,
    concurrency: usize,
}

impl AccountSynchronizer {
    pub fn new(
        resolver: Arc<dyn EndpointResolver>,
        storage: Arc<dyn StorageClient>,
        state: Arc<dyn SyncStateStore>,
        config: SyncConfig,
    ) -> Self {
        let storage: Arc<dyn StorageClient> = Arc::new(
            GuardedStorage::new(storage, config.storage_concurrency, config.request_timeout)
                .with_transfer_timeout(config.transfer_timeout),
        );
        let containers = Arc::new(ContainerSynchronizer::new(
            Arc::clone(&storage),
            state,
            &config,
        ));

        Self {
            worker: TenantWorker {
                resolver,
                storage,
                containers,
                concurrency: config.storage_concurrency.max(1),
            },
            tenant_concurrency: config.tenant_concurrency.max(1),
        }
    }

    /// Run one full pass over every tenant.
    pub async fn process(&self) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let tenants = self.worker.resolver.list_tenants().await?;
        info!(run_id = %run_id, tenants = tenants.len(), "Starting replication run");

        let log = Arc::new(OutcomeLog::new());
        let permits = Arc::new(Semaphore::new(self.tenant_concurrency));
        let mut tasks = JoinSet::new();

        for tenant in tenants {
            log.register(&tenant).await;

            let worker = self.worker.clone();
            let log = Arc::clone(&log);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;

                // Inner task so a panic is attributed to its tenant.
                let handle = tokio::spawn({
                    let tenant = tenant.clone();
                    let log = Arc::clone(&log);
                    async move { worker.run(&tenant, &log).await }
                });

                if let Err(e) = handle.await {
                    error!(tenant = %tenant.id, error = %e, "Tenant task aborted");
                    let error = SyncError::internal(format!("tenant task aborted: {e}"));
                    log.record(&tenant, ItemRef::Tenant, SyncOutcome::failed(&error))
                        .await;
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Tenant supervisor task failed");
            }
        }

        let report = log.report(run_id, started_at).await;
        let totals = report.totals();
        info!(
            run_id = %run_id,
            created = totals.created,
            updated = totals.updated,
            deleted = totals.deleted,
            skipped = totals.skipped,
            failed = totals.failed,
            elapsed_ms = report.duration().num_milliseconds(),
            "Replication run complete"
        );

        Ok(report)
    }
}

impl TenantWorker {
    async fn run(&self, tenant: &Tenant, log: &OutcomeLog) {
        info!(tenant = %tenant, "Replicating tenant");

        let session = match self.open_session(tenant).await {
            Ok(session) => session,
            Err(e) => {
                warn!(tenant = %tenant.id, error = %e, "Cannot resolve tenant endpoints");
                log.record(tenant, ItemRef::Tenant, SyncOutcome::failed(&e))
                    .await;
                return;
            }
        };

        let origin_names: BTreeSet<String> =
            match list_all_containers(self.storage.as_ref(), &session.origin).await {
                Ok(containers) => containers.into_iter().map(|c| c.name).collect(),
                Err(e) => {
                    warn!(tenant = %tenant.id, error = %e, "Cannot list origin account");
                    log.record(tenant, ItemRef::Tenant, SyncOutcome::failed(&e))
                        .await;
                    return;
                }
            };

        let destination_names: Option<BTreeSet<String>> =
            match list_all_containers(self.storage.as_ref(), &session.destination).await {
                Ok(containers) => Some(containers.into_iter().map(|c| c.name).collect()),
                Err(e) => {
                    warn!(tenant = %tenant.id, error = %e, "Cannot list destination account, orphan pass skipped");
                    log.record(tenant, ItemRef::Account, SyncOutcome::failed(&e))
                        .await;
                    None
                }
            };

        let account_outcome = match self.sync_account_metadata(&session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(tenant = %tenant.id, error = %e, "Account metadata not replicated");
                SyncOutcome::failed(&e)
            }
        };
        log.record(tenant, ItemRef::Account, account_outcome).await;

        let session = &session;
        let containers = &self.containers;
        stream::iter(origin_names.iter().cloned())
            .map(|container| async move { containers.sync(session, &container, log).await })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        if let Some(destination_names) = destination_names {
            self.containers
                .delete_orphan_containers(session, &origin_names, &destination_names, log)
                .await;
        }

        if let Some(summary) = log.summary(&tenant.id).await {
            info!(
                tenant = %tenant.id,
                created = summary.created,
                updated = summary.updated,
                deleted = summary.deleted,
                skipped = summary.skipped,
                failed = summary.failed,
                "Tenant replicated"
            );
        }
    }

    async fn open_session(&self, tenant: &Tenant) -> Result<TenantSession> {
        let origin = self.resolver.endpoint(tenant, ClusterSide::Origin).await?;
        let destination = self
            .resolver
            .endpoint(tenant, ClusterSide::Destination)
            .await?;
        debug!(tenant = %tenant.id, origin = %origin.base_url, destination = %destination.base_url, "Endpoints resolved");
        Ok(TenantSession::new(tenant.clone(), origin, destination))
    }

    async fn sync_account_metadata(&self, session: &TenantSession) -> Result<SyncOutcome> {
        let origin = self.storage.head_account(&session.origin).await?;
        let destination = self.storage.head_account(&session.destination).await?;

        let update = metadata_delta(&origin.metadata, &destination.metadata, &[]);
        if update.is_empty() {
            return Ok(SyncOutcome::Skipped);
        }

        self.storage
            .post_account(&session.destination, &update)
            .await?;
        debug!(
            tenant = %session.tenant.id,
            set = update.set.len(),
            removed = update.remove.len(),
            "Account metadata updated"
        );
        Ok(SyncOutcome::Updated)
    }
}
