//! Container reconciliation and orphan container removal.

use crate::change_signal::ChangeSignal;
use crate::config::SyncConfig;
use crate::diff::{container_delta, creation_info, diff_objects};
use crate::listing::list_all_objects;
use crate::objects::ObjectSynchronizer;
use crate::report::OutcomeLog;
use crate::state::SyncStateStore;
use futures_util::stream::{self, StreamExt};
use objsync_core::{ItemRef, Result, StorageClient, SyncOutcome, TenantSession};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectAction {
    Create,
    Update,
    Delete,
}

impl ObjectAction {
    fn outcome(self) -> SyncOutcome {
        match self {
            Self::Create => SyncOutcome::Created,
            Self::Update => SyncOutcome::Updated,
            Self::Delete => SyncOutcome::Deleted,
        }
    }
}

/// Reconciles containers of one tenant.
///
/// `storage` is used as given: pass a shared
/// [`GuardedStorage`](crate::GuardedStorage) to bound and time-limit calls.
pub struct ContainerSynchronizer {
    storage: Arc<dyn StorageClient>,
    objects: ObjectSynchronizer,
    state: Arc<dyn SyncStateStore>,
    signal: ChangeSignal,
    concurrency: usize,
}

impl ContainerSynchronizer {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        state: Arc<dyn SyncStateStore>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            objects: ObjectSynchronizer::new(Arc::clone(&storage)),
            storage,
            state,
            signal: ChangeSignal::new(&config.change_signal_key),
            concurrency: config.storage_concurrency.max(1),
        }
    }

    /// Bring `container` on the destination in line with the origin.
    ///
    /// A container whose change signal is not newer than its sync mark is
    /// skipped without listing, provided it still exists on the destination.
    /// The container outcome is recorded in `log` alongside one outcome per
    /// object visited, and returned.
    pub async fn sync(
        &self,
        session: &TenantSession,
        container: &str,
        log: &OutcomeLog,
    ) -> SyncOutcome {
        let outcome = match self.reconcile(session, container, log).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    tenant = %session.tenant.id,
                    container,
                    error = %e,
                    "Container sync failed"
                );
                SyncOutcome::failed(&e)
            }
        };

        debug!(tenant = %session.tenant.id, container, outcome = ?outcome, "Container done");
        log.record(&session.tenant, ItemRef::container(container), outcome.clone())
            .await;
        outcome
    }

    async fn reconcile(
        &self,
        session: &TenantSession,
        container: &str,
        log: &OutcomeLog,
    ) -> Result<SyncOutcome> {
        let tenant = &session.tenant;

        let origin_info = self
            .storage
            .head_container(&session.origin, container)
            .await?;

        let observed = self.signal.read(&origin_info.metadata);
        if let Some(signal) = observed {
            let mark = match self.state.last_synced(&tenant.id, container).await {
                Ok(mark) => mark,
                Err(e) => {
                    warn!(tenant = %tenant.id, container, error = %e, "Cannot read sync mark");
                    None
                }
            };
            if ChangeSignal::is_unchanged(signal, mark) {
                match self
                    .storage
                    .head_container(&session.destination, container)
                    .await
                {
                    Ok(_) => {
                        debug!(tenant = %tenant.id, container, signal, "Unchanged since last sync");
                        return Ok(SyncOutcome::Skipped);
                    }
                    Err(e) if e.is_not_found() => {
                        info!(tenant = %tenant.id, container, "Destination container missing");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let origin_objects =
            list_all_objects(self.storage.as_ref(), &session.origin, container).await?;

        let ignored = [self.signal.metadata_key()];
        let mut created = false;
        let mut updated = false;
        match self
            .storage
            .head_container(&session.destination, container)
            .await
        {
            Ok(destination_info) => {
                let update = container_delta(&origin_info, &destination_info, &ignored);
                if !update.is_empty() {
                    self.storage
                        .post_container(&session.destination, container, &update)
                        .await?;
                    debug!(tenant = %tenant.id, container, "Container metadata updated");
                    updated = true;
                }
            }
            Err(e) if e.is_not_found() => {
                let info = creation_info(&origin_info, &ignored);
                if let Err(e) = self
                    .storage
                    .put_container(&session.destination, container, &info)
                    .await
                {
                    error!(tenant = %tenant.id, container, error = %e, "Cannot create destination container");
                    return Err(e);
                }
                info!(tenant = %tenant.id, container, "Destination container created");
                created = true;
            }
            Err(e) => return Err(e),
        }

        // A container created above is known to be empty.
        let destination_objects = if created {
            Vec::new()
        } else {
            list_all_objects(self.storage.as_ref(), &session.destination, container).await?
        };

        let diff = diff_objects(origin_objects, destination_objects);
        debug!(
            tenant = %tenant.id,
            container,
            create = diff.create.len(),
            update = diff.update.len(),
            delete = diff.delete.len(),
            unchanged = diff.unchanged.len(),
            "Computed object diff"
        );

        for record in &diff.unchanged {
            log.record(tenant, ItemRef::object(container, &record.name), SyncOutcome::Skipped)
                .await;
        }

        let actions: Vec<(ObjectAction, String)> = diff
            .create
            .into_iter()
            .map(|r| (ObjectAction::Create, r.name))
            .chain(diff.update.into_iter().map(|r| (ObjectAction::Update, r.name)))
            .chain(diff.delete.into_iter().map(|r| (ObjectAction::Delete, r.name)))
            .collect();

        let outcomes = self.apply_all(session, container, actions, log).await;
        if let Some(failure) = aggregate_failure(&outcomes) {
            return Ok(failure);
        }

        if let Some(signal) = observed {
            if let Err(e) = self.state.record_synced(&tenant.id, container, signal).await {
                warn!(tenant = %tenant.id, container, error = %e, "Cannot record sync mark");
            }
        }

        let mutated = outcomes.iter().any(SyncOutcome::is_mutation);
        Ok(if created {
            SyncOutcome::Created
        } else if updated || mutated {
            SyncOutcome::Updated
        } else {
            SyncOutcome::Skipped
        })
    }

    /// Delete every destination container absent from the origin, objects
    /// first. Returns the number of containers removed.
    pub async fn delete_orphan_containers(
        &self,
        session: &TenantSession,
        origin_names: &BTreeSet<String>,
        destination_names: &BTreeSet<String>,
        log: &OutcomeLog,
    ) -> usize {
        let orphans: Vec<String> = destination_names
            .difference(origin_names)
            .cloned()
            .collect();
        if orphans.is_empty() {
            return 0;
        }
        info!(tenant = %session.tenant.id, count = orphans.len(), "Deleting orphan containers");

        let outcomes: Vec<SyncOutcome> = stream::iter(orphans)
            .map(|container| async move {
                let outcome = match self.remove_orphan(session, &container, log).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(
                            tenant = %session.tenant.id,
                            container = %container,
                            error = %e,
                            "Orphan container left in place"
                        );
                        SyncOutcome::failed(&e)
                    }
                };
                log.record(&session.tenant, ItemRef::container(&container), outcome.clone())
                    .await;
                outcome
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SyncOutcome::Deleted))
            .count()
    }

    async fn remove_orphan(
        &self,
        session: &TenantSession,
        container: &str,
        log: &OutcomeLog,
    ) -> Result<SyncOutcome> {
        let objects =
            list_all_objects(self.storage.as_ref(), &session.destination, container).await?;

        let actions = objects
            .into_iter()
            .map(|r| (ObjectAction::Delete, r.name))
            .collect();
        let outcomes = self.apply_all(session, container, actions, log).await;
        if let Some(failure) = aggregate_failure(&outcomes) {
            return Ok(failure);
        }

        match self
            .storage
            .delete_container(&session.destination, container)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        if let Err(e) = self.state.forget(&session.tenant.id, container).await {
            warn!(tenant = %session.tenant.id, container, error = %e, "Cannot drop sync mark");
        }
        info!(tenant = %session.tenant.id, container, "Orphan container deleted");
        Ok(SyncOutcome::Deleted)
    }

    async fn apply_all(
        &self,
        session: &TenantSession,
        container: &str,
        actions: Vec<(ObjectAction, String)>,
        log: &OutcomeLog,
    ) -> Vec<SyncOutcome> {
        stream::iter(actions)
            .map(|(action, object)| async move {
                self.apply(session, container, action, &object, log).await
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn apply(
        &self,
        session: &TenantSession,
        container: &str,
        action: ObjectAction,
        object: &str,
        log: &OutcomeLog,
    ) -> SyncOutcome {
        let result = match action {
            ObjectAction::Create | ObjectAction::Update => {
                self.objects
                    .sync_object(&session.origin, &session.destination, container, object)
                    .await
            }
            ObjectAction::Delete => {
                self.objects
                    .delete_object(&session.destination, container, object)
                    .await
            }
        };

        let outcome = match result {
            Ok(()) => action.outcome(),
            Err(e) => {
                warn!(
                    tenant = %session.tenant.id,
                    container,
                    object,
                    action = ?action,
                    error = %e,
                    "Object sync failed"
                );
                SyncOutcome::failed(&e)
            }
        };

        log.record(&session.tenant, ItemRef::object(container, object), outcome.clone())
            .await;
        outcome
    }
}

/// Container-level failure summarising failed object operations.
fn aggregate_failure(outcomes: &[SyncOutcome]) -> Option<SyncOutcome> {
    let mut kinds = outcomes.iter().filter_map(|outcome| match outcome {
        SyncOutcome::Failed { kind, .. } => Some(*kind),
        _ => None,
    });
    let kind = kinds.next()?;
    let failed = 1 + kinds.count();

    Some(SyncOutcome::Failed {
        kind,
        reason: format!(
            "{failed} of {} object operations failed",
            outcomes.len()
        ),
    })
}
