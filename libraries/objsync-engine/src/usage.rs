//! Cluster usage totals.

use futures_util::stream::{self, StreamExt};
use objsync_core::{AccountInfo, ClusterSide, EndpointResolver, Result, StorageClient, Tenant};
use serde::Serialize;
use tracing::{info, warn};

/// Container, object and byte counts summed over every tenant of one side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub side: ClusterSide,
    /// Tenants whose account was read
    pub tenants: usize,
    /// Tenants whose account could not be read
    pub failed_tenants: usize,
    pub containers: u64,
    pub objects: u64,
    pub bytes: u64,
}

impl UsageReport {
    fn new(side: ClusterSide) -> Self {
        Self {
            side,
            tenants: 0,
            failed_tenants: 0,
            containers: 0,
            objects: 0,
            bytes: 0,
        }
    }

    fn add(&mut self, account: &AccountInfo) {
        self.tenants += 1;
        self.containers += account.container_count;
        self.objects += account.object_count;
        self.bytes += account.bytes_used;
    }
}

/// HEAD every tenant account on `side` and sum the counters.
///
/// A tenant that cannot be read is counted in `failed_tenants`; only a
/// failure to list tenants is an error.
pub async fn collect_usage(
    resolver: &dyn EndpointResolver,
    storage: &dyn StorageClient,
    side: ClusterSide,
    concurrency: usize,
) -> Result<UsageReport> {
    let tenants = resolver.list_tenants().await?;

    let accounts: Vec<(Tenant, Result<AccountInfo>)> = stream::iter(tenants)
        .map(|tenant| async move {
            let result = match resolver.endpoint(&tenant, side).await {
                Ok(endpoint) => storage.head_account(&endpoint).await,
                Err(e) => Err(e),
            };
            (tenant, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = UsageReport::new(side);
    for (tenant, result) in accounts {
        match result {
            Ok(account) => report.add(&account),
            Err(e) => {
                warn!(tenant = %tenant.id, side = %side, error = %e, "Cannot read account usage");
                report.failed_tenants += 1;
            }
        }
    }

    info!(
        side = %side,
        tenants = report.tenants,
        failed = report.failed_tenants,
        containers = report.containers,
        objects = report.objects,
        bytes = report.bytes,
        "Usage collected"
    );
    Ok(report)
}
