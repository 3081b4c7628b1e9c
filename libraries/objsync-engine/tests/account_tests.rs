//! Whole-run replication across tenants.

mod common;

use async_trait::async_trait;
use common::{destination, origin, FakeCluster, FakeResolver, Op};
use mockall::mock;
use mockall::predicate::*;
use objsync_core::{
    ClusterSide, EndpointResolver, ErrorKind, ItemRef, Result, StorageEndpoint, SyncError,
    Tenant,
};
use objsync_engine::{AccountSynchronizer, MemoryStateStore, SyncConfig};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Resolver {}

    #[async_trait]
    impl EndpointResolver for Resolver {
        async fn list_tenants(&self) -> Result<Vec<Tenant>>;
        async fn endpoint(&self, tenant: &Tenant, side: ClusterSide) -> Result<StorageEndpoint>;
    }
}

fn synchronizer(
    resolver: Arc<dyn EndpointResolver>,
    cluster: Arc<FakeCluster>,
    config: SyncConfig,
) -> AccountSynchronizer {
    AccountSynchronizer::new(resolver, cluster, Arc::new(MemoryStateStore::new()), config)
}

fn seed_two_tenants(cluster: &FakeCluster) {
    for name in ["a1", "a2", "a3", "a4", "a5"] {
        cluster.add_object(&origin("t1"), "alpha", name, name);
    }
    cluster.add_container(&origin("t1"), "beta");
    cluster.add_container(&origin("t1"), "gamma");
    cluster.add_object(&origin("t2"), "delta", "d1", "d1");

    cluster.add_object(&destination("t1"), "alpha", "a1", "a1");
    cluster.add_object(&destination("t1"), "alpha", "a2", "stale");
    cluster.add_object(&destination("t1"), "alpha", "gone", "g");
    cluster.add_object(&destination("t1"), "orphan", "o1", "o1");
}

fn assert_converged(cluster: &FakeCluster, tenant_id: &str) {
    let origin = origin(tenant_id);
    let destination = destination(tenant_id);
    assert_eq!(
        cluster.container_names(&destination),
        cluster.container_names(&origin),
        "containers of {tenant_id}"
    );
    for container in cluster.container_names(&origin) {
        assert_eq!(
            cluster.objects(&destination, &container),
            cluster.objects(&origin, &container),
            "objects of {tenant_id}/{container}"
        );
    }
}

// =============================================================================
// Convergence
// =============================================================================

mod convergence {
    use super::*;

    #[tokio::test]
    async fn test_run_converges_every_tenant() {
        let cluster = Arc::new(FakeCluster::new());
        seed_two_tenants(&cluster);
        let resolver = Arc::new(FakeResolver::new(&["t1", "t2"]));

        let report = synchronizer(resolver, cluster.clone(), SyncConfig::default())
            .process()
            .await
            .unwrap();

        assert!(!report.has_failures(), "failures: {:?}", report.failures);
        assert_converged(&cluster, "t1");
        assert_converged(&cluster, "t2");
        assert!(cluster.writes_to(ClusterSide::Origin).is_empty());

        let t1 = &report.tenants["t1"];
        assert_eq!(t1.name, "name-t1");
        assert_eq!(t1.deleted, 3); // gone, o1, orphan
        assert!(t1.created >= 5); // a3, a4, a5, beta, gamma
        assert_eq!(report.tenants["t2"].created, 2);
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let cluster = Arc::new(FakeCluster::new());
        seed_two_tenants(&cluster);
        let resolver: Arc<dyn EndpointResolver> = Arc::new(FakeResolver::new(&["t1", "t2"]));
        let synchronizer = synchronizer(resolver, cluster.clone(), SyncConfig::default());

        synchronizer.process().await.unwrap();
        cluster.reset_calls();
        let second = synchronizer.process().await.unwrap();

        assert!(cluster.writes().is_empty(), "writes: {:?}", cluster.writes());
        assert_eq!(second.totals().mutations(), 0);
        assert!(!second.has_failures());
    }

    #[tokio::test]
    async fn test_account_metadata_is_replicated() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.set_account_meta(&origin("t1"), "quota", "10G");
        cluster.set_account_meta(&destination("t1"), "legacy", "yes");
        let resolver = Arc::new(FakeResolver::new(&["t1"]));

        synchronizer(resolver, cluster.clone(), SyncConfig::default())
            .process()
            .await
            .unwrap();

        let account = cluster.account(&destination("t1"));
        assert_eq!(account.metadata.get("quota").map(String::as_str), Some("10G"));
        assert!(!account.metadata.contains_key("legacy"));
        assert_eq!(cluster.calls_of(Op::PostAccount).len(), 1);
    }

    #[tokio::test]
    async fn test_tenant_without_containers_is_reported() {
        let cluster = Arc::new(FakeCluster::new());
        let resolver = Arc::new(FakeResolver::new(&["empty"]));

        let report = synchronizer(resolver, cluster.clone(), SyncConfig::default())
            .process()
            .await
            .unwrap();

        assert_eq!(report.tenants["empty"].mutations(), 0);
        assert!(cluster.writes().is_empty());
    }
}

// =============================================================================
// Failure isolation
// =============================================================================

mod isolation {
    use super::*;

    #[tokio::test]
    async fn test_denied_tenant_does_not_stop_others() {
        let cluster = Arc::new(FakeCluster::new());
        seed_two_tenants(&cluster);
        let resolver = Arc::new(FakeResolver::new(&["t1", "t2"]));
        resolver.deny("t2", ClusterSide::Destination);

        let report = synchronizer(resolver, cluster.clone(), SyncConfig::default())
            .process()
            .await
            .unwrap();

        assert_converged(&cluster, "t1");
        assert!(cluster.container_names(&destination("t2")).is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].tenant, "t2");
        assert_eq!(report.failures[0].item, ItemRef::Tenant);
        assert_eq!(report.failures[0].kind, ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_destination_listing_failure_skips_orphan_pass() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.add_object(&origin("t1"), "keep", "k", "k");
        cluster.add_object(&destination("t1"), "orphan", "o", "o");
        cluster.fail(Op::ListContainers, ClusterSide::Destination, "", ErrorKind::Transport);
        let resolver = Arc::new(FakeResolver::new(&["t1"]));

        let report = synchronizer(resolver, cluster.clone(), SyncConfig::default())
            .process()
            .await
            .unwrap();

        assert_eq!(cluster.objects(&destination("t1"), "keep").len(), 1);
        assert!(cluster.container(&destination("t1"), "orphan").is_some());
        assert!(cluster.calls_of(Op::DeleteContainer).is_empty());
        assert!(report
            .failures
            .iter()
            .any(|f| f.item == ItemRef::Account && f.kind == ErrorKind::Listing));
    }

    #[tokio::test]
    async fn test_origin_account_listing_failure_fails_tenant() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.add_object(&origin("t1"), "keep", "k", "k");
        cluster.fail(Op::ListContainers, ClusterSide::Origin, "", ErrorKind::Auth);
        let resolver = Arc::new(FakeResolver::new(&["t1"]));

        let report = synchronizer(resolver, cluster.clone(), SyncConfig::default())
            .process()
            .await
            .unwrap();

        assert!(cluster.writes().is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, ItemRef::Tenant);
        assert_eq!(report.failures[0].kind, ErrorKind::Listing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out_as_transport_failure() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.add_object(&origin("t1"), "cont1", "fast", "f");
        cluster.add_object(&origin("t1"), "cont1", "slow", "s");
        cluster.delay(Op::GetObject, Some("cont1/slow"), Duration::from_secs(3600));
        let resolver = Arc::new(FakeResolver::new(&["t1"]));
        let config = SyncConfig::default()
            .with_request_timeout(Duration::from_secs(5))
            .with_transfer_timeout(Duration::from_secs(60));

        let report = synchronizer(resolver, cluster.clone(), config)
            .process()
            .await
            .unwrap();

        let object_failure = report
            .failures
            .iter()
            .find(|f| f.item == ItemRef::object("cont1", "slow"))
            .expect("slow object should fail");
        assert_eq!(object_failure.kind, ErrorKind::Transport);
        assert!(object_failure.reason.contains("timed out"));

        let names: Vec<String> = cluster
            .objects(&destination("t1"), "cont1")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["fast"]);
    }

    struct PanickingResolver {
        inner: FakeResolver,
    }

    #[async_trait]
    impl EndpointResolver for PanickingResolver {
        async fn list_tenants(&self) -> Result<Vec<Tenant>> {
            self.inner.list_tenants().await
        }

        async fn endpoint(&self, tenant: &Tenant, side: ClusterSide) -> Result<StorageEndpoint> {
            if tenant.id == "boom" {
                panic!("resolver bug");
            }
            self.inner.endpoint(tenant, side).await
        }
    }

    #[tokio::test]
    async fn test_panicking_tenant_is_reported_as_internal_failure() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.add_object(&origin("t1"), "cont1", "a", "a");
        let resolver = Arc::new(PanickingResolver {
            inner: FakeResolver::new(&["boom", "t1"]),
        });

        let report = synchronizer(resolver, cluster.clone(), SyncConfig::default())
            .process()
            .await
            .unwrap();

        assert_converged(&cluster, "t1");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].tenant, "boom");
        assert_eq!(report.failures[0].kind, ErrorKind::Internal);
    }
}

// =============================================================================
// Resolver interaction
// =============================================================================

mod resolver {
    use super::*;

    #[tokio::test]
    async fn test_tenant_listing_failure_ends_run() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_list_tenants()
            .times(1)
            .returning(|| Err(SyncError::auth("admin token rejected")));
        resolver.expect_endpoint().never();
        let cluster = Arc::new(FakeCluster::new());

        let result = synchronizer(Arc::new(resolver), cluster.clone(), SyncConfig::default())
            .process()
            .await;

        assert!(matches!(result, Err(SyncError::Auth(_))));
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_each_side_resolved_once_per_tenant() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_list_tenants()
            .times(1)
            .returning(|| Ok(vec![Tenant::new("t1", "foo1")]));
        resolver
            .expect_endpoint()
            .with(always(), eq(ClusterSide::Origin))
            .times(1)
            .returning(|tenant, _| Ok(origin(&tenant.id)));
        resolver
            .expect_endpoint()
            .with(always(), eq(ClusterSide::Destination))
            .times(1)
            .returning(|tenant, _| Ok(destination(&tenant.id)));

        let cluster = Arc::new(FakeCluster::new());
        cluster.add_object(&origin("t1"), "cont1", "a", "a");

        let report = synchronizer(Arc::new(resolver), cluster.clone(), SyncConfig::default())
            .process()
            .await
            .unwrap();

        assert_eq!(report.tenants["t1"].name, "foo1");
        assert_converged(&cluster, "t1");
    }
}

// =============================================================================
// Concurrency bounds
// =============================================================================

mod bounds {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_storage_calls_never_exceed_bound() {
        let cluster = Arc::new(FakeCluster::new());
        let ids = ["t1", "t2", "t3", "t4"];
        for id in ids {
            for c in 0..3 {
                for o in 0..4 {
                    let body = format!("{id}-{c}-{o}");
                    cluster.add_object(&origin(id), &format!("c{c}"), &format!("o{o}"), &body);
                }
            }
        }
        for op in [Op::GetObject, Op::PutObject, Op::ListObjects, Op::HeadContainer] {
            cluster.delay(op, None, Duration::from_millis(20));
        }
        let resolver = Arc::new(FakeResolver::new(&ids));
        let config = SyncConfig::default()
            .with_tenant_concurrency(4)
            .with_storage_concurrency(3);

        let report = synchronizer(resolver, cluster.clone(), config)
            .process()
            .await
            .unwrap();

        assert!(!report.has_failures());
        assert!(cluster.peak_in_flight() <= 3, "peak {}", cluster.peak_in_flight());
        assert!(cluster.peak_in_flight() >= 2);
        for id in ids {
            assert_converged(&cluster, id);
        }
    }
}
