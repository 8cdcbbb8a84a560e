//! Cluster lifecycle tests: registration, ordered start/stop, bootstrap

use minicluster::store::HakeeperState;
use minicluster::{
    ClusterCoordinator, DnStore, Error, Lifecycle, LogStore, MockDnStore, MockLogStore, StoreKind,
    Topology,
};
use std::collections::HashSet;
use std::sync::Arc;

fn dn_handles(stores: &[Arc<MockDnStore>]) -> Vec<Arc<dyn DnStore>> {
    stores.iter().map(|s| s.clone() as Arc<dyn DnStore>).collect()
}

fn log_handles(stores: &[Arc<MockLogStore>]) -> Vec<Arc<dyn LogStore>> {
    stores.iter().map(|s| s.clone() as Arc<dyn LogStore>).collect()
}

#[test]
fn scenario_a_three_dn_one_leader() {
    let dn: Vec<_> = (0..3).map(|_| Arc::new(MockDnStore::new())).collect();
    let log = vec![Arc::new(MockLogStore::with_id("log-1").leader(7))];

    let cluster =
        ClusterCoordinator::new(dn_handles(&dn), log_handles(&log), Topology::default()).unwrap();
    cluster.start().unwrap();
    assert!(cluster.is_running());

    let ids = cluster.list_dn_stores();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids, dn.iter().map(|s| s.id()).collect::<HashSet<_>>());
    assert_eq!(cluster.get_log_store("log-1").unwrap().id(), "log-1");

    let leader = &log[0];
    assert_eq!(leader.bootstrap_calls(), 1);
    assert_eq!(leader.hakeeper_state(), HakeeperState::Running);
    assert_eq!(cluster.cluster_state().unwrap().term, 7);
    assert!(dn.iter().all(|s| s.is_running()));
}

#[test]
fn scenario_b_duplicate_dn_identity() {
    let cluster = ClusterCoordinator::new(vec![], vec![], Topology::default()).unwrap();

    cluster
        .register_dn_store(Arc::new(MockDnStore::with_id("dn-1")))
        .unwrap();
    let err = cluster
        .register_dn_store(Arc::new(MockDnStore::with_id("dn-1")))
        .unwrap_err();

    assert_eq!(
        err,
        Error::DuplicateStore {
            kind: StoreKind::Dn,
            id: "dn-1".into()
        }
    );
    assert_eq!(cluster.list_dn_stores(), HashSet::from(["dn-1".to_string()]));
}

#[test]
fn scenario_c_no_leader() {
    let dn = Arc::new(MockDnStore::with_id("dn-1"));
    let log = Arc::new(MockLogStore::with_id("log-1"));

    let cluster =
        ClusterCoordinator::new(vec![dn.clone()], vec![log.clone()], Topology::default()).unwrap();

    assert_eq!(cluster.start(), Err(Error::NoLeaderHakeeper));
    assert!(!cluster.is_running());
    assert_eq!(log.bootstrap_calls(), 0);

    // Registries survive the failed bootstrap
    assert_eq!(cluster.get_dn_store("dn-1").unwrap().id(), "dn-1");
    assert_eq!(cluster.list_log_stores().len(), 1);
}

#[test]
fn scenario_d_partial_stop_then_retry() {
    let dn = Arc::new(MockDnStore::with_id("dn-1"));
    let log = Arc::new(MockLogStore::with_id("log-1").leader(1));
    let cluster =
        ClusterCoordinator::new(vec![dn.clone()], vec![log.clone()], Topology::default()).unwrap();
    cluster.start().unwrap();

    dn.fail_next_stop("dn-1 refuses to stop");
    assert_eq!(
        cluster.stop(),
        Err(Error::Store("dn-1 refuses to stop".into()))
    );
    // Still considered running; log stores were never reached
    assert!(cluster.is_running());
    assert!(log.is_running());
    assert_eq!(log.stop_calls(), 0);

    cluster.stop().unwrap();
    assert!(!cluster.is_running());
    assert!(!dn.is_running());
    assert!(!log.is_running());
    assert_eq!(dn.stop_calls(), 2);
}

#[test]
fn start_twice_is_noop() {
    let dn = Arc::new(MockDnStore::new());
    let log = Arc::new(MockLogStore::new().leader(2));
    let cluster =
        ClusterCoordinator::new(vec![dn.clone()], vec![log.clone()], Topology::default()).unwrap();

    cluster.start().unwrap();
    cluster.start().unwrap();

    assert_eq!(dn.start_calls(), 1);
    assert_eq!(log.start_calls(), 1);
    assert_eq!(log.bootstrap_calls(), 1);
    assert_eq!(log.info_sets(), 1);
}

#[test]
fn stop_before_start_is_noop() {
    let dn = Arc::new(MockDnStore::new());
    let log = Arc::new(MockLogStore::new().leader(1));
    let cluster =
        ClusterCoordinator::new(vec![dn.clone()], vec![log.clone()], Topology::default()).unwrap();

    cluster.stop().unwrap();
    assert_eq!(dn.stop_calls(), 0);
    assert_eq!(log.stop_calls(), 0);
}

#[test]
fn restart_does_not_rebootstrap() {
    let dn = Arc::new(MockDnStore::new());
    let log = Arc::new(MockLogStore::new().leader(3));
    let cluster =
        ClusterCoordinator::new(vec![dn.clone()], vec![log.clone()], Topology::default()).unwrap();

    cluster.start().unwrap();
    cluster.restart().unwrap();

    assert!(cluster.is_running());
    assert_eq!(dn.start_calls(), 2);
    assert_eq!(dn.stop_calls(), 1);
    assert_eq!(log.bootstrap_calls(), 1);
    assert_eq!(log.hakeeper_state(), HakeeperState::Running);
}

#[test]
fn bootstrap_picks_the_single_leader() {
    let log: Vec<_> = vec![
        Arc::new(MockLogStore::with_id("log-1")),
        Arc::new(MockLogStore::with_id("log-2").leader(9)),
        Arc::new(MockLogStore::with_id("log-3")),
    ];
    let cluster = ClusterCoordinator::new(vec![], log_handles(&log), Topology::new(3, 2, 3)).unwrap();
    cluster.start().unwrap();

    assert_eq!(log[0].bootstrap_calls(), 0);
    assert_eq!(log[1].bootstrap_calls(), 1);
    assert_eq!(log[2].bootstrap_calls(), 0);

    let info = log[1].cluster_info().unwrap();
    assert_eq!(info.log_shards.len(), 3);
    assert_eq!(info.dn_shards.len(), 2);
    assert!(info.log_shards.iter().all(|s| s.replicas == 3));
}

#[test]
fn failed_dn_start_leaves_earlier_stores_started() {
    let dn: Vec<_> = (0..3).map(|i| Arc::new(MockDnStore::with_id(format!("dn-{}", i)))).collect();
    let log = Arc::new(MockLogStore::new().leader(1));
    let cluster =
        ClusterCoordinator::new(dn_handles(&dn), vec![log.clone()], Topology::default()).unwrap();

    // Iteration order is unspecified, so fail all three and count
    for store in &dn {
        store.fail_next_start("no disk");
    }
    assert_eq!(cluster.start(), Err(Error::Store("no disk".into())));
    assert!(!cluster.is_running());
    assert_eq!(dn.iter().map(|s| s.start_calls()).sum::<usize>(), 1);
    assert_eq!(log.start_calls(), 0);
    assert_eq!(log.bootstrap_calls(), 0);

    // Each call consumes exactly one of the remaining faults
    assert!(cluster.start().is_err());
    assert!(cluster.start().is_err());
    cluster.start().unwrap();
    assert!(cluster.is_running());
    assert_eq!(log.bootstrap_calls(), 1);
}

#[test]
fn failed_log_start_skips_bootstrap() {
    let dn = Arc::new(MockDnStore::new());
    let log = Arc::new(MockLogStore::new().leader(1));
    let cluster =
        ClusterCoordinator::new(vec![dn.clone()], vec![log.clone()], Topology::default()).unwrap();

    log.fail_next_start("raft dir locked");
    assert!(cluster.start().is_err());
    // DN store was started and is not rolled back
    assert!(dn.is_running());
    assert_eq!(log.bootstrap_calls(), 0);

    cluster.start().unwrap();
    assert_eq!(log.bootstrap_calls(), 1);
}

#[test]
fn bootstrap_failure_is_sticky() {
    let log = Arc::new(MockLogStore::new());
    let cluster = ClusterCoordinator::new(vec![], vec![log.clone()], Topology::default()).unwrap();

    assert_eq!(cluster.start(), Err(Error::NoLeaderHakeeper));

    // A leader appears, but bootstrap already ran once
    log.set_leader(true, 5);
    assert_eq!(cluster.start(), Err(Error::NoLeaderHakeeper));
    assert_eq!(log.info_sets(), 0);
    assert!(!cluster.is_running());
}

#[test]
fn out_of_band_bootstrap_rejected() {
    let log = Arc::new(MockLogStore::new().leader(1));
    let cluster = ClusterCoordinator::new(vec![], vec![log.clone()], Topology::default()).unwrap();

    // Leader bootstrapped behind the coordinator's back
    log.start().unwrap();
    log.set_initial_cluster_info(1, 1, 3).unwrap();
    let state = log.get_cluster_state().unwrap();
    log.bootstrap(1, &state);
    assert_eq!(log.hakeeper_state(), HakeeperState::Running);

    // set_initial_cluster_info now rejects, which is surfaced
    assert!(matches!(cluster.start(), Err(Error::InvalidState(_))));
    assert!(!cluster.is_running());
}

/// Log store whose leadership moves on between the leader query and
/// `bootstrap`, so the inner store rejects the stale term.
struct TermBumpingStore {
    inner: MockLogStore,
}

impl Lifecycle for TermBumpingStore {
    fn start(&self) -> minicluster::Result<()> {
        self.inner.start()
    }

    fn stop(&self) -> minicluster::Result<()> {
        self.inner.stop()
    }

    fn id(&self) -> minicluster::StoreId {
        self.inner.id()
    }
}

impl LogStore for TermBumpingStore {
    fn is_leader_hakeeper(&self) -> minicluster::Result<(bool, u64)> {
        self.inner.is_leader_hakeeper()
    }

    fn get_cluster_state(&self) -> minicluster::Result<minicluster::store::ClusterState> {
        self.inner.get_cluster_state()
    }

    fn set_initial_cluster_info(
        &self,
        log_shards: u64,
        dn_shards: u64,
        log_replicas: u64,
    ) -> minicluster::Result<()> {
        self.inner
            .set_initial_cluster_info(log_shards, dn_shards, log_replicas)
    }

    fn bootstrap(&self, term: u64, state: &minicluster::store::ClusterState) {
        self.inner.set_leader(true, term + 1);
        self.inner.bootstrap(term, state);
    }
}

#[test]
fn bootstrap_internal_failure_not_surfaced() {
    let store = Arc::new(TermBumpingStore {
        inner: MockLogStore::new().leader(4),
    });
    let cluster = ClusterCoordinator::new(vec![], vec![store.clone()], Topology::default()).unwrap();

    // The coordinator has no way to see the failed bootstrap
    cluster.start().unwrap();
    assert!(cluster.is_running());
    assert_eq!(store.inner.hakeeper_state(), HakeeperState::BootstrapFailed);
    assert!(store.inner.last_bootstrap_error().is_some());
}

#[test]
fn late_registration_is_not_started() {
    let log = Arc::new(MockLogStore::new().leader(1));
    let cluster = ClusterCoordinator::new(vec![], vec![log.clone()], Topology::default()).unwrap();
    cluster.start().unwrap();

    let late = Arc::new(MockDnStore::with_id("dn-late"));
    cluster.register_dn_store(late.clone()).unwrap();
    assert!(cluster.get_dn_store("dn-late").is_ok());
    assert!(!late.is_running());
    assert_eq!(late.start_calls(), 0);

    // Picked up on the next cycle
    cluster.restart().unwrap();
    assert!(late.is_running());
}

#[test]
fn batch_registration_is_not_transactional() {
    let cluster = ClusterCoordinator::new(
        vec![Arc::new(MockDnStore::with_id("dn-2"))],
        vec![],
        Topology::default(),
    )
    .unwrap();

    let batch: Vec<Arc<dyn DnStore>> = vec![
        Arc::new(MockDnStore::with_id("dn-1")),
        Arc::new(MockDnStore::with_id("dn-2")),
        Arc::new(MockDnStore::with_id("dn-3")),
    ];
    assert!(matches!(
        cluster.register_dn_stores(batch),
        Err(Error::DuplicateStore { .. })
    ));
    assert_eq!(
        cluster.list_dn_stores(),
        HashSet::from(["dn-1".to_string(), "dn-2".to_string()])
    );
}

#[test]
fn lookup_missing_store() {
    let cluster = ClusterCoordinator::new(vec![], vec![], Topology::default()).unwrap();
    assert_eq!(
        cluster.get_dn_store("ghost").err(),
        Some(Error::StoreNotFound {
            kind: StoreKind::Dn,
            id: "ghost".into()
        })
    );
    assert!(matches!(
        cluster.get_log_store("ghost"),
        Err(Error::StoreNotFound {
            kind: StoreKind::Log,
            ..
        })
    ));
}
