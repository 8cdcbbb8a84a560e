//! In-memory mock stores for testing.
//!
//! Both mocks count every call made through the store contracts and can be
//! told to fail the next call of a given operation, which is how tests
//! exercise partial start/stop and bootstrap failures.
//!
//! `MockLogStore` embeds a tiny hakeeper: a leader flag, a term and the
//! bootstrap state machine `Created -> Running | BootstrapFailed`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rand::Rng;

use super::state::{ClusterInfo, ClusterState, HakeeperState};
use super::{DnStore, Lifecycle, LogStore, StoreId};
use crate::common::{generate_store_id, lock, Error, Options, Result};

/// One-shot injected failure
#[derive(Debug, Default)]
struct Fault {
    pending: Mutex<Option<String>>,
}

impl Fault {
    fn arm(&self, message: impl Into<String>) {
        *lock(&self.pending) = Some(message.into());
    }

    fn check(&self) -> Result<()> {
        match lock(&self.pending).take() {
            Some(message) => Err(Error::Store(message)),
            None => Ok(()),
        }
    }
}

/// Start/stop bookkeeping shared by both mocks
#[derive(Debug)]
struct MockLifecycle {
    id: StoreId,
    running: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    start_fault: Fault,
    stop_fault: Fault,
}

impl MockLifecycle {
    fn new(id: StoreId) -> Self {
        Self {
            id,
            running: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            start_fault: Fault::default(),
            stop_fault: Fault::default(),
        }
    }

    fn start(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.start_fault.check()?;
        self.running.store(true, Ordering::SeqCst);
        tracing::debug!("Mock store {} started", self.id);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop_fault.check()?;
        self.running.store(false, Ordering::SeqCst);
        tracing::debug!("Mock store {} stopped", self.id);
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Store(format!("store {} is not running", self.id)))
        }
    }
}

/// Mock data-node store
#[derive(Debug)]
pub struct MockDnStore {
    lifecycle: MockLifecycle,
}

impl Default for MockDnStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDnStore {
    /// Mock DN store with a random id
    pub fn new() -> Self {
        Self::with_id(generate_store_id())
    }

    pub fn with_id(id: impl Into<StoreId>) -> Self {
        Self {
            lifecycle: MockLifecycle::new(id.into()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.running.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.lifecycle.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.lifecycle.stop_calls.load(Ordering::SeqCst)
    }

    /// Make the next `start` fail
    pub fn fail_next_start(&self, message: impl Into<String>) {
        self.lifecycle.start_fault.arm(message);
    }

    /// Make the next `stop` fail
    pub fn fail_next_stop(&self, message: impl Into<String>) {
        self.lifecycle.stop_fault.arm(message);
    }
}

impl Lifecycle for MockDnStore {
    fn start(&self) -> Result<()> {
        self.lifecycle.start()
    }

    fn stop(&self) -> Result<()> {
        self.lifecycle.stop()
    }

    fn id(&self) -> StoreId {
        self.lifecycle.id.clone()
    }
}

impl DnStore for MockDnStore {}

/// Hakeeper state held by a mock log store
#[derive(Debug)]
struct Hakeeper {
    is_leader: bool,
    term: u64,
    state: HakeeperState,
    cluster_info: Option<ClusterInfo>,
    last_bootstrap_error: Option<String>,
}

impl Hakeeper {
    fn ensure_leader(&self, id: &str) -> Result<()> {
        if self.is_leader {
            Ok(())
        } else {
            Err(Error::NotLeader(id.to_string()))
        }
    }

    fn apply_bootstrap(&mut self, id: &str, term: u64, state: &ClusterState) -> Result<()> {
        self.ensure_leader(id)?;
        if term != self.term {
            return Err(Error::InvalidState(format!(
                "bootstrap term {} does not match current term {}",
                term, self.term
            )));
        }
        if self.state != HakeeperState::Created {
            return Err(Error::InvalidState(format!(
                "cannot bootstrap from state {}",
                self.state
            )));
        }
        let info = state.cluster_info.clone().ok_or_else(|| {
            Error::InvalidState("initial cluster info not set".to_string())
        })?;

        self.cluster_info = Some(info);
        self.state = HakeeperState::Running;
        Ok(())
    }
}

/// Mock log-service store
#[derive(Debug)]
pub struct MockLogStore {
    lifecycle: MockLifecycle,
    hakeeper: Mutex<Hakeeper>,
    leader_queries: AtomicUsize,
    info_sets: AtomicUsize,
    state_gets: AtomicUsize,
    bootstrap_calls: AtomicUsize,
    leader_fault: Fault,
    info_fault: Fault,
    state_fault: Fault,
}

impl Default for MockLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLogStore {
    /// Follower mock log store with a random id
    pub fn new() -> Self {
        Self::with_id(generate_store_id())
    }

    pub fn with_id(id: impl Into<StoreId>) -> Self {
        Self {
            lifecycle: MockLifecycle::new(id.into()),
            hakeeper: Mutex::new(Hakeeper {
                is_leader: false,
                term: 0,
                state: HakeeperState::Created,
                cluster_info: None,
                last_bootstrap_error: None,
            }),
            leader_queries: AtomicUsize::new(0),
            info_sets: AtomicUsize::new(0),
            state_gets: AtomicUsize::new(0),
            bootstrap_calls: AtomicUsize::new(0),
            leader_fault: Fault::default(),
            info_fault: Fault::default(),
            state_fault: Fault::default(),
        }
    }

    /// Make this store the hakeeper leader at `term`
    pub fn leader(self, term: u64) -> Self {
        self.set_leader(true, term);
        self
    }

    pub fn set_leader(&self, is_leader: bool, term: u64) {
        let mut hk = lock(&self.hakeeper);
        hk.is_leader = is_leader;
        hk.term = term;
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.running.load(Ordering::SeqCst)
    }

    pub fn hakeeper_state(&self) -> HakeeperState {
        lock(&self.hakeeper).state
    }

    pub fn cluster_info(&self) -> Option<ClusterInfo> {
        lock(&self.hakeeper).cluster_info.clone()
    }

    /// Failure recorded by the last `bootstrap` call, if any
    pub fn last_bootstrap_error(&self) -> Option<String> {
        lock(&self.hakeeper).last_bootstrap_error.clone()
    }

    pub fn start_calls(&self) -> usize {
        self.lifecycle.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.lifecycle.stop_calls.load(Ordering::SeqCst)
    }

    pub fn leader_queries(&self) -> usize {
        self.leader_queries.load(Ordering::SeqCst)
    }

    pub fn info_sets(&self) -> usize {
        self.info_sets.load(Ordering::SeqCst)
    }

    pub fn state_gets(&self) -> usize {
        self.state_gets.load(Ordering::SeqCst)
    }

    pub fn bootstrap_calls(&self) -> usize {
        self.bootstrap_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_start(&self, message: impl Into<String>) {
        self.lifecycle.start_fault.arm(message);
    }

    pub fn fail_next_stop(&self, message: impl Into<String>) {
        self.lifecycle.stop_fault.arm(message);
    }

    pub fn fail_next_leader_query(&self, message: impl Into<String>) {
        self.leader_fault.arm(message);
    }

    pub fn fail_next_set_initial_cluster_info(&self, message: impl Into<String>) {
        self.info_fault.arm(message);
    }

    pub fn fail_next_get_cluster_state(&self, message: impl Into<String>) {
        self.state_fault.arm(message);
    }
}

impl Lifecycle for MockLogStore {
    fn start(&self) -> Result<()> {
        self.lifecycle.start()
    }

    fn stop(&self) -> Result<()> {
        self.lifecycle.stop()
    }

    fn id(&self) -> StoreId {
        self.lifecycle.id.clone()
    }
}

impl LogStore for MockLogStore {
    fn is_leader_hakeeper(&self) -> Result<(bool, u64)> {
        self.leader_queries.fetch_add(1, Ordering::SeqCst);
        self.leader_fault.check()?;
        self.lifecycle.ensure_running()?;
        let hk = lock(&self.hakeeper);
        Ok((hk.is_leader, hk.term))
    }

    fn get_cluster_state(&self) -> Result<ClusterState> {
        self.state_gets.fetch_add(1, Ordering::SeqCst);
        self.state_fault.check()?;
        self.lifecycle.ensure_running()?;
        let hk = lock(&self.hakeeper);
        hk.ensure_leader(&self.lifecycle.id)?;
        Ok(ClusterState {
            term: hk.term,
            state: hk.state,
            cluster_info: hk.cluster_info.clone(),
        })
    }

    fn set_initial_cluster_info(
        &self,
        log_shards: u64,
        dn_shards: u64,
        log_replicas: u64,
    ) -> Result<()> {
        self.info_sets.fetch_add(1, Ordering::SeqCst);
        self.info_fault.check()?;
        self.lifecycle.ensure_running()?;
        if log_shards == 0 || dn_shards == 0 || log_replicas == 0 {
            return Err(Error::InvalidState(format!(
                "invalid cluster info: log shards {}, dn shards {}, log replicas {}",
                log_shards, dn_shards, log_replicas
            )));
        }

        let mut hk = lock(&self.hakeeper);
        hk.ensure_leader(&self.lifecycle.id)?;
        if hk.state != HakeeperState::Created {
            return Err(Error::InvalidState(format!(
                "cluster info can only be set in state {}, current state {}",
                HakeeperState::Created,
                hk.state
            )));
        }
        hk.cluster_info = Some(ClusterInfo::from_topology(
            log_shards,
            dn_shards,
            log_replicas,
        ));
        Ok(())
    }

    fn bootstrap(&self, term: u64, state: &ClusterState) {
        self.bootstrap_calls.fetch_add(1, Ordering::SeqCst);
        let mut hk = lock(&self.hakeeper);
        match hk.apply_bootstrap(&self.lifecycle.id, term, state) {
            Ok(()) => {
                tracing::info!("Hakeeper {} bootstrapped at term {}", self.lifecycle.id, term);
                hk.last_bootstrap_error = None;
            }
            Err(e) => {
                tracing::warn!("Hakeeper {} bootstrap failed: {}", self.lifecycle.id, e);
                hk.state = HakeeperState::BootstrapFailed;
                hk.last_bootstrap_error = Some(e.to_string());
            }
        }
    }
}

/// DN and log mock stores built from `Options`
pub type MockStores = (Vec<Arc<MockDnStore>>, Vec<Arc<MockLogStore>>);

/// Build the mock stores described by `options`.
///
/// Exactly one log store leads the hakeeper: the one at `leader_index`,
/// or a random one when no index is configured.
pub fn build_mock_stores(options: &Options) -> Result<MockStores> {
    let options = options.clone().validated()?;

    let dn_stores = (0..options.dn_store_count)
        .map(|_| Arc::new(MockDnStore::new()))
        .collect();

    let leader_index = options
        .leader_index
        .unwrap_or_else(|| rand::thread_rng().gen_range(0..options.log_store_count));
    let log_stores = (0..options.log_store_count)
        .map(|i| {
            let store = MockLogStore::new();
            if i == leader_index {
                Arc::new(store.leader(options.leader_term))
            } else {
                store.set_leader(false, options.leader_term);
                Arc::new(store)
            }
        })
        .collect();

    Ok((dn_stores, log_stores))
}
