//! Store contracts
//!
//! The coordinator never looks inside a store. It drives DN stores and
//! log-service stores through the traits below:
//! - `Lifecycle`: start / stop / identity, shared by both tiers
//! - `DnStore`: a data-node store
//! - `LogStore`: a log-service store that may hold hakeeper leadership

pub mod mock;
pub mod state;

pub use mock::{build_mock_stores, MockDnStore, MockLogStore, MockStores};
pub use state::{ClusterInfo, ClusterState, DnShardRecord, HakeeperState, LogShardRecord};

use crate::common::Result;
use serde::{Deserialize, Serialize};

/// Store identity, unique within a registry
pub type StoreId = String;

/// Which tier a store belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Dn,
    Log,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Dn => write!(f, "dn"),
            StoreKind::Log => write!(f, "log"),
        }
    }
}

/// Lifecycle and identity shared by every store
pub trait Lifecycle: Send + Sync {
    /// Start the store (heartbeats, command handling)
    fn start(&self) -> Result<()>;

    /// Stop the store
    fn stop(&self) -> Result<()>;

    /// Identity assigned at construction; must not change afterwards
    fn id(&self) -> StoreId;
}

/// Data-node store
pub trait DnStore: Lifecycle {}

/// Log-service store
pub trait LogStore: Lifecycle {
    /// Whether this store currently leads the hakeeper, and its term
    fn is_leader_hakeeper(&self) -> Result<(bool, u64)>;

    /// Cluster state as seen by the hakeeper leader
    fn get_cluster_state(&self) -> Result<ClusterState>;

    /// Install the target topology; only meaningful on the leader
    fn set_initial_cluster_info(
        &self,
        log_shards: u64,
        dn_shards: u64,
        log_replicas: u64,
    ) -> Result<()>;

    /// Materialize the initial topology on the leader.
    ///
    /// There is no error channel: failures stay inside the store.
    fn bootstrap(&self, term: u64, state: &ClusterState);
}
