//! Cluster state reported by the hakeeper leader

use serde::{Deserialize, Serialize};

/// Hakeeper bootstrap progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HakeeperState {
    /// Waiting for initial cluster info
    Created,
    Running,
    BootstrapFailed,
}

impl HakeeperState {
    pub fn is_bootstrapped(&self) -> bool {
        matches!(self, HakeeperState::Running)
    }
}

impl std::fmt::Display for HakeeperState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HakeeperState::Created => write!(f, "created"),
            HakeeperState::Running => write!(f, "running"),
            HakeeperState::BootstrapFailed => write!(f, "bootstrap-failed"),
        }
    }
}

/// Log shard and its replica count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogShardRecord {
    pub shard_id: u64,
    pub replicas: u64,
}

/// DN shard and the log shard backing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnShardRecord {
    pub shard_id: u64,
    pub log_shard_id: u64,
}

/// Target topology installed by `set_initial_cluster_info`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub log_shards: Vec<LogShardRecord>,
    pub dn_shards: Vec<DnShardRecord>,
}

/// Shard 0 belongs to the hakeeper itself.
pub const HAKEEPER_SHARD_ID: u64 = 0;

impl ClusterInfo {
    /// Lay out shard records. Log shards take ids right after the hakeeper
    /// shard, DN shards follow, each backed by a log shard round-robin.
    pub fn from_topology(log_shards: u64, dn_shards: u64, log_replicas: u64) -> Self {
        let log_shards: Vec<LogShardRecord> = (1..=log_shards)
            .map(|i| LogShardRecord {
                shard_id: HAKEEPER_SHARD_ID + i,
                replicas: log_replicas,
            })
            .collect();

        let first_dn_shard = HAKEEPER_SHARD_ID + log_shards.len() as u64 + 1;
        let dn_shards = (0..dn_shards)
            .map(|i| DnShardRecord {
                shard_id: first_dn_shard + i,
                log_shard_id: log_shards
                    .get((i as usize) % log_shards.len().max(1))
                    .map_or(HAKEEPER_SHARD_ID, |s| s.shard_id),
            })
            .collect();

        Self {
            log_shards,
            dn_shards,
        }
    }
}

/// Snapshot of the hakeeper leader's view of the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterState {
    pub term: u64,
    pub state: HakeeperState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_info: Option<ClusterInfo>,
}
