//! Configuration for minicluster

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DN_STORE_COUNT: usize = 1;
pub const DEFAULT_LOG_STORE_COUNT: usize = 1;
pub const DEFAULT_DN_SHARD_COUNT: u64 = 1;
pub const DEFAULT_LOG_SHARD_COUNT: u64 = 1;
pub const DEFAULT_LOG_REPLICA_COUNT: u64 = 3;
pub const DEFAULT_LEADER_TERM: u64 = 1;

/// Upper bound on each shard count; every shard gets a record at bootstrap
pub const MAX_SHARD_COUNT: u64 = 1 << 16;
/// Upper bound on each mock store count
pub const MAX_STORE_COUNT: usize = 1024;

/// Prefix for environment overrides, e.g. `MINICLUSTER_DN_STORE_COUNT=3`
pub const ENV_PREFIX: &str = "MINICLUSTER";

/// Test cluster options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Number of mock DN stores built by `ClusterCoordinator::from_options`
    pub dn_store_count: usize,

    /// Number of mock log stores built by `ClusterCoordinator::from_options`
    pub log_store_count: usize,

    /// DN shards pushed to the hakeeper at bootstrap
    pub dn_shard_count: u64,

    /// Log shards pushed to the hakeeper at bootstrap
    pub log_shard_count: u64,

    /// Replicas per log shard
    pub log_replica_count: u64,

    /// Term reported by the mock hakeeper leader
    pub leader_term: u64,

    /// Which mock log store holds leadership; random when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader_index: Option<usize>,

    /// Logging level
    pub log_level: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dn_store_count: DEFAULT_DN_STORE_COUNT,
            log_store_count: DEFAULT_LOG_STORE_COUNT,
            dn_shard_count: DEFAULT_DN_SHARD_COUNT,
            log_shard_count: DEFAULT_LOG_SHARD_COUNT,
            log_replica_count: DEFAULT_LOG_REPLICA_COUNT,
            leader_term: DEFAULT_LEADER_TERM,
            leader_index: None,
            log_level: "info".to_string(),
        }
    }
}

impl Options {
    /// Load options from an optional TOML file, then `MINICLUSTER_*`
    /// environment variables. Missing keys fall back to defaults. The file
    /// is read as TOML whatever its extension.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(true),
            );
        }
        let options: Options = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        options.validated()
    }

    /// Replace zero values with defaults, then reject counts above the caps
    /// and a leader index that points past the last log store.
    pub fn validated(mut self) -> Result<Self> {
        if self.dn_store_count == 0 {
            self.dn_store_count = DEFAULT_DN_STORE_COUNT;
        }
        if self.log_store_count == 0 {
            self.log_store_count = DEFAULT_LOG_STORE_COUNT;
        }
        if self.dn_shard_count == 0 {
            self.dn_shard_count = DEFAULT_DN_SHARD_COUNT;
        }
        if self.log_shard_count == 0 {
            self.log_shard_count = DEFAULT_LOG_SHARD_COUNT;
        }
        if self.log_replica_count == 0 {
            self.log_replica_count = DEFAULT_LOG_REPLICA_COUNT;
        }
        if self.leader_term == 0 {
            self.leader_term = DEFAULT_LEADER_TERM;
        }
        for (name, count) in [
            ("dn_store_count", self.dn_store_count),
            ("log_store_count", self.log_store_count),
        ] {
            if count > MAX_STORE_COUNT {
                return Err(Error::InvalidConfig(format!(
                    "{} {} exceeds the maximum of {}",
                    name, count, MAX_STORE_COUNT
                )));
            }
        }
        for (name, count) in [
            ("dn_shard_count", self.dn_shard_count),
            ("log_shard_count", self.log_shard_count),
        ] {
            if count > MAX_SHARD_COUNT {
                return Err(Error::InvalidConfig(format!(
                    "{} {} exceeds the maximum of {}",
                    name, count, MAX_SHARD_COUNT
                )));
            }
        }
        if let Some(index) = self.leader_index {
            if index >= self.log_store_count {
                return Err(Error::InvalidConfig(format!(
                    "leader index {} out of range for {} log stores",
                    index, self.log_store_count
                )));
            }
        }
        Ok(self)
    }

    pub fn with_dn_store_count(mut self, count: usize) -> Self {
        self.dn_store_count = count;
        self
    }

    pub fn with_log_store_count(mut self, count: usize) -> Self {
        self.log_store_count = count;
        self
    }

    pub fn with_dn_shard_count(mut self, count: u64) -> Self {
        self.dn_shard_count = count;
        self
    }

    pub fn with_log_shard_count(mut self, count: u64) -> Self {
        self.log_shard_count = count;
        self
    }

    pub fn with_log_replica_count(mut self, count: u64) -> Self {
        self.log_replica_count = count;
        self
    }

    pub fn with_leader_term(mut self, term: u64) -> Self {
        self.leader_term = term;
        self
    }

    pub fn with_leader_index(mut self, index: usize) -> Self {
        self.leader_index = Some(index);
        self
    }

    /// Topology pushed to the hakeeper leader
    pub fn topology(&self) -> Topology {
        Topology {
            log_shards: self.log_shard_count,
            dn_shards: self.dn_shard_count,
            log_replicas: self.log_replica_count,
        }
        .normalized()
    }
}

/// Initial cluster topology installed during bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub log_shards: u64,
    pub dn_shards: u64,
    pub log_replicas: u64,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            log_shards: DEFAULT_LOG_SHARD_COUNT,
            dn_shards: DEFAULT_DN_SHARD_COUNT,
            log_replicas: DEFAULT_LOG_REPLICA_COUNT,
        }
    }
}

impl Topology {
    pub fn new(log_shards: u64, dn_shards: u64, log_replicas: u64) -> Self {
        Self {
            log_shards,
            dn_shards,
            log_replicas,
        }
    }

    /// Zero counts become defaults.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            log_shards: if self.log_shards == 0 {
                defaults.log_shards
            } else {
                self.log_shards
            },
            dn_shards: if self.dn_shards == 0 {
                defaults.dn_shards
            } else {
                self.dn_shards
            },
            log_replicas: if self.log_replicas == 0 {
                defaults.log_replicas
            } else {
                self.log_replicas
            },
        }
    }
}
