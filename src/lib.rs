//! # minicluster
//!
//! An in-process test cluster made of data-node (DN) stores and
//! log-service stores, with:
//! - Identity-unique store registries, one per tier
//! - Ordered cluster start/stop (DN stores first, then log stores)
//! - Exactly-once bootstrap through the hakeeper leader
//! - Mock stores with call counters and fault injection
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           ClusterCoordinator             │
//! │  running flag + one-shot bootstrap gate  │
//! └──────┬─────────────────────────┬─────────┘
//!        │ start / stop            │ start / stop, bootstrap
//! ┌──────▼──────────┐     ┌────────▼──────────────────────┐
//! │ DN registry     │     │ Log registry                  │
//! │  dn-1 dn-2 ...  │     │  log-1 (hakeeper leader) ...  │
//! └─────────────────┘     └───────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use minicluster::{ClusterCoordinator, Options};
//!
//! let options = Options::default()
//!     .with_dn_store_count(3)
//!     .with_log_store_count(3);
//! let cluster = ClusterCoordinator::from_options(&options)?;
//! cluster.start()?;
//! let state = cluster.cluster_state()?;
//! println!("hakeeper term {}: {}", state.term, state.state);
//! cluster.stop()?;
//! # Ok::<(), minicluster::Error>(())
//! ```
//!
//! ### From the command line
//! ```bash
//! minicluster run --dn-stores 3 --log-stores 3 --log-shards 2 --json
//! ```

pub mod cluster;
pub mod common;
pub mod store;

// Re-export commonly used types
pub use cluster::ClusterCoordinator;
pub use common::{Error, Options, Result, Topology};
pub use store::{DnStore, Lifecycle, LogStore, MockDnStore, MockLogStore, StoreId, StoreKind};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
