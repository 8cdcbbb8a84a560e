//! Test cluster lifecycle coordination
//!
//! - Store registries (one per store kind, identity-unique)
//! - Cluster-wide start/stop in DN-then-log order
//! - Exactly-once bootstrap through the hakeeper leader

pub mod bootstrap;
pub mod coordinator;
pub mod registry;

pub use bootstrap::BootstrapGate;
pub use coordinator::ClusterCoordinator;
pub use registry::StoreRegistry;
