//! Common utilities and types shared across minicluster

pub mod config;
pub mod error;
pub mod utils;

pub use config::{Options, Topology};
pub use error::{Error, Result};
pub use utils::{generate_store_id, lock};
