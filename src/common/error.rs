//! Error types for minicluster

use crate::store::StoreKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors are `Clone` so the bootstrap outcome can be handed to every
/// caller of `start`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // === Registry Errors ===
    #[error("store id duplicated: {kind} store {id}")]
    DuplicateStore { kind: StoreKind, id: String },

    #[error("store not exist: {kind} store {id}")]
    StoreNotFound { kind: StoreKind, id: String },

    // === Bootstrap Errors ===
    #[error("no leader hakeeper")]
    NoLeaderHakeeper,

    // === Store Errors ===
    #[error("store error: {0}")]
    Store(String),

    #[error("not leader hakeeper: {0}")]
    NotLeader(String),

    #[error("invalid hakeeper state: {0}")]
    InvalidState(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
