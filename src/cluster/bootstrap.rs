//! One-shot cluster bootstrap
//!
//! `BootstrapGate` runs its body at most once per coordinator. Callers that
//! arrive while the body runs wait on a condvar; callers that arrive after it
//! finished get a clone of the cached outcome.
//!
//! The protocol itself (`bootstrap_cluster`) finds the hakeeper leader among
//! the log stores and pushes the initial topology to it.

use crate::common::{lock, Error, Result, Topology};
use crate::store::LogStore;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum GateState {
    NotStarted,
    Running,
    Done(Result<()>),
}

/// Single-execution latch with a cached result
#[derive(Debug)]
pub struct BootstrapGate {
    state: Mutex<GateState>,
    done: Condvar,
}

impl Default for BootstrapGate {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::NotStarted),
            done: Condvar::new(),
        }
    }

    /// Run `body` if no caller has yet, otherwise wait for and return the
    /// outcome of the one execution.
    pub fn run<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut state = self
            .done
            .wait_while(lock(&self.state), |s| *s == GateState::Running)
            .unwrap_or_else(PoisonError::into_inner);
        if let GateState::Done(outcome) = &*state {
            return outcome.clone();
        }
        *state = GateState::Running;
        drop(state);

        let mut publish = Publish {
            gate: self,
            outcome: Err(Error::Internal("bootstrap panicked".to_string())),
        };
        publish.outcome = body();
        publish.outcome.clone()
    }

    /// Outcome of the execution, if it has finished
    pub fn outcome(&self) -> Option<Result<()>> {
        match &*lock(&self.state) {
            GateState::Done(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }
}

/// Publishes the outcome on drop, so waiters are released even if the body
/// panics.
struct Publish<'a> {
    gate: &'a BootstrapGate,
    outcome: Result<()>,
}

impl Drop for Publish<'_> {
    fn drop(&mut self) {
        *lock(&self.gate.state) = GateState::Done(self.outcome.clone());
        self.gate.done.notify_all();
    }
}

/// First log store reporting hakeeper leadership, with its term.
///
/// A failing leader query aborts the scan.
pub fn find_leader(log_stores: &[Arc<dyn LogStore>]) -> Result<(Arc<dyn LogStore>, u64)> {
    for store in log_stores {
        let (is_leader, term) = store.is_leader_hakeeper()?;
        if is_leader {
            return Ok((store.clone(), term));
        }
    }
    Err(Error::NoLeaderHakeeper)
}

/// Install the initial topology on the hakeeper leader.
pub fn bootstrap_cluster(log_stores: &[Arc<dyn LogStore>], topology: Topology) -> Result<()> {
    let (leader, term) = find_leader(log_stores)?;
    tracing::info!(
        "Bootstrapping cluster via hakeeper {} (term {}): {} log shards, {} dn shards, {} log replicas",
        leader.id(),
        term,
        topology.log_shards,
        topology.dn_shards,
        topology.log_replicas
    );

    leader.set_initial_cluster_info(
        topology.log_shards,
        topology.dn_shards,
        topology.log_replicas,
    )?;
    let state = leader.get_cluster_state()?;

    // No error channel: a failed bootstrap is only visible on the store.
    leader.bootstrap(term, &state);
    Ok(())
}
