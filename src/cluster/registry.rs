//! Store registry
//!
//! One registry per store kind, each behind its own lock, so DN and log
//! registrations never contend. The lock only covers membership: store
//! methods are called on `handles()` snapshots, never while it is held.

use crate::common::{lock, Error, Result};
use crate::store::{Lifecycle, StoreId, StoreKind};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub struct StoreRegistry<S: ?Sized> {
    kind: StoreKind,
    stores: Mutex<HashMap<StoreId, Arc<S>>>,
}

impl<S: Lifecycle + ?Sized> StoreRegistry<S> {
    pub fn new(kind: StoreKind) -> Self {
        Self {
            kind,
            stores: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Insert a store under its id; an id already present is rejected.
    pub fn register(&self, store: Arc<S>) -> Result<()> {
        // Read the id before locking: it is a store call.
        let id = store.id();
        match lock(&self.stores).entry(id) {
            Entry::Occupied(entry) => Err(Error::DuplicateStore {
                kind: self.kind,
                id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                tracing::debug!("Registered {} store {}", self.kind, entry.key());
                entry.insert(store);
                Ok(())
            }
        }
    }

    /// Register stores one by one, returning on the first duplicate.
    /// Stores registered before the duplicate stay registered.
    pub fn register_all<I>(&self, stores: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<S>>,
    {
        for store in stores {
            self.register(store)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Arc<S>> {
        lock(&self.stores)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::StoreNotFound {
                kind: self.kind,
                id: id.to_string(),
            })
    }

    /// Snapshot of registered ids
    pub fn ids(&self) -> HashSet<StoreId> {
        lock(&self.stores).keys().cloned().collect()
    }

    /// Snapshot of registered handles, in unspecified order
    pub fn handles(&self) -> Vec<Arc<S>> {
        lock(&self.stores).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.stores).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.stores).is_empty()
    }
}
