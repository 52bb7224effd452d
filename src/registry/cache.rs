//! Instance memoization by configuration identity.
//!
//! The cache enforces the single-shared-ownership invariant: at most one
//! live instance per (runtime type, canonical configuration) within a
//! registry's lifetime. The lock is scoped to individual map operations
//! and never held across construction, since constructing a probe may
//! re-enter the resolver for nested fields.

use crate::probe::SharedProbe;
use crate::registry::ProbeDescriptor;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Memoizes probe instances by descriptor identity.
#[derive(Default)]
pub struct InstanceCache {
    probes: Mutex<HashMap<(String, String), SharedProbe>>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing instance for this descriptor.
    pub fn get(&self, descriptor: &ProbeDescriptor) -> Option<SharedProbe> {
        lock(&self.probes).get(&descriptor.cache_key()).cloned()
    }

    /// Insert-if-absent. Returns the instance now cached under the
    /// descriptor: the given one, or the winner of a construction race
    /// (in which case `probe` is discarded by the caller's drop).
    pub fn insert_or_get(&self, descriptor: &ProbeDescriptor, probe: SharedProbe) -> SharedProbe {
        let mut probes = lock(&self.probes);
        probes
            .entry(descriptor.cache_key())
            .or_insert(probe)
            .clone()
    }

    /// Number of live cached instances.
    pub fn len(&self) -> usize {
        lock(&self.probes).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.probes).is_empty()
    }

    /// Snapshot of every live instance, for iteration or teardown.
    pub fn live(&self) -> Vec<SharedProbe> {
        lock(&self.probes).values().cloned().collect()
    }

    /// Drop all cached instances.
    pub fn clear(&self) {
        lock(&self.probes).clear();
    }
}
