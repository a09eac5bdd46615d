// src/registry/snapshot.rs
use super::descriptor::BackendDescriptor;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable view of the registry produced by one reconciliation pass.
///
/// Readers hold a snapshot for the duration of their operation; the
/// discovery loop never mutates a published snapshot, it replaces it.
#[derive(Debug)]
pub struct RegistrySnapshot {
    version: u64,
    backends: BTreeMap<String, Arc<BackendDescriptor>>,
}

impl RegistrySnapshot {
    pub fn empty() -> Self {
        Self {
            version: 0,
            backends: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Arc<BackendDescriptor>> {
        self.backends.get(id).cloned()
    }

    /// Descriptors in ascending id order (lexicographic).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BackendDescriptor>> {
        self.backends.values()
    }

    /// Descriptors in ascending port order, for deterministic display.
    pub fn by_port(&self) -> Vec<Arc<BackendDescriptor>> {
        let mut all: Vec<_> = self.backends.values().cloned().collect();
        all.sort_by_key(|d| d.port);
        all
    }

    pub fn lowest_port(&self) -> Option<Arc<BackendDescriptor>> {
        self.backends.values().min_by_key(|d| d.port).cloned()
    }

    /// Build the successor snapshot from this cycle's probe results.
    ///
    /// Descriptors confirmed alive are inserted or refreshed. Descriptors
    /// not confirmed this cycle are carried over unchanged while their
    /// last_seen is still within `grace_period`, and dropped once it is
    /// not. The version always advances by exactly one.
    pub fn reconcile(
        &self,
        alive: Vec<BackendDescriptor>,
        now: DateTime<Utc>,
        grace_period: Duration,
    ) -> RegistrySnapshot {
        let mut backends: BTreeMap<String, Arc<BackendDescriptor>> = BTreeMap::new();

        for descriptor in alive {
            backends.insert(descriptor.id.clone(), Arc::new(descriptor));
        }

        for (id, descriptor) in &self.backends {
            if backends.contains_key(id) {
                continue;
            }
            if now - descriptor.last_seen <= grace_period {
                backends.insert(id.clone(), descriptor.clone());
            } else {
                tracing::warn!(
                    id = %id,
                    display_name = %descriptor.display_name,
                    last_seen = %descriptor.last_seen,
                    "evicting backend: grace period exceeded"
                );
            }
        }

        RegistrySnapshot {
            version: self.version + 1,
            backends,
        }
    }
}
