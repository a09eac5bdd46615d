// src/registry/mod.rs
mod descriptor;
mod snapshot;

pub use descriptor::{backend_id, BackendDescriptor};
pub use snapshot::RegistrySnapshot;

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Shared registry of live backends.
///
/// Written only by the discovery loop (single writer) via whole-snapshot
/// replacement; read lock-free by the selector and aggregator. No reader
/// ever blocks the writer and no writer ever blocks a reader.
pub struct Registry {
    current: ArcSwap<RegistrySnapshot>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RegistrySnapshot::empty()),
        }
    }

    /// The snapshot in effect right now. Callers keep it for the whole
    /// operation; a concurrent reconcile does not affect it.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    /// Publish the results of one discovery cycle atomically.
    pub fn reconcile(
        &self,
        alive: Vec<BackendDescriptor>,
        now: DateTime<Utc>,
        grace_period: Duration,
    ) -> Arc<RegistrySnapshot> {
        let next = Arc::new(self.current.load().reconcile(alive, now, grace_period));
        self.current.store(next.clone());
        next
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Map;
    use std::collections::HashSet;

    fn descriptor(port: u16, name: &str, last_seen: DateTime<Utc>) -> BackendDescriptor {
        BackendDescriptor::new("localhost", port, name, Map::new(), last_seen)
    }

    fn grace() -> Duration {
        Duration::seconds(60)
    }

    #[test]
    fn starts_empty_at_version_zero() {
        let registry = Registry::new();
        let snap = registry.snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap.version(), 0);
    }

    #[test]
    fn alive_descriptors_are_all_registered() {
        let registry = Registry::new();
        let now = Utc::now();
        let snap = registry.reconcile(
            vec![
                descriptor(9009, "sample.exe", now),
                descriptor(9010, "sample2.exe", now),
                descriptor(9011, "other.so", now),
            ],
            now,
            grace(),
        );
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.version(), 1);
        assert!(snap.get("port_9010").is_some());
    }

    #[test]
    fn missed_probe_within_grace_is_retained() {
        let registry = Registry::new();
        let now = Utc::now();
        registry.reconcile(vec![descriptor(9009, "sample.exe", now)], now, grace());

        // Next cycle 30s later confirms nothing; entry is 30s stale, inside grace.
        let later = now + Duration::seconds(30);
        let snap = registry.reconcile(vec![], later, grace());
        assert_eq!(snap.len(), 1);
        // Retained unchanged, not refreshed.
        assert_eq!(snap.get("port_9009").unwrap().last_seen, now);
    }

    #[test]
    fn descriptor_past_grace_is_evicted() {
        let registry = Registry::new();
        let now = Utc::now();
        registry.reconcile(vec![descriptor(9009, "sample.exe", now)], now, grace());

        let later = now + Duration::seconds(61);
        let snap = registry.reconcile(vec![], later, grace());
        assert!(snap.is_empty());
        assert_eq!(snap.version(), 2);
    }

    #[test]
    fn refresh_updates_last_seen_and_metadata() {
        let registry = Registry::new();
        let now = Utc::now();
        registry.reconcile(vec![descriptor(9009, "sample.exe", now)], now, grace());

        let later = now + Duration::seconds(30);
        let mut metadata = Map::new();
        metadata.insert("arch".into(), serde_json::json!("x86_64"));
        let refreshed =
            BackendDescriptor::new("localhost", 9009, "sample.exe", metadata, later);
        let snap = registry.reconcile(vec![refreshed], later, grace());

        let entry = snap.get("port_9009").unwrap();
        assert_eq!(entry.last_seen, later);
        assert_eq!(entry.metadata.get("arch").unwrap(), "x86_64");
    }

    #[test]
    fn readers_keep_their_snapshot_across_reconciles() {
        let registry = Registry::new();
        let now = Utc::now();
        registry.reconcile(vec![descriptor(9009, "sample.exe", now)], now, grace());

        let held = registry.snapshot();
        let later = now + Duration::seconds(61);
        registry.reconcile(vec![], later, grace());

        // The held snapshot is unaffected by the eviction.
        assert_eq!(held.len(), 1);
        assert_eq!(registry.snapshot().len(), 0);
    }

    #[test]
    fn by_port_is_ascending() {
        let registry = Registry::new();
        let now = Utc::now();
        let snap = registry.reconcile(
            vec![
                descriptor(9012, "c", now),
                descriptor(9009, "a", now),
                descriptor(9010, "b", now),
            ],
            now,
            grace(),
        );
        let ports: Vec<u16> = snap.by_port().iter().map(|d| d.port).collect();
        assert_eq!(ports, vec![9009, 9010, 9012]);
    }

    proptest! {
        // With every candidate passing its probe, registry size equals the
        // number of distinct live ports and the version advances by one.
        #[test]
        fn registry_size_matches_alive_set(ports in proptest::collection::hash_set(9000u16..9100, 0..20)) {
            let registry = Registry::new();
            let now = Utc::now();
            let alive: Vec<_> = ports
                .iter()
                .map(|&p| descriptor(p, "artifact.bin", now))
                .collect();
            let snap = registry.reconcile(alive, now, grace());
            prop_assert_eq!(snap.len(), ports.len());
            prop_assert_eq!(snap.version(), 1);

            let seen: HashSet<u16> = snap.iter().map(|d| d.port).collect();
            prop_assert_eq!(seen, ports);
        }

        // Version increments by exactly one per pass, regardless of churn.
        #[test]
        fn version_is_monotonic(cycles in 1usize..10) {
            let registry = Registry::new();
            let now = Utc::now();
            for i in 0..cycles {
                let snap = registry.reconcile(vec![], now, grace());
                prop_assert_eq!(snap.version(), (i + 1) as u64);
            }
        }
    }
}
