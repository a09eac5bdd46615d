// src/selector/mod.rs
use crate::error::GatewayError;
use crate::registry::{BackendDescriptor, RegistrySnapshot};
use std::sync::Arc;

/// Client-supplied choice of backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRequest {
    /// Exact id match, e.g. "port_9009".
    ById(String),
    /// Case-insensitive substring match against the display name.
    ByFilename(String),
    /// No selector given; apply the default policy.
    Unspecified,
}

impl SelectionRequest {
    /// Build from the optional query parameters of the HTTP surface.
    /// An explicit id wins over a filename when both are present.
    pub fn from_parts(id: Option<String>, filename: Option<String>) -> Self {
        match (id, filename) {
            (Some(id), _) if !id.is_empty() => SelectionRequest::ById(id),
            (_, Some(filename)) if !filename.is_empty() => {
                SelectionRequest::ByFilename(filename)
            }
            _ => SelectionRequest::Unspecified,
        }
    }
}

/// All descriptors whose display name contains `filename` (case-insensitive),
/// in ascending id order.
pub fn matches_by_filename(
    snapshot: &RegistrySnapshot,
    filename: &str,
) -> Vec<Arc<BackendDescriptor>> {
    let needle = filename.to_lowercase();
    snapshot
        .iter()
        .filter(|d| d.display_name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Resolve a selection request against one registry snapshot.
///
/// Pure function, no I/O. Ambiguous filename matches resolve to the
/// lexicographically smallest id; an absent selector resolves to the
/// lowest port. Both rules exist for determinism, not preference.
pub fn resolve(
    snapshot: &RegistrySnapshot,
    request: &SelectionRequest,
) -> Result<Arc<BackendDescriptor>, GatewayError> {
    match request {
        SelectionRequest::ById(id) => snapshot
            .get(id)
            .ok_or_else(|| GatewayError::NotFound(id.clone())),
        SelectionRequest::ByFilename(filename) => {
            // iter() is id-ordered, so the first match is the tie-break winner.
            matches_by_filename(snapshot, filename)
                .into_iter()
                .next()
                .ok_or_else(|| GatewayError::NotFound(filename.clone()))
        }
        SelectionRequest::Unspecified => {
            snapshot.lowest_port().ok_or(GatewayError::RegistryEmpty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use chrono::Utc;
    use serde_json::Map;

    fn snapshot_with(entries: &[(u16, &str)]) -> Arc<RegistrySnapshot> {
        let registry = Registry::new();
        let now = Utc::now();
        registry.reconcile(
            entries
                .iter()
                .map(|&(port, name)| {
                    BackendDescriptor::new("localhost", port, name, Map::new(), now)
                })
                .collect(),
            now,
            chrono::Duration::seconds(60),
        )
    }

    #[test]
    fn resolves_exact_id() {
        let snap = snapshot_with(&[(9009, "sample.exe"), (9010, "sample2.exe")]);
        let request = SelectionRequest::ById("port_9010".into());
        assert_eq!(resolve(&snap, &request).unwrap().port, 9010);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let snap = snapshot_with(&[(9009, "sample.exe")]);
        let request = SelectionRequest::ById("port_9999".into());
        assert!(matches!(
            resolve(&snap, &request),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn ambiguous_filename_takes_smallest_id() {
        let snap = snapshot_with(&[(9009, "sample.exe"), (9010, "sample2.exe")]);
        let request = SelectionRequest::ByFilename("sample".into());
        assert_eq!(resolve(&snap, &request).unwrap().id, "port_9009");
    }

    #[test]
    fn filename_match_is_case_insensitive() {
        let snap = snapshot_with(&[(9009, "Sample.EXE")]);
        let request = SelectionRequest::ByFilename("sample".into());
        assert_eq!(resolve(&snap, &request).unwrap().id, "port_9009");
    }

    #[test]
    fn no_filename_match_is_not_found() {
        let snap = snapshot_with(&[(9009, "sample.exe")]);
        let request = SelectionRequest::ByFilename("nomatch".into());
        assert!(matches!(
            resolve(&snap, &request),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn unspecified_on_empty_registry_fails() {
        let snap = snapshot_with(&[]);
        assert!(matches!(
            resolve(&snap, &SelectionRequest::Unspecified),
            Err(GatewayError::RegistryEmpty)
        ));
    }

    #[test]
    fn unspecified_picks_lowest_port() {
        let snap = snapshot_with(&[(9010, "b.exe"), (9009, "a.exe")]);
        let resolved = resolve(&snap, &SelectionRequest::Unspecified).unwrap();
        assert_eq!(resolved.port, 9009);

        // Deterministic across repeated calls.
        let again = resolve(&snap, &SelectionRequest::Unspecified).unwrap();
        assert_eq!(again.port, 9009);
    }

    #[test]
    fn id_wins_over_filename_when_both_given() {
        let request =
            SelectionRequest::from_parts(Some("port_9009".into()), Some("sample".into()));
        assert_eq!(request, SelectionRequest::ById("port_9009".into()));
    }

    #[test]
    fn empty_strings_mean_unspecified() {
        let request = SelectionRequest::from_parts(Some("".into()), Some("".into()));
        assert_eq!(request, SelectionRequest::Unspecified);
    }
}
