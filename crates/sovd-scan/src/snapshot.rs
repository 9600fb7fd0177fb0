//! Persisted enumerator state
//!
//! Snapshots hold results, completion flags, the blacklist, discovered edges
//! and the terminated flag. Retry slots and request iterators are runtime
//! caches: a restored enumerator starts them empty, so a state that was not
//! completed is enumerated from the start of its request stream again.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blacklist::NegativeResponseBlacklist;
use crate::catalog::ServiceCatalog;
use crate::edge::EdgeRecord;
use crate::enumerator::ServiceEnumerator;
use crate::error::ScanError;
use crate::state::StateModel;
use crate::store::{ResultStore, ScanResult};

/// Serializable state of a [`ServiceEnumerator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: Deserialize<'de>"))]
pub struct EnumeratorSnapshot<S> {
    /// Name of the enumerator that produced the snapshot
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub results: Vec<ScanResult<S>>,
    /// Executed states and whether they completed
    pub state_completed: Vec<(S, bool)>,
    pub blacklist: NegativeResponseBlacklist,
    #[serde(default)]
    pub edges: EdgeRecord<S>,
    #[serde(default)]
    pub terminated: bool,
}

impl<S: Serialize> EnumeratorSnapshot<S> {
    pub fn to_json(&self) -> Result<String, ScanError> {
        serde_json::to_string_pretty(self).map_err(|e| ScanError::Snapshot(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScanError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| {
            ScanError::Snapshot(format!("Failed to write {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), results = self.results.len(), "Snapshot saved");
        Ok(())
    }
}

impl<S: DeserializeOwned> EnumeratorSnapshot<S> {
    pub fn from_json(json: &str) -> Result<Self, ScanError> {
        serde_json::from_str(json).map_err(|e| ScanError::Snapshot(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScanError::Snapshot(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

impl<C: ServiceCatalog, M: StateModel> ServiceEnumerator<C, M> {
    /// Capture the persistable state
    pub fn snapshot(&self) -> EnumeratorSnapshot<M::State> {
        EnumeratorSnapshot {
            name: self.catalog().name().to_string(),
            created_at: Utc::now(),
            results: self.store().results().to_vec(),
            state_completed: self.executed_states().to_vec(),
            blacklist: self.blacklist().clone(),
            edges: self.edges().clone(),
            terminated: self.is_terminated(),
        }
    }

    /// Rebuild an enumerator from a snapshot
    ///
    /// Packets are re-interned; retry slots and request iterators start empty.
    pub fn restore(catalog: C, model: M, snapshot: EnumeratorSnapshot<M::State>) -> Self {
        let store = ResultStore::from_results(snapshot.results);
        Self::from_parts(
            catalog,
            model,
            store,
            snapshot.state_completed,
            snapshot.blacklist,
            snapshot.edges,
            snapshot.terminated,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ExecuteOptions;
    use crate::enumerator::{Enumerator, StateGenerator};
    use crate::packet::Packet;
    use crate::transport::MockTransport;
    use crate::uds::{EcuState, UdsCatalog, UdsStateModel};

    fn options() -> ExecuteOptions {
        ExecuteOptions::default()
            .with_timeout(Duration::from_millis(10))
            .with_scan_range(0x01, 0x03)
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_excludes_runtime_caches() {
        let transport = MockTransport::new();
        transport.add_response(&[0x10, 0x01], &[0x7F, 0x10, 0x21]);
        transport.add_response(&[0x10, 0x03], &[0x50, 0x03, 0x00, 0x32, 0x01, 0xF4]);

        let state = EcuState::default();
        let mut enumerator = ServiceEnumerator::new(UdsCatalog::SessionScan, UdsStateModel);
        enumerator.execute(&transport, &state, &options()).await.unwrap();
        assert!(enumerator.has_pending_retry(&state));

        let snapshot = enumerator.snapshot();
        let json = snapshot.to_json().unwrap();
        let parsed: EnumeratorSnapshot<EcuState> = EnumeratorSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed.name, snapshot.name);
        assert_eq!(parsed.blacklist, snapshot.blacklist);

        let restored = ServiceEnumerator::restore(UdsCatalog::SessionScan, UdsStateModel, parsed);
        let exchanges = |results: &[ScanResult<EcuState>]| -> Vec<(Packet, Option<Packet>)> {
            results
                .iter()
                .map(|r| (r.request.clone(), r.response.clone()))
                .collect()
        };
        assert_eq!(exchanges(restored.results()), exchanges(enumerator.results()));
        assert_eq!(restored.executed_states(), enumerator.executed_states());
        assert!(!restored.has_pending_retry(&state));
        assert!(!restored.completed());
    }

    #[tokio::test]
    async fn test_save_and_load_keeps_edges() {
        let transport = MockTransport::new();
        transport.add_response(&[0x10, 0x03], &[0x50, 0x03, 0x00, 0x32, 0x01, 0xF4]);

        let mut enumerator = ServiceEnumerator::new(UdsCatalog::SessionScan, UdsStateModel);
        enumerator
            .execute(&transport, &EcuState::default(), &options())
            .await
            .unwrap();
        let edge = enumerator.discover_edge().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session-scan.json");
        enumerator.snapshot().save(&path).unwrap();

        let snapshot = EnumeratorSnapshot::<EcuState>::load(&path).unwrap();
        assert_eq!(snapshot.name, "UDS Session Enumerator");
        let restored = ServiceEnumerator::restore(UdsCatalog::SessionScan, UdsStateModel, snapshot);
        let transition = restored.get_transition(&edge).unwrap();
        assert_eq!(transition.request, Packet::from([0x10, 0x03]));
    }

    #[test]
    fn test_snapshot_without_edges_uses_defaults() {
        let json = r#"{
            "name": "UDS Session Enumerator",
            "created_at": "2024-05-01T12:00:00Z",
            "results": [],
            "state_completed": [],
            "blacklist": { "codes": [16, 17] }
        }"#;
        let snapshot = EnumeratorSnapshot::<EcuState>::from_json(json).unwrap();
        assert!(snapshot.edges.is_empty());
        assert!(!snapshot.terminated);
        assert_eq!(snapshot.blacklist.codes(), &[0x10, 0x11]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EnumeratorSnapshot::<EcuState>::load("/nonexistent/snapshot.json").unwrap_err();
        assert!(matches!(err, ScanError::Snapshot(_)));
    }
}
