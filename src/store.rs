use crate::tracker::StatusMap;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Version tag for the persisted document. Bumping it orphans old files,
/// which then read back as an empty store.
const STORE_VERSION: &str = "aa-status-v2";

/// Injected state service for the tracker's status map
///
/// The tracker reads the whole map, recomputes, and writes the whole map
/// back; there is no per-key update path. Save failures must be swallowed by
/// implementations: the tracker then degrades to re-anchoring countdowns at
/// "now" on the next recompute, which is the accepted data-loss edge case.
pub trait StatusStore: Send {
    /// Read the persisted status map, or an empty map if nothing usable is stored
    fn load(&self) -> StatusMap;

    /// Replace the persisted status map wholesale
    fn save(&mut self, map: &StatusMap);
}

#[derive(Serialize, Deserialize)]
struct StoreDocument {
    version: String,
    entries: StatusMap,
}

/// JSON-file-backed status store
///
/// The on-disk format is a single versioned JSON document. Unreadable,
/// unparseable or wrong-version files are treated as empty rather than
/// errors.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }
}

impl StatusStore for FileStore {
    fn load(&self) -> StatusMap {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(_) => return StatusMap::new(),
        };

        match serde_json::from_str::<StoreDocument>(&data) {
            Ok(doc) if doc.version == STORE_VERSION => doc.entries,
            Ok(doc) => {
                warn!("status store version {} ignored", doc.version);
                StatusMap::new()
            }
            Err(e) => {
                warn!("status store unreadable: {}", e);
                StatusMap::new()
            }
        }
    }

    fn save(&mut self, map: &StatusMap) {
        let doc = StoreDocument {
            version: STORE_VERSION.to_string(),
            entries: map.clone(),
        };
        let json = match serde_json::to_string_pretty(&doc) {
            Ok(json) => json,
            Err(e) => {
                warn!("status store serialize failed: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            // Swallowed: countdowns re-anchor on the next recompute
            warn!("status store write failed: {}", e);
        }
    }
}

/// In-memory status store for tests
#[derive(Default)]
pub struct MemoryStore {
    entries: StatusMap,
}

impl StatusStore for MemoryStore {
    fn load(&self) -> StatusMap {
        self.entries.clone()
    }

    fn save(&mut self, map: &StatusMap) {
        self.entries = map.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::StatusEntry;

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        let mut store = FileStore::new(&path);

        let mut map = StatusMap::new();
        map.insert(
            "deal|D-1".to_string(),
            StatusEntry {
                plane_since: Some(1_700_000_000_000),
                updated_at: 1_700_000_000_000,
                ..Default::default()
            },
        );
        store.save(&map);

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded["deal|D-1"].plane_since,
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nope.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn wrong_version_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        fs::write(&path, r#"{"version":"aa-status-v1","entries":{}}"#).unwrap();
        let store = FileStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn garbage_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        fs::write(&path, "not json").unwrap();
        let store = FileStore::new(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_failure_is_swallowed() {
        // Directory path as the target file makes the write fail
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        store.save(&StatusMap::new());
    }
}
