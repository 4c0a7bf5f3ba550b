use crate::{
    error::StateError,
    logging::debug,
    role::Role,
    run_record::RunRecord,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Deserialize)]
struct StoredState {
    #[serde(default)]
    groups: Option<BTreeMap<String, RunRecord>>,
}

#[derive(Debug, Serialize)]
struct StoredStateRef<'a> {
    groups: &'a BTreeMap<String, RunRecord>,
}

/// Run state store: group name -> `RunRecord`.
///
/// The map is guarded by a reader/writer lock so background tasks of this
/// invocation can touch it safely. Nothing guards the file against a second
/// grappler invocation; the last `save` wins.
#[derive(Debug, Default)]
pub struct RunStateStore {
    groups: RwLock<BTreeMap<String, RunRecord>>,
}

impl RunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug(format!("no state file at {}, starting empty", path.display()));
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(StateError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let stored: StoredState =
            serde_json::from_slice(&data).map_err(|source| StateError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            groups: RwLock::new(stored.groups.unwrap_or_default()),
        })
    }

    /// Rewrite the whole state file.
    ///
    /// The document is written to a sibling temp file and renamed over
    /// `path`, so readers see either the old or the new state.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let data = {
            let groups = self.groups.read();
            serde_json::to_vec_pretty(&StoredStateRef { groups: &groups })?
        };

        let write_err = |source: io::Error| StateError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&data).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|err| write_err(err.error))?;

        debug(format!("saved state to {}", path.display()));
        Ok(())
    }

    pub fn get(&self, group: &str) -> Option<RunRecord> {
        self.groups.read().get(group).cloned()
    }

    /// Store `record` for `group`. A vacant record removes the group instead.
    pub fn set(&self, group: impl Into<String>, record: RunRecord) {
        let group = group.into();
        let mut groups = self.groups.write();
        if record.is_vacant() {
            groups.remove(&group);
        } else {
            groups.insert(group, record);
        }
    }

    pub fn delete(&self, group: &str) -> Option<RunRecord> {
        self.groups.write().remove(group)
    }

    /// Snapshot of all records, ordered by group name.
    pub fn groups(&self) -> Vec<(String, RunRecord)> {
        self.groups
            .read()
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    /// Ports recorded for `role` by any group.
    pub fn claimed_ports(&self, role: Role) -> HashSet<u16> {
        self.groups
            .read()
            .values()
            .filter_map(|record| record.port(role))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn running_record(backend: Option<(u16, u32)>, frontend: Option<(u16, u32)>) -> RunRecord {
        let mut record = RunRecord::started(Utc::now());
        if let Some((port, pid)) = backend {
            record.set_service(Role::Backend, port, pid, Some(1_700_000_000_000));
        }
        if let Some((port, pid)) = frontend {
            record.set_service(Role::Frontend, port, pid, None);
        }
        record
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = RunStateStore::load(&dir.path().join("state.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        match RunStateStore::load(&path) {
            Err(StateError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn null_groups_load_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"groups": null}"#).unwrap();
        assert!(RunStateStore::load(&path).unwrap().is_empty());
    }

    #[test]
    fn save_then_load_preserves_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = RunStateStore::new();
        store.set("alpha", running_record(Some((8000, 101)), Some((5000, 102))));
        store.set("beta", running_record(Some((8001, 201)), None));
        store.save(&path).unwrap();

        let loaded = RunStateStore::load(&path).unwrap();
        assert_eq!(loaded.groups(), store.groups());
        assert_eq!(loaded.get("beta").unwrap().frontend_port, None);
    }

    #[test]
    fn save_overwrites_previous_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store = RunStateStore::new();
        store.set("alpha", running_record(Some((8000, 101)), None));
        store.save(&path).unwrap();

        store.delete("alpha");
        store.save(&path).unwrap();

        assert!(RunStateStore::load(&path).unwrap().is_empty());
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temp files must not be left behind");
    }

    #[test]
    fn vacant_record_is_deleted_not_stored() {
        let store = RunStateStore::new();
        store.set("alpha", running_record(Some((8000, 101)), None));
        store.set("alpha", RunRecord::default());
        assert!(store.get("alpha").is_none());
    }

    #[test]
    fn claimed_ports_are_per_role() {
        let store = RunStateStore::new();
        store.set("alpha", running_record(Some((8000, 1)), Some((5000, 2))));
        store.set("beta", running_record(Some((8003, 3)), None));

        let backend = store.claimed_ports(Role::Backend);
        assert_eq!(backend, HashSet::from([8000, 8003]));
        assert_eq!(store.claimed_ports(Role::Frontend), HashSet::from([5000]));
    }

    #[test]
    fn concurrent_mutation_keeps_every_update() {
        let store = Arc::new(RunStateStore::new());
        let handles: Vec<_> = (0..8u16)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..25u16 {
                        let name = format!("group-{}-{}", i, j);
                        store.set(name, running_record(Some((8000 + i * 25 + j, 1)), None));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 200);
    }
}
