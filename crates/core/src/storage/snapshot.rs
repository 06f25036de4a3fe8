//! Durable record metadata.
//!
//! Each record's persistent fields are written as a MessagePack file so a
//! storage root can be reopened. Descriptor content is never stored: it is
//! re-read from the archive on first access.

use crate::error::Result;
use crate::storage::layout::ensure_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory below the storage root holding snapshot files.
pub const SNAPSHOT_DIR_NAME: &str = ".records";

const SNAPSHOT_VERSION: u32 = 1;

/// Persistent metadata of one module record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub id: u64,
    pub location: String,
    pub file_name: String,
    pub reference: bool,
    pub generation: u32,
    pub start_level: i32,
    pub status: u32,
    pub last_modified: u64,
    pub native_paths: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    record: RecordSnapshot,
}

/// Snapshot files under `<storage-root>/.records`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(storage_root: &Path) -> Self {
        let dir = storage_root.join(SNAPSHOT_DIR_NAME);
        ensure_dir(&dir, "snapshot");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.rec", id))
    }

    /// Write a snapshot, replacing any previous one atomically.
    pub fn save(&self, snapshot: &RecordSnapshot) -> Result<()> {
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            record: snapshot.clone(),
        };
        let bytes = rmp_serde::to_vec(&file)?;

        let path = self.path(snapshot.id);
        let tmp = path.with_extension("rec.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn load(&self, id: u64) -> Result<Option<RecordSnapshot>> {
        let path = self.path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: SnapshotFile = rmp_serde::from_slice(&bytes)?;
        if file.version != SNAPSHOT_VERSION || file.record.id != id {
            warn!("Ignoring stale snapshot {}", path.display());
            return Ok(None);
        }
        Ok(Some(file.record))
    }

    /// Every readable snapshot, ordered by id. Unreadable files are skipped.
    pub fn load_all(&self) -> Vec<RecordSnapshot> {
        let mut snapshots = Vec::new();

        let Ok(entries) = fs::read_dir(&self.dir) else {
            return snapshots;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "rec") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };
            match self.load(id) {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => {}
                Err(e) => warn!("Failed to read snapshot {}: {}", path.display(), e),
            }
        }

        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    pub fn remove(&self, id: u64) -> Result<()> {
        match fs::remove_file(self.path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
