use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the per-module directory below the data root.
pub const DATA_DIR_NAME: &str = "data";

/// Directory layout and generation allocation for module content.
///
/// Directory existence is the only occupancy signal: nothing here keeps an
/// in-memory counter, so directories created out of band (e.g. by an
/// interrupted update) are skipped rather than reused.
#[derive(Debug, Clone)]
pub struct GenerationStore {
    storage_root: PathBuf,
    data_root: Option<PathBuf>,
}

impl GenerationStore {
    pub fn new(storage_root: impl Into<PathBuf>, data_root: Option<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            data_root,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.storage_root.clone(), config.data_root.clone())
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn data_root(&self) -> Option<&Path> {
        self.data_root.as_deref()
    }

    /// `<storage-root>/<id>`
    pub fn module_dir(&self, id: u64) -> PathBuf {
        self.storage_root.join(id.to_string())
    }

    /// `<storage-root>/<id>/<generation>`
    pub fn generation_dir(&self, id: u64, generation: u32) -> PathBuf {
        self.module_dir(id).join(generation.to_string())
    }

    /// Return the generation directory, creating it if needed.
    ///
    /// Creation is best-effort: a failure is logged and the path is returned
    /// anyway, so the caller fails on the actual file access instead.
    pub fn create_generation_dir(&self, id: u64, generation: u32) -> PathBuf {
        let dir = self.generation_dir(id, generation);
        ensure_dir(&dir, "generation");
        dir
    }

    /// `<data-root>/<id>/data`
    pub fn data_dir(&self, id: u64) -> Result<PathBuf> {
        let root = self
            .data_root
            .as_ref()
            .ok_or(StoreError::DataAreaUnavailable)?;
        Ok(root.join(id.to_string()).join(DATA_DIR_NAME))
    }

    /// Return the data directory, creating it (best-effort) if needed.
    pub fn create_data_dir(&self, id: u64) -> Result<PathBuf> {
        let dir = self.data_dir(id)?;
        ensure_dir(&dir, "data");
        Ok(dir)
    }

    /// First generation above `current` whose directory does not exist yet.
    ///
    /// Not atomic with respect to directory creation: concurrent updates of
    /// the same module must be serialized by the caller.
    pub fn next_free_generation(&self, id: u64, current: u32) -> Result<u32> {
        let mut next = current;
        while next < u32::MAX {
            next += 1;
            if self.generation_dir(id, next).exists() {
                debug!("Generation {} of module {} is occupied, skipping", next, id);
                continue;
            }
            return Ok(next);
        }
        Err(StoreError::GenerationExhausted { id })
    }

    /// Existing generation directories of a module, ascending.
    pub fn generations(&self, id: u64) -> Vec<u32> {
        let mut generations: Vec<u32> = numeric_children(&self.module_dir(id));
        generations.sort_unstable();
        generations
    }

    /// Modules that have a directory under the storage root, ascending.
    pub fn module_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = numeric_children(&self.storage_root);
        ids.sort_unstable();
        ids
    }

    /// Remove one generation directory on explicit request.
    ///
    /// `current` is the generation the live record points at and is refused.
    pub fn discard_generation(&self, id: u64, generation: u32, current: u32) -> Result<()> {
        if generation == current {
            return Err(StoreError::GenerationInUse { id, generation });
        }
        let dir = self.generation_dir(id, generation);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!("Discarded generation {} of module {}", generation, id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove everything stored for a module below the storage root.
    pub(crate) fn remove_module_dir(&self, id: u64) {
        let dir = self.module_dir(id);
        if let Err(e) = fs::remove_dir_all(&dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Unable to remove module directory {}: {}", dir.display(), e);
            }
        }
    }
}

/// Create `dir` if absent. Failures are logged, never raised.
pub(crate) fn ensure_dir(dir: &Path, kind: &str) -> bool {
    if dir.is_dir() {
        return true;
    }
    match fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            warn!("Unable to create {} directory {}: {}", kind, dir.display(), e);
            false
        }
    }
}

fn numeric_children<T: std::str::FromStr>(dir: &Path) -> Vec<T> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str()?.parse::<T>().ok())
        .collect()
}
