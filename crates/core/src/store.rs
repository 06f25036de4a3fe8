//! The module store: install, update and uninstall over the generation layout.

use crate::config::{PersistenceMode, StoreConfig};
use crate::error::{Result, StoreError};
use crate::record::ModuleRecord;
use crate::services::StorageServices;
use crate::storage::layout::ensure_dir;
use crate::storage::{GenerationStore, SnapshotStore};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub struct ModuleStore {
    services: Arc<StorageServices>,
    snapshots: SnapshotStore,
    mode: PersistenceMode,
    records: RwLock<BTreeMap<u64, Arc<ModuleRecord>>>,
    dirty: Mutex<BTreeSet<u64>>,
    next_id: AtomicU64,
    // Held by update, uninstall, touch and flush. Generation allocation scans
    // the filesystem and is not atomic, and a snapshot must never be written
    // for a module that is being uninstalled.
    update_lock: Mutex<()>,
}

impl ModuleStore {
    /// Open a store with the default services for `config`.
    pub fn with_defaults(config: &StoreConfig) -> Result<Self> {
        let services = StorageServices::new(GenerationStore::from_config(config));
        Self::open(config, services)
    }

    /// Open (or create) the store and restore every saved record.
    pub fn open(config: &StoreConfig, services: StorageServices) -> Result<Self> {
        let layout = &services.layout;
        fs::create_dir_all(layout.storage_root())?;
        if let Some(data_root) = layout.data_root() {
            ensure_dir(data_root, "data root");
        }

        let services = Arc::new(services);
        let snapshots = SnapshotStore::new(services.layout.storage_root());

        let mut records = BTreeMap::new();
        for snapshot in snapshots.load_all() {
            let record = ModuleRecord::from_snapshot(&snapshot, services.clone());
            if let Err(e) = record.initialize_new_module() {
                warn!("Restored module {} is not readable: {}", record.id(), e);
            }
            records.insert(record.id(), Arc::new(record));
        }

        // Leftover module directories also count, so ids are never reused.
        let highest = records
            .keys()
            .copied()
            .chain(services.layout.module_ids())
            .max()
            .unwrap_or(0);

        info!(
            "Opened module store at {} with {} modules",
            services.layout.storage_root().display(),
            records.len()
        );

        Ok(Self {
            services,
            snapshots,
            mode: config.persistence_mode(),
            records: RwLock::new(records),
            dirty: Mutex::new(BTreeSet::new()),
            next_id: AtomicU64::new(highest + 1),
            update_lock: Mutex::new(()),
        })
    }

    pub fn services(&self) -> &Arc<StorageServices> {
        &self.services
    }

    pub fn layout(&self) -> &GenerationStore {
        &self.services.layout
    }

    pub fn persistence_mode(&self) -> PersistenceMode {
        self.mode
    }

    pub fn get(&self, id: u64) -> Option<Arc<ModuleRecord>> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    /// Current records ordered by id.
    pub fn records(&self) -> Vec<Arc<ModuleRecord>> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    fn require(&self, id: u64) -> Result<Arc<ModuleRecord>> {
        self.get(id).ok_or(StoreError::ModuleNotFound(id))
    }

    /// Install a standalone copy of `source` (a file or a directory).
    pub fn install(&self, location: &str, source: &Path) -> Result<Arc<ModuleRecord>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let name = self.services.locations.map_location_to_name(location);
        let record = ModuleRecord::builder(id, location)
            .file_name(name)
            .last_modified(now_millis())
            .build(self.services.clone());

        self.finish_install(record, Some(source))
    }

    /// Install a module whose content stays at `path`.
    pub fn install_reference(&self, location: &str, path: &Path) -> Result<Arc<ModuleRecord>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = ModuleRecord::builder(id, location)
            .reference(path.to_string_lossy())
            .last_modified(now_millis())
            .build(self.services.clone());

        self.finish_install(record, None)
    }

    fn finish_install(
        &self,
        record: ModuleRecord,
        source: Option<&Path>,
    ) -> Result<Arc<ModuleRecord>> {
        let populated = match source {
            Some(source) => copy_content(source, &record.base_file()),
            None => Ok(()),
        };

        if let Err(e) = populated.and_then(|_| record.initialize_new_module()) {
            let _ = record.close();
            self.services.layout.remove_module_dir(record.id());
            return Err(e);
        }

        info!(
            "Installed module {} from {} ({})",
            record.id(),
            record.location(),
            record.symbolic_name().unwrap_or("<unnamed>")
        );

        let record = Arc::new(record);
        if let Err(e) = self.publish(&record) {
            let _ = record.close();
            self.services.layout.remove_module_dir(record.id());
            return Err(e);
        }
        Ok(record)
    }

    /// Replace the content of module `id` with a standalone copy of `source`.
    pub fn update(&self, id: u64, source: &Path) -> Result<Arc<ModuleRecord>> {
        self.update_with(id, None, Some(source))
    }

    /// Replace the content of module `id` with a reference to `path`.
    pub fn update_reference(&self, id: u64, path: &Path) -> Result<Arc<ModuleRecord>> {
        let path = path.to_string_lossy();
        self.update_with(id, Some(path.as_ref()), None)
    }

    fn update_with(
        &self,
        id: u64,
        reference: Option<&str>,
        source: Option<&Path>,
    ) -> Result<Arc<ModuleRecord>> {
        let _guard = self.update_lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.require(id)?;
        let next = current.derive_next_generation(reference)?;
        next.set_last_modified(now_millis());

        let populated = match source {
            Some(source) => copy_content(source, &next.base_file()),
            None => Ok(()),
        };
        if let Err(e) = populated.and_then(|_| next.initialize_new_module()) {
            let _ = next.close();
            if let Err(cleanup) =
                self.services
                    .layout
                    .discard_generation(id, next.generation(), current.generation())
            {
                warn!(
                    "Unable to clean up generation {} of module {}: {}",
                    next.generation(),
                    id,
                    cleanup
                );
            }
            return Err(e);
        }

        let next = Arc::new(next);
        if let Err(e) = self.publish(&next) {
            let _ = next.close();
            if let Err(cleanup) =
                self.services
                    .layout
                    .discard_generation(id, next.generation(), current.generation())
            {
                warn!(
                    "Unable to clean up generation {} of module {}: {}",
                    next.generation(),
                    id,
                    cleanup
                );
            }
            return Err(e);
        }

        if let Err(e) = current.close() {
            warn!(
                "Failed to close generation {} of module {}: {}",
                current.generation(),
                id,
                e
            );
        }

        info!(
            "Updated module {} to generation {}",
            id,
            next.generation()
        );
        Ok(next)
    }

    /// Forget module `id`. Its directories stay on disk.
    pub fn uninstall(&self, id: u64) -> Result<Arc<ModuleRecord>> {
        let _guard = self.update_lock.lock().unwrap_or_else(|e| e.into_inner());
        let record = self
            .records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .ok_or(StoreError::ModuleNotFound(id))?;

        self.dirty
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        record.close()?;
        self.snapshots.remove(id)?;

        info!("Uninstalled module {}", id);
        Ok(record)
    }

    /// Remove an old generation directory of module `id`.
    pub fn discard_generation(&self, id: u64, generation: u32) -> Result<()> {
        let current = self.require(id)?;
        self.services
            .layout
            .discard_generation(id, generation, current.generation())
    }

    /// Record that the metadata of module `id` changed.
    pub fn touch(&self, id: u64) -> Result<()> {
        let _guard = self.update_lock.lock().unwrap_or_else(|e| e.into_inner());
        let record = self.require(id)?;
        self.persist(&record)
    }

    fn persist(&self, record: &ModuleRecord) -> Result<()> {
        if self.mode.is_immediate() {
            self.snapshots.save(&record.snapshot())
        } else {
            self.dirty
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(record.id());
            Ok(())
        }
    }

    /// Make `record` the current record of its module.
    ///
    /// In immediate mode the snapshot is written first, so a failed write
    /// leaves the previous record in place.
    fn publish(&self, record: &Arc<ModuleRecord>) -> Result<()> {
        if self.mode.is_immediate() {
            self.snapshots.save(&record.snapshot())?;
        }
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.id(), record.clone());
        if !self.mode.is_immediate() {
            self.persist(record)?;
        }
        Ok(())
    }

    /// Write every pending snapshot. Returns how many were written.
    ///
    /// On a failed write the failing id and every id not yet written stay
    /// pending for the next flush.
    pub fn flush(&self) -> Result<usize> {
        let _guard = self.update_lock.lock().unwrap_or_else(|e| e.into_inner());
        let pending = {
            let mut dirty = self.dirty.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *dirty)
        };

        let mut written = 0;
        let mut pending = pending.into_iter();
        while let Some(id) = pending.next() {
            let Some(record) = self.get(id) else {
                continue;
            };
            if let Err(e) = self.snapshots.save(&record.snapshot()) {
                let mut dirty = self.dirty.lock().unwrap_or_else(|e| e.into_inner());
                dirty.insert(id);
                dirty.extend(pending);
                return Err(e);
            }
            written += 1;
        }

        debug!("Flushed {} record snapshots", written);
        Ok(written)
    }

    /// Flush pending snapshots and close every record.
    pub fn shutdown(&self) -> Result<()> {
        self.flush()?;
        for record in self.records() {
            if let Err(e) = record.close() {
                warn!("Failed to close module {}: {}", record.id(), e);
            }
        }
        Ok(())
    }
}

/// Copy a file, or a directory tree, to `target`.
fn copy_content(source: &Path, target: &Path) -> Result<()> {
    if !source.is_dir() {
        fs::copy(source, target)?;
        return Ok(());
    }

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
