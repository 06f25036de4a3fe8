//! Module records.
//!
//! A [`ModuleRecord`] describes one generation of one installed module: its
//! identity, where its content lives, the lazily parsed descriptor and the
//! lifecycle metadata the runtime attaches to it. Records are shared between
//! threads behind `Arc`; an update never mutates a record in place but
//! derives a new one pointing at a fresh generation directory.

pub mod fields;
pub mod native;

pub use fields::{DescriptorFields, parse_symbolic_name};

use crate::descriptor::Version;
use crate::error::{Result, StoreError};
use crate::services::StorageServices;
use crate::storage::RecordSnapshot;
use crate::storage::layout::ensure_dir;
use modstore_api::headers::{ENTRY_URL_SCHEME, MODULE_MANIFEST};
use modstore_api::{ArchiveEntry, ArchiveView, Descriptor, ParseError};
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Metadata that may change during the life of a single record.
#[derive(Debug, Clone)]
struct Lifecycle {
    start_level: i32,
    status: u32,
    last_modified: u64,
    native_paths: Option<Vec<String>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            start_level: -1,
            status: 0,
            last_modified: 0,
            native_paths: None,
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Explicit, field-by-field construction of a [`ModuleRecord`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    id: u64,
    location: String,
    file_name: String,
    reference: bool,
    generation: u32,
    lifecycle: Lifecycle,
}

impl RecordBuilder {
    pub fn new(id: u64, location: impl Into<String>) -> Self {
        Self {
            id,
            location: location.into(),
            file_name: String::new(),
            reference: false,
            generation: 1,
            lifecycle: Lifecycle::default(),
        }
    }

    /// Content is a standalone copy named `file_name` inside the generation directory.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self.reference = false;
        self
    }

    /// Content stays at `path` outside the storage root.
    pub fn reference(mut self, path: impl Into<String>) -> Self {
        self.file_name = path.into();
        self.reference = true;
        self
    }

    pub fn generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    pub fn start_level(mut self, start_level: i32) -> Self {
        self.lifecycle.start_level = start_level;
        self
    }

    pub fn status(mut self, status: u32) -> Self {
        self.lifecycle.status = status;
        self
    }

    pub fn last_modified(mut self, last_modified: u64) -> Self {
        self.lifecycle.last_modified = last_modified;
        self
    }

    pub fn native_paths(mut self, native_paths: Option<Vec<String>>) -> Self {
        self.lifecycle.native_paths = native_paths;
        self
    }

    pub fn build(self, services: Arc<StorageServices>) -> ModuleRecord {
        ModuleRecord {
            id: self.id,
            location: self.location,
            file_name: self.file_name,
            reference: self.reference,
            generation: self.generation,
            services,
            lifecycle: RwLock::new(self.lifecycle),
            descriptor: OnceCell::new(),
            fields: OnceCell::new(),
            archive: RwLock::new(None),
            data_dir: OnceCell::new(),
        }
    }
}

pub struct ModuleRecord {
    id: u64,
    location: String,
    file_name: String,
    reference: bool,
    generation: u32,
    services: Arc<StorageServices>,
    lifecycle: RwLock<Lifecycle>,
    descriptor: OnceCell<Arc<Descriptor>>,
    fields: OnceCell<DescriptorFields>,
    archive: RwLock<Option<Arc<dyn ArchiveView>>>,
    data_dir: OnceCell<PathBuf>,
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("file_name", &self.file_name)
            .field("reference", &self.reference)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl ModuleRecord {
    pub fn builder(id: u64, location: impl Into<String>) -> RecordBuilder {
        RecordBuilder::new(id, location)
    }

    pub fn from_snapshot(snapshot: &RecordSnapshot, services: Arc<StorageServices>) -> Self {
        let builder = RecordBuilder::new(snapshot.id, snapshot.location.clone());
        let builder = if snapshot.reference {
            builder.reference(snapshot.file_name.clone())
        } else {
            builder.file_name(snapshot.file_name.clone())
        };
        builder
            .generation(snapshot.generation)
            .start_level(snapshot.start_level)
            .status(snapshot.status)
            .last_modified(snapshot.last_modified)
            .native_paths(snapshot.native_paths.clone())
            .build(services)
    }

    pub fn snapshot(&self) -> RecordSnapshot {
        let lifecycle = read(&self.lifecycle);
        RecordSnapshot {
            id: self.id,
            location: self.location.clone(),
            file_name: self.file_name.clone(),
            reference: self.reference,
            generation: self.generation,
            start_level: lifecycle.start_level,
            status: lifecycle.status,
            last_modified: lifecycle.last_modified,
            native_paths: lifecycle.native_paths.clone(),
        }
    }

    // ---- identity and content mode ----

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn services(&self) -> &Arc<StorageServices> {
        &self.services
    }

    // ---- lifecycle metadata ----

    pub fn start_level(&self) -> i32 {
        read(&self.lifecycle).start_level
    }

    pub fn set_start_level(&self, start_level: i32) {
        write(&self.lifecycle).start_level = start_level;
    }

    pub fn status(&self) -> u32 {
        read(&self.lifecycle).status
    }

    pub fn set_status(&self, status: u32) {
        write(&self.lifecycle).status = status;
    }

    pub fn last_modified(&self) -> u64 {
        read(&self.lifecycle).last_modified
    }

    pub fn set_last_modified(&self, last_modified: u64) {
        write(&self.lifecycle).last_modified = last_modified;
    }

    pub fn native_paths(&self) -> Option<Vec<String>> {
        read(&self.lifecycle).native_paths.clone()
    }

    /// Comma-joined native paths; `None` when there are none.
    pub fn native_paths_string(&self) -> Option<String> {
        read(&self.lifecycle)
            .native_paths
            .as_ref()
            .filter(|paths| !paths.is_empty())
            .map(|paths| paths.join(","))
    }

    pub fn set_native_paths(&self, native_paths: Vec<String>) {
        write(&self.lifecycle).native_paths = Some(native_paths);
    }

    /// Replace the native paths from a comma-joined list. Empty segments are dropped.
    pub fn set_native_paths_str(&self, native_paths: &str) {
        let paths = native_paths
            .split(',')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        self.set_native_paths(paths);
    }

    // ---- storage layout ----

    /// `<storage-root>/<id>/<generation>`
    pub fn generation_dir(&self) -> PathBuf {
        self.services.layout.generation_dir(self.id, self.generation)
    }

    /// The generation directory, created on demand (best-effort).
    pub fn create_generation_dir(&self) -> PathBuf {
        self.services
            .layout
            .create_generation_dir(self.id, self.generation)
    }

    /// File or directory holding the module content.
    pub fn base_file(&self) -> PathBuf {
        if self.reference {
            PathBuf::from(&self.file_name)
        } else {
            self.create_generation_dir().join(&self.file_name)
        }
    }

    /// Path of `path` inside the module's data directory, which is shared by
    /// all generations and allocated on first use.
    pub fn data_file(&self, path: &str) -> Result<PathBuf> {
        let dir = self
            .data_dir
            .get_or_try_init(|| self.services.layout.data_dir(self.id))?;
        ensure_dir(dir, "data");
        Ok(dir.join(path))
    }

    // ---- archive view ----

    /// Create the archive view on first call; reopen it afterwards.
    pub fn open(&self) -> Result<()> {
        let mut archive = write(&self.archive);
        match archive.as_ref() {
            Some(view) => view.open()?,
            None => {
                let base = self.base_file();
                let scratch = self.create_generation_dir();
                let view = self.services.archives.create(&base, &scratch)?;
                debug!(
                    "Opened module {} generation {} over {}",
                    self.id,
                    self.generation,
                    base.display()
                );
                *archive = Some(view);
            }
        }
        Ok(())
    }

    /// Release the archive view. Safe to call repeatedly or before `open`.
    pub fn close(&self) -> Result<()> {
        if let Some(view) = read(&self.archive).as_ref() {
            view.close()?;
        }
        Ok(())
    }

    pub fn archive(&self) -> Option<Arc<dyn ArchiveView>> {
        read(&self.archive).clone()
    }

    /// Look up an entry of this module's own content.
    pub fn entry(&self, path: &str) -> Option<Box<dyn ArchiveEntry>> {
        self.archive()?.entry(path)
    }

    /// Entries directly below `path` in this module's own content.
    pub fn entry_paths(&self, path: &str) -> Option<Vec<String>> {
        self.archive()?.entry_paths(path)
    }

    /// `bundleentry://<id>/<path>` for an existing entry.
    pub fn entry_url(&self, path: &str) -> Option<String> {
        self.entry(path)?;
        let separator = if path.starts_with('/') { "" } else { "/" };
        Some(format!(
            "{}://{}{}{}",
            ENTRY_URL_SCHEME, self.id, separator, path
        ))
    }

    // ---- descriptor ----

    /// The parsed descriptor, read from the archive at most once per record.
    pub fn descriptor(&self) -> Result<Arc<Descriptor>> {
        self.descriptor
            .get_or_try_init(|| self.read_descriptor().map(Arc::new))
            .cloned()
    }

    fn read_descriptor(&self) -> Result<Descriptor> {
        let entry = self
            .entry(MODULE_MANIFEST)
            .ok_or_else(|| StoreError::DescriptorNotFound {
                entry: MODULE_MANIFEST.to_string(),
                location: self.location.clone(),
            })?;

        let parse_error = |source: ParseError| StoreError::DescriptorParse {
            location: self.location.clone(),
            source,
        };
        let mut reader = entry.open().map_err(|e| parse_error(e.into()))?;
        let descriptor = self.services.parser.parse(&mut reader).map_err(parse_error)?;

        debug!(
            "Parsed descriptor of module {} ({} headers)",
            self.id,
            descriptor.len()
        );
        Ok(descriptor)
    }

    /// Populate the descriptor-derived fields. Later calls are no-ops.
    pub fn load_descriptor_fields(&self) -> Result<()> {
        if self.fields.get().is_some() {
            return Ok(());
        }
        let descriptor = self
            .descriptor()
            .map_err(|e| StoreError::load(&self.location, e))?;
        let fields = DescriptorFields::from_descriptor(&descriptor)
            .map_err(|e| StoreError::load(&self.location, e))?;
        let _ = self.fields.set(fields);
        Ok(())
    }

    /// Open the archive view and load the descriptor-derived fields.
    pub fn initialize_new_module(&self) -> Result<()> {
        self.open()?;
        self.load_descriptor_fields()
    }

    pub fn descriptor_fields(&self) -> Option<&DescriptorFields> {
        self.fields.get()
    }

    pub fn symbolic_name(&self) -> Option<&str> {
        self.fields.get()?.symbolic_name.as_deref()
    }

    pub fn version(&self) -> Option<&Version> {
        self.fields.get().map(|f| &f.version)
    }

    pub fn activator(&self) -> Option<&str> {
        self.fields.get()?.activator.as_deref()
    }

    pub fn class_path(&self) -> Option<&str> {
        self.fields.get()?.class_path.as_deref()
    }

    pub fn execution_environment(&self) -> Option<&str> {
        self.fields.get()?.execution_environment.as_deref()
    }

    pub fn dynamic_imports(&self) -> Option<&str> {
        self.fields.get()?.dynamic_imports.as_deref()
    }

    pub fn is_fragment(&self) -> bool {
        self.fields.get().is_some_and(|f| f.fragment)
    }

    // ---- native code ----

    /// Absolute path of the extracted native library `name`, if registered.
    pub fn find_library(&self, name: &str) -> Option<PathBuf> {
        let archive = self.archive()?;
        let native_paths = self.native_paths()?;
        native::find_library(
            self.services.libraries.as_ref(),
            &native_paths,
            archive.as_ref(),
            name,
        )
    }

    /// Extract every declared native path and register the list for lookup.
    ///
    /// The first path that cannot be resolved aborts the install and leaves
    /// the registered paths untouched.
    pub fn install_native_code<S: AsRef<str>>(&self, paths: &[S]) -> Result<()> {
        let archive = self.archive();
        for path in paths {
            let path = path.as_ref();
            let extracted = archive.as_ref().and_then(|view| view.file(path));
            if extracted.is_none() {
                return Err(StoreError::NativeCodeExtraction {
                    path: path.to_string(),
                });
            }
        }

        if !paths.is_empty() {
            self.set_native_paths(paths.iter().map(|p| p.as_ref().to_string()).collect());
        }
        Ok(())
    }

    // ---- updates ----

    /// A new record for the next free generation of this module.
    ///
    /// Lifecycle metadata is carried over; the descriptor, derived fields and
    /// archive view are not. With `reference_override` the new record
    /// references that path; otherwise a reference record becomes a
    /// standalone copy named after its location.
    pub fn derive_next_generation(&self, reference_override: Option<&str>) -> Result<ModuleRecord> {
        let next = self
            .services
            .layout
            .next_free_generation(self.id, self.generation)?;

        let lifecycle = read(&self.lifecycle).clone();
        let builder = RecordBuilder {
            id: self.id,
            location: self.location.clone(),
            file_name: self.file_name.clone(),
            reference: self.reference,
            generation: next,
            lifecycle,
        };

        let builder = match reference_override {
            Some(path) => builder.reference(path),
            None if self.reference => builder.file_name(
                self.services
                    .locations
                    .map_location_to_name(&self.location),
            ),
            None => builder,
        };

        debug!(
            "Derived generation {} of module {} from generation {}",
            next, self.id, self.generation
        );
        Ok(builder.build(self.services.clone()))
    }
}
