//! On-disk layout of module storage.
//!
//! ```text
//! <storage-root>/
//!   <id>/<generation>/      content of one generation (standalone copies, extracted files)
//!   .records/<id>.rec       record snapshots
//! <data-root>/
//!   <id>/data/              per-module scratch area, shared by all generations
//! ```

pub mod layout;
pub mod snapshot;

pub use layout::{DATA_DIR_NAME, GenerationStore};
pub use snapshot::{RecordSnapshot, SNAPSHOT_DIR_NAME, SnapshotStore};
