//! Capability traits and shared value types for module record storage.
//!
//! The storage core consumes everything here through traits so that the
//! archive format, descriptor grammar and platform naming rules can be
//! swapped without touching record or generation logic.

pub mod archive;
pub mod descriptor;
pub mod error;
pub mod headers;
pub mod naming;

// Re-export commonly used types
pub use archive::{ArchiveEntry, ArchiveFactory, ArchiveView, normalize_entry_path};
pub use descriptor::{Descriptor, DescriptorParser};
pub use error::{HeaderError, ParseError};
pub use naming::{AffixNaming, FileNameMapper, LibraryNaming, LocationMapper};
