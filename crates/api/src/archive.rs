//! Archive view abstractions.
//!
//! An archive view gives path-addressed, read-only access to the content of
//! one module generation. Paths are archive-relative and use `/` separators;
//! a leading `/` is accepted and ignored.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single entry inside an archive view.
pub trait ArchiveEntry: Send {
    /// Archive-relative name, without a leading `/`.
    fn name(&self) -> &str;

    /// Uncompressed size in bytes (0 for directories).
    fn size(&self) -> u64;

    fn is_dir(&self) -> bool;

    /// Open the entry content for reading.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// Path-addressed access to module content.
///
/// Lookups for missing paths return `None`; they never fail.
pub trait ArchiveView: Send + Sync {
    /// The file or directory this view was created over.
    fn base_file(&self) -> &Path;

    /// Look up a single entry.
    fn entry(&self, path: &str) -> Option<Box<dyn ArchiveEntry>>;

    /// Immediate children of a directory path. Directories carry a trailing `/`.
    /// Returns `None` when the path does not exist or has no children.
    fn entry_paths(&self, path: &str) -> Option<Vec<String>>;

    /// Map an archive-relative path to an absolute file on disk, extracting
    /// it first when the content is not already a plain file.
    fn file(&self, path: &str) -> Option<PathBuf>;

    /// (Re)acquire underlying resources.
    fn open(&self) -> io::Result<()>;

    /// Release underlying resources. Must be idempotent.
    fn close(&self) -> io::Result<()>;
}

/// Creates archive views for a module's base file.
pub trait ArchiveFactory: Send + Sync {
    /// `scratch_dir` is a per-generation directory the view may use for
    /// extracted files.
    fn create(&self, base: &Path, scratch_dir: &Path) -> io::Result<Arc<dyn ArchiveView>>;
}

/// Strip the optional leading `/` from an entry path.
pub fn normalize_entry_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_entry_path() {
        assert_eq!(normalize_entry_path("/META-INF/MANIFEST.MF"), "META-INF/MANIFEST.MF");
        assert_eq!(normalize_entry_path("lib/x.so"), "lib/x.so");
        assert_eq!(normalize_entry_path("/"), "");
    }
}
