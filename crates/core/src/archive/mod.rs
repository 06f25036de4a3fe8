//! Concrete archive views.
//!
//! - [`DirArchive`]: module content extracted into a directory
//! - [`JarArchive`]: module content packed in a zip/JAR file, extracted on demand

pub mod dir;
pub mod jar;

pub use dir::DirArchive;
pub use jar::JarArchive;

use modstore_api::{ArchiveFactory, ArchiveView, normalize_entry_path};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Name of the per-generation directory jar content is extracted into.
pub const EXTRACT_DIR_NAME: &str = ".cp";

/// Picks a [`DirArchive`] for directories and a [`JarArchive`] for anything else.
#[derive(Debug, Default, Clone)]
pub struct DefaultArchiveFactory;

impl ArchiveFactory for DefaultArchiveFactory {
    fn create(&self, base: &Path, scratch_dir: &Path) -> io::Result<Arc<dyn ArchiveView>> {
        if base.is_dir() {
            Ok(Arc::new(DirArchive::new(base)))
        } else {
            Ok(Arc::new(JarArchive::open(
                base,
                scratch_dir.join(EXTRACT_DIR_NAME),
            )?))
        }
    }
}

/// Normalize an entry path and reject anything that could escape the archive root.
pub(crate) fn safe_entry_path(path: &str) -> Option<&str> {
    let path = normalize_entry_path(path);
    let escapes = path
        .split(['/', '\\'])
        .any(|segment| segment == ".." || segment.contains(':'));
    if escapes { None } else { Some(path) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_entry_path() {
        assert_eq!(safe_entry_path("/lib/x.so"), Some("lib/x.so"));
        assert_eq!(safe_entry_path(""), Some(""));
        assert_eq!(safe_entry_path("../etc/passwd"), None);
        assert_eq!(safe_entry_path("lib/../../x"), None);
        assert_eq!(safe_entry_path("C:/x"), None);
    }
}
