//! Native library lookup over a record's registered native-code paths.

use modstore_api::{ArchiveView, LibraryNaming};
use std::path::PathBuf;
use tracing::debug;

/// Resolve a platform-independent library name to an extracted file.
///
/// The platform-mapped name is tried first, then the raw name.
pub fn find_library(
    naming: &dyn LibraryNaming,
    native_paths: &[String],
    archive: &dyn ArchiveView,
    name: &str,
) -> Option<PathBuf> {
    let mapped = naming.map_library_name(name);
    debug!("Mapped library name {} -> {}", name, mapped);

    let path = find_native_path(native_paths, archive, &mapped).or_else(|| {
        debug!("Library does not exist: {}", mapped);
        find_native_path(native_paths, archive, name)
    });

    debug!("Returning library: {:?}", path);
    path
}

/// Scan every registered path ending with `/<name>`. Later matches override
/// earlier ones.
pub fn find_native_path(
    native_paths: &[String],
    archive: &dyn ArchiveView,
    name: &str,
) -> Option<PathBuf> {
    let suffix = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{}", name)
    };

    let mut found = None;
    for path in native_paths {
        if path.ends_with(&suffix) {
            if let Some(file) = archive.file(path) {
                found = Some(file);
            }
        }
    }
    found
}
