//! Naming services consumed by the storage core.
//!
//! Two conventions live here: how an install location becomes a stored file
//! name, and how a platform-independent library name becomes a platform file
//! name.

use std::fmt::Debug;

/// Maps an install-time location to the file name used for a standalone copy.
pub trait LocationMapper: Send + Sync + Debug {
    fn map_location_to_name(&self, location: &str) -> String;
}

/// Maps a platform-independent library name (e.g. `x`) to the platform
/// specific file name (e.g. `libx.so`).
pub trait LibraryNaming: Send + Sync + Debug {
    fn map_library_name(&self, name: &str) -> String;
}

/// Uses the last path segment of the location as the file name.
#[derive(Debug, Default, Clone)]
pub struct FileNameMapper;

impl FileNameMapper {
    /// Name used when the location has no usable last segment.
    pub const FALLBACK_NAME: &'static str = "bundlefile";
}

impl LocationMapper for FileNameMapper {
    fn map_location_to_name(&self, location: &str) -> String {
        // Drop query and fragment parts
        let end = location.find(['?', '#']).unwrap_or(location.len());
        let trimmed = location[..end].trim_end_matches(['/', '\\']);

        let name = trimmed
            .rsplit(['/', '\\', ':'])
            .next()
            .unwrap_or_default();

        if name.is_empty() {
            Self::FALLBACK_NAME.to_string()
        } else {
            name.to_string()
        }
    }
}

/// Prefix/suffix library naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffixNaming {
    prefix: String,
    suffix: String,
}

impl AffixNaming {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// `lib<name>.so`
    pub fn unix() -> Self {
        Self::new("lib", ".so")
    }

    /// `lib<name>.dylib`
    pub fn macos() -> Self {
        Self::new("lib", ".dylib")
    }

    /// `<name>.dll`
    pub fn windows() -> Self {
        Self::new("", ".dll")
    }

    /// Convention of the compile target.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Self::windows()
        } else if cfg!(target_os = "macos") {
            Self::macos()
        } else {
            Self::unix()
        }
    }
}

impl Default for AffixNaming {
    fn default() -> Self {
        Self::host()
    }
}

impl LibraryNaming for AffixNaming {
    fn map_library_name(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix, name, self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_location_to_name() {
        let mapper = FileNameMapper;
        assert_eq!(mapper.map_location_to_name("file:/opt/mods/f.jar"), "f.jar");
        assert_eq!(
            mapper.map_location_to_name("http://host/repo/x.jar?rev=2#top"),
            "x.jar"
        );
        assert_eq!(mapper.map_location_to_name("C:\\mods\\y.jar"), "y.jar");
        assert_eq!(mapper.map_location_to_name("file:/opt/mods/dir/"), "dir");
        assert_eq!(mapper.map_location_to_name("plain"), "plain");
    }

    #[test]
    fn test_map_location_fallback() {
        let mapper = FileNameMapper;
        assert_eq!(mapper.map_location_to_name(""), FileNameMapper::FALLBACK_NAME);
        assert_eq!(mapper.map_location_to_name("/"), FileNameMapper::FALLBACK_NAME);
        assert_eq!(
            mapper.map_location_to_name("scheme:"),
            FileNameMapper::FALLBACK_NAME
        );
    }

    #[test]
    fn test_affix_naming() {
        assert_eq!(AffixNaming::unix().map_library_name("x"), "libx.so");
        assert_eq!(AffixNaming::macos().map_library_name("x"), "libx.dylib");
        assert_eq!(AffixNaming::windows().map_library_name("x"), "x.dll");
    }
}
