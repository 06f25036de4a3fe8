use super::safe_entry_path;
use modstore_api::{ArchiveEntry, ArchiveView};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Archive view over a plain directory.
#[derive(Debug)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    pub fn new(root: &Path) -> Self {
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
        }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = safe_entry_path(path)?;
        let full = if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        };
        full.exists().then_some(full)
    }
}

struct DirEntry {
    name: String,
    path: PathBuf,
    size: u64,
    is_dir: bool,
}

impl ArchiveEntry for DirEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

impl ArchiveView for DirArchive {
    fn base_file(&self) -> &Path {
        &self.root
    }

    fn entry(&self, path: &str) -> Option<Box<dyn ArchiveEntry>> {
        let full = self.resolve(path)?;
        let metadata = fs::metadata(&full).ok()?;
        let mut name = safe_entry_path(path)?.to_string();
        if metadata.is_dir() && !name.is_empty() && !name.ends_with('/') {
            name.push('/');
        }

        Some(Box::new(DirEntry {
            name,
            path: full,
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            is_dir: metadata.is_dir(),
        }))
    }

    fn entry_paths(&self, path: &str) -> Option<Vec<String>> {
        let dir = self.resolve(path)?;
        let prefix = safe_entry_path(path)?.trim_end_matches('/');

        let mut children = BTreeSet::new();
        for entry in fs::read_dir(&dir).ok()?.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let mut child = if prefix.is_empty() {
                file_name
            } else {
                format!("{}/{}", prefix, file_name)
            };
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                child.push('/');
            }
            children.insert(child);
        }

        if children.is_empty() {
            None
        } else {
            Some(children.into_iter().collect())
        }
    }

    fn file(&self, path: &str) -> Option<PathBuf> {
        self.resolve(path)
    }

    fn open(&self) -> io::Result<()> {
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn layout(root: &Path) {
        fs::create_dir_all(root.join("META-INF")).unwrap();
        fs::create_dir_all(root.join("lib/linux")).unwrap();
        fs::write(root.join("META-INF/MANIFEST.MF"), b"Bundle-SymbolicName: com.x\n").unwrap();
        fs::write(root.join("lib/linux/libx.so"), b"ELF").unwrap();
    }

    #[test]
    fn test_entry_lookup() {
        let dir = tempdir().unwrap();
        layout(dir.path());
        let archive = DirArchive::new(dir.path());

        let entry = archive.entry("/META-INF/MANIFEST.MF").unwrap();
        assert_eq!(entry.name(), "META-INF/MANIFEST.MF");
        assert!(!entry.is_dir());
        let mut content = String::new();
        entry.open().unwrap().read_to_string(&mut content).unwrap();
        assert!(content.contains("com.x"));

        let lib_dir = archive.entry("lib").unwrap();
        assert!(lib_dir.is_dir());
        assert_eq!(lib_dir.name(), "lib/");

        assert!(archive.entry("/does/not/exist").is_none());
        assert!(archive.entry("../outside").is_none());
    }

    #[test]
    fn test_entry_paths() {
        let dir = tempdir().unwrap();
        layout(dir.path());
        let archive = DirArchive::new(dir.path());

        assert_eq!(
            archive.entry_paths("/").unwrap(),
            vec!["META-INF/".to_string(), "lib/".to_string()]
        );
        assert_eq!(
            archive.entry_paths("lib/linux/").unwrap(),
            vec!["lib/linux/libx.so".to_string()]
        );
        assert!(archive.entry_paths("missing").is_none());
    }

    #[test]
    fn test_file_is_absolute() {
        let dir = tempdir().unwrap();
        layout(dir.path());
        let archive = DirArchive::new(dir.path());

        let file = archive.file("lib/linux/libx.so").unwrap();
        assert!(file.is_absolute());
        assert!(file.ends_with("lib/linux/libx.so"));
        assert!(archive.file("lib/linux/liby.so").is_none());
    }
}
