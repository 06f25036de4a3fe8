#![allow(dead_code)]

use modstore_core::{GenerationStore, StorageServices, StoreConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MANIFEST: &str = "Manifest-Version: 1.0\r\n\
Bundle-SymbolicName: com.x;singleton:=true\r\n\
Bundle-Version: 1.2.0\r\n\
Bundle-Activator: com.x.internal.Acti\r\n vator\r\n";

/// Write a jar holding `entries` at `path`.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

/// A module jar with a manifest and native libraries for two platforms.
pub fn module_jar(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    write_jar(
        &path,
        &[
            ("META-INF/MANIFEST.MF", MANIFEST.as_bytes()),
            ("lib/linux/libx.so", b"\x7fELF linux"),
            ("lib/other/libx.so", b"\x7fELF other"),
            ("com/x/Main.class", &[0xCA, 0xFE, 0xBA, 0xBE]),
        ],
    );
    path
}

/// A module laid out as a directory.
pub fn module_dir(dir: &Path, name: &str, manifest: &str) -> PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(path.join("META-INF")).unwrap();
    fs::write(path.join("META-INF/MANIFEST.MF"), manifest).unwrap();
    path
}

pub fn config(root: &TempDir) -> StoreConfig {
    StoreConfig::new(root.path().join("storage")).with_data_root(root.path().join("data"))
}

pub fn services(root: &TempDir) -> StorageServices {
    StorageServices::new(GenerationStore::from_config(&config(root)))
}
