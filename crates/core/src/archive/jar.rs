use super::safe_entry_path;
use modstore_api::{ArchiveEntry, ArchiveView};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Shared zip handle; entries keep it alive to read their content later.
struct JarHandle {
    path: PathBuf,
    zip: Mutex<Option<ZipArchive<File>>>,
}

impl JarHandle {
    fn lock(&self) -> MutexGuard<'_, Option<ZipArchive<File>>> {
        self.zip.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` against the open zip, reopening it if it was closed.
    fn with_zip<T>(&self, f: impl FnOnce(&mut ZipArchive<File>) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self.lock();
        if guard.is_none() {
            debug!("Reopening archive {}", self.path.display());
            *guard = Some(open_zip(&self.path)?);
        }
        match guard.as_mut() {
            Some(zip) => f(zip),
            None => Err(io::Error::other("archive is closed")),
        }
    }
}

fn open_zip(path: &Path) -> io::Result<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(io::Error::other)
}

/// Archive view over a zip/JAR file.
///
/// `file()` extracts entries below `extract_dir` on first request and hands
/// out the extracted copy afterwards.
pub struct JarArchive {
    handle: Arc<JarHandle>,
    extract_dir: PathBuf,
}

impl JarArchive {
    pub fn open(path: &Path, extract_dir: PathBuf) -> io::Result<Self> {
        let zip = open_zip(path)?;
        Ok(Self {
            handle: Arc::new(JarHandle {
                path: path.to_path_buf(),
                zip: Mutex::new(Some(zip)),
            }),
            extract_dir,
        })
    }

    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    fn names(&self) -> Vec<String> {
        self.handle
            .with_zip(|zip| Ok(zip.file_names().map(str::to_string).collect()))
            .unwrap_or_default()
    }

    fn extract(&self, name: &str) -> io::Result<PathBuf> {
        let target = std::path::absolute(self.extract_dir.join(name))?;
        let dir_prefix = format!("{}/", name.trim_end_matches('/'));

        // Check and write under the zip lock so no caller sees a partial copy.
        self.handle.with_zip(|zip| {
            if target.exists() {
                return Ok(());
            }

            let members: Vec<String> = zip
                .file_names()
                .filter(|n| n == &name || n.starts_with(&dir_prefix))
                .map(str::to_string)
                .collect();
            if members.is_empty() {
                return Err(io::Error::new(io::ErrorKind::NotFound, name.to_string()));
            }

            for member in &members {
                let Some(relative) = safe_entry_path(member) else {
                    warn!("Skipping unsafe archive entry {}", member);
                    continue;
                };
                let out = self.extract_dir.join(relative);
                let mut entry = zip.by_name(member).map_err(io::Error::other)?;
                if entry.is_dir() {
                    fs::create_dir_all(&out)?;
                    continue;
                }
                if out.exists() {
                    continue;
                }
                if let Some(parent) = out.parent() {
                    fs::create_dir_all(parent)?;
                }
                write_atomically(&mut entry, &out)?;
            }

            debug!(
                "Extracted {} from {} to {}",
                name,
                self.handle.path.display(),
                target.display()
            );
            Ok(())
        })?;

        Ok(target)
    }
}

/// Copy `reader` to a sibling temporary file, then rename it onto `out`.
fn write_atomically(reader: &mut impl Read, out: &Path) -> io::Result<()> {
    let mut tmp_name = out.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".part");
    let tmp = out.with_file_name(tmp_name);

    let copied = File::create(&tmp).and_then(|mut file| {
        io::copy(reader, &mut file)?;
        file.sync_all()
    });
    match copied {
        Ok(()) => fs::rename(&tmp, out),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

struct JarEntry {
    handle: Arc<JarHandle>,
    name: String,
    size: u64,
    is_dir: bool,
}

impl ArchiveEntry for JarEntry {
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
        if self.is_dir {
            return Ok(Box::new(io::empty()));
        }
        let bytes = self.handle.with_zip(|zip| {
            let mut entry = zip.by_name(&self.name).map_err(io::Error::other)?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            Ok(bytes)
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

impl ArchiveView for JarArchive {
    fn base_file(&self) -> &Path {
        &self.handle.path
    }

    fn entry(&self, path: &str) -> Option<Box<dyn ArchiveEntry>> {
        let name = safe_entry_path(path)?;
        if name.is_empty() {
            return None;
        }

        let found = self.handle.with_zip(|zip| {
            if let Ok(entry) = zip.by_name(name) {
                return Ok(Some((entry.name().to_string(), entry.size(), entry.is_dir())));
            }
            let dir_name = format!("{}/", name.trim_end_matches('/'));
            if let Ok(entry) = zip.by_name(&dir_name) {
                return Ok(Some((entry.name().to_string(), 0, true)));
            }
            // Directory implied by the entries below it
            let implied = zip.file_names().any(|n| n.starts_with(&dir_name));
            Ok(implied.then(|| (dir_name, 0, true)))
        });

        let (name, size, is_dir) = found.ok().flatten()?;
        Some(Box::new(JarEntry {
            handle: self.handle.clone(),
            name,
            size,
            is_dir,
        }))
    }

    fn entry_paths(&self, path: &str) -> Option<Vec<String>> {
        let name = safe_entry_path(path)?.trim_end_matches('/');
        let prefix = if name.is_empty() {
            String::new()
        } else {
            format!("{}/", name)
        };

        let children: BTreeSet<String> = self
            .names()
            .into_iter()
            .filter_map(|n| {
                let rest = n.strip_prefix(&prefix)?;
                if rest.is_empty() {
                    return None;
                }
                let child = match rest.find('/') {
                    Some(slash) => &rest[..=slash],
                    None => rest,
                };
                Some(format!("{}{}", prefix, child))
            })
            .collect();

        if children.is_empty() {
            None
        } else {
            Some(children.into_iter().collect())
        }
    }

    fn file(&self, path: &str) -> Option<PathBuf> {
        let name = safe_entry_path(path)?;
        if name.is_empty() {
            return None;
        }
        match self.extract(name) {
            Ok(target) => Some(target),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(
                    "Failed to extract {} from {}: {}",
                    name,
                    self.handle.path.display(),
                    e
                );
                None
            }
        }
    }

    fn open(&self) -> io::Result<()> {
        let mut guard = self.handle.lock();
        if guard.is_none() {
            *guard = Some(open_zip(&self.handle.path)?);
        }
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        self.handle.lock().take();
        Ok(())
    }
}
