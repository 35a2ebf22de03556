//! Snapshot reader: random access over an existing snapshot archive.

use crate::error::SnapshotError;
use crate::snapshot::path_tree::PathTree;
use crate::snapshot::ArchiveEntry;
use parking_lot::Mutex;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

/// Read side of the snapshot container. The path index is built once at
/// open time; entry payloads are decompressed on demand.
///
/// Shared across actions by reference, so the underlying archive sits
/// behind a mutex (decompression needs exclusive access).
pub struct SnapshotReader {
    path: PathBuf,
    archive: Mutex<ZipArchive<File>>,
    tree: PathTree,
}

impl SnapshotReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut archive = ZipArchive::new(file)?;

        // Collect names in archive order; the path index synthesizes
        // directory structure from them.
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            names.push(archive.by_index(i)?.name().to_string());
        }

        debug!(path = %path.display(), entries = names.len(), "opened snapshot");
        Ok(Self {
            path,
            archive: Mutex::new(archive),
            tree: PathTree::build(names),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if `path` names a file, an explicit directory entry, or a
    /// directory implied by deeper entries.
    pub fn exists(&self, path: &str) -> bool {
        self.tree.exists(path)
    }

    pub fn is_directory(&self, path: &str) -> bool {
        self.tree.is_directory(path)
    }

    /// Immediate child names of a directory, in first-seen order.
    pub fn list_dir(&self, path: &str) -> Vec<String> {
        self.tree.children_of(path)
    }

    /// All entries in archive order, trailing slashes normalized away.
    pub fn entries(&self) -> Vec<ArchiveEntry> {
        self.tree
            .ordered()
            .iter()
            .map(|path| {
                let is_directory = path.ends_with('/');
                ArchiveEntry {
                    path: path.trim_end_matches('/').to_string(),
                    is_directory,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.ordered().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.ordered().is_empty()
    }

    pub fn read_binary(&self, path: &str) -> Result<Vec<u8>, SnapshotError> {
        let mut archive = self.archive.lock();
        let mut entry = archive
            .by_name(path)
            .map_err(|_| SnapshotError::EntryNotFound(path.to_string()))?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        std::io::copy(&mut entry, &mut data)?;
        Ok(data)
    }

    /// Read an entry as text, detecting UTF-8 and UTF-16LE BOMs. No BOM
    /// means plain UTF-8.
    pub fn read_text(&self, path: &str) -> Result<String, SnapshotError> {
        let data = self.read_binary(path)?;

        if data.len() >= 3 && data[0] == 0xEF && data[1] == 0xBB && data[2] == 0xBF {
            return Ok(String::from_utf8_lossy(&data[3..]).into_owned());
        }
        if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xFE {
            let units: Vec<u16> = data[2..]
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            return Ok(String::from_utf16_lossy(&units));
        }

        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Extract one entry to a file on disk, creating parent directories.
    pub fn extract_to_file(&self, archive_path: &str, dest: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut archive = self.archive.lock();
        let mut entry = archive
            .by_name(archive_path)
            .map_err(|_| SnapshotError::EntryNotFound(archive_path.to_string()))?;
        let mut out = File::create(dest)?;
        std::io::copy(&mut entry, &mut out)?;
        Ok(())
    }

    /// Extract every entry under `archive_prefix` into `dest_dir`,
    /// recreating explicit empty directories.
    pub fn extract_directory_recursive(
        &self,
        archive_prefix: &str,
        dest_dir: &Path,
    ) -> Result<(), SnapshotError> {
        let prefix = archive_prefix.trim_end_matches('/');

        std::fs::create_dir_all(dest_dir)?;

        // Clone to avoid holding the tree borrow across extraction calls.
        let paths: Vec<String> = self.tree.ordered().to_vec();
        for path in &paths {
            let relative = match path.strip_prefix(prefix) {
                // A leading slash separates a true child from a sibling
                // that merely shares the prefix text.
                Some(rest) => match rest.strip_prefix('/') {
                    Some(relative) => relative,
                    None => continue,
                },
                None => continue,
            };
            if relative.is_empty() {
                continue;
            }

            let dest_path = dest_dir.join(relative.trim_end_matches('/'));
            if path.ends_with('/') {
                std::fs::create_dir_all(&dest_path)?;
            } else {
                self.extract_to_file(path, &dest_path)?;
            }
        }

        Ok(())
    }
}
