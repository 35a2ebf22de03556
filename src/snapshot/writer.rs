//! Snapshot writer: builds the zip container during backup.

use crate::error::SnapshotError;
use crate::snapshot::normalize_path;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Streaming writer over a new snapshot archive. Entries are written in
/// the order actions produce them; [`SnapshotWriter::finalize`] consumes
/// the writer so nothing can be appended after the central directory is
/// flushed.
pub struct SnapshotWriter {
    zip: ZipWriter<File>,
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&path)?;
        debug!(path = %path.display(), "creating snapshot");
        Ok(Self {
            zip: ZipWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn options() -> FileOptions {
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated)
    }

    pub fn write_binary(&mut self, path: &str, data: &[u8]) -> Result<(), SnapshotError> {
        self.zip.start_file(normalize_path(path), Self::options())?;
        self.zip.write_all(data)?;
        Ok(())
    }

    pub fn write_text(&mut self, path: &str, content: &str) -> Result<(), SnapshotError> {
        self.write_binary(path, content.as_bytes())
    }

    /// Write text as UTF-16LE with a BOM. Registry export payloads use
    /// this encoding so they can be fed straight back to the key store.
    pub fn write_utf16(&mut self, path: &str, content: &str) -> Result<(), SnapshotError> {
        let mut data = Vec::with_capacity(2 + content.len() * 2);
        data.push(0xFF);
        data.push(0xFE);
        for unit in content.encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        self.write_binary(path, &data)
    }

    /// Copy a file from disk into the archive.
    pub fn write_file(&mut self, archive_path: &str, src: &Path) -> Result<(), SnapshotError> {
        self.zip
            .start_file(normalize_path(archive_path), Self::options())?;
        let mut file = File::open(src)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.zip.write_all(&buf[..n])?;
        }
        Ok(())
    }

    /// Add an explicit directory entry. Needed only for directories with
    /// no files beneath them; others are implied by their files.
    pub fn create_directory(&mut self, path: &str) -> Result<(), SnapshotError> {
        self.zip
            .add_directory(normalize_path(path), Self::options())?;
        Ok(())
    }

    /// Recursively add `src_dir`'s contents under `archive_prefix`.
    /// Empty directories get explicit entries so restore can recreate
    /// them.
    pub fn add_directory_recursive(
        &mut self,
        archive_prefix: &str,
        src_dir: &Path,
    ) -> Result<(), SnapshotError> {
        let prefix = normalize_path(archive_prefix.trim_end_matches('/'));

        let mut dirs: Vec<String> = Vec::new();
        let mut files: Vec<(String, PathBuf)> = Vec::new();

        for entry in WalkDir::new(src_dir).min_depth(1) {
            let entry = entry.map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;
            let rel = entry
                .path()
                .strip_prefix(src_dir)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            let rel = normalize_path(&rel.to_string_lossy());

            if entry.file_type().is_dir() {
                dirs.push(rel);
            } else if entry.file_type().is_file() {
                files.push((rel, entry.path().to_path_buf()));
            }
        }

        for dir in &dirs {
            let has_files = files.iter().any(|(rel, _)| rel.starts_with(&format!("{dir}/")));
            if !has_files {
                self.create_directory(&format!("{prefix}/{dir}"))?;
            }
        }

        for (rel, src) in &files {
            self.write_file(&format!("{prefix}/{rel}"), src)?;
        }

        Ok(())
    }

    /// Flush the central directory and close the archive.
    pub fn finalize(mut self) -> Result<(), SnapshotError> {
        self.zip.finish()?;
        debug!(path = %self.path.display(), "snapshot finalized");
        Ok(())
    }
}
