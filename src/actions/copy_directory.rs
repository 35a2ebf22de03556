//! Directory tree capture and restore with name filters.

use crate::context::{ActionContext, ConflictChoice};
use crate::error::{BlueprintError, EngineError};
use crate::snapshot::normalize_path;
use crate::types::VerifyResult;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CopyDirectoryAction {
    /// Base directory on disk, may contain `${VAR}` placeholders.
    pub path: String,
    /// Snapshot entry prefix all captured paths go under.
    pub archive: String,
    pub recursive: bool,
    /// File-name globs; empty means everything.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Include-then-exclude file name filter. Patterns match the file name
/// only, case-insensitively.
struct NameFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl NameFilter {
    fn build(include: &[String], exclude: &[String]) -> Result<Self, BlueprintError> {
        Ok(Self {
            include: Self::compile(include)?,
            exclude: Self::compile(exclude)?,
        })
    }

    fn compile(patterns: &[String]) -> Result<Option<GlobSet>, BlueprintError> {
        if patterns.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
        }
        Ok(Some(builder.build()?))
    }

    fn matches(&self, name: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(name) {
                return false;
            }
        }
        true
    }
}

/// Validate filter patterns without keeping the compiled sets. Used at
/// blueprint load so bad patterns fail early.
pub(crate) fn validate_patterns(patterns: &[String]) -> Result<(), BlueprintError> {
    NameFilter::compile(patterns).map(|_| ())
}

impl CopyDirectoryAction {
    pub fn new(path: impl Into<String>, archive: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            archive: archive.into(),
            recursive: true,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    pub fn description(&self) -> String {
        format!("Directory: {}", self.path)
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("path", self.path.clone()),
            ("archive", self.archive.clone()),
        ];
        if !self.recursive {
            params.push(("recursive", "false".to_string()));
        }
        params
    }

    /// Walk the base directory and split it into relative directory and
    /// file paths. Filters and the embedded-recipe skip apply to files
    /// only.
    fn collect(
        &self,
        ctx: &mut ActionContext<'_>,
        base: &Path,
        filter: &NameFilter,
    ) -> Result<(Vec<String>, Vec<(String, PathBuf)>), EngineError> {
        let mut dirs: Vec<String> = Vec::new();
        let mut files: Vec<(String, PathBuf)> = Vec::new();

        let mut walker = walkdir::WalkDir::new(base).min_depth(1);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    ctx.report_error("Failed to read directory entry", &err.to_string())?;
                    continue;
                }
            };
            let rel = match entry.path().strip_prefix(base) {
                Ok(rel) => normalize_path(&rel.to_string_lossy()),
                Err(_) => continue,
            };

            if entry.file_type().is_dir() {
                dirs.push(rel);
            } else if entry.file_type().is_file() {
                let name = entry.file_name().to_string_lossy();
                if name.eq_ignore_ascii_case(crate::snapshot::BLUEPRINT_ENTRY) {
                    continue;
                }
                if !filter.matches(&name) {
                    continue;
                }
                files.push((rel, entry.path().to_path_buf()));
            }
        }

        Ok((dirs, files))
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let resolved = ctx.resolve(&self.path);
        let base = Path::new(&resolved).to_path_buf();
        if !base.is_dir() {
            return ctx.report_error("Directory not found", &resolved);
        }

        let filter = NameFilter::build(&self.include, &self.exclude)?;
        let (dirs, files) = self.collect(ctx, &base, &filter)?;

        for dir in &dirs {
            let has_files = files
                .iter()
                .any(|(rel, _)| rel.starts_with(&format!("{dir}/")));
            if has_files {
                continue;
            }
            let archive_path = format!("{}/{}", self.archive, dir);
            ctx.run_item("Failed to add directory to snapshot", dir, |ctx| {
                ctx.writer()?
                    .create_directory(&archive_path)
                    .map_err(EngineError::from)
            })?;
        }

        for (rel, src) in &files {
            let archive_path = format!("{}/{}", self.archive, rel);
            ctx.run_item("Failed to add file to snapshot", rel, |ctx| {
                ctx.writer()?
                    .write_file(&archive_path, src)
                    .map_err(EngineError::from)
            })?;
        }

        // A fully empty tree still needs its base entry so restore can
        // recreate the directory.
        if dirs.is_empty() && files.is_empty() {
            ctx.writer()?.create_directory(&self.archive)?;
        }
        Ok(())
    }

    pub fn restore(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        if !ctx.check_archive_exists(&self.archive)? {
            return Ok(());
        }

        let resolved = ctx.resolve(&self.path);
        if ctx.simulate() {
            info!(
                "[SIMULATE] Would restore directory: {} -> {}",
                self.archive, resolved
            );
            return Ok(());
        }

        let dest = Path::new(&resolved).to_path_buf();
        if dest.exists()
            && ctx.file_conflict(&resolved, "restore directory")? == ConflictChoice::Skip
        {
            return Ok(());
        }
        std::fs::create_dir_all(&dest)?;

        let prefix = format!("{}/", self.archive.trim_end_matches('/'));
        let entries: Vec<(String, bool)> = ctx
            .require_reader()?
            .entries()
            .into_iter()
            .filter_map(|entry| {
                entry
                    .path
                    .strip_prefix(&prefix)
                    .map(|rel| (rel.to_string(), entry.is_directory))
            })
            .collect();

        for (rel, is_directory) in &entries {
            if *is_directory {
                std::fs::create_dir_all(dest.join(rel))?;
            }
        }

        for (rel, is_directory) in &entries {
            if *is_directory {
                continue;
            }
            let archive_path = format!("{prefix}{rel}");
            let target = dest.join(rel);
            ctx.run_item("Failed to restore file", rel, |ctx| {
                ctx.require_reader()?
                    .extract_to_file(&archive_path, &target)
                    .map_err(EngineError::from)
            })?;
        }
        Ok(())
    }

    /// Removes everything under the base directory regardless of the
    /// backup filters, then the base itself.
    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let resolved = ctx.resolve(&self.path);
        if ctx.simulate() {
            info!("[SIMULATE] Would remove directory: {}", resolved);
            return Ok(());
        }

        let base = Path::new(&resolved).to_path_buf();
        if !base.is_dir() {
            return Ok(());
        }

        let mut dirs: Vec<PathBuf> = Vec::new();
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in walkdir::WalkDir::new(&base).min_depth(1) {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if entry.file_type().is_dir() {
                dirs.push(entry.path().to_path_buf());
            } else {
                files.push(entry.path().to_path_buf());
            }
        }

        let mut failures = 0usize;
        for file in &files {
            if let Err(err) = std::fs::remove_file(file) {
                warn!("Failed to remove {}: {}", file.display(), err);
                failures += 1;
            }
        }

        // Deepest first so children go before their parents.
        dirs.sort_by(|a, b| b.components().count().cmp(&a.components().count()));
        for dir in &dirs {
            if let Err(err) = std::fs::remove_dir(dir) {
                warn!("Failed to remove {}: {}", dir.display(), err);
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(EngineError::Io(std::io::Error::other(format!(
                "{failures} item(s) could not be removed under {resolved}"
            ))));
        }
        std::fs::remove_dir(&base)?;
        Ok(())
    }

    pub fn verify(&self, ctx: &mut ActionContext<'_>) -> VerifyResult {
        let resolved = ctx.resolve(&self.path);
        let expected = ctx
            .reader()
            .map(|r| r.exists(&self.archive))
            .unwrap_or(true);
        let found = Path::new(&resolved).is_dir();
        super::presence_verdict(expected, found, "Directory", &resolved)
    }
}
