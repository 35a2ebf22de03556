//! Single-file capture and restore.

use crate::context::{ActionContext, ConflictChoice};
use crate::error::EngineError;
use crate::types::VerifyResult;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CopyFileAction {
    /// Source path on disk, may contain `${VAR}` placeholders.
    pub path: String,
    /// Snapshot entry name.
    pub archive: String,
}

impl CopyFileAction {
    pub fn new(path: impl Into<String>, archive: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            archive: archive.into(),
        }
    }

    pub fn description(&self) -> String {
        format!("File: {}", self.path)
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("path", self.path.clone()),
            ("archive", self.archive.clone()),
        ]
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let resolved = ctx.resolve(&self.path);
        let source = Path::new(&resolved);
        // The entry name is reserved for the embedded blueprint document.
        if source
            .file_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(crate::snapshot::BLUEPRINT_ENTRY))
        {
            ctx.callback()
                .on_warning(&format!("Skipping reserved file name: {resolved}"));
            return Ok(());
        }
        if !source.is_file() {
            return ctx.report_error("File not found", &resolved);
        }

        if let Err(err) = ctx.writer()?.write_file(&self.archive, Path::new(&resolved)) {
            return ctx.report_error(
                "Failed to write file to snapshot",
                &format!("{}: {}", self.archive, err),
            );
        }
        Ok(())
    }

    pub fn restore(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        if !ctx.check_archive_exists(&self.archive)? {
            return Ok(());
        }

        let resolved = ctx.resolve(&self.path);
        if ctx.simulate() {
            info!("[SIMULATE] Would restore file: {} -> {}", self.archive, resolved);
            return Ok(());
        }

        let dest = Path::new(&resolved);
        if dest.exists() {
            if ctx.file_conflict(&resolved, "restore file")? == ConflictChoice::Skip {
                return Ok(());
            }
        }

        let reader = ctx.require_reader()?;
        if let Err(err) = reader.extract_to_file(&self.archive, dest) {
            return ctx.report_error(
                "Failed to restore file from snapshot",
                &format!("{}: {}", resolved, err),
            );
        }
        Ok(())
    }

    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let resolved = ctx.resolve(&self.path);
        if ctx.simulate() {
            info!("[SIMULATE] Would remove file: {}", resolved);
            return Ok(());
        }

        let path = Path::new(&resolved);
        if path.is_file() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn verify(&self, ctx: &mut ActionContext<'_>) -> VerifyResult {
        let resolved = ctx.resolve(&self.path);
        let expected = ctx
            .reader()
            .map(|r| r.exists(&self.archive))
            .unwrap_or(true);
        let found = Path::new(&resolved).is_file();
        super::presence_verdict(expected, found, "File", &resolved)
    }
}
