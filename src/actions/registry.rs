//! Key-store subtree capture and restore.
//!
//! Exports are stored as UTF-16LE text with machine-specific paths
//! replaced by variable placeholders, so a snapshot taken on one machine
//! imports cleanly on another. Values inside an export are quoted and
//! backslash-escaped, so the placeholder substitution runs in that
//! escaped space in both directions.

use crate::backend::reg_escape;
use crate::context::ActionContext;
use crate::error::EngineError;
use crate::types::VerifyResult;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RegistryAction {
    /// Key path, may contain `${VAR}` placeholders.
    pub key: String,
    /// Snapshot entry name.
    pub archive: String,
}

impl RegistryAction {
    pub fn new(key: impl Into<String>, archive: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            archive: archive.into(),
        }
    }

    pub fn description(&self) -> String {
        format!("Registry: {}", self.key)
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![("key", self.key.clone()), ("archive", self.archive.clone())]
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let resolved_key = ctx.resolve(&self.key);

        let content = match ctx.backends().keys.export_subtree(&resolved_key) {
            Ok(Some(content)) => content,
            Ok(None) => {
                return ctx.report_error("Registry key not found", &resolved_key);
            }
            Err(err) => {
                return ctx.report_error(
                    "Failed to export registry key",
                    &format!("{resolved_key}: {err}"),
                );
            }
        };
        if content.is_empty() {
            ctx.callback()
                .on_warning(&format!("Registry export is empty: {resolved_key}"));
        }

        let portable = ctx.blueprint().unresolve_encoded(&content, reg_escape);
        if let Err(err) = ctx.writer()?.write_utf16(&self.archive, &portable) {
            return ctx.report_error(
                "Failed to write registry to snapshot",
                &format!("{}: {}", self.archive, err),
            );
        }
        Ok(())
    }

    pub fn restore(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        if !ctx.check_archive_exists(&self.archive)? {
            return Ok(());
        }

        let resolved_key = ctx.resolve(&self.key);
        if ctx.simulate() {
            info!(
                "[SIMULATE] Would restore registry: {} -> {}",
                self.archive, resolved_key
            );
            return Ok(());
        }

        let raw = ctx.require_reader()?.read_text(&self.archive)?;
        let content = ctx.resolve_encoded(&raw, reg_escape);
        if content.trim().is_empty() {
            ctx.callback()
                .on_warning(&format!("Registry payload is empty: {}", self.archive));
            return Ok(());
        }

        if let Err(err) = ctx.backends().keys.import_subtree(&content) {
            return ctx.report_error(
                "Failed to import registry file",
                &format!("{}: {}", self.archive, err),
            );
        }
        if let Err(err) = ctx.backends().keys.relax_access(&resolved_key) {
            warn!("Failed to relax access on {}: {}", resolved_key, err);
        }
        Ok(())
    }

    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let resolved_key = ctx.resolve(&self.key);
        if ctx.simulate() {
            info!("[SIMULATE] Would delete registry key: {}", resolved_key);
            return Ok(());
        }

        if !ctx.backends().keys.key_exists(&resolved_key) {
            return Ok(());
        }
        ctx.backends().keys.delete_subtree(&resolved_key)?;
        Ok(())
    }

    pub fn verify(&self, ctx: &mut ActionContext<'_>) -> VerifyResult {
        let resolved_key = ctx.resolve(&self.key);
        let expected = ctx
            .reader()
            .map(|r| r.exists(&self.archive))
            .unwrap_or(true);
        let found = ctx.backends().keys.key_exists(&resolved_key);
        super::presence_verdict(expected, found, "Registry key", &resolved_key)
    }
}
