//! Scoped environment variable capture and restore.
//!
//! An empty snapshot value means "was not set": restore unsets the
//! variable instead of setting it to the empty string.

use crate::context::ActionContext;
use crate::error::EngineError;
use crate::types::{EnvScope, VerifyResult, VerifyStatus};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct EnvironmentAction {
    /// Variable name, may contain `${VAR}` placeholders.
    pub name: String,
    pub scope: EnvScope,
    /// Snapshot entry name.
    pub archive: String,
}

impl EnvironmentAction {
    pub fn new(name: impl Into<String>, scope: EnvScope, archive: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope,
            archive: archive.into(),
        }
    }

    pub fn description(&self) -> String {
        format!("Environment: {} ({})", self.name, self.scope.as_str())
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("scope", self.scope.as_str().to_string()),
            ("archive", self.archive.clone()),
        ]
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let name = ctx.resolve(&self.name);

        let value = match ctx.backends().env.get(&name, self.scope) {
            Ok(Some(value)) => value,
            Ok(None) => {
                ctx.callback().on_warning(&format!(
                    "Environment variable not set, storing empty: {name}"
                ));
                String::new()
            }
            Err(err) => {
                return ctx.report_error(
                    "Failed to read environment variable",
                    &format!("{name}: {err}"),
                );
            }
        };

        if let Err(err) = ctx.writer()?.write_text(&self.archive, &value) {
            return ctx.report_error(
                "Failed to write environment variable to snapshot",
                &format!("{}: {}", self.archive, err),
            );
        }
        Ok(())
    }

    pub fn restore(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        if !ctx.check_archive_exists(&self.archive)? {
            return Ok(());
        }

        let name = ctx.resolve(&self.name);
        if ctx.simulate() {
            info!("[SIMULATE] Would restore environment variable: {}", name);
            return Ok(());
        }

        let raw = ctx.require_reader()?.read_text(&self.archive)?;
        let value = ctx.resolve(&raw);

        let result = if value.is_empty() {
            ctx.backends().env.unset(&name, self.scope)
        } else {
            ctx.backends().env.set(&name, self.scope, &value)
        };
        if let Err(err) = result {
            return ctx.report_error(
                "Failed to restore environment variable",
                &format!("{name}: {err}"),
            );
        }
        self.broadcast(ctx);
        Ok(())
    }

    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let name = ctx.resolve(&self.name);
        if ctx.simulate() {
            info!("[SIMULATE] Would unset environment variable: {}", name);
            return Ok(());
        }

        ctx.backends().env.unset(&name, self.scope)?;
        self.broadcast(ctx);
        Ok(())
    }

    fn broadcast(&self, ctx: &ActionContext<'_>) {
        if let Err(err) = ctx.backends().env.broadcast_change() {
            warn!("Failed to broadcast environment change: {}", err);
        }
    }

    pub fn verify(&self, ctx: &mut ActionContext<'_>) -> VerifyResult {
        let name = ctx.resolve(&self.name);

        // Expected value from the snapshot; empty means "expect unset".
        let expected = match ctx.reader() {
            Some(reader) if reader.exists(&self.archive) => match reader.read_text(&self.archive) {
                Ok(raw) => {
                    let value = ctx.resolve(&raw);
                    if value.is_empty() {
                        None
                    } else {
                        Some(value)
                    }
                }
                Err(err) => {
                    return VerifyResult::new(
                        VerifyStatus::Mismatch,
                        format!("Unreadable snapshot payload for {name}: {err}"),
                    );
                }
            },
            _ => None,
        };

        let live = match ctx.backends().env.get(&name, self.scope) {
            Ok(live) => live.filter(|v| !v.is_empty()),
            Err(err) => {
                return VerifyResult::new(
                    VerifyStatus::Mismatch,
                    format!("Failed to read environment variable {name}: {err}"),
                );
            }
        };

        // Without a snapshot the expectation is simply "set".
        if ctx.reader().is_none() {
            return match live {
                Some(_) => VerifyResult::new(VerifyStatus::Match, format!("{name} is set")),
                None => VerifyResult::new(VerifyStatus::Missing, format!("{name} is not set")),
            };
        }

        match (expected, live) {
            (Some(want), Some(have)) if want == have => {
                VerifyResult::new(VerifyStatus::Match, format!("{name} matches"))
            }
            (Some(want), Some(have)) => VerifyResult::new(
                VerifyStatus::Mismatch,
                format!("{name}: expected '{want}', found '{have}'"),
            ),
            (Some(_), None) => VerifyResult::new(VerifyStatus::Missing, format!("{name} is not set")),
            (None, Some(have)) => VerifyResult::new(
                VerifyStatus::Extra,
                format!("{name} unexpectedly set to '{have}'"),
            ),
            (None, None) => {
                VerifyResult::new(VerifyStatus::Match, format!("{name} unset as expected"))
            }
        }
    }
}
