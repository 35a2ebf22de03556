//! Service configuration capture and restore.
//!
//! The snapshot stores the full service configuration as TOML, including
//! whether it was running at capture time. Restore recreates or updates
//! the service and only starts it again if it was running; a failed
//! start is a warning, not an error.

use crate::backend::ServiceConfig;
use crate::context::ActionContext;
use crate::error::EngineError;
use crate::types::VerifyResult;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ServiceAction {
    /// Service name, may contain `${VAR}` placeholders.
    pub name: String,
    /// Snapshot entry name for the TOML payload.
    pub archive: String,
}

impl ServiceAction {
    pub fn new(name: impl Into<String>, archive: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            archive: archive.into(),
        }
    }

    pub fn description(&self) -> String {
        format!("Service: {}", self.name)
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("archive", self.archive.clone()),
        ]
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let name = ctx.resolve(&self.name);

        let config = match ctx.backends().services.query(&name) {
            Ok(Some(config)) => config,
            Ok(None) => {
                return ctx.report_error("Service not found", &name);
            }
            Err(err) => {
                return ctx.report_error("Failed to query service", &format!("{name}: {err}"));
            }
        };

        let payload = match toml::to_string(&config) {
            Ok(payload) => payload,
            Err(err) => {
                return ctx.report_error(
                    "Failed to serialize service config",
                    &format!("{name}: {err}"),
                );
            }
        };
        if let Err(err) = ctx.writer()?.write_text(&self.archive, &payload) {
            return ctx.report_error(
                "Failed to write service config to snapshot",
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
            info!("[SIMULATE] Would restore service: {}", name);
            return Ok(());
        }

        let raw = ctx.require_reader()?.read_text(&self.archive)?;
        let payload = ctx.resolve(&raw);
        let config: ServiceConfig = match toml::from_str(&payload) {
            Ok(config) => config,
            Err(err) => {
                return ctx.report_error(
                    "Failed to parse service config from snapshot",
                    &format!("{}: {}", self.archive, err),
                );
            }
        };

        if let Err(err) = ctx.backends().services.apply(&config) {
            return ctx.report_error("Failed to apply service config", &format!("{name}: {err}"));
        }

        if config.was_running {
            if let Err(err) = ctx.backends().services.start(&config.name) {
                ctx.callback()
                    .on_warning(&format!("Failed to start service {}: {err}", config.name));
            }
        }
        Ok(())
    }

    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let name = ctx.resolve(&self.name);
        if ctx.simulate() {
            info!("[SIMULATE] Would remove service: {}", name);
            return Ok(());
        }

        ctx.backends().services.stop(&name)?;
        ctx.backends().services.remove(&name)?;
        Ok(())
    }

    pub fn verify(&self, ctx: &mut ActionContext<'_>) -> VerifyResult {
        let name = ctx.resolve(&self.name);
        let expected = ctx
            .reader()
            .map(|r| r.exists(&self.archive))
            .unwrap_or(true);
        let found = matches!(ctx.backends().services.query(&name), Ok(Some(_)));
        super::presence_verdict(expected, found, "Service", &name)
    }
}
