//! Hosts database entry capture and restore.
//!
//! The snapshot stores the mapping as TOML; an empty payload records
//! that the name had no mapping at capture time, so restore deletes it.

use crate::backend::HostsEntry;
use crate::context::ActionContext;
use crate::error::EngineError;
use crate::types::{VerifyResult, VerifyStatus};
use tracing::info;

#[derive(Debug, Clone)]
pub struct HostsEntryAction {
    /// Hostname, may contain `${VAR}` placeholders.
    pub hostname: String,
    /// Snapshot entry name for the TOML payload.
    pub archive: String,
}

impl HostsEntryAction {
    pub fn new(hostname: impl Into<String>, archive: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            archive: archive.into(),
        }
    }

    pub fn description(&self) -> String {
        format!("Hosts: {}", self.hostname)
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("hostname", self.hostname.clone()),
            ("archive", self.archive.clone()),
        ]
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let hostname = ctx.resolve(&self.hostname);

        let payload = match ctx.backends().hosts.find(&hostname) {
            Ok(Some(entry)) => match toml::to_string(&entry) {
                Ok(payload) => payload,
                Err(err) => {
                    return ctx.report_error(
                        "Failed to serialize hosts entry",
                        &format!("{hostname}: {err}"),
                    );
                }
            },
            Ok(None) => String::new(),
            Err(err) => {
                return ctx.report_error(
                    "Failed to read hosts entry",
                    &format!("{hostname}: {err}"),
                );
            }
        };

        if let Err(err) = ctx.writer()?.write_text(&self.archive, &payload) {
            return ctx.report_error(
                "Failed to write hosts entry to snapshot",
                &format!("{}: {}", self.archive, err),
            );
        }
        Ok(())
    }

    pub fn restore(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        if !ctx.check_archive_exists(&self.archive)? {
            return Ok(());
        }

        let hostname = ctx.resolve(&self.hostname);
        if ctx.simulate() {
            info!("[SIMULATE] Would restore hosts entry: {}", hostname);
            return Ok(());
        }

        let payload = ctx.require_reader()?.read_text(&self.archive)?;
        if payload.trim().is_empty() {
            ctx.backends().hosts.remove(&hostname)?;
            return Ok(());
        }

        let entry: HostsEntry = match toml::from_str(&payload) {
            Ok(entry) => entry,
            Err(err) => {
                return ctx.report_error(
                    "Failed to parse hosts entry from snapshot",
                    &format!("{}: {}", self.archive, err),
                );
            }
        };
        ctx.backends().hosts.set(&entry)?;
        Ok(())
    }

    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let hostname = ctx.resolve(&self.hostname);
        if ctx.simulate() {
            info!("[SIMULATE] Would remove hosts entry: {}", hostname);
            return Ok(());
        }

        ctx.backends().hosts.remove(&hostname)?;
        Ok(())
    }

    pub fn verify(&self, ctx: &mut ActionContext<'_>) -> VerifyResult {
        let hostname = ctx.resolve(&self.hostname);

        let expected: Option<HostsEntry> = match ctx.reader() {
            Some(reader) if reader.exists(&self.archive) => {
                match reader.read_text(&self.archive) {
                    Ok(payload) if payload.trim().is_empty() => None,
                    Ok(payload) => match toml::from_str(&payload) {
                        Ok(entry) => Some(entry),
                        Err(err) => {
                            return VerifyResult::new(
                                VerifyStatus::Mismatch,
                                format!("Unreadable hosts payload {}: {err}", self.archive),
                            );
                        }
                    },
                    Err(err) => {
                        return VerifyResult::new(
                            VerifyStatus::Mismatch,
                            format!("Unreadable hosts payload {}: {err}", self.archive),
                        );
                    }
                }
            }
            Some(_) => None,
            None => {
                // No snapshot: expect the mapping to exist at all.
                return match ctx.backends().hosts.find(&hostname) {
                    Ok(Some(_)) => VerifyResult::new(
                        VerifyStatus::Match,
                        format!("Hosts entry present: {hostname}"),
                    ),
                    Ok(None) => VerifyResult::new(
                        VerifyStatus::Missing,
                        format!("Hosts entry missing: {hostname}"),
                    ),
                    Err(err) => VerifyResult::new(
                        VerifyStatus::Mismatch,
                        format!("Failed to read hosts entry {hostname}: {err}"),
                    ),
                };
            }
        };

        let live = match ctx.backends().hosts.find(&hostname) {
            Ok(live) => live,
            Err(err) => {
                return VerifyResult::new(
                    VerifyStatus::Mismatch,
                    format!("Failed to read hosts entry {hostname}: {err}"),
                );
            }
        };

        match (expected, live) {
            (Some(want), Some(have)) if want.ip == have.ip => {
                VerifyResult::new(VerifyStatus::Match, format!("{hostname} -> {}", have.ip))
            }
            (Some(want), Some(have)) => VerifyResult::new(
                VerifyStatus::Mismatch,
                format!("{hostname}: expected {}, found {}", want.ip, have.ip),
            ),
            (Some(want), None) => VerifyResult::new(
                VerifyStatus::Missing,
                format!("{hostname}: expected {}, no mapping", want.ip),
            ),
            (None, Some(have)) => VerifyResult::new(
                VerifyStatus::Extra,
                format!("{hostname}: unexpected mapping to {}", have.ip),
            ),
            (None, None) => VerifyResult::new(
                VerifyStatus::Match,
                format!("{hostname} unmapped as expected"),
            ),
        }
    }
}
