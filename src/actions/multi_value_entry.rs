//! Membership of one entry in a multi-string key value.
//!
//! Same marker scheme as the delimited variant, but over the key store's
//! native multi-string type instead of a joined single string.

use crate::actions::delimited_entry::{MARKER_ABSENT, MARKER_PRESENT};
use crate::context::ActionContext;
use crate::error::EngineError;
use crate::types::{VerifyResult, VerifyStatus};
use tracing::info;

#[derive(Debug, Clone)]
pub struct MultiValueListEntryAction {
    pub key: String,
    pub value: String,
    pub entry: String,
    /// Snapshot entry name for the marker.
    pub archive: String,
}

impl MultiValueListEntryAction {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        entry: impl Into<String>,
        archive: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            entry: entry.into(),
            archive: archive.into(),
        }
    }

    pub fn description(&self) -> String {
        format!("Multi-string entry: {} in {}", self.entry, self.key)
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.key.clone()),
            ("value", self.value.clone()),
            ("entry", self.entry.clone()),
            ("archive", self.archive.clone()),
        ]
    }

    fn contains(items: &[String], entry: &str) -> bool {
        items.iter().any(|item| item.eq_ignore_ascii_case(entry))
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let key = ctx.resolve(&self.key);
        let value = ctx.resolve(&self.value);
        let entry = ctx.resolve(&self.entry);

        let present = match ctx.backends().keys.get_multi_string(&key, &value) {
            Ok(items) => items.map(|i| Self::contains(&i, &entry)).unwrap_or(false),
            Err(err) => {
                return ctx.report_error(
                    "Failed to read multi-string value",
                    &format!("{key}\\{value}: {err}"),
                );
            }
        };

        let marker = if present { MARKER_PRESENT } else { MARKER_ABSENT };
        if let Err(err) = ctx.writer()?.write_text(&self.archive, marker) {
            return ctx.report_error(
                "Failed to write list marker to snapshot",
                &format!("{}: {}", self.archive, err),
            );
        }
        Ok(())
    }

    pub fn restore(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        if !ctx.check_archive_exists(&self.archive)? {
            return Ok(());
        }

        let key = ctx.resolve(&self.key);
        let value = ctx.resolve(&self.value);
        let entry = ctx.resolve(&self.entry);
        if ctx.simulate() {
            info!(
                "[SIMULATE] Would restore multi-string entry: {} in {}",
                entry, key
            );
            return Ok(());
        }

        let marker = ctx.require_reader()?.read_text(&self.archive)?;
        let want_present = marker.trim().eq_ignore_ascii_case(MARKER_PRESENT);

        let mut items = ctx
            .backends()
            .keys
            .get_multi_string(&key, &value)?
            .unwrap_or_default();
        let has = Self::contains(&items, &entry);

        if want_present && !has {
            items.push(entry);
            ctx.backends().keys.set_multi_string(&key, &value, &items)?;
        } else if !want_present && has {
            items.retain(|item| !item.eq_ignore_ascii_case(&entry));
            ctx.backends().keys.set_multi_string(&key, &value, &items)?;
        }
        Ok(())
    }

    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let key = ctx.resolve(&self.key);
        let value = ctx.resolve(&self.value);
        let entry = ctx.resolve(&self.entry);
        if ctx.simulate() {
            info!(
                "[SIMULATE] Would remove multi-string entry: {} from {}",
                entry, key
            );
            return Ok(());
        }

        if let Some(mut items) = ctx.backends().keys.get_multi_string(&key, &value)? {
            if Self::contains(&items, &entry) {
                items.retain(|item| !item.eq_ignore_ascii_case(&entry));
                ctx.backends().keys.set_multi_string(&key, &value, &items)?;
            }
        }
        Ok(())
    }

    pub fn verify(&self, ctx: &mut ActionContext<'_>) -> VerifyResult {
        let key = ctx.resolve(&self.key);
        let value = ctx.resolve(&self.value);
        let entry = ctx.resolve(&self.entry);

        let want_present = match ctx.reader() {
            Some(reader) if reader.exists(&self.archive) => match reader.read_text(&self.archive) {
                Ok(marker) => marker.trim().eq_ignore_ascii_case(MARKER_PRESENT),
                Err(err) => {
                    return VerifyResult::new(
                        VerifyStatus::Mismatch,
                        format!("Unreadable marker {}: {err}", self.archive),
                    );
                }
            },
            _ => true,
        };

        let is_present = match ctx.backends().keys.get_multi_string(&key, &value) {
            Ok(items) => items.map(|i| Self::contains(&i, &entry)).unwrap_or(false),
            Err(err) => {
                return VerifyResult::new(
                    VerifyStatus::Mismatch,
                    format!("Failed to read multi-string value {key}\\{value}: {err}"),
                );
            }
        };

        if want_present == is_present {
            VerifyResult::new(VerifyStatus::Match, format!("{entry} membership matches"))
        } else {
            VerifyResult::new(
                VerifyStatus::Mismatch,
                format!(
                    "{entry}: expected {}, found {}",
                    if want_present { MARKER_PRESENT } else { MARKER_ABSENT },
                    if is_present { MARKER_PRESENT } else { MARKER_ABSENT },
                ),
            )
        }
    }
}
