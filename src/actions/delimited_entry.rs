//! Membership of one entry in a delimited list value (PATH-style).
//!
//! The snapshot stores a presence marker, not the whole list: restore
//! re-adds or removes the entry without clobbering what other software
//! put in the list meanwhile.

use crate::context::ActionContext;
use crate::error::EngineError;
use crate::types::{InsertPosition, VerifyResult, VerifyStatus};
use tracing::info;

pub(crate) const MARKER_PRESENT: &str = "present";
pub(crate) const MARKER_ABSENT: &str = "absent";

#[derive(Debug, Clone)]
pub struct DelimitedListEntryAction {
    /// Key path holding the list value.
    pub key: String,
    /// Value name under the key.
    pub value: String,
    /// The list element whose membership is captured.
    pub entry: String,
    pub delimiter: String,
    pub insert: InsertPosition,
    /// Snapshot entry name for the marker.
    pub archive: String,
}

impl DelimitedListEntryAction {
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
            delimiter: ";".to_string(),
            insert: InsertPosition::Append,
            archive: archive.into(),
        }
    }

    pub fn description(&self) -> String {
        format!("List entry: {} in {}", self.entry, self.key)
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("key", self.key.clone()),
            ("value", self.value.clone()),
            ("entry", self.entry.clone()),
        ];
        if self.delimiter != ";" {
            params.push(("delimiter", self.delimiter.clone()));
        }
        if self.insert != InsertPosition::Append {
            params.push(("insert", self.insert.as_str().to_string()));
        }
        params.push(("archive", self.archive.clone()));
        params
    }

    fn split(&self, raw: &str) -> Vec<String> {
        raw.split(&self.delimiter)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn contains(items: &[String], entry: &str) -> bool {
        items.iter().any(|item| item.eq_ignore_ascii_case(entry))
    }

    /// Live list for the resolved key/value, or `None` if the value does
    /// not exist.
    fn current(
        &self,
        ctx: &ActionContext<'_>,
        key: &str,
        value: &str,
    ) -> Result<Option<Vec<String>>, EngineError> {
        Ok(ctx
            .backends()
            .keys
            .get_string(key, value)?
            .map(|raw| self.split(&raw)))
    }

    fn store(
        &self,
        ctx: &ActionContext<'_>,
        key: &str,
        value: &str,
        items: &[String],
    ) -> Result<(), EngineError> {
        ctx.backends()
            .keys
            .set_string(key, value, &items.join(&self.delimiter))?;
        Ok(())
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let key = ctx.resolve(&self.key);
        let value = ctx.resolve(&self.value);
        let entry = ctx.resolve(&self.entry);

        let present = match self.current(ctx, &key, &value) {
            Ok(items) => items.map(|i| Self::contains(&i, &entry)).unwrap_or(false),
            Err(err) => {
                return ctx.report_error(
                    "Failed to read list value",
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
            info!("[SIMULATE] Would restore list entry: {} in {}", entry, key);
            return Ok(());
        }

        let marker = ctx.require_reader()?.read_text(&self.archive)?;
        let want_present = marker.trim().eq_ignore_ascii_case(MARKER_PRESENT);

        let mut items = self.current(ctx, &key, &value)?.unwrap_or_default();
        let has = Self::contains(&items, &entry);

        if want_present {
            if !has {
                match self.insert {
                    InsertPosition::Prepend => items.insert(0, entry),
                    InsertPosition::Append => items.push(entry),
                }
                self.store(ctx, &key, &value, &items)?;
            }
        } else if has {
            items.retain(|item| !item.eq_ignore_ascii_case(&entry));
            self.store(ctx, &key, &value, &items)?;
        }
        Ok(())
    }

    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let key = ctx.resolve(&self.key);
        let value = ctx.resolve(&self.value);
        let entry = ctx.resolve(&self.entry);
        if ctx.simulate() {
            info!("[SIMULATE] Would remove list entry: {} from {}", entry, key);
            return Ok(());
        }

        if let Some(mut items) = self.current(ctx, &key, &value)? {
            if Self::contains(&items, &entry) {
                items.retain(|item| !item.eq_ignore_ascii_case(&entry));
                self.store(ctx, &key, &value, &items)?;
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

        let is_present = match self.current(ctx, &key, &value) {
            Ok(items) => items.map(|i| Self::contains(&i, &entry)).unwrap_or(false),
            Err(err) => {
                return VerifyResult::new(
                    VerifyStatus::Mismatch,
                    format!("Failed to read list value {key}\\{value}: {err}"),
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
