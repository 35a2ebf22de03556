//! Execution context threaded through every action.
//!
//! The context carries the blueprint, the open snapshot (read or write
//! side, depending on the operation), the resource backends and the
//! callback. It also owns the error-handling state of the Decision
//! protocol: once a callback answers `SkipAll`, every later recoverable
//! failure in the same operation (and the phases that follow it) is
//! skipped without asking again.

use crate::backend::Backends;
use crate::blueprint::{vars, Blueprint};
use crate::error::EngineError;
use crate::snapshot::{SnapshotReader, SnapshotWriter};
use crate::types::Decision;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Feedback channel for long-running operations. Implementations can be
/// a CLI (auto-abort) or a GUI (show dialogs).
pub trait ActionCallback {
    /// Progress report. `percent` is `None` for indeterminate steps.
    fn on_progress(&self, phase: &str, detail: &str, percent: Option<u8>);

    /// Warning notification; execution continues.
    fn on_warning(&self, message: &str);

    /// Recoverable error; the returned decision steers the operation.
    fn on_error(&self, message: &str, context: &str) -> Decision;

    /// A restore target already exists. `Continue` overwrites, `Skip`
    /// leaves the existing resource, `Abort` stops.
    fn on_file_conflict(&self, path: &str, action: &str) -> Decision;
}

/// Logs everything and aborts on the first error. The right default for
/// unattended runs.
pub struct AbortOnErrorCallback;

impl ActionCallback for AbortOnErrorCallback {
    fn on_progress(&self, phase: &str, detail: &str, _percent: Option<u8>) {
        info!("[{}] {}", phase, detail);
    }

    fn on_warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn on_error(&self, message: &str, context: &str) -> Decision {
        error!("{}: {}", message, context);
        Decision::Abort
    }

    fn on_file_conflict(&self, path: &str, action: &str) -> Decision {
        warn!("File conflict: {} ({})", path, action);
        Decision::Continue
    }
}

/// Continues past every recoverable error. Useful for best-effort cleans.
pub struct ContinueAllCallback;

impl ActionCallback for ContinueAllCallback {
    fn on_progress(&self, _phase: &str, _detail: &str, _percent: Option<u8>) {}

    fn on_warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn on_error(&self, message: &str, context: &str) -> Decision {
        warn!("{}: {} (continuing)", message, context);
        Decision::Continue
    }

    fn on_file_conflict(&self, _path: &str, _action: &str) -> Decision {
        Decision::Continue
    }
}

/// What to do with an already existing restore target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Overwrite,
    Skip,
}

pub struct ActionContext<'a> {
    blueprint: &'a Blueprint,
    reader: Option<&'a SnapshotReader>,
    writer: Option<&'a mut SnapshotWriter>,
    backends: &'a Backends,
    callback: &'a dyn ActionCallback,
    simulate: bool,
    skip_all_errors: bool,
    overrides: HashMap<String, String>,
    /// Blueprint variables merged with overrides, rebuilt lazily.
    merged: Option<HashMap<String, String>>,
}

impl<'a> ActionContext<'a> {
    pub fn for_backup(
        blueprint: &'a Blueprint,
        writer: &'a mut SnapshotWriter,
        backends: &'a Backends,
        callback: &'a dyn ActionCallback,
    ) -> Self {
        Self::new(blueprint, None, Some(writer), backends, callback)
    }

    pub fn for_restore(
        blueprint: &'a Blueprint,
        reader: &'a SnapshotReader,
        backends: &'a Backends,
        callback: &'a dyn ActionCallback,
    ) -> Self {
        Self::new(blueprint, Some(reader), None, backends, callback)
    }

    pub fn for_clean(
        blueprint: &'a Blueprint,
        backends: &'a Backends,
        callback: &'a dyn ActionCallback,
    ) -> Self {
        Self::new(blueprint, None, None, backends, callback)
    }

    /// Verification may run against a snapshot or against the blueprint
    /// alone.
    pub fn for_verify(
        blueprint: &'a Blueprint,
        reader: Option<&'a SnapshotReader>,
        backends: &'a Backends,
        callback: &'a dyn ActionCallback,
    ) -> Self {
        Self::new(blueprint, reader, None, backends, callback)
    }

    fn new(
        blueprint: &'a Blueprint,
        reader: Option<&'a SnapshotReader>,
        writer: Option<&'a mut SnapshotWriter>,
        backends: &'a Backends,
        callback: &'a dyn ActionCallback,
    ) -> Self {
        Self {
            blueprint,
            reader,
            writer,
            backends,
            callback,
            simulate: false,
            skip_all_errors: false,
            overrides: HashMap::new(),
            merged: None,
        }
    }

    pub fn blueprint(&self) -> &Blueprint {
        self.blueprint
    }

    pub fn reader(&self) -> Option<&SnapshotReader> {
        self.reader
    }

    pub fn require_reader(&self) -> Result<&SnapshotReader, EngineError> {
        self.reader.ok_or(EngineError::SnapshotUnavailable)
    }

    pub fn writer(&mut self) -> Result<&mut SnapshotWriter, EngineError> {
        self.writer
            .as_deref_mut()
            .ok_or(EngineError::SnapshotUnavailable)
    }

    pub fn backends(&self) -> &Backends {
        self.backends
    }

    pub fn callback(&self) -> &dyn ActionCallback {
        self.callback
    }

    pub fn simulate(&self) -> bool {
        self.simulate
    }

    pub fn set_simulate(&mut self, value: bool) {
        self.simulate = value;
    }

    pub fn skip_all_errors(&self) -> bool {
        self.skip_all_errors
    }

    pub fn set_skip_all_errors(&mut self, value: bool) {
        self.skip_all_errors = value;
    }

    /// Set a runtime variable override on top of the blueprint variables.
    /// The value is expanded against the current effective variables at
    /// set time, so overrides may reference blueprint variables.
    pub fn set_override(&mut self, name: impl Into<String>, value: &str) {
        let expanded = vars::expand(value, self.variables_ref());
        self.overrides.insert(name.into(), expanded);
        self.merged = None;
    }

    fn variables_ref(&mut self) -> &HashMap<String, String> {
        if self.merged.is_none() {
            let mut merged = self.blueprint.resolved_variables().clone();
            for (name, value) in &self.overrides {
                merged.insert(name.clone(), value.clone());
            }
            self.merged = Some(merged);
        }
        // Filled directly above.
        self.merged.as_ref().unwrap_or(self.blueprint.resolved_variables())
    }

    /// Effective variables: blueprint variables with overrides applied.
    pub fn variables(&mut self) -> &HashMap<String, String> {
        self.variables_ref()
    }

    /// Expand `${VAR}` placeholders against the effective variables.
    pub fn resolve(&mut self, input: &str) -> String {
        vars::expand(input, self.variables_ref())
    }

    /// Like [`ActionContext::resolve`], with `encode` applied to each
    /// substituted value. Used for content whose syntax escapes variable
    /// values, e.g. the quoted strings of a key-store export.
    pub fn resolve_encoded(&mut self, input: &str, encode: impl Fn(&str) -> String) -> String {
        let encoded: HashMap<String, String> = self
            .variables_ref()
            .iter()
            .map(|(name, value)| (name.clone(), encode(value)))
            .collect();
        vars::expand(input, &encoded)
    }

    /// Apply a decision for a single-shot (non-retryable) failure.
    /// `Retry` is not meaningful here and aborts.
    pub fn handle_decision(&mut self, decision: Decision) -> Result<(), EngineError> {
        match decision {
            Decision::Continue | Decision::Skip => Ok(()),
            Decision::SkipAll => {
                self.skip_all_errors = true;
                Ok(())
            }
            Decision::Retry | Decision::Abort => Err(EngineError::Aborted),
        }
    }

    /// Report a recoverable error and apply the callback's decision.
    pub fn report_error(&mut self, message: &str, detail: &str) -> Result<(), EngineError> {
        if self.skip_all_errors {
            warn!("{}: {} (skipped)", message, detail);
            return Ok(());
        }
        let decision = self.callback.on_error(message, detail);
        self.handle_decision(decision)
    }

    /// Check that an entry exists in the snapshot before restoring from
    /// it. `Ok(true)` means proceed, `Ok(false)` means skip this action.
    pub fn check_archive_exists(&mut self, archive_path: &str) -> Result<bool, EngineError> {
        let reader = self.require_reader()?;
        if reader.exists(archive_path) {
            return Ok(true);
        }

        if self.skip_all_errors {
            warn!("Archive path does not exist in snapshot: {}", archive_path);
            return Ok(false);
        }

        let decision = self
            .callback
            .on_error("Archive path does not exist in snapshot", archive_path);
        self.handle_decision(decision)?;
        Ok(false)
    }

    /// Consult the callback about an existing restore target.
    pub fn file_conflict(
        &mut self,
        path: &str,
        action: &str,
    ) -> Result<ConflictChoice, EngineError> {
        match self.callback.on_file_conflict(path, action) {
            Decision::Abort => Err(EngineError::Aborted),
            Decision::Skip => Ok(ConflictChoice::Skip),
            Decision::Continue | Decision::Retry | Decision::SkipAll => {
                Ok(ConflictChoice::Overwrite)
            }
        }
    }

    /// Run one retryable item. On failure the callback chooses between
    /// retrying the same item, skipping it, skipping all further errors,
    /// or aborting. `Aborted` from the item itself always propagates.
    pub fn run_item<F>(&mut self, message: &str, detail: &str, mut op: F) -> Result<(), EngineError>
    where
        F: FnMut(&mut Self) -> Result<(), EngineError>,
    {
        loop {
            let err = match op(self) {
                Ok(()) => return Ok(()),
                Err(EngineError::Aborted) => return Err(EngineError::Aborted),
                Err(err) => err,
            };

            if self.skip_all_errors {
                warn!("{}: {}: {} (skipped)", message, detail, err);
                return Ok(());
            }

            match self
                .callback
                .on_error(message, &format!("{detail}: {err}"))
            {
                Decision::Retry => continue,
                Decision::Skip | Decision::Continue => return Ok(()),
                Decision::SkipAll => {
                    self.skip_all_errors = true;
                    return Ok(());
                }
                Decision::Abort => return Err(EngineError::Aborted),
            }
        }
    }
}
