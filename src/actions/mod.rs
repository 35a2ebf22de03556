//! Resource actions.
//!
//! Each action knows how to capture one resource into the snapshot
//! (backup), reapply it from the snapshot (restore), remove it from the
//! system (clean) and compare live state against the snapshot (verify).
//! The set of action kinds is closed; dispatch is a plain match.

pub mod copy_directory;
pub mod copy_file;
pub mod delimited_entry;
pub mod environment;
pub mod hosts;
pub mod multi_value_entry;
pub mod registry;
pub mod service;

pub use copy_directory::CopyDirectoryAction;
pub use copy_file::CopyFileAction;
pub use delimited_entry::DelimitedListEntryAction;
pub use environment::EnvironmentAction;
pub use hosts::HostsEntryAction;
pub use multi_value_entry::MultiValueListEntryAction;
pub use registry::RegistryAction;
pub use service::ServiceAction;

use crate::context::ActionContext;
use crate::error::EngineError;
use crate::types::VerifyResult;

#[derive(Debug, Clone)]
pub enum Action {
    CopyFile(CopyFileAction),
    CopyDirectory(CopyDirectoryAction),
    Registry(RegistryAction),
    Environment(EnvironmentAction),
    DelimitedListEntry(DelimitedListEntryAction),
    MultiValueListEntry(MultiValueListEntryAction),
    Service(ServiceAction),
    HostsEntry(HostsEntryAction),
}

impl Action {
    /// Element name in the blueprint document.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CopyFile(_) => "file",
            Action::CopyDirectory(_) => "files",
            Action::Registry(_) => "registry",
            Action::Environment(_) => "environment",
            Action::DelimitedListEntry(_) => "delimited",
            Action::MultiValueListEntry(_) => "multistring",
            Action::Service(_) => "service",
            Action::HostsEntry(_) => "hosts",
        }
    }

    /// Human-readable one-liner used in progress and error reports.
    pub fn description(&self) -> String {
        match self {
            Action::CopyFile(a) => a.description(),
            Action::CopyDirectory(a) => a.description(),
            Action::Registry(a) => a.description(),
            Action::Environment(a) => a.description(),
            Action::DelimitedListEntry(a) => a.description(),
            Action::MultiValueListEntry(a) => a.description(),
            Action::Service(a) => a.description(),
            Action::HostsEntry(a) => a.description(),
        }
    }

    /// Snapshot entry (or entry prefix) this action reads and writes.
    pub fn archive(&self) -> &str {
        match self {
            Action::CopyFile(a) => &a.archive,
            Action::CopyDirectory(a) => &a.archive,
            Action::Registry(a) => &a.archive,
            Action::Environment(a) => &a.archive,
            Action::DelimitedListEntry(a) => &a.archive,
            Action::MultiValueListEntry(a) => &a.archive,
            Action::Service(a) => &a.archive,
            Action::HostsEntry(a) => &a.archive,
        }
    }

    /// Attribute list for serialization, in document order. Child
    /// elements (include/exclude filters) are handled by the serializer.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Action::CopyFile(a) => a.to_params(),
            Action::CopyDirectory(a) => a.to_params(),
            Action::Registry(a) => a.to_params(),
            Action::Environment(a) => a.to_params(),
            Action::DelimitedListEntry(a) => a.to_params(),
            Action::MultiValueListEntry(a) => a.to_params(),
            Action::Service(a) => a.to_params(),
            Action::HostsEntry(a) => a.to_params(),
        }
    }

    pub fn backup(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        ctx.callback().on_progress("Backup", &self.description(), None);
        match self {
            Action::CopyFile(a) => a.backup(ctx),
            Action::CopyDirectory(a) => a.backup(ctx),
            Action::Registry(a) => a.backup(ctx),
            Action::Environment(a) => a.backup(ctx),
            Action::DelimitedListEntry(a) => a.backup(ctx),
            Action::MultiValueListEntry(a) => a.backup(ctx),
            Action::Service(a) => a.backup(ctx),
            Action::HostsEntry(a) => a.backup(ctx),
        }
    }

    pub fn restore(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        ctx.callback().on_progress("Restore", &self.description(), None);
        match self {
            Action::CopyFile(a) => a.restore(ctx),
            Action::CopyDirectory(a) => a.restore(ctx),
            Action::Registry(a) => a.restore(ctx),
            Action::Environment(a) => a.restore(ctx),
            Action::DelimitedListEntry(a) => a.restore(ctx),
            Action::MultiValueListEntry(a) => a.restore(ctx),
            Action::Service(a) => a.restore(ctx),
            Action::HostsEntry(a) => a.restore(ctx),
        }
    }

    /// Clean wraps the variant-specific removal in the Decision protocol:
    /// a residual failure is reported to the callback, which chooses
    /// between continuing and aborting.
    pub fn clean(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        ctx.callback().on_progress("Clean", &self.description(), None);
        let result = match self {
            Action::CopyFile(a) => a.clean(ctx),
            Action::CopyDirectory(a) => a.clean(ctx),
            Action::Registry(a) => a.clean(ctx),
            Action::Environment(a) => a.clean(ctx),
            Action::DelimitedListEntry(a) => a.clean(ctx),
            Action::MultiValueListEntry(a) => a.clean(ctx),
            Action::Service(a) => a.clean(ctx),
            Action::HostsEntry(a) => a.clean(ctx),
        };
        match result {
            Ok(()) => Ok(()),
            Err(EngineError::Aborted) => Err(EngineError::Aborted),
            Err(err) => ctx.report_error(
                "Clean failed",
                &format!("{}: {}", self.description(), err),
            ),
        }
    }

    pub fn verify(&self, ctx: &mut ActionContext<'_>) -> VerifyResult {
        match self {
            Action::CopyFile(a) => a.verify(ctx),
            Action::CopyDirectory(a) => a.verify(ctx),
            Action::Registry(a) => a.verify(ctx),
            Action::Environment(a) => a.verify(ctx),
            Action::DelimitedListEntry(a) => a.verify(ctx),
            Action::MultiValueListEntry(a) => a.verify(ctx),
            Action::Service(a) => a.verify(ctx),
            Action::HostsEntry(a) => a.verify(ctx),
        }
    }
}

/// Existence-only verdict shared by the file, directory and registry
/// variants: the snapshot (when present) sets the expectation, the live
/// system provides the observation.
pub(crate) fn presence_verdict(
    expected: bool,
    found: bool,
    what: &str,
    target: &str,
) -> VerifyResult {
    use crate::types::VerifyStatus;
    match (expected, found) {
        (true, true) => VerifyResult::new(VerifyStatus::Match, format!("{what} present: {target}")),
        (true, false) => {
            VerifyResult::new(VerifyStatus::Missing, format!("{what} missing: {target}"))
        }
        (false, true) => {
            VerifyResult::new(VerifyStatus::Extra, format!("{what} not expected: {target}"))
        }
        (false, false) => VerifyResult::new(
            VerifyStatus::Match,
            format!("{what} absent as expected: {target}"),
        ),
    }
}
