//! Phase hooks.
//!
//! Hooks run before and after the backup/restore/clean operations. They
//! are bound to a phase by their position in the blueprint's per-phase
//! lists; the executing phase is passed in because the substitute hook
//! changes direction with it.

pub mod kill_process;
pub mod query;
pub mod run_process;
pub mod substitute;

pub use kill_process::KillProcessHook;
pub use query::RunQueryHook;
pub use run_process::RunProcessHook;
pub use substitute::SubstituteInFileHook;

use crate::backend::Backends;
use crate::blueprint::Blueprint;
use crate::error::HookError;
use crate::types::Phase;

#[derive(Debug, Clone)]
pub enum Hook {
    KillProcess(KillProcessHook),
    RunProcess(RunProcessHook),
    SubstituteInFile(SubstituteInFileHook),
    RunQuery(RunQueryHook),
}

impl Hook {
    /// Element name in the blueprint document.
    pub fn kind(&self) -> &'static str {
        match self {
            Hook::KillProcess(_) => "kill",
            Hook::RunProcess(_) => "run",
            Hook::SubstituteInFile(_) => "substitute",
            Hook::RunQuery(_) => "sql",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Hook::KillProcess(h) => format!("Kill process: {}", h.process),
            Hook::RunProcess(h) => format!("Run: {}", h.path),
            Hook::SubstituteInFile(h) => format!("Substitute in: {}", h.file),
            Hook::RunQuery(h) => format!("Query: {}", h.file),
        }
    }

    /// Attribute list for serialization, without the phase attribute
    /// (the serializer adds it from the list the hook sits in).
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Hook::KillProcess(h) => h.to_params(),
            Hook::RunProcess(h) => h.to_params(),
            Hook::SubstituteInFile(h) => h.to_params(),
            Hook::RunQuery(h) => h.to_params(),
        }
    }

    pub fn execute(
        &self,
        phase: Phase,
        blueprint: &Blueprint,
        backends: &Backends,
    ) -> Result<(), HookError> {
        match self {
            Hook::KillProcess(h) => h.execute(blueprint, backends),
            Hook::RunProcess(h) => h.execute(blueprint),
            Hook::SubstituteInFile(h) => h.execute(phase, blueprint),
            Hook::RunQuery(h) => h.execute(blueprint),
        }
    }
}
