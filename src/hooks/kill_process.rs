//! Terminate processes by image name before touching their files.

use crate::backend::Backends;
use crate::blueprint::Blueprint;
use crate::error::{BackendError, HookError};
use tracing::{debug, info};

pub const DEFAULT_KILL_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct KillProcessHook {
    /// Image name, may contain `${VAR}` placeholders.
    pub process: String,
    /// Per-process wait before force-terminating.
    pub timeout_ms: u64,
}

impl KillProcessHook {
    pub fn new(process: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            timeout_ms: DEFAULT_KILL_TIMEOUT_MS,
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("process", self.process.clone())];
        if self.timeout_ms != DEFAULT_KILL_TIMEOUT_MS {
            params.push(("timeout", self.timeout_ms.to_string()));
        }
        params
    }

    pub fn execute(&self, blueprint: &Blueprint, backends: &Backends) -> Result<(), HookError> {
        let name = blueprint.resolve(&self.process);
        match backends.processes.kill(&name, self.timeout_ms) {
            Ok(count) => {
                info!("Terminated {} process(es) named {}", count, name);
                Ok(())
            }
            // Nothing to kill is the desired end state.
            Err(BackendError::NotFound(_)) => {
                debug!("No process named {} found", name);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryProcessControl;
    use crate::backend::Backends;

    #[test]
    fn test_kill_resolves_name_and_passes_timeout() {
        let mut bp = Blueprint::new("app", "1.0");
        bp.set_user_variable("EXE", "acmed.exe").unwrap();
        bp.resolve_user_variables().unwrap();

        let processes = std::sync::Arc::new(MemoryProcessControl::default());
        let mut backends = Backends::in_memory();
        backends.processes = Box::new(processes.clone());

        let mut hook = KillProcessHook::new("${EXE}");
        hook.timeout_ms = 250;
        hook.execute(&bp, &backends).unwrap();
        assert_eq!(processes.requests(), vec!["acmed.exe".to_string()]);
    }
}
