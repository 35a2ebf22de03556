//! Launch an external program during a phase.

use crate::blueprint::Blueprint;
use crate::error::HookError;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RunProcessHook {
    /// Executable path, may contain `${VAR}` placeholders.
    pub path: String,
    /// Arguments in order, each variable-expanded before launch.
    pub args: Vec<String>,
    /// Wait for the process to exit (the default) or fire and forget.
    pub wait: bool,
    pub ignore_exit_code: bool,
}

impl RunProcessHook {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            wait: true,
            ignore_exit_code: false,
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("path", self.path.clone())];
        if !self.wait {
            params.push(("wait", "false".to_string()));
        }
        if self.ignore_exit_code {
            params.push(("ignore-exit-code", "true".to_string()));
        }
        params
    }

    pub fn execute(&self, blueprint: &Blueprint) -> Result<(), HookError> {
        let path = blueprint.resolve(&self.path);
        if !Path::new(&path).is_file() {
            return Err(HookError::ExecutableNotFound(path));
        }

        let mut command = Command::new(&path);
        for arg in &self.args {
            command.arg(blueprint.resolve(arg));
        }

        if !self.wait {
            let child = command.spawn()?;
            debug!("Launched {} (pid {}), not waiting", path, child.id());
            return Ok(());
        }

        let status = command.status()?;
        info!("{} exited with {}", path, status);
        if !status.success() && !self.ignore_exit_code {
            return Err(HookError::NonZeroExit(status.code().unwrap_or(-1)));
        }
        Ok(())
    }
}
