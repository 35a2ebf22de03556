//! In-file variable substitution around backup and restore.
//!
//! Before backup, literal machine-specific values in the target files
//! are rewritten to `${VAR}` placeholders so the captured copies stay
//! portable. After restore, the placeholders are expanded back for this
//! machine. The file attribute may carry wildcards in its final
//! component.

use crate::blueprint::Blueprint;
use crate::error::HookError;
use crate::types::Phase;
use globset::GlobBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SubstituteInFileHook {
    /// Target file, may contain `${VAR}` placeholders and wildcards in
    /// the file name.
    pub file: String,
}

impl SubstituteInFileHook {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![("file", self.file.clone())]
    }

    fn matching_files(&self, blueprint: &Blueprint) -> Result<Vec<PathBuf>, HookError> {
        let resolved = blueprint.resolve(&self.file);
        let path = Path::new(&resolved);

        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return Ok(Vec::new()),
        };
        if !name.contains('*') && !name.contains('?') {
            return Ok(if path.is_file() {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            });
        }

        let matcher = GlobBuilder::new(&name)
            .case_insensitive(true)
            .build()?
            .compile_matcher();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut matches = Vec::new();
        let entries = match std::fs::read_dir(parent) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Cannot list {}: {}", parent.display(), err);
                return Ok(Vec::new());
            }
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && matcher.is_match(entry.file_name().to_string_lossy().as_ref())
            {
                matches.push(entry.path());
            }
        }
        matches.sort();
        Ok(matches)
    }

    pub fn execute(&self, phase: Phase, blueprint: &Blueprint) -> Result<(), HookError> {
        let forward = match phase {
            Phase::PreBackup => false,
            Phase::PostRestore => true,
            other => {
                warn!("Substitute hook has no effect in phase {}", other);
                return Ok(());
            }
        };

        // No matching file is fine: the application may simply not have
        // written it yet.
        for path in self.matching_files(blueprint)? {
            let content = std::fs::read_to_string(&path)?;
            let rewritten = if forward {
                blueprint.resolve(&content)
            } else {
                blueprint.unresolve(&content)
            };
            if rewritten != content {
                std::fs::write(&path, rewritten)?;
                debug!("Substituted variables in {}", path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn blueprint(root: &Path) -> Blueprint {
        let mut bp = Blueprint::new("app", "1.0");
        bp.set_user_variable("ROOT", root.to_string_lossy()).unwrap();
        bp.set_user_variable("DATADIR", "${ROOT}/data").unwrap();
        bp.resolve_user_variables().unwrap();
        bp
    }

    #[test]
    fn test_round_trip_through_both_phases() {
        let tmp = TempDir::new().unwrap();
        let bp = blueprint(tmp.path());

        let config = tmp.path().join("app.conf");
        let original = format!("dir={}/data\n", tmp.path().display());
        std::fs::write(&config, &original).unwrap();

        let hook = SubstituteInFileHook::new("${ROOT}/app.conf");

        hook.execute(Phase::PreBackup, &bp).unwrap();
        let masked = std::fs::read_to_string(&config).unwrap();
        assert_eq!(masked, "dir=${DATADIR}\n");

        hook.execute(Phase::PostRestore, &bp).unwrap();
        assert_eq!(std::fs::read_to_string(&config).unwrap(), original);
    }

    #[test]
    fn test_wildcard_matches_are_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        let bp = blueprint(tmp.path());

        std::fs::write(tmp.path().join("One.Cfg"), "x=${ROOT}").unwrap();
        std::fs::write(tmp.path().join("two.cfg"), "y=${ROOT}").unwrap();
        std::fs::write(tmp.path().join("skip.txt"), "z=${ROOT}").unwrap();

        let hook = SubstituteInFileHook::new("${ROOT}/*.cfg");
        hook.execute(Phase::PostRestore, &bp).unwrap();

        let root = tmp.path().display().to_string();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("One.Cfg")).unwrap(),
            format!("x={root}")
        );
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("two.cfg")).unwrap(),
            format!("y={root}")
        );
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("skip.txt")).unwrap(),
            "z=${ROOT}"
        );
    }

    #[test]
    fn test_no_match_is_success() {
        let tmp = TempDir::new().unwrap();
        let bp = blueprint(tmp.path());
        let hook = SubstituteInFileHook::new("${ROOT}/missing-*.ini");
        hook.execute(Phase::PreBackup, &bp).unwrap();
    }
}
