//! Operation sequencing: backup, restore, clean and verify.
//!
//! Each operation is a fixed sequence of hook phases and action passes.
//! The skip-all-errors flag set by a `Decision::SkipAll` answer carries
//! forward through every later pass of the same operation, and PostClean
//! hooks run even when the clean pass failed, so an application is never
//! left half-removed with its pre-clean services still stopped.

use crate::backend::Backends;
use crate::blueprint::{Blueprint, InstanceBlueprint};
use crate::context::{ActionCallback, ActionContext};
use crate::error::EngineError;
use crate::snapshot::{SnapshotReader, SnapshotWriter, BLUEPRINT_ENTRY};
use crate::types::{Decision, Phase, VerifyResult};
use std::path::Path;
use tracing::{info, warn};

pub struct Orchestrator<'a> {
    backends: &'a Backends,
    callback: &'a dyn ActionCallback,
    simulate: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(backends: &'a Backends, callback: &'a dyn ActionCallback) -> Self {
        Self {
            backends,
            callback,
            simulate: false,
        }
    }

    /// Dry-run mode: actions log what they would do without touching
    /// the system, and hooks are skipped entirely.
    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Capture the blueprint's resources into a new snapshot at `path`.
    pub fn backup(&self, blueprint: &Blueprint, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let path = path.as_ref();
        info!(snapshot = %path.display(), "starting backup");

        let mut skip_all = false;
        self.run_hooks(Phase::PreBackup, blueprint, &mut skip_all)?;

        if let Err(err) = self.write_snapshot(blueprint, path, &mut skip_all) {
            // A failed backup must not leave a half-written snapshot
            // behind where it could be mistaken for a usable one.
            let _ = std::fs::remove_file(path);
            return Err(err);
        }

        self.run_hooks(Phase::PostBackup, blueprint, &mut skip_all)?;
        info!(snapshot = %path.display(), "backup complete");
        Ok(())
    }

    fn write_snapshot(
        &self,
        blueprint: &Blueprint,
        path: &Path,
        skip_all: &mut bool,
    ) -> Result<(), EngineError> {
        let mut writer = SnapshotWriter::create(path)?;
        {
            let mut ctx =
                ActionContext::for_backup(blueprint, &mut writer, self.backends, self.callback);
            ctx.set_simulate(self.simulate);
            ctx.set_skip_all_errors(*skip_all);
            for action in blueprint.actions() {
                action.backup(&mut ctx)?;
            }
            *skip_all = ctx.skip_all_errors();
        }

        let metadata = blueprint.new_instance_metadata();
        let document = blueprint.to_instance_document(&metadata)?;
        writer.write_text(BLUEPRINT_ENTRY, &document)?;
        writer.finalize()?;
        Ok(())
    }

    /// Restore a snapshot using the given blueprint. Existing state is
    /// cleaned first, in reverse action order, so later resources never
    /// block the removal of what they depend on.
    pub fn restore(
        &self,
        blueprint: &Blueprint,
        path: impl AsRef<Path>,
    ) -> Result<(), EngineError> {
        let reader = SnapshotReader::open(path)?;
        self.restore_with(blueprint, &reader)
    }

    /// Restore a snapshot using the blueprint embedded in it.
    pub fn restore_archive(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let reader = SnapshotReader::open(path)?;
        let instance = InstanceBlueprint::load_from_archive(&reader)?;
        info!(
            machine = %instance.metadata().machine,
            captured = %instance.metadata().timestamp_string(),
            "restoring from embedded blueprint"
        );
        self.restore_with(instance.blueprint(), &reader)
    }

    fn restore_with(
        &self,
        blueprint: &Blueprint,
        reader: &SnapshotReader,
    ) -> Result<(), EngineError> {
        let mut skip_all = false;
        self.run_hooks(Phase::PreRestore, blueprint, &mut skip_all)?;

        let mut clean_ctx = ActionContext::for_clean(blueprint, self.backends, self.callback);
        clean_ctx.set_simulate(self.simulate);
        clean_ctx.set_skip_all_errors(skip_all);
        for action in blueprint.actions().iter().rev() {
            action.clean(&mut clean_ctx)?;
        }
        skip_all = clean_ctx.skip_all_errors();

        let mut ctx = ActionContext::for_restore(blueprint, reader, self.backends, self.callback);
        ctx.set_simulate(self.simulate);
        ctx.set_skip_all_errors(skip_all);
        for action in blueprint.actions() {
            action.restore(&mut ctx)?;
        }
        skip_all = ctx.skip_all_errors();

        self.run_hooks(Phase::PostRestore, blueprint, &mut skip_all)?;
        Ok(())
    }

    /// Remove every resource the blueprint names, in reverse action
    /// order. PostClean hooks run even when the action pass failed.
    pub fn clean(&self, blueprint: &Blueprint) -> Result<(), EngineError> {
        let mut skip_all = false;
        self.run_hooks(Phase::PreClean, blueprint, &mut skip_all)?;

        let mut ctx = ActionContext::for_clean(blueprint, self.backends, self.callback);
        ctx.set_simulate(self.simulate);
        ctx.set_skip_all_errors(skip_all);

        let mut outcome = Ok(());
        for action in blueprint.actions().iter().rev() {
            if let Err(err) = action.clean(&mut ctx) {
                outcome = Err(err);
                break;
            }
        }
        skip_all = ctx.skip_all_errors();

        let post = self.run_hooks(Phase::PostClean, blueprint, &mut skip_all);
        outcome.and(post)
    }

    /// Compare live system state against the snapshot (or, without one,
    /// against bare existence expectations). One result per action.
    pub fn verify(
        &self,
        blueprint: &Blueprint,
        reader: Option<&SnapshotReader>,
    ) -> Vec<VerifyResult> {
        let mut ctx = ActionContext::for_verify(blueprint, reader, self.backends, self.callback);
        blueprint
            .actions()
            .iter()
            .map(|action| {
                self.callback
                    .on_progress("Verify", &action.description(), None);
                action.verify(&mut ctx)
            })
            .collect()
    }

    /// Verify against a snapshot using the blueprint embedded in it.
    pub fn verify_archive(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<VerifyResult>, EngineError> {
        let reader = SnapshotReader::open(path)?;
        let instance = InstanceBlueprint::load_from_archive(&reader)?;
        Ok(self.verify(instance.blueprint(), Some(&reader)))
    }

    /// Run one phase's hooks. A hook failure consults the callback;
    /// anything short of `Abort` moves on to the next hook.
    fn run_hooks(
        &self,
        phase: Phase,
        blueprint: &Blueprint,
        skip_all: &mut bool,
    ) -> Result<(), EngineError> {
        let hooks = blueprint.hooks(phase);
        if hooks.is_empty() {
            return Ok(());
        }
        if self.simulate {
            info!("[SIMULATE] Skipping {} {} hook(s)", hooks.len(), phase);
            return Ok(());
        }

        for hook in hooks {
            self.callback.on_progress(phase.as_str(), &hook.description(), None);
            let err = match hook.execute(phase, blueprint, self.backends) {
                Ok(()) => continue,
                Err(err) => err,
            };

            if *skip_all {
                warn!("{} hook failed: {} (skipped)", phase, err);
                continue;
            }
            let decision = self.callback.on_error(
                &format!("Hook failed in {phase}"),
                &format!("{}: {}", hook.description(), err),
            );
            match decision {
                Decision::Abort => return Err(EngineError::Aborted),
                Decision::SkipAll => *skip_all = true,
                Decision::Retry | Decision::Skip | Decision::Continue => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContinueAllCallback;
    use crate::hooks::{Hook, RunProcessHook};
    use tempfile::TempDir;

    fn blueprint(root: &Path) -> Blueprint {
        let mut bp = Blueprint::new("app", "1.0");
        bp.set_user_variable("ROOT", root.to_string_lossy()).unwrap();
        bp.resolve_user_variables().unwrap();
        bp
    }

    #[test]
    fn test_backup_embeds_instance_blueprint() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("data")).unwrap();
        std::fs::write(tmp.path().join("data/a.txt"), "a").unwrap();

        let mut bp = blueprint(tmp.path());
        bp.add_action(crate::actions::Action::CopyDirectory(
            crate::actions::CopyDirectoryAction::new("${ROOT}/data", "files/data"),
        ));

        let backends = Backends::in_memory();
        let cb = ContinueAllCallback;
        let orch = Orchestrator::new(&backends, &cb);

        let snap = tmp.path().join("snap.zip");
        orch.backup(&bp, &snap).unwrap();

        let reader = SnapshotReader::open(&snap).unwrap();
        assert!(reader.exists(BLUEPRINT_ENTRY));
        let instance = InstanceBlueprint::load_from_archive(&reader).unwrap();
        assert_eq!(instance.blueprint().name(), "app");
        assert_eq!(instance.blueprint().actions().len(), 1);
    }

    #[test]
    fn test_failed_backup_removes_partial_snapshot() {
        let tmp = TempDir::new().unwrap();
        let mut bp = blueprint(tmp.path());
        bp.add_action(crate::actions::Action::CopyFile(
            crate::actions::CopyFileAction::new("${ROOT}/missing.txt", "files/missing.txt"),
        ));

        let backends = Backends::in_memory();
        let cb = crate::context::AbortOnErrorCallback;
        let orch = Orchestrator::new(&backends, &cb);

        let snap = tmp.path().join("snap.zip");
        let result = orch.backup(&bp, &snap);
        assert!(matches!(result, Err(EngineError::Aborted)));
        assert!(!snap.exists(), "partial snapshot left behind");
    }

    #[test]
    fn test_failed_hook_abort_stops_operation() {
        struct AbortingCallback;
        impl ActionCallback for AbortingCallback {
            fn on_progress(&self, _: &str, _: &str, _: Option<u8>) {}
            fn on_warning(&self, _: &str) {}
            fn on_error(&self, _: &str, _: &str) -> Decision {
                Decision::Abort
            }
            fn on_file_conflict(&self, _: &str, _: &str) -> Decision {
                Decision::Continue
            }
        }

        let tmp = TempDir::new().unwrap();
        let mut bp = blueprint(tmp.path());
        bp.add_hook(
            Phase::PreBackup,
            Hook::RunProcess(RunProcessHook::new("/no/such/binary")),
        );

        let backends = Backends::in_memory();
        let cb = AbortingCallback;
        let orch = Orchestrator::new(&backends, &cb);
        let result = orch.backup(&bp, tmp.path().join("snap.zip"));
        assert!(matches!(result, Err(EngineError::Aborted)));
    }

    #[test]
    fn test_simulate_skips_hooks_and_disk_changes() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "live").unwrap();

        let mut bp = blueprint(tmp.path());
        bp.add_action(crate::actions::Action::CopyFile(
            crate::actions::CopyFileAction::new("${ROOT}/a.txt", "files/a.txt"),
        ));
        // Would fail loudly if executed.
        bp.add_hook(
            Phase::PreRestore,
            Hook::RunProcess(RunProcessHook::new("/no/such/binary")),
        );

        let backends = Backends::in_memory();
        let cb = ContinueAllCallback;
        let orch = Orchestrator::new(&backends, &cb);
        let snap = tmp.path().join("snap.zip");
        orch.backup(&bp, &snap).unwrap();

        std::fs::write(tmp.path().join("a.txt"), "changed").unwrap();

        let sim = Orchestrator::new(&backends, &cb).with_simulate(true);
        sim.restore(&bp, &snap).unwrap();
        // Simulate must not roll the file back.
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("a.txt")).unwrap(),
            "changed"
        );
    }
}
