//! Error steering across whole operations: skip, skip-all stickiness
//! between passes, abort unwinding, and the guaranteed post-clean phase.

use parking_lot::Mutex;
use reinstate::actions::{Action, CopyFileAction, RegistryAction};
use reinstate::backend::{Backends, KeyStore};
use reinstate::error::{BackendError, EngineError};
use reinstate::types::Decision;
use reinstate::{
    AbortOnErrorCallback, ActionCallback, Blueprint, Orchestrator, SnapshotWriter,
};
use tempfile::TempDir;

/// Answers from a scripted list, then aborts.
struct ScriptedCallback {
    answers: Mutex<Vec<Decision>>,
    errors_seen: Mutex<Vec<String>>,
}

impl ScriptedCallback {
    fn new(answers: Vec<Decision>) -> Self {
        Self {
            answers: Mutex::new(answers),
            errors_seen: Mutex::new(Vec::new()),
        }
    }
}

impl ActionCallback for ScriptedCallback {
    fn on_progress(&self, _phase: &str, _detail: &str, _percent: Option<u8>) {}
    fn on_warning(&self, _message: &str) {}

    fn on_error(&self, message: &str, context: &str) -> Decision {
        self.errors_seen.lock().push(format!("{message}: {context}"));
        let mut answers = self.answers.lock();
        if answers.is_empty() {
            Decision::Abort
        } else {
            answers.remove(0)
        }
    }

    fn on_file_conflict(&self, _path: &str, _action: &str) -> Decision {
        Decision::Continue
    }
}

/// Key store where every delete fails. Other operations succeed vacuously.
#[derive(Default)]
struct FailingKeyStore;

impl KeyStore for FailingKeyStore {
    fn key_exists(&self, _key: &str) -> bool {
        true
    }
    fn export_subtree(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(Some(format!("[{key}]\n")))
    }
    fn import_subtree(&self, _content: &str) -> Result<(), BackendError> {
        Ok(())
    }
    fn delete_subtree(&self, key: &str) -> Result<(), BackendError> {
        Err(BackendError::AccessDenied(key.to_string()))
    }
    fn get_string(&self, _key: &str, _value: &str) -> Result<Option<String>, BackendError> {
        Ok(None)
    }
    fn set_string(&self, _key: &str, _value: &str, _data: &str) -> Result<(), BackendError> {
        Ok(())
    }
    fn get_multi_string(
        &self,
        _key: &str,
        _value: &str,
    ) -> Result<Option<Vec<String>>, BackendError> {
        Ok(None)
    }
    fn set_multi_string(
        &self,
        _key: &str,
        _value: &str,
        _data: &[String],
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

fn undeletable_backends() -> Backends {
    let mut backends = Backends::in_memory();
    backends.keys = Box::new(FailingKeyStore);
    backends
}

fn blueprint(root: &std::path::Path) -> Blueprint {
    let mut bp = Blueprint::new("app", "1.0");
    bp.set_user_variable("ROOT", root.to_string_lossy()).unwrap();
    bp.resolve_user_variables().unwrap();
    bp
}

/// Snapshot holding a single file entry, written without a blueprint.
fn snapshot_with_file(dir: &std::path::Path, entry: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join("snap.zip");
    let mut writer = SnapshotWriter::create(&path).unwrap();
    writer.write_text(entry, content).unwrap();
    writer.finalize().unwrap();
    path
}

#[test]
fn test_skip_moves_past_missing_archive_entry() {
    let tmp = TempDir::new().unwrap();
    let snap = snapshot_with_file(tmp.path(), "files/a.txt", "payload");

    let mut bp = blueprint(tmp.path());
    bp.add_action(Action::CopyFile(CopyFileAction::new(
        "${ROOT}/gone.txt",
        "files/never-captured.txt",
    )));
    bp.add_action(Action::CopyFile(CopyFileAction::new(
        "${ROOT}/a.txt",
        "files/a.txt",
    )));

    let backends = Backends::in_memory();
    let cb = ScriptedCallback::new(vec![Decision::Skip]);
    Orchestrator::new(&backends, &cb).restore(&bp, &snap).unwrap();

    // The missing entry was skipped; the present one still restored.
    assert!(!tmp.path().join("gone.txt").exists());
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("a.txt")).unwrap(),
        "payload"
    );
    assert_eq!(cb.errors_seen.lock().len(), 1);
}

#[test]
fn test_abort_unwinds_restore() {
    let tmp = TempDir::new().unwrap();
    let snap = snapshot_with_file(tmp.path(), "files/a.txt", "payload");

    let mut bp = blueprint(tmp.path());
    bp.add_action(Action::CopyFile(CopyFileAction::new(
        "${ROOT}/gone.txt",
        "files/never-captured.txt",
    )));
    bp.add_action(Action::CopyFile(CopyFileAction::new(
        "${ROOT}/a.txt",
        "files/a.txt",
    )));

    let backends = Backends::in_memory();
    let cb = AbortOnErrorCallback;
    let result = Orchestrator::new(&backends, &cb).restore(&bp, &snap);
    assert!(matches!(result, Err(EngineError::Aborted)));
    // The abort hit the first action, so the second never ran.
    assert!(!tmp.path().join("a.txt").exists());
}

#[test]
fn test_skip_all_carries_from_clean_pass_to_restore_pass() {
    let tmp = TempDir::new().unwrap();
    let snap = snapshot_with_file(tmp.path(), "placeholder.txt", "x");

    let mut bp = blueprint(tmp.path());
    bp.add_action(Action::Registry(RegistryAction::new(
        "HKCU\\Software\\Acme",
        "registry/acme.reg",
    )));
    bp.add_action(Action::CopyFile(CopyFileAction::new(
        "${ROOT}/gone.txt",
        "files/never-captured.txt",
    )));

    let backends = undeletable_backends();
    let cb = ScriptedCallback::new(vec![Decision::SkipAll]);
    Orchestrator::new(&backends, &cb).restore(&bp, &snap).unwrap();

    // The clean-pass delete failure consumed the one scripted answer;
    // the restore-pass missing entry was then skipped without asking.
    assert_eq!(cb.errors_seen.lock().len(), 1);
}

#[cfg(unix)]
#[test]
fn test_post_clean_hooks_run_after_failed_clean() {
    use reinstate::hooks::{Hook, RunProcessHook};
    use reinstate::types::Phase;

    let tmp = TempDir::new().unwrap();
    let marker = tmp.path().join("post-clean-ran");

    let mut bp = blueprint(tmp.path());
    bp.add_action(Action::Registry(RegistryAction::new(
        "HKCU\\Software\\Acme",
        "registry/acme.reg",
    )));
    let mut hook = RunProcessHook::new("/bin/sh");
    hook.args = vec![
        "-c".to_string(),
        format!("touch {}", marker.display()),
    ];
    bp.add_hook(Phase::PostClean, Hook::RunProcess(hook));

    let backends = undeletable_backends();
    let cb = AbortOnErrorCallback;
    let result = Orchestrator::new(&backends, &cb).clean(&bp);

    assert!(matches!(result, Err(EngineError::Aborted)));
    assert!(marker.exists(), "post-clean hook must run despite the failure");
}
