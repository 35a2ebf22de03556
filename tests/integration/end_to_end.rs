//! Whole-lifecycle scenarios: backup, wipe, restore, verify, clean.

use super::test_utils::*;
use reinstate::actions::{
    Action, CopyDirectoryAction, DelimitedListEntryAction, EnvironmentAction, HostsEntryAction,
    RegistryAction, ServiceAction,
};
use reinstate::types::EnvScope;
use reinstate::{Backends, ContinueAllCallback, Orchestrator, VerifyStatus};
use tempfile::TempDir;

fn full_blueprint(root: &std::path::Path) -> reinstate::Blueprint {
    let mut bp = blueprint_with_root(root);
    bp.add_action(Action::CopyDirectory(CopyDirectoryAction::new(
        "${ROOT}/app",
        "files/app",
    )));
    bp.add_action(Action::Registry(RegistryAction::new(
        REG_KEY,
        "registry/app.reg",
    )));
    bp.add_action(Action::Environment(EnvironmentAction::new(
        ENV_NAME,
        EnvScope::User,
        "env/ACME_HOME",
    )));
    bp.add_action(Action::DelimitedListEntry(DelimitedListEntryAction::new(
        "HKLM\\System\\Env",
        "Path",
        "${ROOT}/app/bin",
        "list/path.txt",
    )));
    bp.add_action(Action::Service(ServiceAction::new(
        SERVICE_NAME,
        "service/acmed.toml",
    )));
    bp.add_action(Action::HostsEntry(HostsEntryAction::new(
        HOSTNAME,
        "hosts/acme.toml",
    )));
    bp
}

#[test]
fn test_backup_wipe_restore_verify() {
    let tmp = TempDir::new().unwrap();
    seed_install_tree(tmp.path());
    let backends = seeded_backends(tmp.path());
    let bp = full_blueprint(tmp.path());
    let cb = ContinueAllCallback;

    let snap = tmp.path().join("snap.zip");
    let orch = Orchestrator::new(&backends, &cb);
    orch.backup(&bp, &snap).unwrap();

    // Wipe everything the blueprint covers.
    orch.clean(&bp).unwrap();
    assert!(!tmp.path().join("app").exists());
    assert!(!backends.keys.key_exists(REG_KEY));
    assert!(backends.env.get(ENV_NAME, EnvScope::User).unwrap().is_none());
    assert!(backends.services.query(SERVICE_NAME).unwrap().is_none());
    assert!(backends.hosts.find(HOSTNAME).unwrap().is_none());

    // Restore from the embedded blueprint and check every resource.
    orch.restore_archive(&snap).unwrap();
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("app/config/settings.ini")).unwrap(),
        "[core]\nlevel=3\n"
    );
    assert!(tmp.path().join("app/cache").is_dir());
    assert_eq!(
        backends.keys.get_string(REG_KEY, "DataDir").unwrap().unwrap(),
        format!("{}/app/config", tmp.path().display())
    );
    assert_eq!(
        backends.env.get(ENV_NAME, EnvScope::User).unwrap().unwrap(),
        format!("{}/app", tmp.path().display())
    );
    let service = backends.services.query(SERVICE_NAME).unwrap().unwrap();
    assert!(service.was_running);
    assert_eq!(
        backends.hosts.find(HOSTNAME).unwrap().unwrap().ip,
        "127.0.0.2"
    );

    let results = orch.verify_archive(&snap).unwrap();
    assert_eq!(results.len(), 6);
    for result in &results {
        assert_eq!(result.status, VerifyStatus::Match, "{}", result.detail);
    }
}

#[test]
fn test_verify_reports_missing_after_clean() {
    let tmp = TempDir::new().unwrap();
    seed_install_tree(tmp.path());
    let backends = seeded_backends(tmp.path());
    let bp = full_blueprint(tmp.path());
    let cb = ContinueAllCallback;

    let snap = tmp.path().join("snap.zip");
    let orch = Orchestrator::new(&backends, &cb);
    orch.backup(&bp, &snap).unwrap();
    orch.clean(&bp).unwrap();

    let results = orch.verify_archive(&snap).unwrap();
    // Directory, registry key, environment variable and service are
    // gone; the delimited entry was absent at capture time too, so its
    // marker still matches.
    let missing = results
        .iter()
        .filter(|r| r.status == VerifyStatus::Missing)
        .count();
    assert!(missing >= 4, "expected at least 4 missing, got {results:?}");
}

#[test]
fn test_delimited_restore_is_idempotent_through_orchestrator() {
    let tmp = TempDir::new().unwrap();
    seed_install_tree(tmp.path());
    let backends = seeded_backends(tmp.path());
    let cb = ContinueAllCallback;

    let mut bp = blueprint_with_root(tmp.path());
    let entry = format!("{}/app/bin", tmp.path().display());
    backends
        .keys
        .set_string("HKLM\\System\\Env", "Path", &format!("base;{entry}"))
        .unwrap();
    bp.add_action(Action::DelimitedListEntry(DelimitedListEntryAction::new(
        "HKLM\\System\\Env",
        "Path",
        "${ROOT}/app/bin",
        "list/path.txt",
    )));

    let snap = tmp.path().join("snap.zip");
    let orch = Orchestrator::new(&backends, &cb);
    orch.backup(&bp, &snap).unwrap();

    for _ in 0..3 {
        orch.restore_archive(&snap).unwrap();
    }
    assert_eq!(
        backends
            .keys
            .get_string("HKLM\\System\\Env", "Path")
            .unwrap()
            .unwrap(),
        format!("base;{entry}")
    );
}

#[test]
fn test_restore_on_fresh_host() {
    let tmp = TempDir::new().unwrap();
    seed_install_tree(tmp.path());
    let backends = seeded_backends(tmp.path());
    let bp = full_blueprint(tmp.path());
    let cb = ContinueAllCallback;

    let snap = tmp.path().join("snap.zip");
    Orchestrator::new(&backends, &cb).backup(&bp, &snap).unwrap();

    // A second machine: empty backends, empty disk root.
    std::fs::remove_dir_all(tmp.path().join("app")).unwrap();
    let fresh = Backends::in_memory();
    let orch = Orchestrator::new(&fresh, &cb);
    orch.restore_archive(&snap).unwrap();

    assert!(tmp.path().join("app/config/settings.ini").is_file());
    assert!(fresh.keys.key_exists(REG_KEY));
    assert!(fresh.services.query(SERVICE_NAME).unwrap().unwrap().was_running);
}
