//! Shared fixtures: a small "installed application" on disk plus seeded
//! in-memory backends.

use reinstate::backend::{Backends, HostsEntry, ServiceConfig};
use reinstate::types::EnvScope;
use reinstate::Blueprint;
use std::path::Path;

pub const REG_KEY: &str = "HKCU\\Software\\Acme\\App";
pub const ENV_NAME: &str = "ACME_HOME";
pub const SERVICE_NAME: &str = "acmed";
pub const HOSTNAME: &str = "acme.local";

/// Blueprint whose `ROOT` variable points at the test directory.
pub fn blueprint_with_root(root: &Path) -> Blueprint {
    let mut bp = Blueprint::new("Acme", "2.1");
    bp.set_user_variable("ROOT", root.to_string_lossy()).unwrap();
    bp.resolve_user_variables().unwrap();
    bp
}

/// Lay down a small install tree under `root/app`.
pub fn seed_install_tree(root: &Path) {
    let app = root.join("app");
    std::fs::create_dir_all(app.join("config")).unwrap();
    std::fs::create_dir_all(app.join("cache")).unwrap();
    std::fs::write(app.join("config/settings.ini"), "[core]\nlevel=3\n").unwrap();
    std::fs::write(app.join("readme.txt"), "acme").unwrap();
}

/// Backends pre-populated with the state the blueprint expects.
pub fn seeded_backends(root: &Path) -> Backends {
    let backends = Backends::in_memory();
    backends
        .keys
        .set_string(
            REG_KEY,
            "DataDir",
            &format!("{}/app/config", root.display()),
        )
        .unwrap();
    backends
        .env
        .set(ENV_NAME, EnvScope::User, &format!("{}/app", root.display()))
        .unwrap();
    backends
        .keys
        .set_string("HKLM\\System\\Env", "Path", "base;other")
        .unwrap();
    backends
        .services
        .apply(&ServiceConfig {
            name: SERVICE_NAME.to_string(),
            display_name: "Acme Daemon".to_string(),
            binary_path: format!("{}/app/acmed", root.display()),
            start_type: 2,
            ..ServiceConfig::default()
        })
        .unwrap();
    backends.services.start(SERVICE_NAME).unwrap();
    backends
        .hosts
        .set(&HostsEntry {
            ip: "127.0.0.2".to_string(),
            hostname: HOSTNAME.to_string(),
            comment: "pinned".to_string(),
        })
        .unwrap();
    backends
}
