//! Document lifecycle: recipe files on disk, embedded instance copies,
//! and the variable resolver's failure modes.

use reinstate::error::BlueprintError;
use reinstate::{
    Blueprint, ContinueAllCallback, InstanceBlueprint, Orchestrator, ProjectBlueprint,
    SnapshotReader,
};
use tempfile::TempDir;

const RECIPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<blueprint name="Acme" version="2.1" installdir="${ROOT}/app">
  <description>Acme suite</description>
  <variables>
    <var name="ROOT">/opt</var>
    <var name="DATADIR">${INSTALLDIR}/data</var>
  </variables>
  <resources>
    <files path="${INSTALLDIR}" archive="files/install">
      <exclude>*.log</exclude>
    </files>
  </resources>
</blueprint>
"#;

#[test]
fn test_project_blueprint_loads_and_resolves() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("acme.xml");
    std::fs::write(&path, RECIPE).unwrap();

    let project = ProjectBlueprint::load_from_file(&path).unwrap();
    let bp = project.blueprint();
    assert_eq!(bp.var("INSTALLDIR"), "/opt/app");
    assert_eq!(bp.var("DATADIR"), "/opt/app/data");
    assert_eq!(bp.resolve("${DATADIR}/x.db"), "/opt/app/data/x.db");
}

#[test]
fn test_cycle_fails_load_with_names() {
    let doc = r#"<blueprint name="x" version="1">
      <variables>
        <var name="A">${B}</var>
        <var name="B">${A}</var>
      </variables>
    </blueprint>"#;
    match Blueprint::from_document(doc) {
        Err(BlueprintError::UnresolvedVariables(names)) => {
            assert!(names.contains(&"A".to_string()));
            assert!(names.contains(&"B".to_string()));
        }
        other => panic!("expected unresolved-variable error, got {other:?}"),
    }
}

#[test]
fn test_embedded_instance_metadata_survives_backup() {
    let tmp = TempDir::new().unwrap();
    let mut bp = Blueprint::new("Acme", "2.1");
    bp.set_user_variable("ROOT", tmp.path().to_string_lossy())
        .unwrap();
    bp.resolve_user_variables().unwrap();

    let backends = reinstate::Backends::in_memory();
    let cb = ContinueAllCallback;
    let snap = tmp.path().join("snap.zip");
    Orchestrator::new(&backends, &cb).backup(&bp, &snap).unwrap();

    let reader = SnapshotReader::open(&snap).unwrap();
    let instance = InstanceBlueprint::load_from_archive(&reader).unwrap();
    assert_eq!(instance.blueprint().name(), "Acme");
    assert_eq!(instance.blueprint().version(), "2.1");
    // The capture stamp parses back with the wire format.
    assert!(reinstate::types::InstanceMetadata::parse_timestamp(
        &instance.metadata().timestamp_string()
    )
    .is_some());
}

#[test]
fn test_unresolve_keeps_snapshot_portable() {
    let mut bp = Blueprint::new("Acme", "2.1");
    bp.set_user_variable("INSTALLDIR", "C:\\Program Files (x86)\\Acme")
        .unwrap();
    bp.set_user_variable("PF", "C:\\Program Files").unwrap();
    bp.resolve_user_variables().unwrap();

    let content = "bin=C:\\Program Files (x86)\\Acme\\acme.exe\nshared=C:\\Program Files\\Common";
    let portable = bp.unresolve(content);
    assert_eq!(
        portable,
        "bin=${INSTALLDIR}\\acme.exe\nshared=${PF}\\Common"
    );
    assert_eq!(bp.resolve(&portable), content);
}
