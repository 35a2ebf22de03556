//! Container-level symmetry: what goes in comes back out, including
//! empty directories and both BOM encodings.

use reinstate::{SnapshotReader, SnapshotWriter};
use tempfile::TempDir;

#[test]
fn test_directory_tree_symmetry_with_empty_dir() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(src.join("a/b")).unwrap();
    std::fs::create_dir_all(src.join("empty")).unwrap();
    std::fs::write(src.join("a/one.txt"), "1").unwrap();
    std::fs::write(src.join("a/b/two.txt"), "2").unwrap();

    let archive = tmp.path().join("snap.zip");
    let mut writer = SnapshotWriter::create(&archive).unwrap();
    writer.add_directory_recursive("files/tree", &src).unwrap();
    writer.finalize().unwrap();

    let reader = SnapshotReader::open(&archive).unwrap();
    let out = tmp.path().join("out");
    reader.extract_directory_recursive("files/tree", &out).unwrap();

    assert_eq!(std::fs::read_to_string(out.join("a/one.txt")).unwrap(), "1");
    assert_eq!(std::fs::read_to_string(out.join("a/b/two.txt")).unwrap(), "2");
    assert!(out.join("empty").is_dir());
}

#[test]
fn test_text_encodings_detected_on_read() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("snap.zip");

    let mut writer = SnapshotWriter::create(&archive).unwrap();
    writer.write_text("plain.txt", "no bom h\u{00e9}re").unwrap();
    writer
        .write_binary("utf8-bom.txt", b"\xEF\xBB\xBFwith bom")
        .unwrap();
    writer.write_utf16("utf16.txt", "wide \u{20ac}").unwrap();
    writer.finalize().unwrap();

    let reader = SnapshotReader::open(&archive).unwrap();
    assert_eq!(reader.read_text("plain.txt").unwrap(), "no bom h\u{00e9}re");
    assert_eq!(reader.read_text("utf8-bom.txt").unwrap(), "with bom");
    assert_eq!(reader.read_text("utf16.txt").unwrap(), "wide \u{20ac}");
}

#[test]
fn test_listing_and_prefix_queries() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("snap.zip");

    let mut writer = SnapshotWriter::create(&archive).unwrap();
    writer.write_text("blueprint.xml", "<blueprint/>").unwrap();
    writer.write_text("files/app/a.txt", "a").unwrap();
    writer.write_text("files/app/sub/b.txt", "b").unwrap();
    writer.write_text("files/application.txt", "sibling").unwrap();
    writer.finalize().unwrap();

    let reader = SnapshotReader::open(&archive).unwrap();
    assert!(reader.exists("files/app"));
    assert!(reader.is_directory("files/app"));
    assert!(reader.exists("files/app/sub/b.txt"));
    assert!(!reader.is_directory("files/application.txt"));

    let mut children = reader.list_dir("files");
    children.sort();
    assert_eq!(children, vec!["app", "application.txt"]);

    // Extracting "files/app" must not pick up "files/application.txt".
    let out = tmp.path().join("out");
    reader.extract_directory_recursive("files/app", &out).unwrap();
    assert!(out.join("a.txt").exists());
    assert!(!out.join("..").join("application.txt").exists());
}
