//! Snapshot container: a zip archive holding captured resource state plus
//! an embedded copy of the blueprint that produced it.

mod path_tree;
pub mod reader;
pub mod writer;

pub use reader::SnapshotReader;
pub use writer::SnapshotWriter;

/// Well-known archive entry holding the embedded blueprint document.
pub const BLUEPRINT_ENTRY: &str = "blueprint.xml";

/// One entry of a snapshot archive. Paths use `/` separators and never
/// carry a trailing slash; directory-ness is the flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub is_directory: bool,
}

/// Normalize an archive path to forward slashes.
pub(crate) fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}
