//! Error types for the state capture/restore engine.

use thiserror::Error;

/// Blueprint load and parse errors. These are fatal: no partial blueprint
/// is ever returned.
#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Missing <blueprint> root element")]
    MissingRoot,

    #[error("<{element}> missing '{attribute}' attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("<{element}> has invalid '{attribute}' value: {value}")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("Unknown entity reference: &{0};")]
    UnknownEntity(String),

    #[error("Duplicate variable definition: {0}")]
    DuplicateVariable(String),

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    #[error("Circular dependency or unresolved reference in variable(s): {}", .0.join(", "))]
    UnresolvedVariables(Vec<String>),

    #[error("Invalid phase: {0}")]
    InvalidPhase(String),

    #[error("Blueprint I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Snapshot container errors. Container-level failures are always fatal.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Entry not found in snapshot: {0}")]
    EntryNotFound(String),

    #[error("Snapshot already finalized")]
    Finalized,
}

/// Errors reported by the native resource backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hook execution errors.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Process exited with code {0}")]
    NonZeroExit(i32),

    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Hook I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Logging bootstrap errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid logging config: {0}")]
    Config(String),
}

/// Operation-level error for backup/restore/clean/verify.
///
/// `Aborted` is the terminal outcome of the Decision protocol: a callback
/// answered `Decision::Abort`, which unwinds the entire multi-phase
/// operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Operation aborted")]
    Aborted,

    #[error("Operation requires an open snapshot")]
    SnapshotUnavailable,

    #[error("Blueprint error: {0}")]
    Blueprint(#[from] BlueprintError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}
