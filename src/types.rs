//! Core value types shared across the engine.

use crate::error::BlueprintError;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Execution points bracketing the backup/restore/clean operations.
/// Hooks are bound to exactly one phase at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreBackup,
    PostBackup,
    PreRestore,
    PostRestore,
    PreClean,
    PostClean,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::PreBackup,
        Phase::PostBackup,
        Phase::PreRestore,
        Phase::PostRestore,
        Phase::PreClean,
        Phase::PostClean,
    ];

    /// Canonical PascalCase spelling, used when serializing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreBackup => "PreBackup",
            Phase::PostBackup => "PostBackup",
            Phase::PreRestore => "PreRestore",
            Phase::PostRestore => "PostRestore",
            Phase::PreClean => "PreClean",
            Phase::PostClean => "PostClean",
        }
    }

    fn kebab(&self) -> &'static str {
        match self {
            Phase::PreBackup => "pre-backup",
            Phase::PostBackup => "post-backup",
            Phase::PreRestore => "pre-restore",
            Phase::PostRestore => "post-restore",
            Phase::PreClean => "pre-clean",
            Phase::PostClean => "post-clean",
        }
    }

    /// Index into the blueprint's per-phase hook lists.
    pub fn index(&self) -> usize {
        match self {
            Phase::PreBackup => 0,
            Phase::PostBackup => 1,
            Phase::PreRestore => 2,
            Phase::PostRestore => 3,
            Phase::PreClean => 4,
            Phase::PostClean => 5,
        }
    }

    /// Accepts both "PreBackup" and "pre-backup" spellings, case-insensitively.
    pub fn parse(value: &str) -> Result<Phase, BlueprintError> {
        for phase in Phase::ALL {
            if value.eq_ignore_ascii_case(phase.as_str()) || value.eq_ignore_ascii_case(phase.kebab())
            {
                return Ok(phase);
            }
        }
        Err(BlueprintError::InvalidPhase(value.to_string()))
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a callback consulted about a recoverable error or conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Proceed past the failed item.
    Continue,
    /// Attempt the same item again.
    Retry,
    /// Skip the failed item.
    Skip,
    /// Skip this and every subsequent failure of the operation.
    SkipAll,
    /// Terminate the whole operation.
    Abort,
}

/// Outcome of comparing live system state against the snapshot/blueprint
/// expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    /// Resource matches expectation.
    Match,
    /// Resource exists but differs.
    Mismatch,
    /// Resource expected but not found.
    Missing,
    /// Resource found but not expected.
    Extra,
}

/// Per-action verification result. Produced on demand, never persisted.
#[derive(Debug, Clone)]
pub struct VerifyResult {
    pub status: VerifyStatus,
    pub detail: String,
}

impl VerifyResult {
    pub fn new(status: VerifyStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

/// Scope of an environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvScope {
    User,
    System,
}

impl EnvScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvScope::User => "user",
            EnvScope::System => "system",
        }
    }
}

/// Where a delimited-list entry is inserted on restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Prepend,
    Append,
}

impl InsertPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPosition::Prepend => "prepend",
            InsertPosition::Append => "append",
        }
    }
}

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Capture metadata carried by snapshot-derived (instance) blueprints.
#[derive(Debug, Clone)]
pub struct InstanceMetadata {
    pub timestamp: DateTime<Local>,
    pub machine: String,
    pub user: String,
    pub description: String,
}

impl InstanceMetadata {
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn parse_timestamp(value: &str) -> Option<DateTime<Local>> {
        let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()?;
        Local.from_local_datetime(&naive).single()
    }
}
