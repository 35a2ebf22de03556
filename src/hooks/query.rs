//! Run SQL against an application's embedded SQLite database, typically
//! to patch machine-specific rows after a restore.

use crate::blueprint::Blueprint;
use crate::error::HookError;
use rusqlite::Connection;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RunQueryHook {
    /// Database file path, may contain `${VAR}` placeholders.
    pub file: String,
    /// SQL to execute, variable-expanded before execution. May contain
    /// multiple statements.
    pub query: String,
}

impl RunQueryHook {
    pub fn new(file: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            query: query.into(),
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![("file", self.file.clone()), ("query", self.query.clone())]
    }

    pub fn execute(&self, blueprint: &Blueprint) -> Result<(), HookError> {
        let path = blueprint.resolve(&self.file);
        let sql = blueprint.resolve(&self.query);

        let conn = Connection::open(&path)?;
        conn.execute_batch(&sql)?;
        info!("Executed query against {}", path);
        Ok(())
    }
}
