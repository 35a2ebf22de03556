//! Native resource backends.
//!
//! Actions never touch key stores, service managers or hosts databases
//! directly; they go through these traits. The in-memory implementations
//! in [`memory`] back the default test configuration, and hosts can plug
//! in real system bindings behind the same seams.

pub mod memory;

use crate::error::BackendError;
use crate::types::EnvScope;
use serde::{Deserialize, Serialize};

/// Persisted configuration of a service, exchanged as TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub binary_path: String,
    #[serde(default)]
    pub start_type: u32,
    #[serde(default)]
    pub service_type: u32,
    #[serde(default)]
    pub account: String,
    /// Whether the service was running at capture time. Restore starts
    /// the service again only if this is set.
    #[serde(default)]
    pub was_running: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// One name mapping of the hosts database, exchanged as TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostsEntry {
    pub ip: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

/// Escape a value for the quoted strings of the key-store export format:
/// backslashes and quotes are backslash-escaped. Variable substitution
/// over an export must run in this escaped space (see
/// [`crate::blueprint::Blueprint::unresolve_encoded`]) or values
/// containing backslashes never match.
pub fn reg_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Hierarchical key/value store (the registry seam).
///
/// Keys are backslash-separated paths. Whole-subtree export/import uses a
/// reg-style textual format: names and data appear as quoted strings
/// escaped with [`reg_escape`], so the engine can run variable
/// substitution over an export without a full parse.
pub trait KeyStore: Send + Sync {
    /// True if the key exists, directly or as a parent of deeper keys.
    fn key_exists(&self, key: &str) -> bool;

    /// Export the subtree rooted at `key` as text, or `None` if the key
    /// does not exist.
    fn export_subtree(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Apply a previously exported subtree back to the store.
    fn import_subtree(&self, content: &str) -> Result<(), BackendError>;

    /// Delete a key and everything beneath it. Deleting a missing key is
    /// not an error.
    fn delete_subtree(&self, key: &str) -> Result<(), BackendError>;

    fn get_string(&self, key: &str, value: &str) -> Result<Option<String>, BackendError>;

    /// Creates the key if needed.
    fn set_string(&self, key: &str, value: &str, data: &str) -> Result<(), BackendError>;

    fn get_multi_string(&self, key: &str, value: &str)
        -> Result<Option<Vec<String>>, BackendError>;

    fn set_multi_string(
        &self,
        key: &str,
        value: &str,
        data: &[String],
    ) -> Result<(), BackendError>;

    /// Widen access control on a key after import. Stores without ACLs
    /// treat this as a no-op.
    fn relax_access(&self, key: &str) -> Result<(), BackendError> {
        let _ = key;
        Ok(())
    }
}

/// Scoped environment variable store.
pub trait EnvStore: Send + Sync {
    fn get(&self, name: &str, scope: EnvScope) -> Result<Option<String>, BackendError>;
    fn set(&self, name: &str, scope: EnvScope, value: &str) -> Result<(), BackendError>;
    /// Unsetting a missing variable is not an error.
    fn unset(&self, name: &str, scope: EnvScope) -> Result<(), BackendError>;

    /// Notify the host that the environment changed. No-op by default.
    fn broadcast_change(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Service control manager seam.
pub trait ServiceManager: Send + Sync {
    /// Query config and run state, or `None` if the service is unknown.
    fn query(&self, name: &str) -> Result<Option<ServiceConfig>, BackendError>;

    /// Create the service or update its configuration in place. Does not
    /// change the run state.
    fn apply(&self, config: &ServiceConfig) -> Result<(), BackendError>;

    fn start(&self, name: &str) -> Result<(), BackendError>;

    /// Stopping a missing or already stopped service is not an error.
    fn stop(&self, name: &str) -> Result<(), BackendError>;

    /// Stop and delete. Removing a missing service is not an error.
    fn remove(&self, name: &str) -> Result<(), BackendError>;
}

/// Hosts database seam. Hostnames compare case-insensitively.
pub trait HostsStore: Send + Sync {
    fn find(&self, hostname: &str) -> Result<Option<HostsEntry>, BackendError>;
    fn set(&self, entry: &HostsEntry) -> Result<(), BackendError>;
    /// Removing a missing mapping is not an error.
    fn remove(&self, hostname: &str) -> Result<(), BackendError>;
}

/// Process termination seam used by kill hooks.
pub trait ProcessControl: Send + Sync {
    /// Terminate all processes with the given image name, waiting up to
    /// `timeout_ms` for each. Returns how many were terminated.
    fn kill(&self, image_name: &str, timeout_ms: u64) -> Result<u32, BackendError>;
}

impl<T: ProcessControl> ProcessControl for std::sync::Arc<T> {
    fn kill(&self, image_name: &str, timeout_ms: u64) -> Result<u32, BackendError> {
        (**self).kill(image_name, timeout_ms)
    }
}

/// Aggregate of all backend seams, passed to every operation.
pub struct Backends {
    pub keys: Box<dyn KeyStore>,
    pub env: Box<dyn EnvStore>,
    pub services: Box<dyn ServiceManager>,
    pub hosts: Box<dyn HostsStore>,
    pub processes: Box<dyn ProcessControl>,
}

impl Backends {
    /// All-in-memory backends. State lives only as long as the value.
    pub fn in_memory() -> Self {
        Self {
            keys: Box::new(memory::MemoryKeyStore::default()),
            env: Box::new(memory::MemoryEnvStore::default()),
            services: Box::new(memory::MemoryServiceManager::default()),
            hosts: Box::new(memory::MemoryHostsStore::default()),
            processes: Box::new(memory::MemoryProcessControl::default()),
        }
    }
}
