//! In-memory backend implementations.
//!
//! Used by tests and simulation setups. The key store speaks a reg-style
//! textual export format so whole subtrees survive the snapshot roundtrip
//! as plain text that variable substitution can run over.

use crate::backend::{
    reg_escape, EnvStore, HostsEntry, HostsStore, KeyStore, ProcessControl, ServiceConfig,
    ServiceManager,
};
use crate::error::BackendError;
use crate::types::EnvScope;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const EXPORT_HEADER: &str = "Windows Registry Editor Version 5.00";

#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Str(String),
    Multi(Vec<String>),
}

/// Parse a quoted string starting at `input`, returning the unescaped
/// content and the remainder after the closing quote.
fn parse_quoted(input: &str) -> Option<(String, &str)> {
    let rest = input.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => return None,
            },
            '"' => return Some((out, &rest[i + 1..])),
            other => out.push(other),
        }
    }
    None
}

/// In-memory hierarchical key/value store. Keys are backslash-separated
/// paths; iteration order is deterministic.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<BTreeMap<String, BTreeMap<String, StoredValue>>>,
}

impl MemoryKeyStore {
    fn is_under(parent: &str, key: &str) -> bool {
        key == parent || key.starts_with(&format!("{parent}\\"))
    }
}

impl KeyStore for MemoryKeyStore {
    fn key_exists(&self, key: &str) -> bool {
        let keys = self.keys.lock();
        keys.keys().any(|k| Self::is_under(key, k))
    }

    fn export_subtree(&self, key: &str) -> Result<Option<String>, BackendError> {
        let keys = self.keys.lock();

        let mut matched = false;
        let mut out = String::from(EXPORT_HEADER);
        out.push('\n');

        for (path, values) in keys.iter() {
            if !Self::is_under(key, path) {
                continue;
            }
            matched = true;
            out.push_str(&format!("\n[{path}]\n"));
            for (name, value) in values {
                match value {
                    StoredValue::Str(data) => {
                        out.push_str(&format!(
                            "\"{}\"=\"{}\"\n",
                            reg_escape(name),
                            reg_escape(data)
                        ));
                    }
                    StoredValue::Multi(items) => {
                        let joined = items
                            .iter()
                            .map(|item| format!("\"{}\"", reg_escape(item)))
                            .collect::<Vec<_>>()
                            .join(",");
                        out.push_str(&format!("\"{}\"=multi:{joined}\n", reg_escape(name)));
                    }
                }
            }
        }

        Ok(if matched { Some(out) } else { None })
    }

    fn import_subtree(&self, content: &str) -> Result<(), BackendError> {
        let mut keys = self.keys.lock();
        let mut current: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line == EXPORT_HEADER {
                continue;
            }

            if let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                keys.entry(inner.to_string()).or_default();
                current = Some(inner.to_string());
                continue;
            }

            let key = current.as_ref().ok_or_else(|| {
                BackendError::InvalidData(format!("value line before any key: {line}"))
            })?;

            let (name, rest) = parse_quoted(line).ok_or_else(|| {
                BackendError::InvalidData(format!("malformed value line: {line}"))
            })?;
            let rest = rest.strip_prefix('=').ok_or_else(|| {
                BackendError::InvalidData(format!("malformed value line: {line}"))
            })?;

            let value = if let Some(mut items_str) = rest.strip_prefix("multi:") {
                let mut items = Vec::new();
                while !items_str.is_empty() {
                    let (item, after) = parse_quoted(items_str).ok_or_else(|| {
                        BackendError::InvalidData(format!("malformed multi value: {line}"))
                    })?;
                    items.push(item);
                    items_str = after.strip_prefix(',').unwrap_or(after);
                }
                StoredValue::Multi(items)
            } else {
                let (data, _) = parse_quoted(rest).ok_or_else(|| {
                    BackendError::InvalidData(format!("malformed value line: {line}"))
                })?;
                StoredValue::Str(data)
            };

            keys.entry(key.clone()).or_default().insert(name, value);
        }

        Ok(())
    }

    fn delete_subtree(&self, key: &str) -> Result<(), BackendError> {
        let mut keys = self.keys.lock();
        keys.retain(|path, _| !Self::is_under(key, path));
        Ok(())
    }

    fn get_string(&self, key: &str, value: &str) -> Result<Option<String>, BackendError> {
        let keys = self.keys.lock();
        match keys.get(key).and_then(|values| values.get(value)) {
            Some(StoredValue::Str(data)) => Ok(Some(data.clone())),
            Some(StoredValue::Multi(_)) => Err(BackendError::InvalidData(format!(
                "{key}\\{value} is a multi-string value"
            ))),
            None => Ok(None),
        }
    }

    fn set_string(&self, key: &str, value: &str, data: &str) -> Result<(), BackendError> {
        let mut keys = self.keys.lock();
        keys.entry(key.to_string())
            .or_default()
            .insert(value.to_string(), StoredValue::Str(data.to_string()));
        Ok(())
    }

    fn get_multi_string(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<Vec<String>>, BackendError> {
        let keys = self.keys.lock();
        match keys.get(key).and_then(|values| values.get(value)) {
            Some(StoredValue::Multi(items)) => Ok(Some(items.clone())),
            Some(StoredValue::Str(_)) => Err(BackendError::InvalidData(format!(
                "{key}\\{value} is a plain string value"
            ))),
            None => Ok(None),
        }
    }

    fn set_multi_string(
        &self,
        key: &str,
        value: &str,
        data: &[String],
    ) -> Result<(), BackendError> {
        let mut keys = self.keys.lock();
        keys.entry(key.to_string())
            .or_default()
            .insert(value.to_string(), StoredValue::Multi(data.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEnvStore {
    values: Mutex<HashMap<(EnvScope, String), String>>,
}

impl EnvStore for MemoryEnvStore {
    fn get(&self, name: &str, scope: EnvScope) -> Result<Option<String>, BackendError> {
        Ok(self.values.lock().get(&(scope, name.to_string())).cloned())
    }

    fn set(&self, name: &str, scope: EnvScope, value: &str) -> Result<(), BackendError> {
        self.values
            .lock()
            .insert((scope, name.to_string()), value.to_string());
        Ok(())
    }

    fn unset(&self, name: &str, scope: EnvScope) -> Result<(), BackendError> {
        self.values.lock().remove(&(scope, name.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct ServiceState {
    config: ServiceConfig,
    running: bool,
}

#[derive(Default)]
pub struct MemoryServiceManager {
    services: Mutex<HashMap<String, ServiceState>>,
}

impl ServiceManager for MemoryServiceManager {
    fn query(&self, name: &str) -> Result<Option<ServiceConfig>, BackendError> {
        let services = self.services.lock();
        Ok(services.get(name).map(|state| {
            let mut config = state.config.clone();
            config.was_running = state.running;
            config
        }))
    }

    fn apply(&self, config: &ServiceConfig) -> Result<(), BackendError> {
        let mut services = self.services.lock();
        let state = services.entry(config.name.clone()).or_default();
        state.config = config.clone();
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), BackendError> {
        let mut services = self.services.lock();
        match services.get_mut(name) {
            Some(state) => {
                state.running = true;
                Ok(())
            }
            None => Err(BackendError::NotFound(format!("service {name}"))),
        }
    }

    fn stop(&self, name: &str) -> Result<(), BackendError> {
        if let Some(state) = self.services.lock().get_mut(name) {
            state.running = false;
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), BackendError> {
        self.services.lock().remove(name);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryHostsStore {
    entries: Mutex<Vec<HostsEntry>>,
}

impl HostsStore for MemoryHostsStore {
    fn find(&self, hostname: &str) -> Result<Option<HostsEntry>, BackendError> {
        let entries = self.entries.lock();
        Ok(entries
            .iter()
            .find(|e| e.hostname.eq_ignore_ascii_case(hostname))
            .cloned())
    }

    fn set(&self, entry: &HostsEntry) -> Result<(), BackendError> {
        let mut entries = self.entries.lock();
        match entries
            .iter_mut()
            .find(|e| e.hostname.eq_ignore_ascii_case(&entry.hostname))
        {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        Ok(())
    }

    fn remove(&self, hostname: &str) -> Result<(), BackendError> {
        self.entries
            .lock()
            .retain(|e| !e.hostname.eq_ignore_ascii_case(hostname));
        Ok(())
    }
}

/// Records kill requests instead of touching real processes.
#[derive(Default)]
pub struct MemoryProcessControl {
    requests: Mutex<Vec<String>>,
}

impl MemoryProcessControl {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl ProcessControl for MemoryProcessControl {
    fn kill(&self, image_name: &str, timeout_ms: u64) -> Result<u32, BackendError> {
        debug!(image = image_name, timeout_ms, "kill requested");
        self.requests.lock().push(image_name.to_string());
        Ok(0)
    }
}
