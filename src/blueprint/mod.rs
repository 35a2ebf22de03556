//! Blueprint: the in-memory recipe of resources, hooks and variables for
//! one application's state.

pub mod instance;
pub mod vars;
mod xml;

pub use instance::{InstanceBlueprint, ProjectBlueprint};

use crate::actions::Action;
use crate::error::BlueprintError;
use crate::hooks::Hook;
use crate::types::{InstanceMetadata, Phase};
use std::collections::HashMap;
use tracing::debug;

pub const VAR_PROJECT_NAME: &str = "PROJECT_NAME";
pub const VAR_PROJECT_VERSION: &str = "PROJECT_VERSION";
pub const VAR_PROJECT_DESCRIPTION: &str = "PROJECT_DESCRIPTION";
pub const VAR_INSTALLDIR: &str = "INSTALLDIR";

/// Variables excluded from reverse substitution: project metadata has no
/// portability value, and SYSTEMDRIVE is almost always the same short
/// prefix on every machine.
const UNRESOLVE_EXCLUDED: [&str; 4] = [
    VAR_PROJECT_NAME,
    VAR_PROJECT_VERSION,
    VAR_PROJECT_DESCRIPTION,
    "SYSTEMDRIVE",
];

/// The in-memory recipe. Parsed from a declarative document (standalone
/// file or a snapshot's embedded copy); owns its actions and per-phase
/// hook lists outright.
#[derive(Debug, Default)]
pub struct Blueprint {
    builtin_variables: HashMap<String, String>,
    /// Ordered, uniquely-keyed user variables (raw, unresolved values).
    user_variables: Vec<(String, String)>,
    resolved_variables: HashMap<String, String>,
    actions: Vec<Action>,
    hooks: [Vec<Hook>; 6],
}

impl Blueprint {
    /// Create an empty blueprint with host builtins and project metadata
    /// populated. Callers add variables/actions/hooks and then call
    /// [`Blueprint::resolve_user_variables`].
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let mut bp = Blueprint::default();
        bp.populate_builtins();
        bp.builtin_variables
            .insert(VAR_PROJECT_NAME.to_string(), name.into());
        bp.builtin_variables
            .insert(VAR_PROJECT_VERSION.to_string(), version.into());
        bp.resolved_variables = bp.builtin_variables.clone();
        bp
    }

    /// Parse a blueprint from its XML document form.
    pub fn from_document(document: &str) -> Result<Self, BlueprintError> {
        let mut bp = Blueprint::default();
        bp.populate_builtins();
        xml::parse_into(&mut bp, document)?;
        bp.resolve_user_variables()?;
        Ok(bp)
    }

    /// Serialize back to the XML document form.
    pub fn to_document(&self) -> Result<String, BlueprintError> {
        xml::serialize(self, None)
    }

    /// Document form including capture metadata, for embedding in a
    /// snapshot.
    pub fn to_instance_document(
        &self,
        metadata: &InstanceMetadata,
    ) -> Result<String, BlueprintError> {
        xml::serialize(self, Some(metadata))
    }

    /// Capture metadata for a snapshot taken now on this host.
    pub fn new_instance_metadata(&self) -> InstanceMetadata {
        xml::fallback_instance_metadata(self)
    }

    pub fn name(&self) -> &str {
        self.var(VAR_PROJECT_NAME)
    }

    pub fn version(&self) -> &str {
        self.var(VAR_PROJECT_VERSION)
    }

    pub fn description(&self) -> &str {
        self.var(VAR_PROJECT_DESCRIPTION)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn hooks(&self, phase: Phase) -> &[Hook] {
        &self.hooks[phase.index()]
    }

    pub fn resolved_variables(&self) -> &HashMap<String, String> {
        &self.resolved_variables
    }

    pub fn user_variables(&self) -> &[(String, String)] {
        &self.user_variables
    }

    /// Resolved value of a variable, or empty if unknown.
    pub fn var(&self, name: &str) -> &str {
        self.resolved_variables
            .get(name)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn add_hook(&mut self, phase: Phase, hook: Hook) {
        self.hooks[phase.index()].push(hook);
    }

    pub(crate) fn set_builtin(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.builtin_variables.insert(name.to_string(), value.clone());
        self.resolved_variables.insert(name.to_string(), value);
    }

    /// Define a user variable. Names must be unique; insertion order is
    /// serialization order.
    pub fn set_user_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), BlueprintError> {
        let name = name.into();
        if self.user_variables.iter().any(|(n, _)| n == &name) {
            return Err(BlueprintError::DuplicateVariable(name));
        }
        self.user_variables.push((name, value.into()));
        Ok(())
    }

    fn populate_builtins(&mut self) {
        if let Some(base) = directories::BaseDirs::new() {
            self.builtin_variables.insert(
                "HOME".to_string(),
                base.home_dir().to_string_lossy().into_owned(),
            );
            self.builtin_variables.insert(
                "APPDATA".to_string(),
                base.data_dir().to_string_lossy().into_owned(),
            );
            self.builtin_variables.insert(
                "LOCALAPPDATA".to_string(),
                base.data_local_dir().to_string_lossy().into_owned(),
            );
        }

        if let Ok(name) = std::env::var("COMPUTERNAME").or_else(|_| std::env::var("HOSTNAME")) {
            self.builtin_variables.insert("COMPUTERNAME".to_string(), name);
        }
        if let Ok(name) = std::env::var("USERNAME").or_else(|_| std::env::var("USER")) {
            self.builtin_variables.insert("USERNAME".to_string(), name);
        }
        if let Ok(drive) = std::env::var("SYSTEMDRIVE") {
            self.builtin_variables.insert("SYSTEMDRIVE".to_string(), drive);
        }
    }

    /// Resolve user variables by fixed-point iteration: re-expand every
    /// user variable against the full current map until nothing changes,
    /// bounded by `user_variable_count + 1` passes. Any placeholder left
    /// afterwards means a cycle or a reference to a name that will never
    /// resolve; both fail the load.
    pub fn resolve_user_variables(&mut self) -> Result<(), BlueprintError> {
        self.resolved_variables = self.builtin_variables.clone();
        for (name, value) in &self.user_variables {
            self.resolved_variables.insert(name.clone(), value.clone());
        }

        let max_iterations = self.user_variables.len() + 1;

        for _ in 0..max_iterations {
            let mut changed = false;

            for (name, _) in &self.user_variables {
                let current = self.resolved_variables.get(name).cloned().unwrap_or_default();
                let resolved = vars::expand_keeping_unknown(&current, &self.resolved_variables);
                if resolved != current {
                    self.resolved_variables.insert(name.clone(), resolved);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        let stuck: Vec<String> = self
            .user_variables
            .iter()
            .filter(|(name, _)| vars::has_placeholder(self.var(name)))
            .map(|(name, _)| name.clone())
            .collect();

        if !stuck.is_empty() {
            return Err(BlueprintError::UnresolvedVariables(stuck));
        }

        debug!(
            variables = self.resolved_variables.len(),
            "resolved blueprint variables"
        );
        Ok(())
    }

    /// Expand `${VAR}` placeholders against the resolved map. Unknown
    /// names expand to empty. `%VAR%` references are runtime variables the
    /// OS expands later and pass through untouched.
    pub fn resolve(&self, input: &str) -> String {
        vars::expand(input, &self.resolved_variables)
    }

    /// Reverse substitution: replace literal variable values with `${VAR}`
    /// placeholders so snapshot content stays portable across machines.
    /// Longer values are substituted first so "C:\Program Files (x86)"
    /// wins over "C:\Program Files".
    pub fn unresolve(&self, input: &str) -> String {
        self.unresolve_encoded(input, |value| value.to_string())
    }

    /// [`Blueprint::unresolve`] for content whose syntax escapes variable
    /// values, e.g. the quoted strings of a `.reg` export. `encode` maps
    /// each variable value to the form it takes inside the content.
    pub fn unresolve_encoded(&self, input: &str, encode: impl Fn(&str) -> String) -> String {
        let mut sorted_vars: Vec<(&str, String)> = self
            .resolved_variables
            .iter()
            .filter(|(name, value)| {
                !value.is_empty() && !UNRESOLVE_EXCLUDED.contains(&name.as_str())
            })
            .map(|(name, value)| (name.as_str(), encode(value)))
            .collect();

        sorted_vars.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(b.0)));

        let mut result = input.to_string();
        for (name, value) in sorted_vars {
            let placeholder = format!("${{{}}}", name);
            result = vars::replace_all_nocase(&result, &value, &placeholder);
        }
        result
    }

    /// Forward expansion with `encode` applied to each substituted value,
    /// the inverse of [`Blueprint::unresolve_encoded`].
    pub fn resolve_encoded(&self, input: &str, encode: impl Fn(&str) -> String) -> String {
        let encoded: HashMap<String, String> = self
            .resolved_variables
            .iter()
            .map(|(name, value)| (name.clone(), encode(value)))
            .collect();
        vars::expand(input, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(user: &[(&str, &str)]) -> Blueprint {
        let mut bp = Blueprint::new("app", "1.0");
        for (name, value) in user {
            bp.set_user_variable(*name, *value).unwrap();
        }
        bp
    }

    #[test]
    fn test_resolve_chained_variables() {
        let mut bp = bare(&[("ROOT", "/opt/app"), ("DATA", "${ROOT}/data")]);
        bp.resolve_user_variables().unwrap();
        assert_eq!(bp.var("DATA"), "/opt/app/data");
        assert_eq!(bp.resolve("${DATA}/file.db"), "/opt/app/data/file.db");
    }

    #[test]
    fn test_cycle_detected() {
        let mut bp = bare(&[("A", "${B}"), ("B", "${A}")]);
        let err = bp.resolve_user_variables().unwrap_err();
        match err {
            BlueprintError::UnresolvedVariables(names) => {
                assert!(names.contains(&"A".to_string()));
                assert!(names.contains(&"B".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_reference_reported() {
        let mut bp = bare(&[("A", "${NO_SUCH_NAME}/x")]);
        let err = bp.resolve_user_variables().unwrap_err();
        match err {
            BlueprintError::UnresolvedVariables(names) => assert_eq!(names, vec!["A".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let mut bp = bare(&[("A", "1")]);
        assert!(bp.set_user_variable("A", "2").is_err());
    }

    #[test]
    fn test_unresolve_longest_value_first() {
        let mut bp = bare(&[
            ("PF", "C:\\Program Files"),
            ("PF86", "C:\\Program Files (x86)"),
        ]);
        bp.resolve_user_variables().unwrap();
        let out = bp.unresolve("C:\\Program Files (x86)\\App and C:\\Program Files\\Other");
        assert_eq!(out, "${PF86}\\App and ${PF}\\Other");
    }

    #[test]
    fn test_unresolve_resolve_inverse() {
        let mut bp = bare(&[("INSTALLDIR", "C:\\Apps\\Foo")]);
        bp.resolve_user_variables().unwrap();
        let literal = "C:\\Apps\\Foo\\data.db";
        assert_eq!(bp.resolve(&bp.unresolve(literal)), literal);
    }

    #[test]
    fn test_unresolve_encoded_matches_escaped_content() {
        let mut bp = bare(&[("INSTALLDIR", "C:\\Apps\\Foo")]);
        bp.resolve_user_variables().unwrap();
        let encode = |value: &str| value.replace('\\', "\\\\");

        // The value appears with doubled backslashes inside quoted text.
        let content = "\"Dir\"=\"C:\\\\Apps\\\\Foo\\\\data\"";
        let portable = bp.unresolve_encoded(content, encode);
        assert_eq!(portable, "\"Dir\"=\"${INSTALLDIR}\\\\data\"");
        assert_eq!(bp.resolve_encoded(&portable, encode), content);

        // The plain form does not match escaped content.
        assert_eq!(bp.unresolve(content), content);
    }

    #[test]
    fn test_unresolve_skips_project_metadata() {
        let bp = bare(&[]);
        // PROJECT_NAME is "app"; the word must survive unresolve untouched.
        assert_eq!(bp.unresolve("my app data"), "my app data");
    }
}
