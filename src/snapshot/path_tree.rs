//! Directory-structure index over a flat list of archive entry names.
//!
//! Zip archives store a flat name list where directories are entries
//! ending in `/`, and intermediate directories may have no entry at all.
//! The tree synthesizes those parents so existence and listing queries
//! behave like a filesystem.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub(crate) struct PathTree {
    /// Raw entry names in archive order, trailing slashes intact.
    ordered: Vec<String>,
    all: HashSet<String>,
    /// Normalized directory paths, including the root "".
    directories: HashSet<String>,
    children: HashMap<String, Vec<String>>,
}

impl PathTree {
    pub fn build(paths: Vec<String>) -> Self {
        let mut tree = PathTree::default();

        tree.directories.insert(String::new());
        tree.children.insert(String::new(), Vec::new());

        for path in &paths {
            tree.all.insert(path.clone());

            let is_dir = path.ends_with('/');
            let normalized = if is_dir {
                &path[..path.len() - 1]
            } else {
                path.as_str()
            };

            if is_dir {
                tree.directories.insert(normalized.to_string());
            }

            // Walk up the parent chain, synthesizing directories and
            // recording child names exactly once.
            let mut current = normalized;
            while !current.is_empty() {
                let (parent, child_name) = match current.rfind('/') {
                    Some(at) => (&current[..at], &current[at + 1..]),
                    None => ("", current),
                };

                tree.directories.insert(parent.to_string());
                let children = tree.children.entry(parent.to_string()).or_default();
                if !children.iter().any(|c| c == child_name) {
                    children.push(child_name.to_string());
                }

                current = parent;
            }
        }

        tree.ordered = paths;
        tree
    }

    pub fn exists(&self, path: &str) -> bool {
        if self.all.contains(path) {
            return true;
        }
        if self.all.contains(&format!("{path}/")) {
            return true;
        }
        self.directories.contains(path)
    }

    pub fn is_directory(&self, path: &str) -> bool {
        self.directories.contains(path.trim_end_matches('/'))
    }

    pub fn children_of(&self, path: &str) -> Vec<String> {
        self.children
            .get(path.trim_end_matches('/'))
            .cloned()
            .unwrap_or_default()
    }

    pub fn ordered(&self) -> &[String] {
        &self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PathTree {
        PathTree::build(vec![
            "blueprint.xml".to_string(),
            "files/0/config/app.ini".to_string(),
            "files/0/cache/".to_string(),
            "registry/0.reg".to_string(),
        ])
    }

    #[test]
    fn test_direct_entries_exist() {
        let tree = sample();
        assert!(tree.exists("blueprint.xml"));
        assert!(tree.exists("files/0/config/app.ini"));
        assert!(!tree.exists("files/0/config/missing.ini"));
    }

    #[test]
    fn test_synthetic_parents_exist_as_directories() {
        let tree = sample();
        assert!(tree.exists("files"));
        assert!(tree.exists("files/0/config"));
        assert!(tree.is_directory("files/0"));
        assert!(!tree.is_directory("blueprint.xml"));
    }

    #[test]
    fn test_explicit_empty_directory() {
        let tree = sample();
        assert!(tree.exists("files/0/cache"));
        assert!(tree.is_directory("files/0/cache"));
        assert!(tree.is_directory("files/0/cache/"));
    }

    #[test]
    fn test_children_listing() {
        let tree = sample();
        let mut root = tree.children_of("");
        root.sort();
        assert_eq!(root, vec!["blueprint.xml", "files", "registry"]);

        let mut under = tree.children_of("files/0");
        under.sort();
        assert_eq!(under, vec!["cache", "config"]);
    }

    #[test]
    fn test_root_is_directory() {
        let tree = PathTree::build(Vec::new());
        assert!(tree.is_directory(""));
        assert!(tree.children_of("").is_empty());
    }
}
