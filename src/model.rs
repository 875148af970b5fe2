// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend-independent call records and the user-function lookup set

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Caller placeholder for call sites outside any function definition.
pub const UNRESOLVED_CALLER: &str = "<unresolved>";

/// One observed call site: at `file:line`, `callee_function` was invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub caller_function: String,
    pub callee_function: String,
    pub file: PathBuf,
    pub line: usize,
}

impl CallRecord {
    pub fn new(
        caller: Option<&str>,
        callee: impl Into<String>,
        file: impl AsRef<Path>,
        line: usize,
    ) -> Self {
        Self {
            caller_function: caller.unwrap_or(UNRESOLVED_CALLER).to_string(),
            callee_function: callee.into(),
            file: file.as_ref().to_path_buf(),
            line,
        }
    }
}

/// Names of functions defined in the analyzed source.
///
/// Matching is by unqualified name only: overloads collapse to one entry and a
/// call to any overload of a defined name counts as a user call. When a name is
/// defined more than once the first definition line seen is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFunctionSet {
    names: HashMap<String, usize>,
}

impl UserFunctionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition. Returns false when the name was already present.
    pub fn insert(&mut self, name: impl Into<String>, line: usize) -> bool {
        use std::collections::hash_map::Entry;

        match self.names.entry(name.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(line);
                true
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Line of the first recorded definition of `name`.
    pub fn definition_line(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order, for stable diagnostics.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fold `other` into this set; entries already present win.
    pub fn merge(&mut self, other: UserFunctionSet) {
        for (name, line) in other.names {
            self.names.entry(name).or_insert(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_definition_wins() {
        let mut set = UserFunctionSet::new();
        assert!(set.insert("add", 3));
        assert!(!set.insert("add", 10));
        assert_eq!(set.definition_line("add"), Some(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_merge_keeps_existing_entries() {
        let mut left = UserFunctionSet::new();
        left.insert("add", 1);
        let mut right = UserFunctionSet::new();
        right.insert("add", 7);
        right.insert("sub", 9);

        left.merge(right);
        assert_eq!(left.sorted_names(), vec!["add", "sub"]);
        assert_eq!(left.definition_line("add"), Some(1));
    }

    #[test]
    fn test_unresolved_caller_sentinel() {
        let record = CallRecord::new(None, "add", "a.cpp", 4);
        assert_eq!(record.caller_function, UNRESOLVED_CALLER);
        let record = CallRecord::new(Some("main"), "add", "a.cpp", 4);
        assert_eq!(record.caller_function, "main");
    }
}
