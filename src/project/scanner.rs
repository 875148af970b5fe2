// SPDX-License-Identifier: MIT OR Apache-2.0

//! File scanner using the ignore crate (same as ripgrep)

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::errors::DiscoveryError;

const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cxx", "cc", "c"];
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hxx", "hh"];
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Bucket a discovered file falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Source,
    Header,
    Other,
}

/// File scanner that respects .gitignore and custom excludes
pub struct FileScanner {
    root: PathBuf,
    exclude_patterns: Vec<String>,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Create scanner with exclude patterns
    pub fn with_excludes(root: impl AsRef<Path>, excludes: Vec<String>) -> Self {
        let mut scanner = Self::new(root);
        scanner.exclude_patterns = excludes;
        scanner
    }

    fn make_builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_exclude(true)
            .git_global(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| !SKIPPED_DIRS.contains(&name))
                    .unwrap_or(true)
            });
        builder
    }

    /// List every file under the root in deterministic (name-sorted, depth-first) order.
    pub fn list_files(&self) -> Result<Vec<PathBuf>, DiscoveryError> {
        let mut files = Vec::new();

        for entry in self.make_builder().build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) if source.depth().unwrap_or(0) == 0 => {
                    return Err(DiscoveryError::Walk {
                        path: self.root.clone(),
                        source,
                    });
                }
                Err(err) => {
                    tracing::warn!("skipping unreadable entry: {}", err);
                    continue;
                }
            };

            let path = entry.path();
            if self.is_excluded(path) {
                continue;
            }
            if entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude_patterns.is_empty() {
            return false;
        }
        let path_str = path.to_string_lossy();
        self.exclude_patterns
            .iter()
            .any(|pattern| path_str.contains(pattern.as_str()))
    }
}

/// Classify a path by its extension
pub fn categorize(path: &Path) -> FileCategory {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FileCategory::Other;
    };
    let lower = ext.to_ascii_lowercase();
    if SOURCE_EXTENSIONS.contains(&lower.as_str()) {
        FileCategory::Source
    } else if HEADER_EXTENSIONS.contains(&lower.as_str()) {
        FileCategory::Header
    } else {
        FileCategory::Other
    }
}
