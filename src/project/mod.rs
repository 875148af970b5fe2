// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project discovery - walk a root and bucket files by extension

pub mod scanner;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::errors::{DiscoveryError, SessionError};
use crate::language::Language;
use scanner::{categorize, FileCategory, FileScanner};

/// Files discovered under a project root, in discovery order per bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFiles {
    pub root: PathBuf,
    pub language: Language,
    pub sources: Vec<PathBuf>,
    pub headers: Vec<PathBuf>,
    pub other: Vec<PathBuf>,
}

impl ProjectFiles {
    /// Directories containing headers, used as include paths by the frontend.
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        let dirs: BTreeSet<PathBuf> = std::iter::once(self.root.clone())
            .chain(
                self.headers
                    .iter()
                    .filter_map(|header| header.parent().map(Path::to_path_buf)),
            )
            .collect();
        dirs.into_iter().collect()
    }

    pub fn total_files(&self) -> usize {
        self.sources.len() + self.headers.len() + self.other.len()
    }
}

/// Discover and categorize the files of a project.
///
/// The language is checked before the filesystem is touched.
pub fn load_project(
    path: impl AsRef<Path>,
    language: Language,
    exclude_patterns: &[String],
) -> Result<ProjectFiles, SessionError> {
    language.ensure_supported()?;

    let path = path.as_ref();
    if !path.exists() {
        return Err(DiscoveryError::NotFound(path.to_path_buf()).into());
    }
    if !path.is_dir() {
        return Err(DiscoveryError::NotADirectory(path.to_path_buf()).into());
    }
    let root = path
        .canonicalize()
        .map_err(|_| DiscoveryError::NotFound(path.to_path_buf()))?;

    tracing::info!("Loading project from: {}", root.display());

    let files = FileScanner::with_excludes(&root, exclude_patterns.to_vec()).list_files()?;
    let mut project = ProjectFiles {
        root,
        language,
        sources: Vec::new(),
        headers: Vec::new(),
        other: Vec::new(),
    };
    for file in files {
        match categorize(&file) {
            FileCategory::Source => project.sources.push(file),
            FileCategory::Header => project.headers.push(file),
            FileCategory::Other => project.other.push(file),
        }
    }

    tracing::info!(
        sources = project.sources.len(),
        headers = project.headers.len(),
        other = project.other.len(),
        "project files categorized"
    );

    Ok(project)
}
