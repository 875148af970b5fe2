// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction orchestrator - feed every source file through one backend
//!
//! A failing file is recorded and skipped; the run always returns the
//! outcomes of every file, in discovery order, whatever order workers finish in.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::ParseFailure;
use crate::language::Language;
use crate::model::{CallRecord, UserFunctionSet};
use crate::parser::{Backend, BackendKind};

/// Scope of the user-function set calls are matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchScope {
    /// Each file only knows the functions it defines itself
    #[default]
    File,
    /// Definitions from every source file are visible to every file
    Project,
}

impl std::fmt::Display for MatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchScope::File => f.write_str("file"),
            MatchScope::Project => f.write_str("project"),
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Parsed; may legitimately hold zero calls
    Parsed(Vec<CallRecord>),
    Failed(ParseFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn calls(&self) -> &[CallRecord] {
        match &self.status {
            FileStatus::Parsed(calls) => calls,
            FileStatus::Failed(_) => &[],
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match &self.status {
            FileStatus::Parsed(_) => None,
            FileStatus::Failed(failure) => Some(failure),
        }
    }
}

/// Result of analyzing one project with one backend
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub project_path: PathBuf,
    pub language: Language,
    pub backend: BackendKind,
    pub match_scope: MatchScope,
    pub files: Vec<FileOutcome>,
}

impl AnalysisReport {
    /// All call records, file by file in discovery order.
    pub fn calls(&self) -> impl Iterator<Item = &CallRecord> {
        self.files.iter().flat_map(|file| file.calls().iter())
    }

    pub fn call_count(&self) -> usize {
        self.files.iter().map(|file| file.calls().len()).sum()
    }

    pub fn parsed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.failure().is_none())
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ParseFailure)> {
        self.files
            .iter()
            .filter_map(|file| file.failure().map(|failure| (file.path.as_path(), failure)))
    }
}

/// Runs a backend over a batch of files
pub struct Analyzer<'b> {
    backend: &'b Backend,
    scope: MatchScope,
    jobs: Option<usize>,
}

impl<'b> Analyzer<'b> {
    pub fn new(backend: &'b Backend) -> Self {
        Self {
            backend,
            scope: MatchScope::File,
            jobs: None,
        }
    }

    pub fn with_scope(mut self, scope: MatchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Worker count; `None` uses one per core
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs.filter(|jobs| *jobs > 0);
        self
    }

    /// Analyze `files`, returning one outcome per file in the same order.
    pub fn run(&self, files: &[PathBuf]) -> Vec<FileOutcome> {
        let workers = match (self.jobs, self.backend.max_parallelism()) {
            (Some(jobs), Some(limit)) => Some(jobs.min(limit)),
            (jobs, limit) => jobs.or(limit),
        };

        match workers.map(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build()) {
            None => self.run_batch(files),
            Some(Ok(pool)) => pool.install(|| self.run_batch(files)),
            Some(Err(err)) => {
                tracing::warn!("failed to build worker pool, running on the global pool: {}", err);
                self.run_batch(files)
            }
        }
    }

    fn run_batch(&self, files: &[PathBuf]) -> Vec<FileOutcome> {
        let outcomes: Vec<FileOutcome> = match self.scope {
            MatchScope::File => files
                .par_iter()
                .map(|path| self.analyze_one(path, None))
                .collect(),
            MatchScope::Project => self.run_project_scope(files),
        };

        let failed = outcomes
            .iter()
            .filter(|outcome| outcome.failure().is_some())
            .count();
        tracing::info!(
            backend = %self.backend.kind(),
            files = files.len(),
            failed,
            "analysis finished"
        );
        outcomes
    }

    fn run_project_scope(&self, files: &[PathBuf]) -> Vec<FileOutcome> {
        let definitions: Vec<Result<UserFunctionSet, ParseFailure>> = files
            .par_iter()
            .map(|path| self.backend.collect_definitions(path))
            .collect();

        let mut known = UserFunctionSet::new();
        for (path, result) in files.iter().zip(&definitions) {
            let Ok(set) = result else { continue };
            for name in set.sorted_names() {
                if let Some(line) = known.definition_line(name) {
                    tracing::debug!(
                        file = %path.display(),
                        function = name,
                        kept_line = line,
                        "duplicate definition ignored; earlier file wins"
                    );
                }
            }
            known.merge(set.clone());
        }
        tracing::debug!(functions = ?known.sorted_names(), "project-wide user functions");
        let known = Arc::new(known);

        files
            .par_iter()
            .zip(definitions.into_par_iter())
            .map(|(path, collected)| match collected {
                Ok(_) => self.analyze_one(path, Some(&known)),
                Err(failure) => self.failed(path, failure),
            })
            .collect()
    }

    fn analyze_one(&self, path: &Path, known: Option<&Arc<UserFunctionSet>>) -> FileOutcome {
        match self.backend.analyze_file(path, known) {
            Ok(calls) => {
                tracing::debug!(file = %path.display(), calls = calls.len(), "extracted calls");
                FileOutcome {
                    path: path.to_path_buf(),
                    status: FileStatus::Parsed(calls),
                }
            }
            Err(failure) => self.failed(path, failure),
        }
    }

    fn failed(&self, path: &Path, failure: ParseFailure) -> FileOutcome {
        tracing::warn!(file = %path.display(), "{} parsing failed: {}", self.backend.kind(), failure);
        FileOutcome {
            path: path.to_path_buf(),
            status: FileStatus::Failed(failure),
        }
    }
}
