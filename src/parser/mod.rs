// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser module - the two interchangeable parse-and-extract backends
//!
//! Both backends follow the same contract: parse one file, build the set of
//! user-defined functions (pass 1), then match call sites against it (pass 2),
//! producing [`CallRecord`]s in source order. The tree itself never leaves the
//! backend; each file is parsed, mined and dropped.

pub mod frontend;
pub mod grammar;
pub mod syntax;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::errors::ParseFailure;
use crate::model::{CallRecord, UserFunctionSet};
use frontend::FrontendBackend;
use grammar::GrammarSource;
use syntax::GrammarBackend;

/// Which backend a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// tree-sitter concrete syntax tree
    #[default]
    Grammar,
    /// libclang translation unit
    Clang,
}

impl BackendKind {
    /// Provenance label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Grammar => "Tree-sitter",
            BackendKind::Clang => "Clang",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grammar" | "tree-sitter" | "treesitter" => Ok(BackendKind::Grammar),
            "clang" | "libclang" => Ok(BackendKind::Clang),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Knobs for building either backend
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub grammar: GrammarSource,
    pub reject_syntax_errors: bool,
    pub clang_args: Vec<String>,
    pub fail_on_fatal_diagnostics: bool,
    pub timeout: Option<Duration>,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BackendOptions {
    pub fn from_config(config: &Config) -> Self {
        let grammar = match &config.grammar_library {
            Some(path) => GrammarSource::library(path, config.grammar_symbol()),
            None => GrammarSource::Bundled,
        };
        Self {
            grammar,
            reject_syntax_errors: config.reject_syntax_errors(),
            clang_args: config.clang_args.clone(),
            fail_on_fatal_diagnostics: config.fail_on_fatal_diagnostics(),
            timeout: config.timeout(),
        }
    }
}

/// The closed set of backends, selected by [`BackendKind`].
pub enum Backend {
    Grammar(GrammarBackend),
    Frontend(FrontendBackend),
    /// Selected backend could not start; every file fails with `reason`.
    Unavailable { kind: BackendKind, reason: String },
}

impl Backend {
    /// Build the backend for `kind`. Load failures produce [`Backend::Unavailable`].
    pub fn select(kind: BackendKind, options: &BackendOptions) -> Self {
        match kind {
            BackendKind::Grammar => match GrammarBackend::load(&options.grammar) {
                Ok(backend) => Backend::Grammar(
                    backend
                        .with_syntax_errors_rejected(options.reject_syntax_errors)
                        .with_timeout(options.timeout),
                ),
                Err(err) => {
                    tracing::warn!("grammar backend unavailable: {}", err);
                    Backend::Unavailable {
                        kind,
                        reason: err.to_string(),
                    }
                }
            },
            BackendKind::Clang => {
                if FrontendBackend::is_available() {
                    Backend::Frontend(
                        FrontendBackend::new(options.clang_args.clone())
                            .with_fatal_diagnostics_rejected(options.fail_on_fatal_diagnostics)
                            .with_timeout(options.timeout),
                    )
                } else {
                    tracing::warn!("libclang could not be loaded");
                    Backend::Unavailable {
                        kind,
                        reason: "libclang could not be loaded (set LIBCLANG_PATH)".into(),
                    }
                }
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Grammar(_) => BackendKind::Grammar,
            Backend::Frontend(_) => BackendKind::Clang,
            Backend::Unavailable { kind, .. } => *kind,
        }
    }

    /// Upper bound on useful worker threads; libclang parses are serialized.
    pub fn max_parallelism(&self) -> Option<usize> {
        match self {
            Backend::Frontend(_) => Some(1),
            _ => None,
        }
    }

    /// Pass 1 on its own, for project-wide matching.
    pub fn collect_definitions(&self, path: &Path) -> Result<UserFunctionSet, ParseFailure> {
        match self {
            Backend::Grammar(backend) => {
                let unit = backend.parse(path)?;
                Ok(syntax::collect_user_functions(&unit))
            }
            Backend::Frontend(backend) => backend.collect_definitions(path),
            Backend::Unavailable { reason, .. } => {
                Err(ParseFailure::BackendUnavailable(reason.clone()))
            }
        }
    }

    /// Parse one file and extract its call records.
    ///
    /// `known` replaces the file's own user-function set when matching
    /// across the whole project.
    pub fn analyze_file(
        &self,
        path: &Path,
        known: Option<&Arc<UserFunctionSet>>,
    ) -> Result<Vec<CallRecord>, ParseFailure> {
        match self {
            Backend::Grammar(backend) => {
                let unit = backend.parse(path)?;
                Ok(match known {
                    Some(functions) => syntax::match_calls(&unit, functions, path),
                    None => backend.extract_calls(&unit, path),
                })
            }
            Backend::Frontend(backend) => backend.analyze_file(path, known.cloned()),
            Backend::Unavailable { reason, .. } => {
                Err(ParseFailure::BackendUnavailable(reason.clone()))
            }
        }
    }
}
