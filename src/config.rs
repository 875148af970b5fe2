// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for coba
//!
//! Loads configuration from .cobarc.toml in current directory or ~/.config/coba/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::MatchScope;
use crate::parser::BackendKind;

pub const DEFAULT_REPORT_PATH: &str = "analysis_report.json";
pub const DEFAULT_GRAMMAR_SYMBOL: &str = "tree_sitter_cpp";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration loaded from .cobarc.toml or ~/.config/coba/config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default backend (grammar or clang)
    pub backend: Option<BackendKind>,
    /// Prebuilt dynamic grammar library; the bundled grammar is used when unset
    pub grammar_library: Option<PathBuf>,
    /// Exported language function inside `grammar_library`
    pub grammar_symbol: Option<String>,
    /// Treat trees containing ERROR/MISSING nodes as parse failures
    pub reject_syntax_errors: Option<bool>,
    /// Extra arguments handed to the compiler frontend
    pub clang_args: Vec<String>,
    /// Turn fatal frontend diagnostics into parse failures
    pub fail_on_fatal_diagnostics: Option<bool>,
    /// Per-file parse timeout in seconds (0 disables)
    pub timeout_secs: Option<u64>,
    /// Worker threads for per-file parsing
    pub jobs: Option<usize>,
    /// Whether user functions are matched per file or across the project
    pub match_scope: Option<MatchScope>,
    /// Patterns to exclude from discovery
    pub exclude_patterns: Vec<String>,
    /// Where the JSON report is written
    pub report_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .cobarc.toml in current directory
    /// 2. ~/.config/coba/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(".cobarc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("coba").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend.unwrap_or_default()
    }

    pub fn grammar_symbol(&self) -> &str {
        self.grammar_symbol
            .as_deref()
            .unwrap_or(DEFAULT_GRAMMAR_SYMBOL)
    }

    pub fn reject_syntax_errors(&self) -> bool {
        self.reject_syntax_errors.unwrap_or(true)
    }

    pub fn fail_on_fatal_diagnostics(&self) -> bool {
        self.fail_on_fatal_diagnostics.unwrap_or(false)
    }

    /// Per-file timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn match_scope(&self) -> MatchScope {
        self.match_scope.unwrap_or_default()
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH))
    }
}
