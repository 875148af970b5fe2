// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types with helpful suggestions
//!
//! Run-level errors (configuration, discovery) abort an operation before any
//! file is touched. Per-file errors ([`ParseFailure`]) are recorded in the
//! report and never stop the run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Operation could not start because the session is not set up for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(
        "No language selected\n\n\
         Suggestion: choose a language first.\n\
         Example: load_language cpp"
    )]
    NoLanguage,

    #[error(
        "No project loaded\n\n\
         Suggestion: load a project before analyzing.\n\
         Example: load_project /path/to/project"
    )]
    NoProject,

    #[error(
        "Invalid language: '{0}'\n\n\
         Supported languages: cpp, python, javascript"
    )]
    InvalidLanguage(String),

    #[error("{0} analysis is not implemented yet; only cpp has working backends")]
    Unsupported(String),
}

/// Project root could not be turned into a file listing.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("'{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("'{}' is not a valid directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to walk '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// The grammar library could not be turned into a usable tree-sitter language.
#[derive(Debug, Error, Clone)]
pub enum GrammarLoadError {
    #[error(
        "grammar library not found at '{}'\n\n\
         Suggestion: build the C++ grammar first (tree-sitter generate + cc -shared)\n\
         or unset `grammar_library` to use the bundled grammar",
        .0.display()
    )]
    Missing(PathBuf),

    #[error("failed to load grammar library '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("grammar library '{}' does not export `{symbol}`", path.display())]
    MissingSymbol { path: PathBuf, symbol: String },

    #[error("grammar ABI version {found} is not supported (expected {min}..={max})")]
    IncompatibleAbi { found: usize, min: usize, max: usize },
}

/// Per-file backend failure. The file contributes no call records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("failed to read source: {0}")]
    Io(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("syntax error near line {line}")]
    Syntax { line: usize },

    #[error("parser produced no tree")]
    NoTree,

    #[error("compiler frontend failed: {0}")]
    Frontend(String),

    #[error("fatal diagnostic: {0}")]
    FatalDiagnostic(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced by [`crate::session::Session`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_carry_suggestions() {
        let message = ConfigurationError::NoLanguage.to_string();
        assert!(message.contains("load_language cpp"));
        let message = ConfigurationError::NoProject.to_string();
        assert!(message.contains("load_project"));
    }

    #[test]
    fn test_parse_failure_display() {
        assert_eq!(
            ParseFailure::Syntax { line: 4 }.to_string(),
            "syntax error near line 4"
        );
        assert_eq!(
            ParseFailure::Timeout(Duration::from_secs(3)).to_string(),
            "timed out after 3s"
        );
        assert_eq!(
            ParseFailure::Timeout(Duration::from_millis(250)).to_string(),
            "timed out after 250ms"
        );
    }
}
