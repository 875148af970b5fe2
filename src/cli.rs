// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use coba::analysis::MatchScope;
use coba::parser::BackendKind;

/// coba - CodeSynth Engine call graph extractor
///
/// Parses C/C++ sources with tree-sitter or libclang and reports calls
/// between functions defined in the project.
#[derive(Parser, Debug)]
#[command(name = "coba")]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Quickstart:\n  coba analyze ./my-project\n  coba analyze ./my-project --use-clang --format json\n  coba shell"
)]
pub struct Cli {
    /// Verbose logging (same as COBA_LOG=coba=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parsing backend (mirrored from the library for clap)
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliBackend {
    /// tree-sitter grammar
    Grammar,
    /// libclang compiler frontend
    Clang,
}

impl From<CliBackend> for BackendKind {
    fn from(value: CliBackend) -> Self {
        match value {
            CliBackend::Grammar => BackendKind::Grammar,
            CliBackend::Clang => BackendKind::Clang,
        }
    }
}

/// Where user-defined functions are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliScope {
    /// Only functions defined in the same file
    File,
    /// Functions defined anywhere in the project
    Project,
}

impl From<CliScope> for MatchScope {
    fn from(value: CliScope) -> Self {
        match value {
            CliScope::File => MatchScope::File,
            CliScope::Project => MatchScope::Project,
        }
    }
}

/// Flags shared by `analyze` and the shell's `analyze`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Parsing backend
    #[arg(short, long, value_enum)]
    pub backend: Option<CliBackend>,

    /// Shorthand for `--backend clang`
    #[arg(long, conflicts_with = "backend")]
    pub use_clang: bool,

    /// Match calls against functions from the same file or the whole project
    #[arg(short, long, value_enum)]
    pub scope: Option<CliScope>,

    /// Worker threads for parsing
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-file parse timeout in seconds (0 disables)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Prebuilt tree-sitter grammar library (defaults to the bundled grammar)
    #[arg(long, value_name = "PATH")]
    pub grammar_library: Option<PathBuf>,

    /// Where to write the JSON report (text format only)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Do not write the JSON report file
    #[arg(long)]
    pub no_report: bool,
}

impl AnalyzeArgs {
    pub fn backend(&self) -> Option<BackendKind> {
        if self.use_clang {
            Some(BackendKind::Clang)
        } else {
            self.backend.map(Into::into)
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover, parse and extract calls from a project
    #[command(visible_aliases = ["a"])]
    Analyze {
        /// Project root directory
        path: PathBuf,

        /// Language of the project (cpp, python, javascript)
        #[arg(short, long, default_value = "cpp")]
        lang: String,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,

        /// Compact JSON output (no pretty formatting)
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        args: AnalyzeArgs,
    },

    /// Show how a project's files are categorized
    Files {
        /// Project root directory
        path: PathBuf,

        /// Language of the project
        #[arg(short, long, default_value = "cpp")]
        lang: String,
    },

    /// Interactive session (load_language, load_project, analyze)
    Shell,

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
