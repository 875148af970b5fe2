// SPDX-License-Identifier: MIT OR Apache-2.0

//! coba - CodeSynth Engine
//!
//! Extracts caller -> callee relationships from C/C++ projects using a
//! tree-sitter grammar or the libclang compiler frontend.

mod cli;
mod shell;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{AnalyzeArgs, Cli, Commands, OutputFormat};
use tracing_subscriber::EnvFilter;

use coba::analysis::AnalysisReport;
use coba::config::Config;
use coba::language::Language;
use coba::output::{self, ReportDocument};
use coba::parser::BackendOptions;
use coba::project::load_project;
use coba::session::{AnalyzeOptions, Session};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load();

    match cli.command {
        Commands::Analyze {
            path,
            lang,
            format,
            compact,
            args,
        } => {
            let language: Language = lang.parse()?;
            let session = Session::new()
                .with_language(language)
                .load_project(&path, &config.exclude_patterns)?;
            let report = session.analyze(&analyze_options(&config, &args))?;
            emit_report(&report, format, compact, &args, &config)?;
        }
        Commands::Files { path, lang } => {
            let language: Language = lang.parse()?;
            let project = load_project(&path, language, &config.exclude_patterns)?;
            output::print_project_summary(&project);
        }
        Commands::Shell => {
            shell::run(&config)?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "coba", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "coba=debug" } else { "coba=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("COBA_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge CLI flags over config values (CLI wins)
pub(crate) fn analyze_options(config: &Config, args: &AnalyzeArgs) -> AnalyzeOptions {
    let mut config = config.clone();
    if let Some(timeout) = args.timeout {
        config.timeout_secs = Some(timeout);
    }
    if let Some(library) = &args.grammar_library {
        config.grammar_library = Some(library.clone());
    }

    AnalyzeOptions {
        backend: args.backend().unwrap_or_else(|| config.backend()),
        backend_options: BackendOptions::from_config(&config),
        scope: args.scope.map(Into::into).unwrap_or_else(|| config.match_scope()),
        jobs: args.jobs.or(config.jobs),
    }
}

pub(crate) fn emit_report(
    report: &AnalysisReport,
    format: OutputFormat,
    compact: bool,
    args: &AnalyzeArgs,
    config: &Config,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            output::print_json(&ReportDocument::new(report), compact)?;
            if let Some(path) = &args.output {
                output::write_json_report(report, path)?;
            }
        }
        OutputFormat::Text => {
            output::print_console(report);
            if !args.no_report {
                let path = args.output.clone().unwrap_or_else(|| config.report_path());
                let written = output::write_json_report(report, &path)?;
                println!("\nJSON report saved to: {}", written.display());
            }
        }
    }
    Ok(())
}
