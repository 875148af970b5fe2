// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interactive session loop
//!
//! Each line is parsed with clap and applied to an immutable [`Session`];
//! every successful command replaces the session, failures leave it as is.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::cli::{AnalyzeArgs, OutputFormat};
use coba::config::Config;
use coba::language::Language;
use coba::output;
use coba::session::Session;

#[derive(Parser, Debug)]
#[command(
    name = "coba",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Specify the programming language (cpp, python, javascript)
    #[command(name = "load_language")]
    LoadLanguage { language: String },

    /// Load a project from a path and categorize its files (does not analyze)
    #[command(name = "load_project")]
    LoadProject { path: PathBuf },

    /// Parse and analyze the currently loaded project
    Analyze {
        #[command(flatten)]
        args: AnalyzeArgs,
    },

    /// Show available commands
    Help,

    /// Exit the interactive session
    #[command(alias = "quit")]
    Exit,
}

enum Step {
    Continue(Session),
    Exit,
}

/// Run the loop on stdin until `exit`, `quit` or end of input.
pub fn run(config: &Config) -> Result<()> {
    println!("Welcome to CodeSynth Engine Interactive CLI (coba)");
    println!("Type 'help' for available commands or 'exit' to quit.");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut session = Session::new();
    let mut line = String::new();

    loop {
        print!("coba> ");
        io::stdout().flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let command = match ShellLine::try_parse_from(words.iter().copied()) {
            Ok(parsed) => parsed.command,
            Err(err) => {
                let _ = err.print();
                continue;
            }
        };

        match execute(command, &session, config) {
            Step::Continue(next) => session = next,
            Step::Exit => {
                println!("Exiting CodeSynth Engine.");
                break;
            }
        }
    }

    println!("CodeSynth Engine CLI session ended.");
    Ok(())
}

fn execute(command: ShellCommand, session: &Session, config: &Config) -> Step {
    match command {
        ShellCommand::LoadLanguage { language } => match language.parse::<Language>() {
            Ok(language) => {
                println!("Language set to: {}", language);
                Step::Continue(session.with_language(language))
            }
            Err(err) => report_error(err, session),
        },
        ShellCommand::LoadProject { path } => {
            if session.project().is_some() {
                println!(
                    "{} A project is already loaded. Loading a new project will replace the current one.",
                    "Warning:".yellow()
                );
            }
            match session.load_project(&path, &config.exclude_patterns) {
                Ok(next) => {
                    println!("\nProject loaded and files categorized. Use 'analyze' command to parse and analyze.");
                    if let Some(project) = next.project() {
                        output::print_project_summary(project);
                    }
                    Step::Continue(next)
                }
                Err(err) => report_error(err, session),
            }
        }
        ShellCommand::Analyze { args } => {
            let options = crate::analyze_options(config, &args);
            let result = session.analyze(&options).map_err(anyhow::Error::from).and_then(
                |report| crate::emit_report(&report, OutputFormat::Text, false, &args, config),
            );
            match result {
                Ok(()) => Step::Continue(session.clone()),
                Err(err) => report_error(err, session),
            }
        }
        ShellCommand::Help => {
            let mut command = <ShellLine as clap::CommandFactory>::command();
            let _ = command.print_help();
            println!();
            Step::Continue(session.clone())
        }
        ShellCommand::Exit => Step::Exit,
    }
}

fn report_error(err: impl std::fmt::Display, session: &Session) -> Step {
    println!("{} {}", "Error:".red(), err);
    Step::Continue(session.clone())
}
