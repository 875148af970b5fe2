// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report rendering: JSON document and console lines

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisReport, FileStatus};
use crate::model::CallRecord;
use crate::project::ProjectFiles;

/// Serializable view of an [`AnalysisReport`]
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub project_path: &'a Path,
    pub language: &'static str,
    pub parser_used: &'static str,
    pub match_scope: String,
    pub function_calls: Vec<&'a CallRecord>,
    pub files: Vec<FileEntry<'a>>,
    pub summary: Summary,
}

#[derive(Debug, Serialize)]
pub struct FileEntry<'a> {
    pub file: &'a Path,
    pub status: &'static str,
    pub call_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub discovered: usize,
    pub parsed: usize,
    pub failed: usize,
    pub calls: usize,
}

impl<'a> ReportDocument<'a> {
    pub fn new(report: &'a AnalysisReport) -> Self {
        let files = report
            .files
            .iter()
            .map(|outcome| match &outcome.status {
                FileStatus::Parsed(calls) => FileEntry {
                    file: &outcome.path,
                    status: "parsed",
                    call_count: calls.len(),
                    error: None,
                },
                FileStatus::Failed(failure) => FileEntry {
                    file: &outcome.path,
                    status: "failed",
                    call_count: 0,
                    error: Some(failure.to_string()),
                },
            })
            .collect();

        let parsed = report.parsed_count();
        Self {
            project_path: &report.project_path,
            language: report.language.as_str(),
            parser_used: report.backend.label(),
            match_scope: report.match_scope.to_string(),
            function_calls: report.calls().collect(),
            files,
            summary: Summary {
                discovered: report.files.len(),
                parsed,
                failed: report.files.len() - parsed,
                calls: report.call_count(),
            },
        }
    }
}

/// Print JSON to stdout
pub fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}

/// Write the JSON report document to `path`, returning the path written.
pub fn write_json_report(report: &AnalysisReport, path: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(&ReportDocument::new(report))?;
    std::fs::write(path, json)
        .with_context(|| format!("Error writing JSON report to {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Human-readable line for one call record
pub fn format_call_line(call: &CallRecord) -> String {
    format!(
        "  - File: {}, Line: {}, Callee: {}",
        call.file.display(),
        call.line,
        call.callee_function
    )
}

/// Discovery summary for a freshly loaded project
pub fn print_project_summary(project: &ProjectFiles) {
    println!("Project: {}", project.root.display().to_string().cyan());
    println!("C++ Project File Summary:");
    println!("  Detected C++ Source Files: {}", project.sources.len());
    println!("  Detected C++ Header Files: {}", project.headers.len());
    println!("  Other Files: {}", project.other.len());
    println!("  Total Files: {}", project.total_files());
}

/// Print calls, then per-file notes, to stdout.
pub fn print_console(report: &AnalysisReport) {
    if report.files.is_empty() {
        println!("No C++ source files found in the loaded project.");
        return;
    }

    if report.call_count() == 0 {
        println!("\n{} No function calls found.", "✗".red());
    } else {
        println!("\n{}", "Extracted Function Calls:".bold());
        for call in report.calls() {
            println!("{}", format_call_line(call));
        }
    }

    let empty: Vec<&Path> = report
        .files
        .iter()
        .filter(|outcome| matches!(&outcome.status, FileStatus::Parsed(calls) if calls.is_empty()))
        .map(|outcome| outcome.path.as_path())
        .collect();
    if !empty.is_empty() {
        println!("\nParsed with no calls to user-defined functions:");
        for path in empty {
            println!("  - {}", path.display().to_string().dimmed());
        }
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("\n{}", "Parsing failed:".yellow());
        for (path, failure) in &failures {
            println!("  - {}: {}", path.display(), failure);
        }
    }

    println!(
        "\n{} {} calls from {}/{} files ({} parser)",
        "✓".green(),
        report.call_count().to_string().cyan(),
        report.parsed_count(),
        report.files.len(),
        report.backend
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FileOutcome, MatchScope};
    use crate::errors::ParseFailure;
    use crate::language::Language;
    use crate::parser::BackendKind;

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            project_path: PathBuf::from("/proj"),
            language: Language::Cpp,
            backend: BackendKind::Clang,
            match_scope: MatchScope::File,
            files: vec![
                FileOutcome {
                    path: PathBuf::from("/proj/a.cpp"),
                    status: FileStatus::Parsed(vec![CallRecord::new(
                        Some("main"),
                        "add",
                        "/proj/a.cpp",
                        7,
                    )]),
                },
                FileOutcome {
                    path: PathBuf::from("/proj/empty.cpp"),
                    status: FileStatus::Parsed(Vec::new()),
                },
                FileOutcome {
                    path: PathBuf::from("/proj/bad.cpp"),
                    status: FileStatus::Failed(ParseFailure::Syntax { line: 3 }),
                },
            ],
        }
    }

    #[test]
    fn test_document_shape() {
        let report = sample_report();
        let value = serde_json::to_value(ReportDocument::new(&report)).unwrap();

        assert_eq!(value["project_path"], "/proj");
        assert_eq!(value["language"], "cpp");
        assert_eq!(value["parser_used"], "Clang");
        assert_eq!(value["match_scope"], "file");
        assert_eq!(value["function_calls"][0]["caller_function"], "main");
        assert_eq!(value["function_calls"][0]["callee_function"], "add");
        assert_eq!(value["function_calls"][0]["line"], 7);
        assert_eq!(value["files"][1]["status"], "parsed");
        assert_eq!(value["files"][1]["call_count"], 0);
        assert!(value["files"][1].get("error").is_none());
        assert_eq!(value["files"][2]["status"], "failed");
        assert_eq!(value["files"][2]["error"], "syntax error near line 3");
        assert_eq!(value["summary"]["discovered"], 3);
        assert_eq!(value["summary"]["parsed"], 2);
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["summary"]["calls"], 1);
    }

    #[test]
    fn test_call_line_format() {
        let call = CallRecord::new(None, "add", "/proj/a.cpp", 7);
        assert_eq!(
            format_call_line(&call),
            "  - File: /proj/a.cpp, Line: 7, Callee: add"
        );
    }

    #[test]
    fn test_write_json_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("analysis_report.json");
        write_json_report(&sample_report(), &path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["function_calls"].as_array().unwrap().len(), 1);
    }
}
