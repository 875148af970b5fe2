// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analysis session: selected language and loaded project
//!
//! A session is immutable. Choosing a language yields a fresh session with no
//! project; loading a project yields a new session that replaces the old one.

use std::path::Path;
use std::sync::Arc;

use crate::analysis::{AnalysisReport, Analyzer, MatchScope};
use crate::errors::{ConfigurationError, SessionError};
use crate::language::Language;
use crate::parser::{Backend, BackendKind, BackendOptions};
use crate::project::{load_project, ProjectFiles};

/// Per-run analysis choices
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub backend: BackendKind,
    pub backend_options: BackendOptions,
    pub scope: MatchScope,
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    language: Option<Language>,
    project: Option<Arc<ProjectFiles>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with `language`; any loaded project is discarded.
    pub fn with_language(&self, language: Language) -> Self {
        Self {
            language: Some(language),
            project: None,
        }
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn project(&self) -> Option<&ProjectFiles> {
        self.project.as_deref()
    }

    /// Discover `path` and return a session holding it. On error the current
    /// session is untouched.
    pub fn load_project(
        &self,
        path: impl AsRef<Path>,
        exclude_patterns: &[String],
    ) -> Result<Self, SessionError> {
        let language = self.language.ok_or(ConfigurationError::NoLanguage)?;
        let project = load_project(path, language, exclude_patterns)?;
        Ok(Self {
            language: Some(language),
            project: Some(Arc::new(project)),
        })
    }

    /// Run the chosen backend over every source file of the loaded project.
    pub fn analyze(&self, options: &AnalyzeOptions) -> Result<AnalysisReport, SessionError> {
        let language = self.language.ok_or(ConfigurationError::NoLanguage)?;
        language.ensure_supported()?;
        let project = self.project.as_ref().ok_or(ConfigurationError::NoProject)?;

        let mut backend_options = options.backend_options.clone();
        backend_options.clang_args.extend(
            project
                .include_dirs()
                .iter()
                .map(|dir| format!("-I{}", dir.display())),
        );
        let backend = Backend::select(options.backend, &backend_options);

        tracing::info!(
            project = %project.root.display(),
            backend = %backend.kind(),
            sources = project.sources.len(),
            "analyzing project"
        );

        let files = Analyzer::new(&backend)
            .with_scope(options.scope)
            .with_jobs(options.jobs)
            .run(&project.sources);

        Ok(AnalysisReport {
            project_path: project.root.clone(),
            language,
            backend: backend.kind(),
            match_scope: options.scope,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DiscoveryError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_analyze_requires_language_and_project() {
        let session = Session::new();
        assert!(matches!(
            session.analyze(&AnalyzeOptions::default()),
            Err(SessionError::Configuration(ConfigurationError::NoLanguage))
        ));

        let session = session.with_language(Language::Cpp);
        assert!(matches!(
            session.analyze(&AnalyzeOptions::default()),
            Err(SessionError::Configuration(ConfigurationError::NoProject))
        ));
    }

    #[test]
    fn test_load_project_requires_language() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Session::new().load_project(dir.path(), &[]),
            Err(SessionError::Configuration(ConfigurationError::NoLanguage))
        ));
    }

    #[test]
    fn test_language_change_discards_project() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.cpp"), "int main() { return 0; }\n").unwrap();

        let session = Session::new()
            .with_language(Language::Cpp)
            .load_project(dir.path(), &[])
            .unwrap();
        assert!(session.project().is_some());

        let session = session.with_language(Language::Cpp);
        assert!(session.project().is_none());
    }

    #[test]
    fn test_failed_reload_keeps_previous_project() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.cpp"), "int main() { return 0; }\n").unwrap();
        let session = Session::new()
            .with_language(Language::Cpp)
            .load_project(dir.path(), &[])
            .unwrap();

        let err = session
            .load_project(dir.path().join("missing"), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Discovery(DiscoveryError::NotFound(_))
        ));
        assert_eq!(session.project().unwrap().sources.len(), 1);
    }

    #[test]
    fn test_analyze_reports_per_file_outcomes() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.cpp"),
            "int add(int a, int b) { return a + b; }\nint main() { return add(5, 3); }\n",
        )
        .unwrap();
        fs::write(dir.path().join("z.cpp"), "int broken( {\n").unwrap();

        let report = Session::new()
            .with_language(Language::Cpp)
            .load_project(dir.path(), &[])
            .unwrap()
            .analyze(&AnalyzeOptions::default())
            .unwrap();

        assert_eq!(report.backend, BackendKind::Grammar);
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.parsed_count(), 1);
        assert_eq!(report.failures().count(), 1);
        let calls: Vec<_> = report.calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callee_function, "add");
        assert_eq!(calls[0].line, 2);
    }
}
