// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiler-frontend backend: libclang translation units
//!
//! libclang is loaded at runtime. The `clang` binding allows a single live
//! `Clang` instance per process, so every parse takes [`FRONTEND_LOCK`] for
//! its whole lifetime and files are handled one at a time.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::time::Duration;

use clang::diagnostic::Severity;
use clang::{Clang, Entity, EntityKind, Index, Linkage, TranslationUnit};
use once_cell::sync::Lazy;

use crate::errors::ParseFailure;
use crate::model::{CallRecord, UserFunctionSet};

static FRONTEND_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

static AVAILABLE: Lazy<bool> = Lazy::new(|| {
    let _guard = FRONTEND_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    match Clang::new() {
        Ok(_) => true,
        Err(reason) => {
            tracing::debug!("libclang unavailable: {}", reason);
            false
        }
    }
});

/// libclang-backed parser for C/C++ sources
#[derive(Debug, Clone, Default)]
pub struct FrontendBackend {
    arguments: Vec<String>,
    fail_on_fatal: bool,
    timeout: Option<Duration>,
}

impl FrontendBackend {
    /// `arguments` are passed to the frontend verbatim (`-I`, `-std=`, ...).
    pub fn new(arguments: Vec<String>) -> Self {
        Self {
            arguments,
            ..Self::default()
        }
    }

    /// True when libclang can be loaded in this process.
    pub fn is_available() -> bool {
        *AVAILABLE
    }

    pub fn with_fatal_diagnostics_rejected(mut self, reject: bool) -> Self {
        self.fail_on_fatal = reject;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pass 1 only: user functions defined in `path`.
    pub fn collect_definitions(&self, path: &Path) -> Result<UserFunctionSet, ParseFailure> {
        self.run_guarded(path, |tu, _| collect_user_functions(tu))
    }

    /// Parse `path` and extract its call records. With `known`, that set is
    /// used for matching instead of the unit's own definitions.
    pub fn analyze_file(
        &self,
        path: &Path,
        known: Option<std::sync::Arc<UserFunctionSet>>,
    ) -> Result<Vec<CallRecord>, ParseFailure> {
        self.run_guarded(path, move |tu, path| match known {
            Some(functions) => match_calls(tu, &functions, path),
            None => extract_calls(tu, path),
        })
    }

    /// Run `job` against the translation unit of `path`, bounded by the timeout.
    ///
    /// On timeout the worker thread is abandoned; it keeps the frontend lock
    /// until libclang returns, and later files wait (bounded) for it.
    fn run_guarded<R, J>(&self, path: &Path, job: J) -> Result<R, ParseFailure>
    where
        R: Send + 'static,
        J: FnOnce(&TranslationUnit<'_>, &Path) -> R + Send + 'static,
    {
        let Some(timeout) = self.timeout else {
            let _guard = FRONTEND_LOCK
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            return parse_and_run(path, &self.arguments, self.fail_on_fatal, job);
        };

        let (started_tx, started_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let path_buf: PathBuf = path.to_path_buf();
        let arguments = self.arguments.clone();
        let fail_on_fatal = self.fail_on_fatal;

        std::thread::Builder::new()
            .name("coba-frontend".into())
            .spawn(move || {
                let _guard = FRONTEND_LOCK
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let _ = started_tx.send(());
                let _ = result_tx.send(parse_and_run(&path_buf, &arguments, fail_on_fatal, job));
            })
            .map_err(|e| ParseFailure::Frontend(e.to_string()))?;

        // Waiting for the lock is bounded separately from the parse itself.
        match started_rx.recv_timeout(timeout) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => return Err(ParseFailure::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ParseFailure::Frontend("frontend worker exited".into()))
            }
        }

        match result_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ParseFailure::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ParseFailure::Frontend("frontend worker panicked".into()))
            }
        }
    }
}

/// Caller must hold [`FRONTEND_LOCK`].
fn parse_and_run<R>(
    path: &Path,
    arguments: &[String],
    fail_on_fatal: bool,
    job: impl FnOnce(&TranslationUnit<'_>, &Path) -> R,
) -> Result<R, ParseFailure> {
    let clang = Clang::new().map_err(ParseFailure::BackendUnavailable)?;
    let index = Index::new(&clang, false, false);
    let tu = index
        .parser(path)
        .arguments(arguments)
        .parse()
        .map_err(|e| ParseFailure::Frontend(e.to_string()))?;

    for diagnostic in tu.get_diagnostics() {
        if diagnostic.get_severity() != Severity::Fatal {
            continue;
        }
        let text = diagnostic.get_text();
        if fail_on_fatal {
            return Err(ParseFailure::FatalDiagnostic(text));
        }
        tracing::warn!(file = %path.display(), "fatal diagnostic: {}", text);
    }

    tracing::debug!(file = %path.display(), "parsed translation unit");
    Ok(job(&tu, path))
}

/// Both passes over one translation unit.
pub fn extract_calls(tu: &TranslationUnit<'_>, path: &Path) -> Vec<CallRecord> {
    let functions = collect_user_functions(tu);
    tracing::debug!(
        file = %path.display(),
        functions = ?functions.sorted_names(),
        "user-defined functions detected"
    );
    match_calls(tu, &functions, path)
}

/// Pass 1: functions and methods that are defined here with external linkage.
///
/// Static (internal linkage) functions are excluded even when they belong to
/// the project.
pub fn collect_user_functions(tu: &TranslationUnit<'_>) -> UserFunctionSet {
    let mut functions = UserFunctionSet::new();

    let mut stack = vec![tu.get_entity()];
    while let Some(entity) = stack.pop() {
        if matches!(entity.get_kind(), EntityKind::FunctionDecl | EntityKind::Method)
            && entity.is_definition()
            && entity.get_linkage() == Some(Linkage::External)
        {
            if let Some(name) = entity.get_name() {
                functions.insert(name, entity_line(&entity));
            }
        }
        push_children_reversed(entity, &mut stack);
    }

    functions
}

/// Pass 2: call expressions in the main file naming a function in `functions`.
///
/// Records are returned in line order; calls on the same line keep traversal order.
pub fn match_calls(
    tu: &TranslationUnit<'_>,
    functions: &UserFunctionSet,
    path: &Path,
) -> Vec<CallRecord> {
    let mut calls = Vec::new();

    let mut stack: Vec<(Entity<'_>, Option<Rc<str>>)> = vec![(tu.get_entity(), None)];
    while let Some((entity, enclosing)) = stack.pop() {
        let mut scope = enclosing;
        let kind = entity.get_kind();

        if is_function_like(kind) && entity.is_definition() {
            if let Some(name) = entity.get_name() {
                scope = Some(Rc::from(name));
            }
        } else if kind == EntityKind::CallExpr && in_main_file(&entity) {
            if let Some(callee) = entity.get_name().filter(|name| functions.contains(name)) {
                calls.push(CallRecord::new(
                    scope.as_deref(),
                    callee,
                    path,
                    entity_line(&entity),
                ));
            }
        }

        let mut children = Vec::new();
        push_children_reversed(entity, &mut children);
        stack.extend(children.into_iter().map(|child| (child, scope.clone())));
    }

    calls.sort_by_key(|call| call.line);
    calls
}

fn is_function_like(kind: EntityKind) -> bool {
    matches!(
        kind,
        EntityKind::FunctionDecl
            | EntityKind::Method
            | EntityKind::Constructor
            | EntityKind::Destructor
            | EntityKind::ConversionFunction
            | EntityKind::FunctionTemplate
    )
}

/// Children in reverse order so popping yields a left-to-right pre-order walk.
/// System-header subtrees are skipped.
fn push_children_reversed<'tu>(entity: Entity<'tu>, stack: &mut Vec<Entity<'tu>>) {
    let children = entity.get_children();
    stack.extend(
        children
            .into_iter()
            .rev()
            .filter(|child| !in_system_header(child)),
    );
}

fn in_system_header(entity: &Entity<'_>) -> bool {
    entity
        .get_location()
        .map(|location| location.is_in_system_header())
        .unwrap_or(false)
}

fn in_main_file(entity: &Entity<'_>) -> bool {
    entity
        .get_location()
        .map(|location| location.is_in_main_file())
        .unwrap_or(false)
}

fn entity_line(entity: &Entity<'_>) -> usize {
    entity
        .get_location()
        .map(|location| location.get_file_location().line as usize)
        .unwrap_or(0)
}
