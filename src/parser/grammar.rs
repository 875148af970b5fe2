// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grammar loading for the tree-sitter backend
//!
//! A grammar is either the C++ grammar compiled into this binary or a
//! prebuilt parsing-table library (`my-languages.so` style) loaded from disk.
//! Loaded grammars are cached for the life of the process, so every file after
//! the first reuses the same handle. Failed loads are not cached.

use libloading::Library;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tree_sitter::{Language, LANGUAGE_VERSION, MIN_COMPATIBLE_LANGUAGE_VERSION};
use tree_sitter_language::LanguageFn;

use crate::errors::GrammarLoadError;

/// Where the C++ grammar comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GrammarSource {
    Bundled,
    Library { path: PathBuf, symbol: String },
}

impl GrammarSource {
    pub fn library(path: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        GrammarSource::Library {
            path: path.into(),
            symbol: symbol.into(),
        }
    }
}

/// A usable grammar. Keeps the backing library mapped while the language lives.
pub struct LoadedGrammar {
    language: Language,
    _library: Option<Library>,
}

impl LoadedGrammar {
    pub fn language(&self) -> &Language {
        &self.language
    }
}

static LOADED: Lazy<Mutex<HashMap<GrammarSource, Arc<LoadedGrammar>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Load (or fetch from cache) the grammar for `source`.
pub fn load_grammar(source: &GrammarSource) -> Result<Arc<LoadedGrammar>, GrammarLoadError> {
    let mut cache = LOADED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(grammar) = cache.get(source) {
        return Ok(Arc::clone(grammar));
    }

    let grammar = Arc::new(match source {
        GrammarSource::Bundled => LoadedGrammar {
            language: tree_sitter_cpp::LANGUAGE.into(),
            _library: None,
        },
        GrammarSource::Library { path, symbol } => load_library(path, symbol)?,
    });
    check_abi(&grammar.language)?;

    tracing::debug!(?source, "grammar loaded");
    cache.insert(source.clone(), Arc::clone(&grammar));
    Ok(grammar)
}

fn load_library(path: &Path, symbol: &str) -> Result<LoadedGrammar, GrammarLoadError> {
    if !path.is_file() {
        return Err(GrammarLoadError::Missing(path.to_path_buf()));
    }

    // SAFETY: the library is a tree-sitter grammar whose initializers have no
    // preconditions; it stays loaded for as long as the returned language.
    let library = unsafe { Library::new(path) }.map_err(|e| GrammarLoadError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let constructor = {
        // SAFETY: tree-sitter grammars export `const TSLanguage *tree_sitter_<name>(void)`.
        let symbol_fn = unsafe {
            library.get::<unsafe extern "C" fn() -> *const ()>(symbol.as_bytes())
        }
        .map_err(|_| GrammarLoadError::MissingSymbol {
            path: path.to_path_buf(),
            symbol: symbol.to_string(),
        })?;
        *symbol_fn
    };

    // SAFETY: `constructor` is the grammar entry point resolved above.
    let language_fn = unsafe { LanguageFn::from_raw(constructor) };
    Ok(LoadedGrammar {
        language: Language::new(language_fn),
        _library: Some(library),
    })
}

fn check_abi(language: &Language) -> Result<(), GrammarLoadError> {
    let found = language.version();
    if (MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&found) {
        Ok(())
    } else {
        Err(GrammarLoadError::IncompatibleAbi {
            found,
            min: MIN_COMPATIBLE_LANGUAGE_VERSION,
            max: LANGUAGE_VERSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_grammar_is_cached() {
        let first = load_grammar(&GrammarSource::Bundled).unwrap();
        let second = load_grammar(&GrammarSource::Bundled).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_library_reports_path() {
        let source = GrammarSource::library("/nonexistent/my-languages.so", "tree_sitter_cpp");
        let err = load_grammar(&source).err().unwrap();
        assert!(matches!(err, GrammarLoadError::Missing(path) if path.ends_with("my-languages.so")));
    }

    #[test]
    fn test_non_library_file_fails_to_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("my-languages.so");
        std::fs::write(&path, b"not a shared object").unwrap();
        let err = load_grammar(&GrammarSource::library(&path, "tree_sitter_cpp"))
            .err()
            .unwrap();
        assert!(matches!(err, GrammarLoadError::Load { .. }));
        // Failed loads are retried rather than cached.
        assert!(load_grammar(&GrammarSource::library(&path, "tree_sitter_cpp")).is_err());
    }
}
