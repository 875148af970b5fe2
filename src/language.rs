// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analysis target languages

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::ConfigurationError;

/// Languages a session can be pointed at. Only [`Language::Cpp`] has backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Python,
    Javascript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Python => "python",
            Language::Javascript => "javascript",
        }
    }

    /// True when the language has at least one working backend.
    pub fn is_supported(&self) -> bool {
        matches!(self, Language::Cpp)
    }

    /// Fail with [`ConfigurationError::Unsupported`] for placeholder languages.
    pub fn ensure_supported(&self) -> Result<(), ConfigurationError> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(ConfigurationError::Unsupported(capitalize(self.as_str())))
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpp" | "c++" => Ok(Language::Cpp),
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::Javascript),
            other => Err(ConfigurationError::InvalidLanguage(other.to_string())),
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_names() {
        assert_eq!("cpp".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(ConfigurationError::InvalidLanguage(name)) if name == "cobol"
        ));
    }

    #[test]
    fn test_only_cpp_is_supported() {
        assert!(Language::Cpp.ensure_supported().is_ok());
        let err = Language::Javascript.ensure_supported().unwrap_err();
        assert_eq!(err, ConfigurationError::Unsupported("Javascript".into()));
    }
}
