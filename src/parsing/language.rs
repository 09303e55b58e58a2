//! Language detection and enumeration.
//!
//! Exactly four languages are supported; [`SUPPORTED_LANGUAGES`] is part
//! of the public contract. Asking the pipeline to index anything else
//! yields `IndexError::UnsupportedLanguage`.

use crate::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};

/// Supported programming languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Rust,
}

/// The closed set of languages the pipeline accepts.
pub const SUPPORTED_LANGUAGES: [Language; 4] = [
    Language::JavaScript,
    Language::TypeScript,
    Language::Python,
    Language::Rust,
];

impl Language {
    /// Parse a language tag, e.g. `"typescript"`.
    pub fn from_tag(tag: &str) -> IndexResult<Self> {
        match tag.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "python" | "py" => Ok(Language::Python),
            "rust" | "rs" => Ok(Language::Rust),
            other => Err(IndexError::UnsupportedLanguage {
                language: other.to_string(),
            }),
        }
    }

    /// Detect language from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Detect language from a path string.
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.rsplit('/').next()?;
        let ext = name.rsplit('.').next()?;
        if ext == name {
            return None;
        }
        Self::from_extension(ext)
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::Python => &["py", "pyi"],
            Language::Rust => &["rs"],
        }
    }

    /// Stable key used in configuration and query-file names.
    pub fn config_key(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Rust => "rust",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Python => "Python",
            Language::Rust => "Rust",
        }
    }

    /// Whether the language scopes variables at function level rather than
    /// block level.
    pub fn function_level_scoping(&self) -> bool {
        matches!(self, Language::Python)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        for lang in SUPPORTED_LANGUAGES {
            assert_eq!(Language::from_tag(lang.config_key()).unwrap(), lang);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = Language::from_tag("cobol").unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedLanguage { language } if language == "cobol"));
    }

    #[test]
    fn extension_detection() {
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("TSX"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("pyi"), Some(Language::Python));
        assert_eq!(Language::from_extension("mjs"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("txt"), None);
    }

    #[test]
    fn path_detection() {
        assert_eq!(Language::from_path("src/lib.rs"), Some(Language::Rust));
        assert_eq!(Language::from_path("a/b/c.test.ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("Makefile"), None);
        assert_eq!(Language::from_path("src/mod"), None);
    }
}
