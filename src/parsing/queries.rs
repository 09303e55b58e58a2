//! Caching loader for capture-pattern files.
//!
//! Patterns live in `queries/<language>.scm` and are embedded at build
//! time. The loader surface is part of the external contract:
//! [`load_query`], [`has_query`], and validation of every pattern at
//! startup via [`validate_all`].

use crate::error::{IndexError, IndexResult};
use crate::parsing::language::{Language, SUPPORTED_LANGUAGES};
use std::collections::HashMap;
use std::sync::OnceLock;

static QUERY_SOURCES: OnceLock<HashMap<Language, &'static str>> = OnceLock::new();

fn sources() -> &'static HashMap<Language, &'static str> {
    QUERY_SOURCES.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert(
            Language::JavaScript,
            include_str!("../../queries/javascript.scm"),
        );
        map.insert(
            Language::TypeScript,
            include_str!("../../queries/typescript.scm"),
        );
        map.insert(Language::Python, include_str!("../../queries/python.scm"));
        map.insert(Language::Rust, include_str!("../../queries/rust.scm"));
        map
    })
}

/// Load the capture-pattern source for a language.
pub fn load_query(language: Language) -> IndexResult<&'static str> {
    sources()
        .get(&language)
        .copied()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| IndexError::QueryFileNotFound {
            language: language.config_key().to_string(),
        })
}

/// Whether a pattern file exists for the language.
pub fn has_query(language: Language) -> bool {
    load_query(language).is_ok()
}

/// Compile every bundled pattern against its grammar. Called once at
/// startup; a failure here is project-fatal.
pub fn validate_all() -> IndexResult<()> {
    for language in SUPPORTED_LANGUAGES {
        let source = load_query(language)?;
        let grammar = super::parser::grammar_for(language);
        tree_sitter::Query::new(&grammar, source).map_err(|e| IndexError::InvalidQueryPattern {
            language: language.config_key().to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_language_has_a_query() {
        for language in SUPPORTED_LANGUAGES {
            assert!(has_query(language), "missing query for {language}");
        }
    }

    #[test]
    fn bundled_queries_compile() {
        validate_all().unwrap();
    }

    #[test]
    fn query_sources_use_dotted_capture_names() {
        for language in SUPPORTED_LANGUAGES {
            let source = load_query(language).unwrap();
            assert!(source.contains("@definition."));
            assert!(source.contains("@reference."));
        }
    }
}
