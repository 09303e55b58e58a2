//! Tree-sitter parser engine.
//!
//! Wraps grammar selection, tree construction, and compiled-query
//! sharing. `Parser` instances are per-thread (tree-sitter parsers are
//! not `Sync`); compiled [`Query`] objects are immutable and shared
//! through [`QuerySet`].

use crate::error::{IndexError, IndexResult, ParseError, ParseResult};
use crate::parsing::language::{Language, SUPPORTED_LANGUAGES};
use crate::parsing::queries;
use crate::types::FilePath;
use std::collections::HashMap;
use std::sync::Arc;
use tree_sitter::{Parser, Query, Tree};

/// The tree-sitter grammar for a language.
pub fn grammar_for(language: Language) -> tree_sitter::Language {
    match language {
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
    }
}

/// Compiled capture queries for every supported language, built once at
/// startup and shared across worker threads.
#[derive(Clone)]
pub struct QuerySet {
    queries: HashMap<Language, Arc<Query>>,
}

impl QuerySet {
    /// Compile all bundled patterns. Fails fast with
    /// [`IndexError::InvalidQueryPattern`] or
    /// [`IndexError::QueryFileNotFound`].
    pub fn compile() -> IndexResult<Self> {
        let mut map = HashMap::new();
        for language in SUPPORTED_LANGUAGES {
            let source = queries::load_query(language)?;
            let query = Query::new(&grammar_for(language), source).map_err(|e| {
                IndexError::InvalidQueryPattern {
                    language: language.config_key().to_string(),
                    reason: e.to_string(),
                }
            })?;
            map.insert(language, Arc::new(query));
        }
        Ok(Self { queries: map })
    }

    pub fn get(&self, language: Language) -> &Query {
        // Every supported language is compiled in `compile`.
        &self.queries[&language]
    }
}

/// Parse source text into a syntax tree.
///
/// Partial trees (with error nodes) are returned and consumed; only a
/// completely absent tree is an error.
pub fn parse(language: Language, source: &str, path: &FilePath) -> ParseResult<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar_for(language))
        .map_err(|e| ParseError::GrammarInit {
            language: language.config_key().to_string(),
            reason: e.to_string(),
        })?;

    parser.parse(source, None).ok_or(ParseError::NoTree {
        path: path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_set_compiles_for_all_languages() {
        let set = QuerySet::compile().unwrap();
        for language in SUPPORTED_LANGUAGES {
            assert!(set.get(language).capture_names().len() > 3);
        }
    }

    #[test]
    fn parses_each_language() {
        let cases = [
            (Language::JavaScript, "function a() { return 1; }"),
            (Language::TypeScript, "interface A { run(): void; }"),
            (Language::Python, "def a():\n    return 1\n"),
            (Language::Rust, "fn a() -> u32 { 1 }"),
        ];
        for (language, source) in cases {
            let tree = parse(language, source, &FilePath::new("t")).unwrap();
            assert!(!tree.root_node().has_error(), "{language} parse error");
        }
    }

    #[test]
    fn partial_tree_is_still_a_tree() {
        let tree = parse(Language::Rust, "fn a( {", &FilePath::new("t")).unwrap();
        assert!(tree.root_node().has_error());
    }
}
