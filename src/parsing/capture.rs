//! Capture normalization.
//!
//! Executes a language's capture patterns against a parsed tree and emits
//! a uniform, document-ordered stream of [`NormalizedCapture`] records.
//! Capture names use the dotted `category.entity` convention
//! (`@definition.function`, `@reference.call`, `@scope.block`); a capture
//! whose name does not parse is dropped with a warning and processing
//! continues.
//!
//! The records keep a handle to their syntax node so the extractors can
//! inspect structure (receivers, property chains, heritage clauses)
//! without the query patterns having to encode it.

use crate::types::{FilePath, Location};
use serde::{Deserialize, Serialize};
use streaming_iterator::StreamingIterator;
use tracing::warn;
use tree_sitter::{Node, Query, QueryCursor, Tree};

/// The coarse classification of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureCategory {
    Definition,
    Reference,
    Assignment,
    Return,
    Scope,
}

impl CaptureCategory {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "definition" => Some(Self::Definition),
            "reference" => Some(Self::Reference),
            "assignment" => Some(Self::Assignment),
            "return" => Some(Self::Return),
            "scope" => Some(Self::Scope),
            _ => None,
        }
    }
}

/// The semantic kind of the captured entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureEntity {
    Function,
    Method,
    Class,
    Interface,
    TypeAlias,
    Variable,
    Parameter,
    Field,
    Import,
    Export,
    Module,
    Impl,
    Call,
    Constructor,
    Member,
    Expression,
    Statement,
    Block,
}

impl CaptureEntity {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(Self::Function),
            "method" => Some(Self::Method),
            "class" => Some(Self::Class),
            "interface" => Some(Self::Interface),
            "type_alias" => Some(Self::TypeAlias),
            "variable" => Some(Self::Variable),
            "parameter" => Some(Self::Parameter),
            "field" => Some(Self::Field),
            "import" => Some(Self::Import),
            "export" => Some(Self::Export),
            "module" => Some(Self::Module),
            "impl" => Some(Self::Impl),
            "call" => Some(Self::Call),
            "constructor" => Some(Self::Constructor),
            "member" => Some(Self::Member),
            "expression" => Some(Self::Expression),
            "statement" => Some(Self::Statement),
            "block" => Some(Self::Block),
            _ => None,
        }
    }
}

/// One uniform capture record. Ordering over a file is document order:
/// ascending start byte, with enclosing nodes before their children.
#[derive(Debug, Clone)]
pub struct NormalizedCapture<'t> {
    pub category: CaptureCategory,
    pub entity: CaptureEntity,
    /// Truncated preview of the captured source text.
    pub text: String,
    pub location: Location,
    pub node: Node<'t>,
}

/// Maximum bytes of source text preserved on a capture record.
const TEXT_PREVIEW_BYTES: usize = 256;

/// Run the compiled query over a tree and normalize the captures.
pub fn normalize<'t>(
    tree: &'t Tree,
    source: &str,
    file: &FilePath,
    query: &Query,
) -> Vec<NormalizedCapture<'t>> {
    let capture_names = query.capture_names();
    let mut cursor = QueryCursor::new();
    let mut out: Vec<NormalizedCapture<'t>> = Vec::new();
    let mut seen: std::collections::HashSet<(usize, u32)> = std::collections::HashSet::new();

    let mut matches = cursor.matches(query, tree.root_node(), source.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            let name = capture_names[capture.index as usize];
            let Some((category, entity)) = parse_capture_name(name) else {
                warn!(capture = name, "dropping capture with unparseable name");
                continue;
            };
            // The same node can be reached by more than one pattern; keep
            // the first occurrence per (node, capture name).
            if !seen.insert((capture.node.id(), capture.index)) {
                continue;
            }
            out.push(NormalizedCapture {
                category,
                entity,
                text: safe_truncate(node_text(capture.node, source), TEXT_PREVIEW_BYTES)
                    .to_string(),
                location: location_of(capture.node, file),
                node: capture.node,
            });
        }
    }

    // Document order: parents before children.
    out.sort_by(|a, b| {
        a.node
            .start_byte()
            .cmp(&b.node.start_byte())
            .then(b.node.end_byte().cmp(&a.node.end_byte()))
    });
    out
}

fn parse_capture_name(name: &str) -> Option<(CaptureCategory, CaptureEntity)> {
    let (category, entity) = name.split_once('.')?;
    Some((CaptureCategory::parse(category)?, CaptureEntity::parse(entity)?))
}

/// Source text of a node.
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// Location of a node within a file.
pub fn location_of(node: Node<'_>, file: &FilePath) -> Location {
    let start = node.start_position();
    let end = node.end_position();
    Location::new(
        file.clone(),
        start.row as u32,
        start.column as u32,
        end.row as u32,
        end.column as u32,
    )
}

/// Truncate at a UTF-8 character boundary at or before `max_bytes`.
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    &s[..boundary]
}

/// Text of the `name`-like field of a definition node, trying the common
/// field names across the four grammars.
pub fn name_text<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    for field in ["name", "pattern"] {
        if let Some(child) = node.child_by_field_name(field) {
            return Some(node_text(child, source));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parser::{parse, QuerySet};
    use crate::parsing::Language;

    fn captures_for(language: Language, source: &str) -> Vec<(CaptureCategory, CaptureEntity)> {
        let file = FilePath::new("test");
        let tree = parse(language, source, &file).unwrap();
        let queries = QuerySet::compile().unwrap();
        normalize(&tree, source, &file, queries.get(language))
            .iter()
            .map(|c| (c.category, c.entity))
            .collect()
    }

    #[test]
    fn javascript_function_and_call() {
        let caps = captures_for(Language::JavaScript, "function main() { foo(); }");
        assert!(caps.contains(&(CaptureCategory::Definition, CaptureEntity::Function)));
        assert!(caps.contains(&(CaptureCategory::Reference, CaptureEntity::Call)));
        assert!(caps.contains(&(CaptureCategory::Scope, CaptureEntity::Block)));
    }

    #[test]
    fn python_class_and_method() {
        let caps = captures_for(
            Language::Python,
            "class User:\n    def get_name(self):\n        return self.name\n",
        );
        assert!(caps.contains(&(CaptureCategory::Definition, CaptureEntity::Class)));
        assert!(caps.contains(&(CaptureCategory::Definition, CaptureEntity::Function)));
        assert!(caps.contains(&(CaptureCategory::Return, CaptureEntity::Statement)));
        assert!(caps.contains(&(CaptureCategory::Reference, CaptureEntity::Member)));
        // Python never opens block scopes.
        assert!(!caps.contains(&(CaptureCategory::Scope, CaptureEntity::Block)));
    }

    #[test]
    fn rust_impl_and_struct_literal() {
        let caps = captures_for(
            Language::Rust,
            "struct P { x: u32 }\nimpl P { fn get(&self) -> u32 { self.x } }\nfn mk() -> P { P { x: 1 } }\n",
        );
        assert!(caps.contains(&(CaptureCategory::Definition, CaptureEntity::Class)));
        assert!(caps.contains(&(CaptureCategory::Definition, CaptureEntity::Impl)));
        assert!(caps.contains(&(CaptureCategory::Reference, CaptureEntity::Constructor)));
    }

    #[test]
    fn document_order_parents_first() {
        let file = FilePath::new("test");
        let source = "function outer() { function inner() { leaf(); } }";
        let tree = parse(Language::JavaScript, source, &file).unwrap();
        let queries = QuerySet::compile().unwrap();
        let caps = normalize(&tree, source, &file, queries.get(Language::JavaScript));

        let positions: Vec<usize> = caps
            .iter()
            .filter(|c| c.entity == CaptureEntity::Function)
            .map(|c| c.node.start_byte())
            .collect();
        assert_eq!(positions.len(), 2);
        assert!(positions[0] < positions[1], "outer must precede inner");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "ab\u{1F50D}cd";
        let cut = safe_truncate(text, 3);
        assert_eq!(cut, "ab");
    }
}
