//! Core identifier and location types.
//!
//! All cross-entity relationships in the index are expressed through these
//! ids, never through pointers. Ids are content-addressed: reindexing an
//! unchanged file yields bitwise-identical values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Canonical path of an indexed file, `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilePath(Arc<str>);

impl FilePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The directory portion of the path, without a trailing slash.
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// The final path component.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The final path component without its extension.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => Some(&name[idx + 1..]),
            _ => None,
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Globally-unique, content-addressed symbol identifier.
///
/// Derived from kind, name, containing class (if any), and the definition
/// location, so identical source always yields the identical id. The
/// reserved sentinel [`SymbolId::module_sentinel`] stands for file-level
/// code that belongs to no named symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(Box<str>);

pub const MODULE_SENTINEL: &str = "<module>";

impl SymbolId {
    /// Derive the id for a definition.
    pub fn derive(
        kind: SymbolKind,
        name: &str,
        class_name: Option<&str>,
        location: &Location,
    ) -> Self {
        let qualified = match class_name {
            Some(class) => format!("{class}.{name}"),
            None => name.to_string(),
        };
        Self(
            format!(
                "{}:{}@{}:{}:{}",
                kind.as_str(),
                qualified,
                location.file,
                location.start_line,
                location.start_column
            )
            .into_boxed_str(),
        )
    }

    /// An id standing for an unresolved callee known only by name.
    pub fn unresolved(name: &str) -> Self {
        Self(format!("?:{name}").into_boxed_str())
    }

    /// The `<module>` sentinel: caller of file-level code.
    pub fn module_sentinel() -> Self {
        Self(MODULE_SENTINEL.into())
    }

    pub fn is_module_sentinel(&self) -> bool {
        &*self.0 == MODULE_SENTINEL
    }

    pub fn is_unresolved(&self) -> bool {
        self.0.starts_with("?:")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a scope in its file's scope arena. The module root is 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A source span. Lines and columns are 0-based, matching tree-sitter rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: FilePath,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    pub fn new(
        file: FilePath,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Whether this span contains the given point.
    pub fn contains_point(&self, line: u32, column: u32) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && column < self.start_column {
            return false;
        }
        if line == self.end_line && column > self.end_column {
            return false;
        }
        true
    }

    /// Whether this span fully contains `other`. Spans in a scope tree are
    /// nested or disjoint, never partially overlapping.
    pub fn contains(&self, other: &Location) -> bool {
        self.contains_point(other.start_line, other.start_column)
            && self.contains_point(other.end_line, other.end_column)
    }

    pub fn key(&self) -> LocationKey {
        LocationKey::from_location(self)
    }
}

/// Deterministic map key derived from `(file, start_line, start_column)`.
///
/// Two distinct sites never collide because the file path is part of the
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey(Box<str>);

impl LocationKey {
    pub fn from_location(location: &Location) -> Self {
        Self::from_parts(&location.file, location.start_line, location.start_column)
    }

    pub fn from_parts(file: &FilePath, line: u32, column: u32) -> Self {
        Self(format!("{file}:{line}:{column}").into_boxed_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of thing a definition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Variable,
    Parameter,
    Constructor,
    Field,
    TypeAlias,
    Module,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Variable => "variable",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Field => "field",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Module => "module",
        }
    }

    /// Kinds that can appear as the caller of a reference.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Constructor
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Visibility of a definition to other files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}
