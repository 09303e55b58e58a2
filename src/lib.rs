//! Semantic code graph extraction for multi-language repositories.
//!
//! `semgraph` indexes a set of source files and produces a semantic graph:
//! symbol definitions, lexical scopes, typed references, resolved call
//! edges, class hierarchies, and interface-implementation maps.
//!
//! The pipeline runs in four phases:
//!
//! 1. **Per-file indexing** — tree-sitter captures are normalized into a
//!    uniform stream, a scope tree is built, definitions and references
//!    are extracted into a [`SemanticIndex`].
//! 2. **Name resolution** — bindings propagate down the scope tree with
//!    lexical shadowing and cross-file import/export chains.
//! 3. **Reference resolution** — method and constructor sites bind to
//!    concrete symbols through a cascade of heuristic strategies.
//! 4. **Structural analysis** — call chains, class hierarchies, and
//!    interface implementations are derived from the resolved graph.
//!
//! Entry point is [`ProjectIndexer`]; the result is a frozen
//! [`SemanticGraph`].

pub mod analysis;
pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod parsing;
pub mod project;
pub mod resolve;
pub mod symbol;
pub mod types;

pub use analysis::call_chains::{CallChain, CallChainAnalysis, CallChainNode};
pub use analysis::hierarchy::{ClassHierarchy, ClassNode};
pub use analysis::interfaces::{
    ImplementationMapResult, InterfaceDefinition, InterfaceImplementation,
};
pub use config::Settings;
pub use error::{IndexError, IndexResult, ParseError, ParseResult};
pub use index::file_index::SemanticIndex;
pub use parsing::{Language, SUPPORTED_LANGUAGES};
pub use project::{CancellationToken, ProjectIndexer, SemanticGraph, SourceFile};
pub use symbol::{SymbolDefinition, SymbolModifiers};
pub use types::{FilePath, Location, LocationKey, ScopeId, SymbolId, SymbolKind, Visibility};
