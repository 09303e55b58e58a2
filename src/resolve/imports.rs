//! Cross-file import graph and export-chain resolution.
//!
//! Built once after every per-file index exists. Each import declaration
//! is resolved against the language's module-resolution rules to an
//! exporting file; unresolvable imports are recorded and skipped, and any
//! name depending on them simply stays unresolved.

use crate::index::definitions::ImportKind;
use crate::index::file_index::SemanticIndex;
use crate::parsing::{behavior_for, FileSet};
use crate::types::{FilePath, Location, ScopeId, SymbolId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One resolved (or unresolvable) import binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub importing_file: FilePath,
    /// The exporting file, when the specifier resolves inside the project.
    pub exporting_file: Option<FilePath>,
    /// Module specifier as written in the source.
    pub specifier: String,
    pub imported_name: String,
    pub local_name: String,
    pub kind: ImportKind,
    pub scope_id: ScopeId,
    /// Symbol id of the import binding itself.
    pub symbol_id: SymbolId,
    pub location: Location,
}

/// An import that could not be resolved to a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedImport {
    pub file: FilePath,
    pub specifier: String,
    pub imported_name: String,
    pub location: Location,
}

/// The project-wide import graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportGraph {
    edges_by_file: HashMap<FilePath, Vec<ImportEdge>>,
    resolved_path_by_symbol: HashMap<SymbolId, FilePath>,
    unresolved: Vec<UnresolvedImport>,
}

impl ImportGraph {
    /// Build the graph across all per-file indexes.
    pub fn build(indexes: &IndexMap<FilePath, SemanticIndex>) -> Self {
        let files = FileSet::new(indexes.keys().cloned());
        let mut graph = ImportGraph::default();

        for (path, index) in indexes {
            let behavior = behavior_for(index.language);
            let mut edges = Vec::new();
            for import in &index.imports {
                let exporting =
                    behavior.resolve_module_path(path, &import.specifier, &files);
                match &exporting {
                    Some(target) => {
                        graph
                            .resolved_path_by_symbol
                            .insert(import.symbol_id.clone(), target.clone());
                    }
                    None => {
                        debug!(
                            file = %path,
                            specifier = %import.specifier,
                            "import does not resolve inside the project"
                        );
                        graph.unresolved.push(UnresolvedImport {
                            file: path.clone(),
                            specifier: import.specifier.clone(),
                            imported_name: import.imported_name.clone(),
                            location: import.location.clone(),
                        });
                    }
                }
                edges.push(ImportEdge {
                    importing_file: path.clone(),
                    exporting_file: exporting,
                    specifier: import.specifier.clone(),
                    imported_name: import.imported_name.clone(),
                    local_name: import.local_name.clone(),
                    kind: import.kind,
                    scope_id: import.scope_id,
                    symbol_id: import.symbol_id.clone(),
                    location: import.location.clone(),
                });
            }
            graph.edges_by_file.insert(path.clone(), edges);
        }
        graph
    }

    /// Import edges attached to one scope of a file.
    pub fn get_scope_imports(&self, file: &FilePath, scope: ScopeId) -> Vec<&ImportEdge> {
        self.edges_by_file
            .get(file)
            .map(|edges| edges.iter().filter(|e| e.scope_id == scope).collect())
            .unwrap_or_default()
    }

    /// All import edges of a file.
    pub fn file_imports(&self, file: &FilePath) -> &[ImportEdge] {
        self.edges_by_file
            .get(file)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The exporting file an import binding resolved to.
    pub fn get_resolved_import_path(&self, symbol_id: &SymbolId) -> Option<&FilePath> {
        self.resolved_path_by_symbol.get(symbol_id)
    }

    pub fn unresolved_imports(&self) -> &[UnresolvedImport] {
        &self.unresolved
    }
}

/// Resolves exported names through re-export chains with bounded depth.
pub struct ExportResolver<'a> {
    indexes: &'a IndexMap<FilePath, SemanticIndex>,
    files: FileSet,
    max_depth: usize,
    follow_reexports: bool,
}

impl<'a> ExportResolver<'a> {
    pub fn new(
        indexes: &'a IndexMap<FilePath, SemanticIndex>,
        max_depth: usize,
        follow_reexports: bool,
    ) -> Self {
        Self {
            indexes,
            files: FileSet::new(indexes.keys().cloned()),
            max_depth,
            follow_reexports,
        }
    }

    /// Resolve `name` as exported from `file`, following re-exports up to
    /// the configured depth.
    pub fn resolve_export_chain(&self, file: &FilePath, name: &str) -> Option<SymbolId> {
        self.resolve_inner(file, name, self.max_depth)
    }

    fn resolve_inner(&self, file: &FilePath, name: &str, depth: usize) -> Option<SymbolId> {
        if depth == 0 {
            return None;
        }
        let index = self.indexes.get(file)?;

        if let Some(def) = index.exported(name) {
            return Some(def.id.clone());
        }

        // `export { a as b }` and `export default a` re-export local
        // definitions under a different public name.
        for reexport in &index.reexports {
            if reexport.exported_name != name {
                continue;
            }
            match &reexport.specifier {
                None => {
                    if let Some(def) = index.module_scope_definition(&reexport.source_name) {
                        return Some(def.id.clone());
                    }
                }
                Some(spec) if self.follow_reexports => {
                    let behavior = behavior_for(index.language);
                    let target = behavior.resolve_module_path(file, spec, &self.files)?;
                    return self.resolve_inner(&target, &reexport.source_name, depth - 1);
                }
                Some(_) => {}
            }
        }

        // `export * from './m'` forwards the whole surface.
        if self.follow_reexports {
            for reexport in &index.reexports {
                if reexport.source_name != "*" {
                    continue;
                }
                let Some(spec) = &reexport.specifier else {
                    continue;
                };
                let behavior = behavior_for(index.language);
                if let Some(target) = behavior.resolve_module_path(file, spec, &self.files) {
                    if let Some(found) = self.resolve_inner(&target, name, depth - 1) {
                        return Some(found);
                    }
                }
            }
        }

        None
    }
}
