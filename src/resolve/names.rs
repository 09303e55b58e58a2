//! Phase 1: lexical name resolution.
//!
//! Propagates bindings down each file's scope tree: inherited names from
//! the parent scope, then import bindings, then local definitions (which
//! override both). The result is the visible name set at every scope,
//! used by reference resolution and the structural phases.

use crate::index::definitions::ImportKind;
use crate::index::file_index::SemanticIndex;
use crate::parsing::behavior_for;
use crate::resolve::imports::{ExportResolver, ImportGraph};
use crate::types::{FilePath, ScopeId, SymbolId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The visible name set of every scope of every file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameResolutions {
    by_file: HashMap<FilePath, HashMap<ScopeId, IndexMap<String, SymbolId>>>,
}

impl NameResolutions {
    /// Resolve a name visible at the given scope.
    pub fn resolve(&self, file: &FilePath, scope: ScopeId, name: &str) -> Option<&SymbolId> {
        self.by_file.get(file)?.get(&scope)?.get(name)
    }

    /// The complete binding map at one scope.
    pub fn scope_bindings(
        &self,
        file: &FilePath,
        scope: ScopeId,
    ) -> Option<&IndexMap<String, SymbolId>> {
        self.by_file.get(file)?.get(&scope)
    }

    pub fn file_count(&self) -> usize {
        self.by_file.len()
    }
}

/// Run phase 1 across the whole project.
pub fn resolve_project(
    indexes: &IndexMap<FilePath, SemanticIndex>,
    imports: &ImportGraph,
    exports: &ExportResolver<'_>,
) -> NameResolutions {
    let mut result = NameResolutions::default();
    for (path, index) in indexes {
        let mut per_scope = HashMap::new();
        let locals = hoisted_local_bindings(index);
        resolve_scope_recursive(
            ScopeId::ROOT,
            &IndexMap::new(),
            path,
            index,
            imports,
            exports,
            indexes,
            &locals,
            &mut per_scope,
        );
        result.by_file.insert(path.clone(), per_scope);
    }
    result
}

/// Local definitions grouped by the scope they bind in, honoring the
/// language's hoisting policy: hoisted definitions bind at the nearest
/// function (or module) scope instead of their lexical block.
fn hoisted_local_bindings(index: &SemanticIndex) -> HashMap<ScopeId, Vec<(String, SymbolId)>> {
    let behavior = behavior_for(index.language);
    let mut bindings: HashMap<ScopeId, Vec<(String, SymbolId)>> = HashMap::new();
    for def in index.symbols.values() {
        let target = if behavior.hoists_to_function_scope()
            && def
                .modifiers
                .contains(crate::symbol::SymbolModifiers::HOISTED)
        {
            index
                .scopes
                .nearest_callable_scope(def.scope_id)
                .unwrap_or(ScopeId::ROOT)
        } else {
            def.scope_id
        };
        bindings
            .entry(target)
            .or_default()
            .push((def.name.clone(), def.id.clone()));
    }
    bindings
}

#[allow(clippy::too_many_arguments)]
fn resolve_scope_recursive(
    scope: ScopeId,
    parent_resolutions: &IndexMap<String, SymbolId>,
    file: &FilePath,
    index: &SemanticIndex,
    imports: &ImportGraph,
    exports: &ExportResolver<'_>,
    indexes: &IndexMap<FilePath, SemanticIndex>,
    locals: &HashMap<ScopeId, Vec<(String, SymbolId)>>,
    out: &mut HashMap<ScopeId, IndexMap<String, SymbolId>>,
) {
    let mut bindings = parent_resolutions.clone();

    // Import bindings attached to this scope.
    for edge in imports.get_scope_imports(file, scope) {
        if edge.kind == ImportKind::Namespace {
            bindings.insert(edge.local_name.clone(), edge.symbol_id.clone());
            continue;
        }
        let resolved = imports
            .get_resolved_import_path(&edge.symbol_id)
            .and_then(|source_file| exports.resolve_export_chain(source_file, &edge.imported_name));
        match resolved {
            Some(id) => {
                bindings.insert(edge.local_name.clone(), id);
            }
            None => {
                // The imported name may itself be a submodule file; bind
                // the module symbol so member accesses still anchor.
                let behavior = behavior_for(index.language);
                let separator = match index.language {
                    crate::parsing::Language::Python => ".",
                    crate::parsing::Language::Rust => "::",
                    _ => "/",
                };
                let submodule_spec = format!("{}{separator}{}", edge.specifier, edge.imported_name);
                let files = crate::parsing::FileSet::new(indexes.keys().cloned());
                if let Some(target) =
                    behavior.resolve_module_path(file, &submodule_spec, &files)
                {
                    if let Some(target_index) = indexes.get(&target) {
                        bindings.insert(
                            edge.local_name.clone(),
                            target_index.module_symbol_id(),
                        );
                    }
                }
            }
        }
    }

    // Local definitions override inherited and imported names.
    if let Some(local_defs) = locals.get(&scope) {
        for (name, id) in local_defs {
            bindings.insert(name.clone(), id.clone());
        }
    }

    out.insert(scope, bindings.clone());

    for &child in &index.scopes.scope(scope).children {
        resolve_scope_recursive(
            child, &bindings, file, index, imports, exports, indexes, locals, out,
        );
    }
}
