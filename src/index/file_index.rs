//! Per-file semantic index assembly.
//!
//! Runs the per-file pipeline (parse → normalize → scope tree →
//! definitions → references) and assembles the write-once
//! [`SemanticIndex`]. Once built, an index is never mutated; the global
//! phases only read from it.

use crate::error::{IndexError, IndexResult};
use crate::index::definitions::{self, ClassInfo, Definitions, ImplBlockInfo, ImportDeclaration, ReExport};
use crate::index::references::{
    self, AssignmentReference, CallReference, MemberAccessReference, References, ReturnReference,
    TypeReference,
};
use crate::index::scope::ScopeTree;
use crate::parsing::capture::normalize;
use crate::parsing::parser::{parse, QuerySet};
use crate::parsing::{behavior_for, Language};
use crate::symbol::SymbolDefinition;
use crate::types::{FilePath, Location, LocationKey, ScopeId, SymbolId, SymbolKind, Visibility};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A constructor call assigned to a local variable, recorded for
/// receiver-type track-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorAssignment {
    pub class_name: String,
    pub scope_id: ScopeId,
    pub location: Location,
}

/// Local type facts: constructor assignments, annotations by site, and
/// declared variable types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalTypeFlow {
    /// Variable name → constructor calls assigned to it, in document order.
    pub constructors_by_var: HashMap<String, Vec<ConstructorAssignment>>,
    /// Type annotation text keyed by the annotated name's location.
    pub annotations: HashMap<LocationKey, String>,
    /// Declared variable types by name.
    pub variable_types: HashMap<String, String>,
}

/// The complete semantic index of one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticIndex {
    pub file: FilePath,
    pub language: Language,
    /// SHA-256 of the source, for unchanged-file detection.
    pub content_hash: String,
    pub scopes: ScopeTree,
    pub symbols: IndexMap<SymbolId, SymbolDefinition>,
    pub definitions_by_scope: HashMap<ScopeId, IndexMap<String, SymbolId>>,
    pub calls: Vec<CallReference>,
    pub member_accesses: Vec<MemberAccessReference>,
    pub type_references: Vec<TypeReference>,
    pub assignments: Vec<AssignmentReference>,
    pub returns: Vec<ReturnReference>,
    pub imports: Vec<ImportDeclaration>,
    pub reexports: Vec<ReExport>,
    pub classes: Vec<ClassInfo>,
    pub impls: Vec<ImplBlockInfo>,
    pub local_type_flow: LocalTypeFlow,
}

impl SemanticIndex {
    pub fn symbol(&self, id: &SymbolId) -> Option<&SymbolDefinition> {
        self.symbols.get(id)
    }

    /// The synthetic symbol id of this file as a module.
    pub fn module_symbol_id(&self) -> SymbolId {
        let root = self.scopes.scope(ScopeId::ROOT);
        SymbolId::derive(SymbolKind::Module, self.file.file_stem(), None, &root.location)
    }

    /// Resolve an exported name to its module-scope definition.
    pub fn exported(&self, name: &str) -> Option<&SymbolDefinition> {
        let root = self.definitions_by_scope.get(&ScopeId::ROOT)?;
        let id = root.get(name)?;
        let def = self.symbols.get(id)?;
        match self.language {
            // JS/TS exports are explicit.
            Language::JavaScript | Language::TypeScript => def.is_exported().then_some(def),
            _ => (def.visibility == Visibility::Public).then_some(def),
        }
    }

    /// Any module-scope definition, ignoring export markers. Used for the
    /// default-export fallback and diagnostics.
    pub fn module_scope_definition(&self, name: &str) -> Option<&SymbolDefinition> {
        let root = self.definitions_by_scope.get(&ScopeId::ROOT)?;
        root.get(name).and_then(|id| self.symbols.get(id))
    }

    pub fn class_named(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// Index one file. Fails only when the language is unsupported or the
/// parser cannot produce any tree.
pub fn index_file(
    file: FilePath,
    source: &str,
    language: Language,
    queries: &QuerySet,
) -> IndexResult<SemanticIndex> {
    let behavior = behavior_for(language);

    let tree = parse(language, source, &file).map_err(|e| IndexError::ParseFailure {
        path: file.clone(),
        reason: e.to_string(),
    })?;

    let captures = normalize(&tree, source, &file, queries.get(language));

    let root = tree.root_node();
    let file_span = Location::new(
        file.clone(),
        0,
        0,
        root.end_position().row as u32,
        root.end_position().column as u32,
    );

    let mut scopes = ScopeTree::build(file_span, &captures, source, behavior);
    let defs = definitions::extract(&captures, source, &file, &mut scopes, behavior);
    let refs = references::extract(&captures, source, &file, &scopes, behavior);

    Ok(assemble(file, source, language, scopes, defs, refs))
}

fn assemble(
    file: FilePath,
    source: &str,
    language: Language,
    scopes: ScopeTree,
    defs: Definitions,
    refs: References,
) -> SemanticIndex {
    let References {
        calls,
        member_accesses,
        assignments,
        returns,
    } = refs;

    let mut local_type_flow = LocalTypeFlow {
        annotations: defs.annotations,
        variable_types: defs.variable_types,
        constructors_by_var: HashMap::new(),
    };
    for call in &calls {
        if let CallReference::ConstructorCall(ctor) = call {
            if let Some(target) = &ctor.assigned_to {
                local_type_flow
                    .constructors_by_var
                    .entry(target.name.clone())
                    .or_default()
                    .push(ConstructorAssignment {
                        class_name: ctor.class_name.clone(),
                        scope_id: ctor.scope_id,
                        location: ctor.location.clone(),
                    });
                local_type_flow
                    .variable_types
                    .entry(target.name.clone())
                    .or_insert_with(|| ctor.class_name.clone());
            }
        }
    }

    // Ordered per-scope name tables, insertion-ordered by symbol id so
    // reindexing yields an equal structure.
    let mut definitions_by_scope: HashMap<ScopeId, IndexMap<String, SymbolId>> = HashMap::new();
    for def in defs.symbols.values() {
        definitions_by_scope
            .entry(def.scope_id)
            .or_default()
            .insert(def.name.clone(), def.id.clone());
    }

    let content_hash = {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    };

    SemanticIndex {
        file,
        language,
        content_hash,
        scopes,
        symbols: defs.symbols,
        definitions_by_scope,
        calls,
        member_accesses,
        type_references: defs.type_references,
        assignments,
        returns,
        imports: defs.imports,
        reexports: defs.reexports,
        classes: defs.classes,
        impls: defs.impls,
        local_type_flow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::references::CallReference;

    fn index(language: Language, source: &str) -> SemanticIndex {
        let queries = QuerySet::compile().unwrap();
        index_file(FilePath::new("test_input"), source, language, &queries).unwrap()
    }

    #[test]
    fn empty_source_builds_empty_index() {
        let idx = index(Language::JavaScript, "");
        assert!(idx.symbols.is_empty());
        assert!(idx.calls.is_empty());
        assert_eq!(idx.scopes.len(), 1);
    }

    #[test]
    fn caller_attribution() {
        let idx = index(
            Language::JavaScript,
            "function main() { foo(); }\nbar();\n",
        );
        let callers: Vec<String> = idx
            .calls
            .iter()
            .map(|c| c.caller().as_str().to_string())
            .collect();
        assert_eq!(idx.calls.len(), 2);
        assert!(callers.iter().any(|c| c.contains("main")), "{callers:?}");
        assert!(callers.iter().any(|c| c == "<module>"), "{callers:?}");
    }

    #[test]
    fn constructor_track_back_is_recorded() {
        let idx = index(
            Language::JavaScript,
            "function run() { const u = new User(); u.getName(); }\n",
        );
        let ctors = &idx.local_type_flow.constructors_by_var;
        assert_eq!(ctors.get("u").map(|v| v[0].class_name.as_str()), Some("User"));
        assert_eq!(
            idx.local_type_flow.variable_types.get("u").map(String::as_str),
            Some("User")
        );
    }

    #[test]
    fn python_constructor_and_method() {
        let idx = index(
            Language::Python,
            "class User:\n    def get_name(self):\n        return self.name\n\ndef run():\n    u = User()\n    u.get_name()\n",
        );
        let has_ctor = idx
            .calls
            .iter()
            .any(|c| matches!(c, CallReference::ConstructorCall(ctor) if ctor.class_name == "User"));
        assert!(has_ctor);
        let has_method_call = idx.calls.iter().any(
            |c| matches!(c, CallReference::MethodCall(m) if m.method_name == "get_name" && m.receiver == "u"),
        );
        assert!(has_method_call);
    }

    #[test]
    fn reindexing_is_deterministic() {
        let source = "export class User { getName() { return this.name; } }\n";
        let a = index(Language::TypeScript, source);
        let b = index(Language::TypeScript, source);
        assert_eq!(a.content_hash, b.content_hash);
        let ids_a: Vec<&SymbolId> = a.symbols.keys().collect();
        let ids_b: Vec<&SymbolId> = b.symbols.keys().collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn rust_impl_methods_carry_class() {
        let idx = index(
            Language::Rust,
            "struct Store;\nimpl Store {\n    fn get(&self) -> u32 { 1 }\n}\n",
        );
        let method = idx
            .symbols
            .values()
            .find(|s| s.name == "get")
            .expect("method indexed");
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.class_name.as_deref(), Some("Store"));
    }
}
