//! Class-hierarchy derivation: inheritance graph, ancestors/descendants,
//! and method-resolution order.
//!
//! An edge `A → B` means "A extends B". The derivation graph is treated
//! as acyclic; a cycle encountered during linearization terminates that
//! branch instead of recursing forever. MRO is computed once per class:
//! C3 linearization for multiple-inheritance languages, the plain base
//! chain elsewhere.

use crate::index::file_index::SemanticIndex;
use crate::parsing::Language;
use crate::resolve::names::NameResolutions;
use crate::types::{FilePath, Location, SymbolId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// One class in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    pub symbol_id: SymbolId,
    pub name: String,
    pub file: FilePath,
    pub language: Language,
    pub location: Location,
    /// Direct bases, resolved through phase-1 bindings where possible.
    pub base_classes: Vec<SymbolId>,
    pub base_names: Vec<String>,
    /// Interface names from implements-style clauses or trait impls.
    pub interfaces: Vec<String>,
    pub methods: BTreeSet<String>,
    /// Linearized resolution order, starting with the class itself.
    pub mro: Vec<SymbolId>,
}

/// The frozen inheritance graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassHierarchy {
    nodes: IndexMap<SymbolId, ClassNode>,
    /// base → classes extending it.
    derived_by_base: HashMap<SymbolId, Vec<SymbolId>>,
}

impl ClassHierarchy {
    pub fn build(
        indexes: &IndexMap<FilePath, SemanticIndex>,
        resolutions: &NameResolutions,
    ) -> Self {
        let mut hierarchy = ClassHierarchy::default();

        for (path, index) in indexes {
            for class in &index.classes {
                let scope = index
                    .symbol(&class.symbol_id)
                    .map(|d| d.scope_id)
                    .unwrap_or_default();

                let mut base_classes = Vec::new();
                for base in &class.bases {
                    let id = resolutions
                        .resolve(path, scope, base)
                        .cloned()
                        .unwrap_or_else(|| SymbolId::unresolved(base));
                    base_classes.push(id);
                }

                let mut methods: BTreeSet<String> =
                    class.method_names().map(str::to_string).collect();
                let mut interfaces = class.interfaces.clone();

                // Rust methods live in impl blocks, trait impls also
                // mark the type as implementing the trait.
                for impl_block in &index.impls {
                    if impl_block.type_name != class.name || impl_block.is_negative {
                        continue;
                    }
                    methods.extend(impl_block.methods.iter().map(|m| m.name.clone()));
                    if let Some(trait_name) = &impl_block.trait_name {
                        if !interfaces.contains(trait_name) {
                            interfaces.push(trait_name.clone());
                        }
                    }
                }

                hierarchy.nodes.insert(
                    class.symbol_id.clone(),
                    ClassNode {
                        symbol_id: class.symbol_id.clone(),
                        name: class.name.clone(),
                        file: path.clone(),
                        language: index.language,
                        location: class.location.clone(),
                        base_classes,
                        base_names: class.bases.clone(),
                        interfaces,
                        methods,
                        mro: Vec::new(),
                    },
                );
            }
        }

        for (id, node) in &hierarchy.nodes {
            for base in &node.base_classes {
                hierarchy
                    .derived_by_base
                    .entry(base.clone())
                    .or_default()
                    .push(id.clone());
            }
        }

        // MRO once per class.
        let ids: Vec<SymbolId> = hierarchy.nodes.keys().cloned().collect();
        let mut memo: HashMap<SymbolId, Vec<SymbolId>> = HashMap::new();
        for id in ids {
            let mro = hierarchy.linearize(&id, &mut memo, &mut HashSet::new());
            if let Some(node) = hierarchy.nodes.get_mut(&id) {
                node.mro = mro;
            }
        }

        hierarchy
    }

    pub fn node(&self, id: &SymbolId) -> Option<&ClassNode> {
        self.nodes.get(id)
    }

    pub fn node_named(&self, name: &str) -> Option<&ClassNode> {
        self.nodes.values().find(|n| n.name == name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ClassNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every (transitive) ancestor of a class.
    pub fn ancestors(&self, id: &SymbolId) -> BTreeSet<SymbolId> {
        let mut out = BTreeSet::new();
        let mut queue: VecDeque<SymbolId> = self
            .nodes
            .get(id)
            .map(|n| n.base_classes.iter().cloned().collect())
            .unwrap_or_default();
        while let Some(current) = queue.pop_front() {
            if !out.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                queue.extend(node.base_classes.iter().cloned());
            }
        }
        out
    }

    /// Every (transitive) class deriving from this one.
    pub fn descendants(&self, id: &SymbolId) -> BTreeSet<SymbolId> {
        let mut out = BTreeSet::new();
        let mut queue: VecDeque<SymbolId> = self
            .derived_by_base
            .get(id)
            .map(|v| v.iter().cloned().collect())
            .unwrap_or_default();
        while let Some(current) = queue.pop_front() {
            if !out.insert(current.clone()) {
                continue;
            }
            if let Some(derived) = self.derived_by_base.get(&current) {
                queue.extend(derived.iter().cloned());
            }
        }
        out
    }

    /// Classes with no incoming extends edge — nothing derives from them.
    pub fn entry_points(&self) -> Vec<&ClassNode> {
        self.nodes
            .values()
            .filter(|n| {
                self.derived_by_base
                    .get(&n.symbol_id)
                    .map(|d| d.is_empty())
                    .unwrap_or(true)
            })
            .collect()
    }

    /// MRO: C3 for Python, plain base chain for single-inheritance
    /// languages. Unresolved bases participate by id so ordering stays
    /// stable.
    fn linearize(
        &self,
        id: &SymbolId,
        memo: &mut HashMap<SymbolId, Vec<SymbolId>>,
        in_progress: &mut HashSet<SymbolId>,
    ) -> Vec<SymbolId> {
        if let Some(done) = memo.get(id) {
            return done.clone();
        }
        if !in_progress.insert(id.clone()) {
            // Derivation cycle; terminate this branch.
            return vec![id.clone()];
        }

        let result = match self.nodes.get(id) {
            None => vec![id.clone()],
            Some(node) if node.base_classes.is_empty() => vec![id.clone()],
            Some(node) if node.language == Language::Python => {
                let parent_mros: Vec<Vec<SymbolId>> = node
                    .base_classes
                    .iter()
                    .map(|base| self.linearize(base, memo, in_progress))
                    .collect();
                let mut sequences = parent_mros;
                sequences.push(node.base_classes.clone());
                match c3_merge(sequences) {
                    Some(mut merged) => {
                        let mut mro = vec![id.clone()];
                        mro.append(&mut merged);
                        mro
                    }
                    // Inconsistent hierarchy: fall back to the base chain.
                    None => self.base_chain(id),
                }
            }
            Some(_) => self.base_chain(id),
        };

        in_progress.remove(id);
        memo.insert(id.clone(), result.clone());
        result
    }

    /// First-base chain: C, B, A, …
    fn base_chain(&self, id: &SymbolId) -> Vec<SymbolId> {
        let mut chain = vec![id.clone()];
        let mut seen: HashSet<SymbolId> = chain.iter().cloned().collect();
        let mut current = id.clone();
        while let Some(base) = self
            .nodes
            .get(&current)
            .and_then(|n| n.base_classes.first())
            .cloned()
        {
            if !seen.insert(base.clone()) {
                break;
            }
            chain.push(base.clone());
            current = base;
        }
        chain
    }
}

/// C3 merge. Returns `None` when no consistent linearization exists.
fn c3_merge(mut sequences: Vec<Vec<SymbolId>>) -> Option<Vec<SymbolId>> {
    let mut result = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(result);
        }
        // A head is good when it appears in no other sequence's tail.
        let mut chosen: Option<SymbolId> = None;
        for sequence in &sequences {
            let head = &sequence[0];
            let in_tail = sequences
                .iter()
                .any(|other| other.iter().skip(1).any(|s| s == head));
            if !in_tail {
                chosen = Some(head.clone());
                break;
            }
        }
        let head = chosen?;
        result.push(head.clone());
        for sequence in &mut sequences {
            sequence.retain(|s| s != &head);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::file_index::index_file;
    use crate::parsing::parser::QuerySet;
    use crate::resolve::imports::{ExportResolver, ImportGraph};
    use crate::resolve::names::resolve_project;

    fn hierarchy(files: &[(&str, Language, &str)]) -> ClassHierarchy {
        let queries = QuerySet::compile().unwrap();
        let indexes: IndexMap<FilePath, SemanticIndex> = files
            .iter()
            .map(|(path, language, source)| {
                let file = FilePath::new(*path);
                (
                    file.clone(),
                    index_file(file, source, *language, &queries).unwrap(),
                )
            })
            .collect();
        let imports = ImportGraph::build(&indexes);
        let exports = ExportResolver::new(&indexes, 10, true);
        let resolutions = resolve_project(&indexes, &imports, &exports);
        ClassHierarchy::build(&indexes, &resolutions)
    }

    #[test]
    fn linear_inheritance_chain() {
        let h = hierarchy(&[(
            "app.py",
            Language::Python,
            "class A:\n    pass\nclass B(A):\n    pass\nclass C(B):\n    pass\n",
        )]);
        let c = h.node_named("C").unwrap();
        let a = h.node_named("A").unwrap();

        let mro_names: Vec<&str> = c
            .mro
            .iter()
            .map(|id| h.node(id).map(|n| n.name.as_str()).unwrap_or("?"))
            .collect();
        assert_eq!(mro_names, vec!["C", "B", "A"]);

        assert_eq!(h.ancestors(&c.symbol_id).len(), 2);
        assert_eq!(h.descendants(&a.symbol_id).len(), 2);
    }

    #[test]
    fn diamond_mro_is_c3() {
        let h = hierarchy(&[(
            "app.py",
            Language::Python,
            "class A:\n    pass\nclass B(A):\n    pass\nclass C(A):\n    pass\nclass D(B, C):\n    pass\n",
        )]);
        let d = h.node_named("D").unwrap();
        let mro_names: Vec<&str> = d
            .mro
            .iter()
            .map(|id| h.node(id).map(|n| n.name.as_str()).unwrap_or("?"))
            .collect();
        assert_eq!(mro_names, vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn entry_points_are_underived_classes() {
        let h = hierarchy(&[(
            "app.ts",
            Language::TypeScript,
            "class Base {}\nclass Derived extends Base {}\n",
        )]);
        let entries: Vec<&str> = h.entry_points().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(entries, vec!["Derived"]);
    }

    #[test]
    fn rust_impl_methods_and_traits_attach() {
        let h = hierarchy(&[(
            "lib.rs",
            Language::Rust,
            "trait Draw { fn draw(&self); }\nstruct Shape;\nimpl Shape { fn area(&self) -> f64 { 0.0 } }\nimpl Draw for Shape { fn draw(&self) {} }\n",
        )]);
        let shape = h.node_named("Shape").unwrap();
        assert!(shape.methods.contains("area"));
        assert!(shape.methods.contains("draw"));
        assert!(shape.interfaces.contains(&"Draw".to_string()));
    }

    #[test]
    fn unresolved_base_keeps_name() {
        let h = hierarchy(&[(
            "app.ts",
            Language::TypeScript,
            "class Widget extends ExternalBase {}\n",
        )]);
        let widget = h.node_named("Widget").unwrap();
        assert_eq!(widget.base_names, vec!["ExternalBase"]);
        assert!(widget.base_classes[0].is_unresolved());
    }
}
