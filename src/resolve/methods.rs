//! Phase 2: heuristic binding of method and constructor call sites.
//!
//! Requires every per-file index (the global method index is the barrier)
//! and the phase-1 name resolutions. Each site runs through a cascade of
//! strategies in fixed order; the first whose precondition holds wins and
//! attaches its confidence. Sites no strategy can bind are recorded as
//! unresolved — a data outcome, not an error.

use crate::config::IndexingConfig;
use crate::index::file_index::SemanticIndex;
use crate::index::references::{CallReference, ConstructorCall, MethodCall, SelfReferenceCall};
use crate::resolve::names::NameResolutions;
use crate::types::{FilePath, Location, LocationKey, ScopeId, SymbolId, SymbolKind};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

/// One method definition usable as a binding target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCandidate {
    pub class_id: SymbolId,
    pub class_name: String,
    pub method_id: SymbolId,
    pub location: Location,
    pub is_static: bool,
    pub file: FilePath,
}

/// Global method index: built once after the per-file barrier, then
/// frozen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalMethodIndex {
    by_method_name: HashMap<String, Vec<MethodCandidate>>,
    methods_by_class: HashMap<SymbolId, BTreeSet<String>>,
    class_ids_by_name: HashMap<String, Vec<SymbolId>>,
    classes_by_file: HashMap<FilePath, Vec<(String, SymbolId)>>,
}

impl GlobalMethodIndex {
    pub fn build(indexes: &IndexMap<FilePath, SemanticIndex>) -> Self {
        let mut index = GlobalMethodIndex::default();
        let mut duplicate_warned: HashSet<(SymbolId, String)> = HashSet::new();

        for (path, file_index) in indexes {
            for class in &file_index.classes {
                index
                    .class_ids_by_name
                    .entry(class.name.clone())
                    .or_default()
                    .push(class.symbol_id.clone());
                index
                    .classes_by_file
                    .entry(path.clone())
                    .or_default()
                    .push((class.name.clone(), class.symbol_id.clone()));
            }

            for def in file_index.symbols.values() {
                if !matches!(def.kind, SymbolKind::Method | SymbolKind::Constructor) {
                    continue;
                }
                let Some(class_name) = &def.class_name else {
                    continue;
                };
                let class_id = file_index
                    .class_named(class_name)
                    .map(|c| c.symbol_id.clone())
                    .unwrap_or_else(|| SymbolId::unresolved(class_name));

                let methods = index.methods_by_class.entry(class_id.clone()).or_default();
                if !methods.insert(def.name.clone())
                    && duplicate_warned.insert((class_id.clone(), def.name.clone()))
                {
                    // Duplicate names on one class are kept as overloads.
                    warn!(class = %class_name, method = %def.name, "duplicate method name; keeping all candidates");
                }
                index
                    .by_method_name
                    .entry(def.name.clone())
                    .or_default()
                    .push(MethodCandidate {
                        class_id,
                        class_name: class_name.clone(),
                        method_id: def.id.clone(),
                        location: def.location.clone(),
                        is_static: def
                            .modifiers
                            .contains(crate::symbol::SymbolModifiers::STATIC),
                        file: path.clone(),
                    });
            }
        }
        index
    }

    pub fn candidates(&self, method_name: &str) -> &[MethodCandidate] {
        self.by_method_name
            .get(method_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn class_methods(&self, class_id: &SymbolId) -> Option<&BTreeSet<String>> {
        self.methods_by_class.get(class_id)
    }

    /// Distinct classes defining a method, in deterministic order.
    pub fn classes_defining(&self, method_name: &str) -> Vec<SymbolId> {
        let mut ids: Vec<SymbolId> = self
            .candidates(method_name)
            .iter()
            .map(|c| c.class_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn class_ids_named(&self, name: &str) -> &[SymbolId] {
        self.class_ids_by_name
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn file_classes(&self, file: &FilePath) -> &[(String, SymbolId)] {
        self.classes_by_file
            .get(file)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn method_on(&self, class_id: &SymbolId, method_name: &str) -> Option<&MethodCandidate> {
        self.candidates(method_name)
            .iter()
            .find(|c| &c.class_id == class_id)
    }
}

/// Which strategy bound a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    ExplicitAnnotation,
    VariableType,
    /// Reserved slot; never fires in the current data model.
    TypeGuard,
    ReturnType,
    UniqueMethod,
    SiblingMethods,
    ImportScope,
    FileProximity,
    SelfReceiver,
    LocalClass,
    ImportedClass,
}

impl ResolutionStrategy {
    pub fn confidence(&self) -> f32 {
        match self {
            ResolutionStrategy::ExplicitAnnotation => 0.99,
            ResolutionStrategy::VariableType => 0.95,
            ResolutionStrategy::TypeGuard => 0.93,
            ResolutionStrategy::ReturnType => 0.90,
            ResolutionStrategy::UniqueMethod => 1.0,
            ResolutionStrategy::SiblingMethods => 0.90,
            ResolutionStrategy::ImportScope => 0.80,
            ResolutionStrategy::FileProximity => 0.60,
            ResolutionStrategy::SelfReceiver => 0.99,
            ResolutionStrategy::LocalClass => 0.95,
            ResolutionStrategy::ImportedClass => 0.95,
        }
    }
}

/// A successful binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub symbol_id: SymbolId,
    pub confidence: f32,
    pub strategy: ResolutionStrategy,
}

impl Resolution {
    fn new(symbol_id: SymbolId, strategy: ResolutionStrategy) -> Self {
        Self {
            symbol_id,
            confidence: strategy.confidence(),
            strategy,
        }
    }
}

/// A site no strategy could bind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedSite {
    pub location: Location,
    pub name: String,
}

/// Phase-2 outputs, keyed by location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedCalls {
    pub method_calls: HashMap<LocationKey, Resolution>,
    pub constructor_calls: HashMap<LocationKey, Resolution>,
    /// Reverse map: method id → every site that binds to it.
    pub calls_to_method: HashMap<SymbolId, Vec<Location>>,
    pub unresolved: Vec<UnresolvedSite>,
}

impl ResolvedCalls {
    pub fn method_call_at(&self, key: &LocationKey) -> Option<&Resolution> {
        self.method_calls.get(key)
    }

    pub fn constructor_call_at(&self, key: &LocationKey) -> Option<&Resolution> {
        self.constructor_calls.get(key)
    }
}

/// Run phase 2 across all files. Parallel per file after the barrier;
/// output merge order follows the index order, so results are
/// deterministic.
pub fn resolve_calls(
    indexes: &IndexMap<FilePath, SemanticIndex>,
    resolutions: &NameResolutions,
    global: &GlobalMethodIndex,
    config: &IndexingConfig,
) -> ResolvedCalls {
    let _ = config;
    let files: Vec<(&FilePath, &SemanticIndex)> = indexes.iter().collect();
    let per_file: Vec<ResolvedCalls> = files
        .par_iter()
        .map(|&(path, index)| {
            let resolver = SiteResolver {
                file: path,
                index,
                indexes,
                resolutions,
                global,
            };
            resolver.resolve_file()
        })
        .collect();

    let mut merged = ResolvedCalls::default();
    for part in per_file {
        merged.method_calls.extend(part.method_calls);
        merged.constructor_calls.extend(part.constructor_calls);
        for (id, mut locations) in part.calls_to_method {
            merged.calls_to_method.entry(id).or_default().append(&mut locations);
        }
        merged.unresolved.extend(part.unresolved);
    }
    merged
}

struct SiteResolver<'a> {
    file: &'a FilePath,
    index: &'a SemanticIndex,
    indexes: &'a IndexMap<FilePath, SemanticIndex>,
    resolutions: &'a NameResolutions,
    global: &'a GlobalMethodIndex,
}

impl<'a> SiteResolver<'a> {
    fn resolve_file(&self) -> ResolvedCalls {
        let mut out = ResolvedCalls::default();
        for call in &self.index.calls {
            match call {
                CallReference::MethodCall(site) => match self.resolve_method(site) {
                    Some(resolution) => self.record_method(&mut out, site.location.clone(), resolution),
                    None => out.unresolved.push(UnresolvedSite {
                        location: site.location.clone(),
                        name: site.method_name.clone(),
                    }),
                },
                CallReference::SelfReferenceCall(site) => match self.resolve_self_call(site) {
                    Some(resolution) => self.record_method(&mut out, site.location.clone(), resolution),
                    None => out.unresolved.push(UnresolvedSite {
                        location: site.location.clone(),
                        name: site.method_name.clone(),
                    }),
                },
                CallReference::ConstructorCall(site) => match self.resolve_constructor(site) {
                    Some(resolution) => {
                        out.calls_to_method
                            .entry(resolution.symbol_id.clone())
                            .or_default()
                            .push(site.location.clone());
                        out.constructor_calls.insert(site.location.key(), resolution);
                    }
                    None => out.unresolved.push(UnresolvedSite {
                        location: site.location.clone(),
                        name: site.class_name.clone(),
                    }),
                },
                CallReference::FunctionCall(_) => {}
            }
        }
        out
    }

    fn record_method(&self, out: &mut ResolvedCalls, location: Location, resolution: Resolution) {
        out.calls_to_method
            .entry(resolution.symbol_id.clone())
            .or_default()
            .push(location.clone());
        out.method_calls.insert(location.key(), resolution);
    }

    /// The strategy cascade, in fixed order. Monotonic: a strategy binds
    /// only when its precondition holds, and earlier strategies take
    /// precedence.
    fn resolve_method(&self, site: &MethodCall) -> Option<Resolution> {
        // 1. Explicit cast or annotation at the receiver's location.
        if let Some(annotation) = self
            .index
            .local_type_flow
            .annotations
            .get(&site.receiver_location.key())
        {
            if let Some(resolution) = self.bind_via_class_name(
                annotation,
                site,
                ResolutionStrategy::ExplicitAnnotation,
            ) {
                return Some(resolution);
            }
        }

        // 2. Variable-typed resolution: constructor track-back, then the
        //    declared annotation, then a static receiver naming the type.
        if let Some(class_name) = self.receiver_type(site) {
            if let Some(resolution) =
                self.bind_via_class_name(&class_name, site, ResolutionStrategy::VariableType)
            {
                return Some(resolution);
            }
        }

        // 3. Type guards: reserved; the data model carries no
        //    control-flow narrowing facts yet.

        // 4. Return type of the called receiver expression.
        if let Some(called) = &site.receiver_call_name {
            if let Some(return_type) = self.function_return_type(called, site.scope_id) {
                if let Some(resolution) =
                    self.bind_via_class_name(&return_type, site, ResolutionStrategy::ReturnType)
                {
                    return Some(resolution);
                }
            }
        }

        // 5. Unique method name across the codebase.
        let classes = self.global.classes_defining(&site.method_name);
        if classes.len() == 1 {
            if let Some(candidate) = self.global.method_on(&classes[0], &site.method_name) {
                return Some(Resolution::new(
                    candidate.method_id.clone(),
                    ResolutionStrategy::UniqueMethod,
                ));
            }
        }

        // 6. Sibling-method narrowing on the same receiver.
        if classes.len() > 1 {
            if let Some(resolution) = self.narrow_by_siblings(site, &classes) {
                return Some(resolution);
            }

            // 7. Import scope: prefer a candidate class imported here.
            if let Some(resolution) = self.narrow_by_imports(site, &classes) {
                return Some(resolution);
            }

            // 8. File proximity: prefer a candidate class from this file.
            if let Some(resolution) = self.narrow_by_file(site, &classes) {
                return Some(resolution);
            }
        }

        None
    }

    /// Receiver type from local flow: a preceding constructor call
    /// assigned to the receiver in a visible scope, else the declared
    /// annotation, else the type named by a static receiver.
    fn receiver_type(&self, site: &MethodCall) -> Option<String> {
        let flow = &self.index.local_type_flow;
        if let Some(assignments) = flow.constructors_by_var.get(&site.receiver) {
            let best = assignments.iter().find(|a| {
                self.scope_visible_from(a.scope_id, site.scope_id) && precedes(&a.location, &site.location)
            });
            if let Some(assignment) = best {
                return Some(assignment.class_name.clone());
            }
        }
        if let Some(declared) = flow.variable_types.get(&site.receiver) {
            return Some(declared.clone());
        }
        if site.is_static {
            return Some(site.receiver.clone());
        }
        None
    }

    /// Whether names bound in `outer` are visible from `inner`.
    fn scope_visible_from(&self, outer: ScopeId, inner: ScopeId) -> bool {
        let mut current = Some(inner);
        while let Some(id) = current {
            if id == outer {
                return true;
            }
            current = self.index.scopes.scope(id).parent;
        }
        false
    }

    fn function_return_type(&self, function_name: &str, scope: ScopeId) -> Option<String> {
        // Prefer the phase-1 binding; fall back to a same-file lookup.
        if let Some(id) = self.resolutions.resolve(self.file, scope, function_name) {
            for index in self.indexes.values() {
                if let Some(def) = index.symbol(id) {
                    return def.return_type.clone();
                }
            }
        }
        self.index
            .symbols
            .values()
            .find(|d| d.name == function_name && d.kind.is_callable())
            .and_then(|d| d.return_type.clone())
    }

    /// Resolve a class name at the site's scope, then bind the method on
    /// that class.
    fn bind_via_class_name(
        &self,
        class_name: &str,
        site: &MethodCall,
        strategy: ResolutionStrategy,
    ) -> Option<Resolution> {
        let base = crate::index::definitions::clean_annotation(class_name);
        let class_id = self.resolve_class_id(&base, site.scope_id)?;
        let candidate = self.global.method_on(&class_id, &site.method_name)?;
        Some(Resolution::new(candidate.method_id.clone(), strategy))
    }

    /// Class-name resolution: phase-1 binding, then same-file classes,
    /// then a globally unique name.
    fn resolve_class_id(&self, name: &str, scope: ScopeId) -> Option<SymbolId> {
        if let Some(id) = self.resolutions.resolve(self.file, scope, name) {
            if self.global.class_methods(id).is_some()
                || self.global.class_ids_named(name).contains(id)
            {
                return Some(id.clone());
            }
        }
        if let Some(class) = self.index.class_named(name) {
            return Some(class.symbol_id.clone());
        }
        let global = self.global.class_ids_named(name);
        if global.len() == 1 {
            return Some(global[0].clone());
        }
        None
    }

    fn narrow_by_siblings(&self, site: &MethodCall, classes: &[SymbolId]) -> Option<Resolution> {
        // Other methods invoked on the same receiver in the same scope.
        let mut sibling_names: BTreeSet<&str> = BTreeSet::new();
        for call in &self.index.calls {
            if let CallReference::MethodCall(other) = call {
                if other.receiver == site.receiver
                    && other.scope_id == site.scope_id
                    && other.location != site.location
                {
                    sibling_names.insert(&other.method_name);
                }
            }
        }
        if sibling_names.is_empty() {
            return None;
        }
        let matching: Vec<&SymbolId> = classes
            .iter()
            .filter(|class_id| {
                self.global.class_methods(class_id).is_some_and(|methods| {
                    sibling_names.iter().all(|name| methods.contains(*name))
                })
            })
            .collect();
        if let [only] = matching.as_slice() {
            let candidate = self.global.method_on(only, &site.method_name)?;
            return Some(Resolution::new(
                candidate.method_id.clone(),
                ResolutionStrategy::SiblingMethods,
            ));
        }
        None
    }

    fn narrow_by_imports(&self, site: &MethodCall, classes: &[SymbolId]) -> Option<Resolution> {
        let bindings = self.resolutions.scope_bindings(self.file, ScopeId::ROOT)?;
        let imported: Vec<&SymbolId> = classes
            .iter()
            .filter(|class_id| bindings.values().any(|id| id == *class_id))
            .filter(|class_id| {
                // Locally defined classes belong to the file-proximity
                // strategy, not this one.
                !self
                    .global
                    .file_classes(self.file)
                    .iter()
                    .any(|(_, id)| id == *class_id)
            })
            .collect();
        if let [only] = imported.as_slice() {
            let candidate = self.global.method_on(only, &site.method_name)?;
            return Some(Resolution::new(
                candidate.method_id.clone(),
                ResolutionStrategy::ImportScope,
            ));
        }
        None
    }

    fn narrow_by_file(&self, site: &MethodCall, classes: &[SymbolId]) -> Option<Resolution> {
        let local: Vec<&SymbolId> = classes
            .iter()
            .filter(|class_id| {
                self.global
                    .file_classes(self.file)
                    .iter()
                    .any(|(_, id)| id == *class_id)
            })
            .collect();
        if let [only] = local.as_slice() {
            let candidate = self.global.method_on(only, &site.method_name)?;
            return Some(Resolution::new(
                candidate.method_id.clone(),
                ResolutionStrategy::FileProximity,
            ));
        }
        None
    }

    /// Self-reference calls bind through the enclosing class.
    fn resolve_self_call(&self, site: &SelfReferenceCall) -> Option<Resolution> {
        let caller = self.index.symbol(&site.caller)?;
        let class_name = caller.class_name.as_deref()?;
        let class_id = self.resolve_class_id(class_name, site.scope_id)?;
        let candidate = self.global.method_on(&class_id, &site.method_name)?;
        Some(Resolution::new(
            candidate.method_id.clone(),
            ResolutionStrategy::SelfReceiver,
        ))
    }

    /// Constructor sites: resolve the class name through imports first,
    /// then local class symbols; otherwise leave unresolved.
    fn resolve_constructor(&self, site: &ConstructorCall) -> Option<Resolution> {
        if let Some(id) = self.resolutions.resolve(self.file, site.scope_id, &site.class_name) {
            if !self.global.class_ids_named(&site.class_name).is_empty()
                && self.global.class_ids_named(&site.class_name).contains(id)
            {
                return Some(Resolution::new(id.clone(), ResolutionStrategy::ImportedClass));
            }
            // The phase-1 binding may point at a non-class (shadowing);
            // fall through to the local lookup.
        }
        if let Some(class) = self.index.class_named(&site.class_name) {
            return Some(Resolution::new(
                class.symbol_id.clone(),
                ResolutionStrategy::LocalClass,
            ));
        }
        None
    }
}

fn precedes(a: &Location, b: &Location) -> bool {
    (a.start_line, a.start_column) < (b.start_line, b.start_column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::file_index::index_file;
    use crate::parsing::parser::QuerySet;
    use crate::parsing::Language;
    use crate::resolve::imports::{ExportResolver, ImportGraph};
    use crate::resolve::names::resolve_project;

    fn run(files: &[(&str, Language, &str)]) -> (IndexMap<FilePath, SemanticIndex>, ResolvedCalls) {
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
        let global = GlobalMethodIndex::build(&indexes);
        let resolved = resolve_calls(&indexes, &resolutions, &global, &IndexingConfig::default());
        (indexes, resolved)
    }

    fn method_resolution<'a>(
        indexes: &IndexMap<FilePath, SemanticIndex>,
        resolved: &'a ResolvedCalls,
        file: &str,
        method: &str,
    ) -> &'a Resolution {
        let file = FilePath::new(file);
        let index = &indexes[&file];
        let site = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::MethodCall(m) if m.method_name == method => Some(m),
                _ => None,
            })
            .expect("site exists");
        resolved
            .method_call_at(&site.location.key())
            .expect("site resolved")
    }

    #[test]
    fn unique_method_name_binds_globally() {
        let (indexes, resolved) = run(&[(
            "app.ts",
            Language::TypeScript,
            "class User { getName() { return 'u'; } }\nclass Order { place() {} }\nfunction go(x) { x.getName(); }\n",
        )]);
        let resolution = method_resolution(&indexes, &resolved, "app.ts", "getName");
        assert_eq!(resolution.strategy, ResolutionStrategy::UniqueMethod);
        assert!(resolution.symbol_id.as_str().contains("User.getName"));
        assert_eq!(resolution.confidence, 1.0);
    }

    #[test]
    fn constructor_track_back_beats_unique_name() {
        let source = "class User { getName() {} }\nclass Admin { getName() {} }\nfunction go() { const u = new User(); u.getName(); }\n";
        let (indexes, resolved) = run(&[("app.js", Language::JavaScript, source)]);
        let resolution = method_resolution(&indexes, &resolved, "app.js", "getName");
        assert_eq!(resolution.strategy, ResolutionStrategy::VariableType);
        assert!(resolution.confidence >= 0.9);
        assert!(resolution.symbol_id.as_str().contains("User.getName"));
    }

    #[test]
    fn sibling_methods_narrow_ambiguity() {
        let source = "class Cart { add() {} total() {} }\nclass Set2 { add() {} clear() {} }\nfunction go(c) { c.add(); c.total(); }\n";
        let (indexes, resolved) = run(&[("app.js", Language::JavaScript, source)]);
        let resolution = method_resolution(&indexes, &resolved, "app.js", "add");
        assert_eq!(resolution.strategy, ResolutionStrategy::SiblingMethods);
        assert!(resolution.symbol_id.as_str().contains("Cart.add"));
    }

    #[test]
    fn self_call_binds_to_own_class() {
        let source = "class Task:\n    def run(self):\n        self.validate()\n    def validate(self):\n        pass\n";
        let (indexes, resolved) = run(&[("task.py", Language::Python, source)]);
        let file = FilePath::new("task.py");
        let index = &indexes[&file];
        let site = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::SelfReferenceCall(s) => Some(s),
                _ => None,
            })
            .expect("self call extracted");
        let resolution = resolved.method_call_at(&site.location.key()).unwrap();
        assert!(resolution.symbol_id.as_str().contains("Task.validate"));
    }

    #[test]
    fn constructor_resolves_through_import() {
        let (indexes, resolved) = run(&[
            ("src/user.ts", Language::TypeScript, "export class User {}\n"),
            (
                "src/main.ts",
                Language::TypeScript,
                "import { User } from './user';\nconst u = new User();\n",
            ),
        ]);
        let main = FilePath::new("src/main.ts");
        let index = &indexes[&main];
        let site = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::ConstructorCall(ctor) => Some(ctor),
                _ => None,
            })
            .unwrap();
        let resolution = resolved.constructor_call_at(&site.location.key()).unwrap();
        assert!(resolution.symbol_id.as_str().contains("user.ts"));
    }

    #[test]
    fn unresolvable_site_is_recorded_not_erred() {
        let (_, resolved) = run(&[(
            "app.js",
            Language::JavaScript,
            "function go(x) { x.mystery(); }\n",
        )]);
        assert_eq!(resolved.method_calls.len(), 0);
        assert!(resolved.unresolved.iter().any(|u| u.name == "mystery"));
    }

    #[test]
    fn phase_two_is_idempotent() {
        let files = &[(
            "app.js",
            Language::JavaScript,
            "class User { getName() {} }\nfunction go() { const u = new User(); u.getName(); }\n",
        )][..];
        let (_, first) = run(files);
        let (_, second) = run(files);
        assert_eq!(first.method_calls, second.method_calls);
        assert_eq!(first.constructor_calls, second.constructor_calls);
    }
}
