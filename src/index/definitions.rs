//! Definition extraction.
//!
//! Turns `definition` captures into [`SymbolDefinition`] records attached
//! to their containing scopes, and aggregates the class-shaped facts the
//! structural phases need: class records with bases, implemented
//! interfaces and members, Rust impl blocks, imports, and re-exports.
//!
//! Symbol ids are content-addressed, so extraction is deterministic for
//! identical source.

use crate::index::references::{TypeContext, TypeReference};
use crate::index::scope::{ScopeKind, ScopeTree};
use crate::parsing::capture::{location_of, node_text, NormalizedCapture};
use crate::parsing::{CaptureCategory, CaptureEntity, Language, LanguageBehavior};
use crate::symbol::{SymbolDefinition, SymbolModifiers};
use crate::types::{FilePath, Location, LocationKey, ScopeId, SymbolId, SymbolKind, Visibility};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tree_sitter::Node;

/// A method recorded on a class, interface, trait, or impl block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub arity: usize,
    pub is_static: bool,
    pub is_abstract: bool,
    /// Whether the method carries a body (trait/interface members may not).
    pub has_body: bool,
    pub decorators: Vec<String>,
    pub return_type: Option<String>,
    pub location: Location,
}

/// A field or property recorded on a class or interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub type_annotation: Option<String>,
    pub is_static: bool,
    pub is_optional: bool,
    pub location: Location,
}

/// What shape of type-like record this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassRecordKind {
    Class,
    Interface,
    Enum,
}

/// Aggregated facts about one class-like definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub symbol_id: SymbolId,
    pub kind: ClassRecordKind,
    pub location: Location,
    pub language: Language,
    /// Direct base classes (or parent interfaces for interface records).
    pub bases: Vec<String>,
    /// Interfaces named by an implements-style clause.
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodInfo>,
    pub properties: Vec<PropertyInfo>,
    pub decorators: Vec<String>,
    pub metaclass: Option<String>,
    pub generic_params: Vec<String>,
    pub index_signatures: usize,
    pub construct_signatures: usize,
    /// Associated types declared on a Rust trait.
    pub associated_types: Vec<String>,
    pub associated_consts: Vec<String>,
}

impl ClassInfo {
    fn new(
        name: String,
        symbol_id: SymbolId,
        kind: ClassRecordKind,
        location: Location,
        language: Language,
    ) -> Self {
        Self {
            name,
            symbol_id,
            kind,
            location,
            language,
            bases: Vec::new(),
            interfaces: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            decorators: Vec::new(),
            metaclass: None,
            generic_params: Vec::new(),
            index_signatures: 0,
            construct_signatures: 0,
            associated_types: Vec::new(),
            associated_consts: Vec::new(),
        }
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|m| m.name.as_str())
    }
}

/// One Rust `impl` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplBlockInfo {
    /// The implemented trait, `None` for inherent impls.
    pub trait_name: Option<String>,
    pub type_name: String,
    pub is_negative: bool,
    pub methods: Vec<MethodInfo>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Named,
    Default,
    Namespace,
}

/// One imported binding, before cross-file resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDeclaration {
    /// Module specifier as written (`./user`, `pkg.models`, `crate::store`).
    pub specifier: String,
    /// Name in the exporting module (`default` for default imports).
    pub imported_name: String,
    /// Name bound locally.
    pub local_name: String,
    pub kind: ImportKind,
    pub location: Location,
    pub scope_id: ScopeId,
    /// Symbol id of the import binding itself.
    pub symbol_id: SymbolId,
}

/// A re-export edge: `export { a as b } from './m'` or `export { local }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReExport {
    /// Source module; `None` re-exports a local definition.
    pub specifier: Option<String>,
    pub source_name: String,
    pub exported_name: String,
    pub location: Location,
}

/// Everything the definition pass produces for one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Definitions {
    pub symbols: IndexMap<SymbolId, SymbolDefinition>,
    pub classes: Vec<ClassInfo>,
    pub impls: Vec<ImplBlockInfo>,
    pub imports: Vec<ImportDeclaration>,
    pub reexports: Vec<ReExport>,
    pub type_references: Vec<TypeReference>,
    /// Type annotation text keyed by the annotated name's location.
    pub annotations: HashMap<LocationKey, String>,
    /// Declared variable types by name (`user` → `User`).
    pub variable_types: HashMap<String, String>,
}

/// Run definition extraction over the capture stream, registering symbols
/// into the scope tree as they are found.
pub fn extract(
    captures: &[NormalizedCapture<'_>],
    source: &str,
    file: &FilePath,
    scopes: &mut ScopeTree,
    behavior: &dyn LanguageBehavior,
) -> Definitions {
    let mut extractor = DefinitionExtractor {
        source,
        file,
        language: behavior.language(),
        behavior,
        out: Definitions::default(),
        class_by_scope: HashMap::new(),
        impl_by_scope: HashMap::new(),
    };
    for capture in captures {
        extractor.process(capture, scopes);
    }
    extractor.out
}

struct DefinitionExtractor<'a> {
    source: &'a str,
    file: &'a FilePath,
    language: Language,
    behavior: &'a dyn LanguageBehavior,
    out: Definitions,
    /// Scope of a class-like body → index into `out.classes`.
    class_by_scope: HashMap<ScopeId, usize>,
    /// Scope of an impl body → index into `out.impls`.
    impl_by_scope: HashMap<ScopeId, usize>,
}

impl<'a> DefinitionExtractor<'a> {
    fn process(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        match (capture.category, capture.entity) {
            (CaptureCategory::Definition, CaptureEntity::Function)
            | (CaptureCategory::Definition, CaptureEntity::Method) => {
                self.process_callable(capture, scopes)
            }
            (CaptureCategory::Definition, CaptureEntity::Class) => {
                self.process_class(capture, scopes)
            }
            (CaptureCategory::Definition, CaptureEntity::Interface) => {
                self.process_interface(capture, scopes)
            }
            (CaptureCategory::Definition, CaptureEntity::Impl) => {
                self.process_impl(capture, scopes)
            }
            (CaptureCategory::Definition, CaptureEntity::TypeAlias) => {
                self.process_simple(capture, scopes, SymbolKind::TypeAlias)
            }
            (CaptureCategory::Definition, CaptureEntity::Module) => {
                self.process_simple(capture, scopes, SymbolKind::Module)
            }
            (CaptureCategory::Definition, CaptureEntity::Variable) => {
                self.process_variable(capture, scopes)
            }
            (CaptureCategory::Definition, CaptureEntity::Parameter) => {
                self.process_parameter(capture, scopes)
            }
            (CaptureCategory::Definition, CaptureEntity::Field) => {
                self.process_field(capture, scopes)
            }
            (CaptureCategory::Definition, CaptureEntity::Import) => self.process_import(capture, scopes),
            (CaptureCategory::Definition, CaptureEntity::Export) => self.process_export(capture),
            // First assignment to a name in a scope declares it in
            // Python; later ones are plain writes.
            (CaptureCategory::Assignment, _) if self.language == Language::Python => {
                self.process_python_assignment(capture, scopes)
            }
            _ => {}
        }
    }

    fn register(
        &mut self,
        def: SymbolDefinition,
        scopes: &mut ScopeTree,
    ) -> SymbolId {
        let id = def.id.clone();
        scopes.insert_symbol(def.scope_id, &def.name, id.clone());
        self.out.symbols.insert(id.clone(), def);
        id
    }

    /// The class-like context a definition sits in, if any.
    fn enclosing_class_name(&self, scope: ScopeId, scopes: &ScopeTree) -> Option<String> {
        let class_scope = scopes.enclosing_class_scope(scope)?;
        if let Some(idx) = self.class_by_scope.get(&class_scope) {
            return Some(self.out.classes[*idx].name.clone());
        }
        if let Some(idx) = self.impl_by_scope.get(&class_scope) {
            return Some(self.out.impls[*idx].type_name.clone());
        }
        None
    }

    fn visibility_of(&self, node: Node<'_>, name: &str) -> Visibility {
        match self.language {
            Language::Rust => {
                if child_kind_present(node, "visibility_modifier") {
                    Visibility::Public
                } else {
                    Visibility::Private
                }
            }
            Language::Python => {
                if name.starts_with('_') && !name.starts_with("__") {
                    Visibility::Private
                } else {
                    Visibility::Public
                }
            }
            _ => {
                if has_export_ancestor(node) {
                    Visibility::Public
                } else {
                    Visibility::Private
                }
            }
        }
    }

    fn decorators_of(&self, node: Node<'_>) -> Vec<String> {
        if self.language != Language::Python {
            return Vec::new();
        }
        let Some(parent) = node.parent() else {
            return Vec::new();
        };
        if parent.kind() != "decorated_definition" {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut cursor = parent.walk();
        for child in parent.named_children(&mut cursor) {
            if child.kind() == "decorator" {
                let text = node_text(child, self.source);
                let name = text.trim_start_matches('@');
                // `@foo.bar(...)` keeps only the final attribute name.
                let name = name.split('(').next().unwrap_or(name);
                let name = name.rsplit('.').next().unwrap_or(name);
                out.push(name.trim().to_string());
            }
        }
        out
    }

    fn return_type_of(&self, node: Node<'_>) -> Option<String> {
        let rt = node.child_by_field_name("return_type")?;
        Some(clean_annotation(node_text(rt, self.source)))
    }

    fn arity_of(&self, node: Node<'_>) -> usize {
        node.child_by_field_name("parameters")
            .map(|p| p.named_child_count())
            .unwrap_or(0)
    }

    fn process_callable(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        let node = capture.node;
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();

        let own_scope = scopes.scope_opened_at(&capture.location);
        let attach_scope = scopes.scope_for_definition(&capture.location);
        let kind = match own_scope.map(|s| scopes.scope(s).kind) {
            Some(ScopeKind::Method) => SymbolKind::Method,
            Some(ScopeKind::Constructor) => SymbolKind::Constructor,
            _ => SymbolKind::Function,
        };

        let decorators = self.decorators_of(node);
        let is_static = match self.language {
            // Associated functions without a self parameter.
            Language::Rust => {
                kind != SymbolKind::Function
                    && node
                        .child_by_field_name("parameters")
                        .map(|p| find_child(p, "self_parameter").is_none())
                        .unwrap_or(true)
            }
            _ => {
                child_token_present(node, "static")
                    || decorators
                        .iter()
                        .any(|d| d == "staticmethod" || d == "classmethod")
            }
        };
        let is_async = child_token_present(node, "async");
        let is_abstract = decorators.iter().any(|d| d == "abstractmethod");

        let mut modifiers = SymbolModifiers::empty();
        if is_static {
            modifiers |= SymbolModifiers::STATIC;
        }
        if is_async {
            modifiers |= SymbolModifiers::ASYNC;
        }
        if is_abstract {
            modifiers |= SymbolModifiers::ABSTRACT;
        }
        if self.hoists(node) {
            modifiers |= SymbolModifiers::HOISTED;
        }
        if has_export_ancestor(node) {
            modifiers |= SymbolModifiers::EXPORTED;
        }

        let return_type = self.return_type_of(node);
        let arity = self.arity_of(node);
        let class_name = if kind == SymbolKind::Function {
            None
        } else {
            self.enclosing_class_name(attach_scope, scopes)
        };

        let mut def = SymbolDefinition::new(name.clone(), kind, capture.location.clone())
            .with_scope(attach_scope)
            .with_visibility(self.visibility_of(node, &name))
            .with_modifiers(modifiers)
            .with_arity(arity);
        if let Some(rt) = &return_type {
            def = def.with_return_type(rt.clone());
            self.out.type_references.push(TypeReference {
                name: rt.clone(),
                context: TypeContext::Return,
                location: capture.location.clone(),
                scope_id: attach_scope,
            });
            if let Some(rt_node) = node.child_by_field_name("return_type") {
                self.push_generic_refs(
                    node_text(rt_node, self.source),
                    &capture.location,
                    attach_scope,
                );
            }
        }
        if let Some(class) = &class_name {
            def = def.in_class(class.clone());
        }

        let id = self.register(def, scopes);
        if let Some(own) = own_scope {
            scopes.set_owner(own, id.clone());
        }

        // Feed the owning class or impl record.
        if kind != SymbolKind::Function {
            let info = MethodInfo {
                name,
                arity,
                is_static,
                is_abstract,
                has_body: true,
                decorators,
                return_type,
                location: capture.location.clone(),
            };
            if let Some(class_scope) = scopes.enclosing_class_scope(attach_scope) {
                if let Some(idx) = self.class_by_scope.get(&class_scope) {
                    push_method(&mut self.out.classes[*idx].methods, info);
                } else if let Some(idx) = self.impl_by_scope.get(&class_scope) {
                    push_method(&mut self.out.impls[*idx].methods, info);
                }
            }
        }
    }

    fn hoists(&self, node: Node<'_>) -> bool {
        if !self.behavior.hoists_to_function_scope() {
            return false;
        }
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => true,
            "variable_declarator" => node
                .parent()
                .is_some_and(|p| p.kind() == "variable_declaration"),
            _ => false,
        }
    }

    fn process_class(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        let node = capture.node;
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let attach_scope = scopes.scope_for_definition(&capture.location);

        let mut modifiers = SymbolModifiers::empty();
        if has_export_ancestor(node) {
            modifiers |= SymbolModifiers::EXPORTED;
        }
        if node.kind() == "abstract_class_declaration" {
            modifiers |= SymbolModifiers::ABSTRACT;
        }

        let def = SymbolDefinition::new(name.clone(), SymbolKind::Class, capture.location.clone())
            .with_scope(attach_scope)
            .with_visibility(self.visibility_of(node, &name))
            .with_modifiers(modifiers);
        let id = self.register(def, scopes);

        let record_kind = if node.kind() == "enum_declaration" || node.kind() == "enum_item" {
            ClassRecordKind::Enum
        } else {
            ClassRecordKind::Class
        };
        let mut info = ClassInfo::new(
            name,
            id.clone(),
            record_kind,
            capture.location.clone(),
            self.language,
        );
        info.decorators = self.decorators_of(node);
        self.collect_heritage(node, attach_scope, &mut info);
        self.collect_generics(node, &mut info);

        match self.language {
            Language::Python => self.collect_python_class_body(node, &mut info),
            Language::Rust => self.collect_rust_fields(node, &mut info, scopes),
            _ => {}
        }

        if let Some(own) = scopes.scope_opened_at(&capture.location) {
            scopes.set_owner(own, id);
            self.class_by_scope.insert(own, self.out.classes.len());
        }
        self.out.classes.push(info);
    }

    fn collect_generics(&mut self, node: Node<'_>, info: &mut ClassInfo) {
        if let Some(params) = node.child_by_field_name("type_parameters") {
            let mut cursor = params.walk();
            for child in params.named_children(&mut cursor) {
                let text = node_text(child, self.source);
                let base = text.split([' ', ':', '=']).next().unwrap_or(text);
                if !base.is_empty() {
                    info.generic_params.push(base.to_string());
                }
            }
        }
    }

    /// Bases and implemented interfaces from heritage clauses.
    fn collect_heritage(&mut self, node: Node<'_>, scope: ScopeId, info: &mut ClassInfo) {
        match self.language {
            Language::Python => {
                if let Some(superclasses) = node.child_by_field_name("superclasses") {
                    let mut cursor = superclasses.walk();
                    for child in superclasses.named_children(&mut cursor) {
                        match child.kind() {
                            "identifier" | "attribute" => {
                                let text = node_text(child, self.source);
                                let base = text.rsplit('.').next().unwrap_or(text).to_string();
                                self.push_type_ref(&base, TypeContext::Extends, child, scope);
                                info.bases.push(base);
                            }
                            "subscript" => {
                                // `Generic[T]`, `Protocol[T]`: the base
                                // extends, the subscript arguments are
                                // generic references.
                                if let Some(value) = child.child_by_field_name("value") {
                                    let base = node_text(value, self.source).to_string();
                                    self.push_type_ref(&base, TypeContext::Extends, child, scope);
                                    let location = location_of(child, self.file);
                                    self.push_generic_refs(
                                        node_text(child, self.source),
                                        &location,
                                        scope,
                                    );
                                    info.bases.push(base);
                                }
                            }
                            "keyword_argument" => {
                                let name = child
                                    .child_by_field_name("name")
                                    .map(|n| node_text(n, self.source));
                                if name == Some("metaclass") {
                                    info.metaclass = child
                                        .child_by_field_name("value")
                                        .map(|v| node_text(v, self.source).to_string());
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            Language::JavaScript | Language::TypeScript => {
                let Some(heritage) = find_child(node, "class_heritage") else {
                    return;
                };
                let mut cursor = heritage.walk();
                for clause in heritage.children(&mut cursor) {
                    match clause.kind() {
                        "extends_clause" => {
                            let mut inner = clause.walk();
                            for base in clause.named_children(&mut inner) {
                                if matches!(base.kind(), "identifier" | "member_expression") {
                                    let text = node_text(base, self.source);
                                    let base_name =
                                        text.rsplit('.').next().unwrap_or(text).to_string();
                                    self.push_type_ref(&base_name, TypeContext::Extends, base, scope);
                                    info.bases.push(base_name);
                                }
                            }
                            // `extends Base<T>` carries the arguments as
                            // siblings of the base expression.
                            let location = location_of(clause, self.file);
                            self.push_generic_refs(
                                node_text(clause, self.source),
                                &location,
                                scope,
                            );
                        }
                        "implements_clause" => {
                            let mut inner = clause.walk();
                            for iface in clause.named_children(&mut inner) {
                                let text = node_text(iface, self.source);
                                let base = text.split('<').next().unwrap_or(text).to_string();
                                self.push_type_ref(&base, TypeContext::Implements, iface, scope);
                                let location = location_of(iface, self.file);
                                self.push_generic_refs(text, &location, scope);
                                info.interfaces.push(base);
                            }
                        }
                        // Plain JavaScript: `class A extends B` puts the
                        // expression directly under class_heritage.
                        "identifier" | "member_expression" => {
                            let text = node_text(clause, self.source);
                            let base_name = text.rsplit('.').next().unwrap_or(text).to_string();
                            self.push_type_ref(&base_name, TypeContext::Extends, clause, scope);
                            info.bases.push(base_name);
                        }
                        _ => {}
                    }
                }
            }
            Language::Rust => {}
        }
    }

    fn push_type_ref(&mut self, name: &str, context: TypeContext, node: Node<'_>, scope: ScopeId) {
        self.out.type_references.push(TypeReference {
            name: name.to_string(),
            context,
            location: location_of(node, self.file),
            scope_id: scope,
        });
    }

    /// Class-level assignments in a Python class body become properties.
    fn collect_python_class_body(&mut self, node: Node<'_>, info: &mut ClassInfo) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for stmt in body.named_children(&mut cursor) {
            if stmt.kind() != "expression_statement" {
                continue;
            }
            let Some(expr) = stmt.named_child(0) else {
                continue;
            };
            if expr.kind() != "assignment" {
                continue;
            }
            let Some(left) = expr.child_by_field_name("left") else {
                continue;
            };
            if left.kind() != "identifier" {
                continue;
            }
            info.properties.push(PropertyInfo {
                name: node_text(left, self.source).to_string(),
                type_annotation: expr
                    .child_by_field_name("type")
                    .map(|t| clean_annotation(node_text(t, self.source))),
                is_static: false,
                is_optional: false,
                location: location_of(left, self.file),
            });
        }
    }

    /// Rust struct fields become properties plus field symbols.
    fn collect_rust_fields(
        &mut self,
        node: Node<'_>,
        info: &mut ClassInfo,
        scopes: &mut ScopeTree,
    ) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        if body.kind() != "field_declaration_list" {
            return;
        }
        let mut cursor = body.walk();
        for field in body.named_children(&mut cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let Some(name_node) = field.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name_node, self.source).to_string();
            let annotation = if let Some(type_node) = field.child_by_field_name("type") {
                let raw = node_text(type_node, self.source);
                let base = clean_annotation(raw);
                let type_location = location_of(type_node, self.file);
                let type_scope = scopes.find_containing_scope(&type_location);
                self.out.type_references.push(TypeReference {
                    name: base.clone(),
                    context: TypeContext::Annotation,
                    location: type_location.clone(),
                    scope_id: type_scope,
                });
                self.push_generic_refs(raw, &type_location, type_scope);
                Some(base)
            } else {
                None
            };
            let location = location_of(field, self.file);
            info.properties.push(PropertyInfo {
                name: name.clone(),
                type_annotation: annotation.clone(),
                is_static: false,
                is_optional: false,
                location: location.clone(),
            });

            let scope = scopes.scope_for_definition(&location);
            let def = SymbolDefinition::new(name.clone(), SymbolKind::Field, location)
                .in_class(info.name.clone())
                .with_scope(scope)
                .with_visibility(self.visibility_of(field, &name));
            self.register(def, scopes);
        }
    }

    fn process_interface(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        let node = capture.node;
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let attach_scope = scopes.scope_for_definition(&capture.location);

        let mut modifiers = SymbolModifiers::empty();
        if has_export_ancestor(node) {
            modifiers |= SymbolModifiers::EXPORTED;
        }
        let def =
            SymbolDefinition::new(name.clone(), SymbolKind::Interface, capture.location.clone())
                .with_scope(attach_scope)
                .with_visibility(self.visibility_of(node, &name))
                .with_modifiers(modifiers);
        let id = self.register(def, scopes);

        let mut info = ClassInfo::new(
            name,
            id.clone(),
            ClassRecordKind::Interface,
            capture.location.clone(),
            self.language,
        );
        self.collect_generics(node, &mut info);

        match self.language {
            Language::TypeScript => self.collect_ts_interface_body(node, attach_scope, &mut info),
            Language::Rust => self.collect_trait_body(node, attach_scope, &mut info),
            _ => {}
        }

        if let Some(own) = scopes.scope_opened_at(&capture.location) {
            scopes.set_owner(own, id);
            self.class_by_scope.insert(own, self.out.classes.len());
        }
        self.out.classes.push(info);
    }

    fn collect_ts_interface_body(&mut self, node: Node<'_>, scope: ScopeId, info: &mut ClassInfo) {
        // Parent interfaces: `interface A extends B, C`.
        for clause_kind in ["extends_type_clause", "extends_clause"] {
            if let Some(clause) = find_child(node, clause_kind) {
                let mut cursor = clause.walk();
                for parent in clause.named_children(&mut cursor) {
                    let text = node_text(parent, self.source);
                    let base = text.split('<').next().unwrap_or(text).to_string();
                    self.push_type_ref(&base, TypeContext::Extends, parent, scope);
                    let location = location_of(parent, self.file);
                    self.push_generic_refs(text, &location, scope);
                    info.bases.push(base);
                }
            }
        }

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_signature" => {
                    let Some(name_node) = member.child_by_field_name("name") else {
                        continue;
                    };
                    push_method(
                        &mut info.methods,
                        MethodInfo {
                            name: node_text(name_node, self.source).to_string(),
                            arity: member
                                .child_by_field_name("parameters")
                                .map(|p| p.named_child_count())
                                .unwrap_or(0),
                            is_static: false,
                            is_abstract: true,
                            has_body: false,
                            decorators: Vec::new(),
                            return_type: member
                                .child_by_field_name("return_type")
                                .map(|t| clean_annotation(node_text(t, self.source))),
                            location: location_of(member, self.file),
                        },
                    );
                }
                "property_signature" => {
                    let Some(name_node) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let text = node_text(member, self.source);
                    info.properties.push(PropertyInfo {
                        name: node_text(name_node, self.source).to_string(),
                        type_annotation: member
                            .child_by_field_name("type")
                            .map(|t| clean_annotation(node_text(t, self.source))),
                        is_static: false,
                        is_optional: text.contains('?'),
                        location: location_of(member, self.file),
                    });
                }
                "index_signature" => info.index_signatures += 1,
                "construct_signature" => info.construct_signatures += 1,
                _ => {}
            }
        }
    }

    fn collect_trait_body(&mut self, node: Node<'_>, scope: ScopeId, info: &mut ClassInfo) {
        // Supertraits: `trait Draw: Base + Other`.
        for child_kind in ["trait_bounds", "bounds"] {
            if let Some(bounds) = find_child(node, child_kind) {
                let mut cursor = bounds.walk();
                for bound in bounds.named_children(&mut cursor) {
                    if matches!(bound.kind(), "type_identifier" | "scoped_type_identifier") {
                        let text = node_text(bound, self.source);
                        let base = text.rsplit("::").next().unwrap_or(text).to_string();
                        self.push_type_ref(&base, TypeContext::Extends, bound, scope);
                        info.bases.push(base);
                    }
                }
            }
        }

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "function_signature_item" | "function_item" => {
                    let Some(name_node) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let has_body = member.kind() == "function_item";
                    push_method(
                        &mut info.methods,
                        MethodInfo {
                            name: node_text(name_node, self.source).to_string(),
                            arity: member
                                .child_by_field_name("parameters")
                                .map(|p| p.named_child_count())
                                .unwrap_or(0),
                            is_static: false,
                            is_abstract: !has_body,
                            has_body,
                            decorators: Vec::new(),
                            return_type: member
                                .child_by_field_name("return_type")
                                .map(|t| clean_annotation(node_text(t, self.source))),
                            location: location_of(member, self.file),
                        },
                    );
                }
                "associated_type" => {
                    if let Some(name_node) = member.child_by_field_name("name") {
                        info.associated_types
                            .push(node_text(name_node, self.source).to_string());
                    }
                }
                "const_item" => {
                    if let Some(name_node) = member.child_by_field_name("name") {
                        info.associated_consts
                            .push(node_text(name_node, self.source).to_string());
                    }
                }
                _ => {}
            }
        }
    }

    fn process_impl(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        let node = capture.node;
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let type_text = node_text(type_node, self.source);
        let type_name = clean_annotation(type_text);

        let trait_name = node.child_by_field_name("trait").map(|t| {
            let text = node_text(t, self.source);
            clean_annotation(text)
        });
        let is_negative = has_bang_before_trait(node);

        let info = ImplBlockInfo {
            trait_name,
            type_name,
            is_negative,
            methods: Vec::new(),
            location: capture.location.clone(),
        };
        if let Some(own) = scopes.scope_opened_at(&capture.location) {
            self.impl_by_scope.insert(own, self.out.impls.len());
        }
        self.out.impls.push(info);
    }

    fn process_simple(
        &mut self,
        capture: &NormalizedCapture<'_>,
        scopes: &mut ScopeTree,
        kind: SymbolKind,
    ) {
        let node = capture.node;
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let attach_scope = scopes.scope_for_definition(&capture.location);
        let def = SymbolDefinition::new(name.clone(), kind, capture.location.clone())
            .with_scope(attach_scope)
            .with_visibility(self.visibility_of(node, &name));
        let id = self.register(def, scopes);
        if kind == SymbolKind::Module {
            if let Some(own) = scopes.scope_opened_at(&capture.location) {
                scopes.set_owner(own, id);
            }
        }
    }

    fn process_variable(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        let node = capture.node;
        let (name_node, value_node, type_node) = match node.kind() {
            "variable_declarator" => (
                node.child_by_field_name("name"),
                node.child_by_field_name("value"),
                node.child_by_field_name("type"),
            ),
            "let_declaration" => (
                node.child_by_field_name("pattern"),
                node.child_by_field_name("value"),
                node.child_by_field_name("type"),
            ),
            // const_item / static_item
            _ => (
                node.child_by_field_name("name"),
                node.child_by_field_name("value"),
                node.child_by_field_name("type"),
            ),
        };
        let Some(mut name_node) = name_node else { return };
        if name_node.kind() == "mut_pattern" {
            match find_child(name_node, "identifier") {
                Some(inner) => name_node = inner,
                None => return,
            }
        }
        if name_node.kind() != "identifier" {
            // Destructuring patterns are not tracked as single symbols.
            return;
        }
        let name = node_text(name_node, self.source).to_string();
        let attach_scope = scopes.scope_for_definition(&capture.location);

        // `const f = () => ...` defines a function under the variable's
        // name; the arrow's scope is owned by it.
        if let Some(value) = value_node {
            if matches!(
                value.kind(),
                "arrow_function" | "function_expression" | "generator_function"
            ) {
                let mut modifiers = SymbolModifiers::empty();
                if child_token_present(value, "async") {
                    modifiers |= SymbolModifiers::ASYNC;
                }
                if has_export_ancestor(node) {
                    modifiers |= SymbolModifiers::EXPORTED;
                }
                let def =
                    SymbolDefinition::new(name.clone(), SymbolKind::Function, capture.location.clone())
                        .with_scope(attach_scope)
                        .with_visibility(self.visibility_of(node, &name))
                        .with_modifiers(modifiers)
                        .with_arity(
                            value
                                .child_by_field_name("parameters")
                                .map(|p| p.named_child_count())
                                .unwrap_or(0),
                        );
                let id = self.register(def, scopes);
                let value_location = location_of(value, self.file);
                if let Some(arrow_scope) = scopes.scope_opened_at(&value_location) {
                    scopes.set_owner(arrow_scope, id);
                }
                return;
            }
        }

        let mut modifiers = SymbolModifiers::empty();
        if self.hoists(node) {
            modifiers |= SymbolModifiers::HOISTED;
        }
        if matches!(node.kind(), "const_item" | "static_item")
            || node.parent().is_some_and(|p| child_token_present(p, "const"))
        {
            modifiers |= SymbolModifiers::CONST;
        }
        if has_export_ancestor(node) {
            modifiers |= SymbolModifiers::EXPORTED;
        }

        let mut def = SymbolDefinition::new(name.clone(), SymbolKind::Variable, capture.location.clone())
            .with_scope(attach_scope)
            .with_visibility(self.visibility_of(node, &name))
            .with_modifiers(modifiers);

        if let Some(type_node) = type_node {
            let annotation = self.record_annotation(
                name_node,
                &name,
                node_text(type_node, self.source),
                attach_scope,
            );
            def = def.with_return_type(annotation);
        }
        self.register(def, scopes);
    }

    /// Record a type annotation from its raw source text: an
    /// annotation-context reference for the base type, generic-context
    /// references for every type argument, and the local type-flow
    /// entries. Returns the base type name.
    fn record_annotation(
        &mut self,
        name_node: Node<'_>,
        name: &str,
        raw: &str,
        scope: ScopeId,
    ) -> String {
        let base = clean_annotation(raw);
        let location = location_of(name_node, self.file);
        self.out.type_references.push(TypeReference {
            name: base.clone(),
            context: TypeContext::Annotation,
            location: location.clone(),
            scope_id: scope,
        });
        self.push_generic_refs(raw, &location, scope);
        self.out.annotations.insert(location.key(), base.clone());
        self.out
            .variable_types
            .insert(name.to_string(), base.clone());
        base
    }

    /// A generic-context reference for every type argument found in a
    /// raw type text (`Array<User>`, `List[User]`).
    fn push_generic_refs(&mut self, raw: &str, location: &Location, scope: ScopeId) {
        for argument in generic_argument_names(raw) {
            self.out.type_references.push(TypeReference {
                name: argument,
                context: TypeContext::Generic,
                location: location.clone(),
                scope_id: scope,
            });
        }
    }

    fn process_parameter(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        let node = capture.node;
        let name = node_text(node, self.source).to_string();
        let attach_scope = scopes.find_containing_scope(&capture.location);
        let mut def = SymbolDefinition::new(name.clone(), SymbolKind::Parameter, capture.location.clone())
            .with_scope(attach_scope);

        // The annotation sits on the wrapping parameter node.
        if let Some(parent) = node.parent() {
            if let Some(type_node) = parent.child_by_field_name("type") {
                let annotation = self.record_annotation(
                    node,
                    &name,
                    node_text(type_node, self.source),
                    attach_scope,
                );
                def = def.with_return_type(annotation);
            }
        }
        self.register(def, scopes);
    }

    fn process_field(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        let node = capture.node;
        // TS uses the `name` field, plain JS field_definition uses `property`.
        let Some(name_node) = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"))
        else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let attach_scope = scopes.scope_for_definition(&capture.location);
        let class_name = self.enclosing_class_name(attach_scope, scopes);
        let annotation = if let Some(type_node) = node.child_by_field_name("type") {
            let raw = node_text(type_node, self.source);
            let base = clean_annotation(raw);
            let location = location_of(type_node, self.file);
            self.out.type_references.push(TypeReference {
                name: base.clone(),
                context: TypeContext::Annotation,
                location: location.clone(),
                scope_id: attach_scope,
            });
            self.push_generic_refs(raw, &location, attach_scope);
            Some(base)
        } else {
            None
        };

        let mut def = SymbolDefinition::new(name.clone(), SymbolKind::Field, capture.location.clone())
            .with_scope(attach_scope);
        if let Some(class) = &class_name {
            def = def.in_class(class.clone());
        }
        if let Some(annotation) = &annotation {
            def = def.with_return_type(annotation.clone());
        }
        self.register(def, scopes);

        if let Some(class_scope) = scopes.enclosing_class_scope(attach_scope) {
            if let Some(idx) = self.class_by_scope.get(&class_scope) {
                self.out.classes[*idx].properties.push(PropertyInfo {
                    name,
                    type_annotation: annotation,
                    is_static: child_token_present(node, "static"),
                    is_optional: false,
                    location: capture.location.clone(),
                });
            }
        }
    }

    fn process_python_assignment(
        &mut self,
        capture: &NormalizedCapture<'_>,
        scopes: &mut ScopeTree,
    ) {
        let node = capture.node;
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }
        let name = node_text(left, self.source).to_string();
        let scope = scopes.find_containing_scope(&capture.location);
        if scopes.scope(scope).symbols.contains_key(&name) {
            return;
        }
        let location = location_of(left, self.file);
        let mut def = SymbolDefinition::new(name.clone(), SymbolKind::Variable, location)
            .with_scope(scope)
            .with_visibility(self.visibility_of(node, &name));
        if let Some(type_node) = node.child_by_field_name("type") {
            let annotation =
                self.record_annotation(left, &name, node_text(type_node, self.source), scope);
            def = def.with_return_type(annotation);
        }
        self.register(def, scopes);
    }

    fn process_import(&mut self, capture: &NormalizedCapture<'_>, scopes: &mut ScopeTree) {
        let node = capture.node;
        let scope_id = scopes.find_containing_scope(&capture.location);
        let mut records: Vec<(String, String, String, ImportKind)> = Vec::new();

        match self.language {
            Language::JavaScript | Language::TypeScript => {
                self.collect_js_import(node, &mut records)
            }
            Language::Python => self.collect_python_import(node, &mut records),
            Language::Rust => {
                if let Some(tree) = node
                    .child_by_field_name("argument")
                    .or_else(|| node.named_child(0))
                {
                    self.collect_use_tree(tree, String::new(), &mut records);
                }
            }
        }

        for (specifier, imported_name, local_name, kind) in records {
            if local_name == "*" {
                // Glob imports bind no single local name.
                continue;
            }
            let def =
                SymbolDefinition::new(local_name.clone(), SymbolKind::Module, capture.location.clone())
                    .with_scope(scope_id);
            let symbol_id = def.id.clone();
            // The binding participates in scope lookups through the
            // import edge, not the local-symbol map; keep the symbol
            // queryable by id only.
            self.out.symbols.insert(symbol_id.clone(), def);
            self.out.imports.push(ImportDeclaration {
                specifier,
                imported_name,
                local_name,
                kind,
                location: capture.location.clone(),
                scope_id,
                symbol_id,
            });
        }
    }

    fn collect_js_import(
        &self,
        node: Node<'_>,
        records: &mut Vec<(String, String, String, ImportKind)>,
    ) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let specifier = strip_quotes(node_text(source_node, self.source)).to_string();

        let Some(clause) = find_child(node, "import_clause") else {
            // Bare `import './side-effect'`.
            return;
        };
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => {
                    let local = node_text(child, self.source).to_string();
                    records.push((specifier.clone(), "default".to_string(), local, ImportKind::Default));
                }
                "namespace_import" => {
                    if let Some(name) = find_child(child, "identifier") {
                        let local = node_text(name, self.source).to_string();
                        records.push((specifier.clone(), "*".to_string(), local, ImportKind::Namespace));
                    }
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name_node) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = node_text(name_node, self.source).to_string();
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| node_text(a, self.source).to_string())
                            .unwrap_or_else(|| imported.clone());
                        records.push((specifier.clone(), imported, local, ImportKind::Named));
                    }
                }
                _ => {}
            }
        }
    }

    fn collect_python_import(
        &self,
        node: Node<'_>,
        records: &mut Vec<(String, String, String, ImportKind)>,
    ) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => {
                            let module = node_text(child, self.source).to_string();
                            let local = module.split('.').next().unwrap_or(&module).to_string();
                            records.push((module.clone(), "*".to_string(), local, ImportKind::Namespace));
                        }
                        "aliased_import" => {
                            let Some(name) = child.child_by_field_name("name") else {
                                continue;
                            };
                            let module = node_text(name, self.source).to_string();
                            let local = child
                                .child_by_field_name("alias")
                                .map(|a| node_text(a, self.source).to_string())
                                .unwrap_or_else(|| module.clone());
                            records.push((module, "*".to_string(), local, ImportKind::Namespace));
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let Some(module_node) = node.child_by_field_name("module_name") else {
                    return;
                };
                let specifier = node_text(module_node, self.source).to_string();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.id() == module_node.id() {
                        continue;
                    }
                    match child.kind() {
                        "dotted_name" | "identifier" => {
                            let imported = node_text(child, self.source).to_string();
                            records.push((
                                specifier.clone(),
                                imported.clone(),
                                imported,
                                ImportKind::Named,
                            ));
                        }
                        "aliased_import" => {
                            let Some(name) = child.child_by_field_name("name") else {
                                continue;
                            };
                            let imported = node_text(name, self.source).to_string();
                            let local = child
                                .child_by_field_name("alias")
                                .map(|a| node_text(a, self.source).to_string())
                                .unwrap_or_else(|| imported.clone());
                            records.push((specifier.clone(), imported, local, ImportKind::Named));
                        }
                        "wildcard_import" => {
                            records.push((
                                specifier.clone(),
                                "*".to_string(),
                                "*".to_string(),
                                ImportKind::Namespace,
                            ));
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Walk a Rust use tree, flattening groups, aliases, and globs.
    fn collect_use_tree(
        &self,
        node: Node<'_>,
        prefix: String,
        records: &mut Vec<(String, String, String, ImportKind)>,
    ) {
        match node.kind() {
            "use_as_clause" => {
                let Some(path) = node.child_by_field_name("path") else {
                    return;
                };
                let full = join_use_path(&prefix, node_text(path, self.source));
                let local = node
                    .child_by_field_name("alias")
                    .map(|a| node_text(a, self.source).to_string())
                    .unwrap_or_else(|| last_segment(&full).to_string());
                records.push((full.clone(), last_segment(&full).to_string(), local, ImportKind::Named));
            }
            "use_wildcard" => {
                let inner = node
                    .named_child(0)
                    .map(|p| node_text(p, self.source))
                    .unwrap_or("");
                let full = join_use_path(&prefix, inner);
                records.push((full, "*".to_string(), "*".to_string(), ImportKind::Namespace));
            }
            "use_list" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect_use_tree(child, prefix.clone(), records);
                }
            }
            "scoped_use_list" => {
                let new_prefix = node
                    .child_by_field_name("path")
                    .map(|p| join_use_path(&prefix, node_text(p, self.source)))
                    .unwrap_or(prefix);
                if let Some(list) = node.child_by_field_name("list") {
                    self.collect_use_tree(list, new_prefix, records);
                }
            }
            "identifier" | "scoped_identifier" | "crate" | "self" | "super" => {
                let full = join_use_path(&prefix, node_text(node, self.source));
                let local = last_segment(&full).to_string();
                records.push((full.clone(), local.clone(), local, ImportKind::Named));
            }
            "use_tree" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect_use_tree(child, prefix.clone(), records);
                }
            }
            _ => {}
        }
    }

    fn process_export(&mut self, capture: &NormalizedCapture<'_>) {
        let node = capture.node;
        // Declaration exports (`export function f…`) are marked on the
        // declarations themselves; only clause and re-export forms
        // produce records here.
        let specifier = node
            .child_by_field_name("source")
            .map(|s| strip_quotes(node_text(s, self.source)).to_string());

        if let Some(clause) = find_child(node, "export_clause") {
            let mut cursor = clause.walk();
            for spec in clause.named_children(&mut cursor) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                let Some(name_node) = spec.child_by_field_name("name") else {
                    continue;
                };
                let source_name = node_text(name_node, self.source).to_string();
                let exported = spec
                    .child_by_field_name("alias")
                    .map(|a| node_text(a, self.source).to_string())
                    .unwrap_or_else(|| source_name.clone());
                self.out.reexports.push(ReExport {
                    specifier: specifier.clone(),
                    source_name,
                    exported_name: exported,
                    location: capture.location.clone(),
                });
            }
        } else if let Some(value) = node.child_by_field_name("value") {
            // `export default <identifier>`.
            if value.kind() == "identifier" {
                self.out.reexports.push(ReExport {
                    specifier: None,
                    source_name: node_text(value, self.source).to_string(),
                    exported_name: "default".to_string(),
                    location: capture.location.clone(),
                });
            }
        } else if child_token_present(node, "default") {
            // `export default function f() {}` — the declaration is also
            // reachable under the `default` name.
            if let Some(decl) = node.child_by_field_name("declaration") {
                if let Some(name_node) = decl.child_by_field_name("name") {
                    self.out.reexports.push(ReExport {
                        specifier: None,
                        source_name: node_text(name_node, self.source).to_string(),
                        exported_name: "default".to_string(),
                        location: capture.location.clone(),
                    });
                }
            }
        } else if specifier.is_some() {
            // `export * from './m'`.
            self.out.reexports.push(ReExport {
                specifier,
                source_name: "*".to_string(),
                exported_name: "*".to_string(),
                location: capture.location.clone(),
            });
        }
    }
}

fn has_bang_before_trait(node: Node<'_>) -> bool {
    child_token_present(node, "!")
}

fn push_method(methods: &mut Vec<MethodInfo>, info: MethodInfo) {
    if methods.iter().any(|m| m.location == info.location) {
        return;
    }
    methods.push(info);
}

fn find_child<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn child_kind_present(node: Node<'_>, kind: &str) -> bool {
    find_child(node, kind).is_some()
}

/// Whether an unnamed token child with this text/kind is present
/// (e.g. `static`, `async`).
fn child_token_present(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == token);
    found
}

fn has_export_ancestor(node: Node<'_>) -> bool {
    let mut current = node.parent();
    for _ in 0..3 {
        match current {
            Some(p) if p.kind() == "export_statement" => return true,
            Some(p) => current = p.parent(),
            None => return false,
        }
    }
    false
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

fn join_use_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}::{segment}")
    }
}

/// Normalize an annotation to its base type text: strips the leading
/// colon of TS annotations, references, and generic/subscript arguments.
/// The discarded arguments are reported separately through
/// [`generic_argument_names`].
pub fn clean_annotation(text: &str) -> String {
    let text = text.trim_start_matches(':').trim();
    let text = text.trim_start_matches("&mut ").trim_start_matches('&');
    let text = text.trim_start_matches("dyn ").trim_start_matches("impl ");
    let base = text.split('<').next().unwrap_or(text);
    let base = base.split('|').next().unwrap_or(base);
    let base = base.trim().trim_end_matches("[]");
    let base = base.split('[').next().unwrap_or(base);
    base.trim().to_string()
}

/// Base names of the type arguments inside a generic application,
/// nested arguments included: `HashMap<String, Vec<User>>` yields
/// `["String", "Vec", "User"]`, `List[User]` yields `["User"]`.
/// Lifetimes and non-type arguments are skipped.
pub fn generic_argument_names(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    collect_generic_arguments(text, &mut out);
    out
}

fn collect_generic_arguments(text: &str, out: &mut Vec<String>) {
    let Some(open) = text.find(['<', '[']) else {
        return;
    };
    let tail = &text[open..];
    let open_char = if tail.starts_with('<') { '<' } else { '[' };
    let close_char = if open_char == '<' { '>' } else { ']' };

    let mut depth = 0usize;
    let mut close = None;
    for (i, c) in tail.char_indices() {
        if c == open_char {
            depth += 1;
        } else if c == close_char {
            depth -= 1;
            if depth == 0 {
                close = Some(i);
                break;
            }
        }
    }
    let Some(close) = close else { return };
    let inner = &tail[1..close];

    // Split on commas outside any nested bracket group.
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut arguments: Vec<&str> = Vec::new();
    for (i, c) in inner.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                arguments.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    arguments.push(&inner[start..]);

    for argument in arguments {
        let mut argument = argument.trim().trim_start_matches('&').trim_start();
        if argument.starts_with('\'') {
            // `&'a User`: drop the lifetime, keep the type.
            match argument.split_once(char::is_whitespace) {
                Some((_, rest)) => argument = rest.trim_start(),
                None => continue,
            }
        }
        argument = argument.strip_prefix("mut ").unwrap_or(argument).trim_start();
        if argument.is_empty() {
            continue;
        }
        let base = clean_annotation(argument);
        if is_type_name(&base) {
            out.push(base);
        }
        collect_generic_arguments(argument, out);
    }
}

fn is_type_name(base: &str) -> bool {
    !base.is_empty()
        && base
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
        && base
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_annotation_strips_decoration() {
        assert_eq!(clean_annotation(": User"), "User");
        assert_eq!(clean_annotation("&mut Store"), "Store");
        assert_eq!(clean_annotation("Vec<Item>"), "Vec");
        assert_eq!(clean_annotation("User | null"), "User");
        assert_eq!(clean_annotation("User[]"), "User");
        assert_eq!(clean_annotation("List[User]"), "List");
        assert_eq!(clean_annotation("dyn Draw"), "Draw");
    }

    #[test]
    fn generic_arguments_are_extracted() {
        assert_eq!(generic_argument_names("Array<User>"), vec!["User"]);
        assert_eq!(
            generic_argument_names("HashMap<String, Vec<User>>"),
            vec!["String", "Vec", "User"]
        );
        assert_eq!(generic_argument_names("List[User]"), vec!["User"]);
        assert_eq!(generic_argument_names(": Promise<Conn>"), vec!["Conn"]);
        assert_eq!(generic_argument_names("Option<&'a User>"), vec!["User"]);
        assert_eq!(generic_argument_names("Box<dyn Draw>"), vec!["Draw"]);
    }

    #[test]
    fn generic_extraction_skips_non_types() {
        assert!(generic_argument_names("plain").is_empty());
        assert!(generic_argument_names("[u8; 32]").is_empty());
        assert!(generic_argument_names("Vec<'static>").is_empty());
    }

    #[test]
    fn quote_stripping() {
        assert_eq!(strip_quotes("'./user'"), "./user");
        assert_eq!(strip_quotes("\"pkg\""), "pkg");
    }

    #[test]
    fn use_path_segments() {
        assert_eq!(last_segment("crate::store::Store"), "Store");
        assert_eq!(last_segment("Store"), "Store");
        assert_eq!(join_use_path("", "crate"), "crate");
        assert_eq!(join_use_path("crate::a", "B"), "crate::a::B");
    }
}
