//! Typed reference records and their extraction.
//!
//! Consumes `reference`, `assignment`, and `return` captures and emits
//! discriminated records: function calls, method calls, self-reference
//! calls, constructor calls, member accesses, assignments, and returns.
//! Callers are attributed to the nearest enclosing callable symbol, or
//! the `<module>` sentinel at file level.

use crate::index::scope::ScopeTree;
use crate::parsing::capture::{location_of, node_text, NormalizedCapture};
use crate::parsing::{CaptureCategory, CaptureEntity, Language, LanguageBehavior};
use crate::types::{FilePath, Location, ScopeId, SymbolId};
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// A call site, discriminated by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallReference {
    FunctionCall(FunctionCall),
    MethodCall(MethodCall),
    SelfReferenceCall(SelfReferenceCall),
    ConstructorCall(ConstructorCall),
}

impl CallReference {
    pub fn location(&self) -> &Location {
        match self {
            CallReference::FunctionCall(c) => &c.location,
            CallReference::MethodCall(c) => &c.location,
            CallReference::SelfReferenceCall(c) => &c.location,
            CallReference::ConstructorCall(c) => &c.location,
        }
    }

    pub fn caller(&self) -> &SymbolId {
        match self {
            CallReference::FunctionCall(c) => &c.caller,
            CallReference::MethodCall(c) => &c.caller,
            CallReference::SelfReferenceCall(c) => &c.caller,
            CallReference::ConstructorCall(c) => &c.caller,
        }
    }

    /// The name the site refers to: callee, method, or class name.
    pub fn target_name(&self) -> &str {
        match self {
            CallReference::FunctionCall(c) => &c.callee_name,
            CallReference::MethodCall(c) => &c.method_name,
            CallReference::SelfReferenceCall(c) => &c.method_name,
            CallReference::ConstructorCall(c) => &c.class_name,
        }
    }
}

/// A bare-name call: `foo()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub caller: SymbolId,
    pub callee_name: String,
    pub location: Location,
    pub scope_id: ScopeId,
    pub arity: usize,
    /// Identifier arguments, for pattern detection (`Abc.register(Def)`).
    pub argument_names: Vec<String>,
}

/// A member call: `receiver.m()` or `Type::m()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub caller: SymbolId,
    pub method_name: String,
    pub location: Location,
    pub scope_id: ScopeId,
    /// Receiver expression text (`user`, `a.b`, `Type`).
    pub receiver: String,
    pub receiver_location: Location,
    /// When the receiver is itself a call, the name of the called
    /// function (for return-type resolution).
    pub receiver_call_name: Option<String>,
    /// Full chain for `a.b.c()` → `["a", "b", "c"]`.
    pub property_chain: Vec<String>,
    pub is_optional_chain: bool,
    pub is_static: bool,
    pub arity: usize,
    pub argument_names: Vec<String>,
}

/// A method call whose receiver is the language's self keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfReferenceCall {
    pub caller: SymbolId,
    pub keyword: String,
    pub method_name: String,
    pub location: Location,
    pub scope_id: ScopeId,
    pub arity: usize,
}

/// A construction site: `new User(...)`, `User(...)` (Python),
/// `User { .. }` or `User::new(...)` (Rust).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorCall {
    pub caller: SymbolId,
    pub class_name: String,
    pub location: Location,
    pub scope_id: ScopeId,
    /// Variable receiving the instance, when the site sits in an
    /// assignment or declaration.
    pub assigned_to: Option<AssignTarget>,
    pub arity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignTarget {
    pub name: String,
    pub location: Location,
}

/// How a member is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Property,
    Method,
    Index,
}

/// A member access that is not itself a call (`a.b`, `a[0]`), plus the
/// access record behind every method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccessReference {
    pub location: Location,
    pub member_name: String,
    pub scope_id: ScopeId,
    pub access_type: AccessType,
    pub object_location: Option<Location>,
    pub property_chain: Vec<String>,
    pub is_optional_chain: bool,
    pub is_static: bool,
}

/// The syntactic context a type name appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeContext {
    Annotation,
    Extends,
    Implements,
    Generic,
    Return,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeReference {
    pub name: String,
    pub context: TypeContext,
    pub location: Location,
    pub scope_id: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentReference {
    pub name: String,
    pub target_location: Location,
    pub location: Location,
    pub scope_id: ScopeId,
    pub type_annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnReference {
    pub expression_text: String,
    pub location: Location,
    pub scope_id: ScopeId,
    pub caller: SymbolId,
}

/// The typed reference collections of one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct References {
    pub calls: Vec<CallReference>,
    pub member_accesses: Vec<MemberAccessReference>,
    pub assignments: Vec<AssignmentReference>,
    pub returns: Vec<ReturnReference>,
}

/// Extract all reference records from the capture stream.
pub fn extract(
    captures: &[NormalizedCapture<'_>],
    source: &str,
    file: &FilePath,
    scopes: &ScopeTree,
    behavior: &dyn LanguageBehavior,
) -> References {
    let mut refs = References::default();
    let language = behavior.language();

    for capture in captures {
        match (capture.category, capture.entity) {
            (CaptureCategory::Reference, CaptureEntity::Call) => {
                if let Some(call) =
                    extract_call(capture.node, source, file, scopes, behavior, language)
                {
                    refs.calls.push(call);
                }
            }
            (CaptureCategory::Reference, CaptureEntity::Constructor) => {
                if let Some(call) =
                    extract_explicit_constructor(capture.node, source, file, scopes, language)
                {
                    refs.calls.push(CallReference::ConstructorCall(call));
                }
            }
            (CaptureCategory::Reference, CaptureEntity::Member) => {
                if let Some(access) =
                    extract_member_access(capture.node, source, file, scopes, behavior, language)
                {
                    refs.member_accesses.push(access);
                }
            }
            (CaptureCategory::Assignment, _) => {
                if let Some(assign) =
                    extract_assignment(capture.node, source, file, scopes, language)
                {
                    refs.assignments.push(assign);
                }
            }
            (CaptureCategory::Return, _) => {
                refs.returns.push(extract_return(capture.node, source, file, scopes));
            }
            _ => {}
        }
    }

    refs
}

fn caller_at(scopes: &ScopeTree, location: &Location) -> SymbolId {
    scopes
        .enclosing_caller(location)
        .unwrap_or_else(SymbolId::module_sentinel)
}

fn call_arity(node: Node<'_>) -> usize {
    node.child_by_field_name("arguments")
        .map(|args| args.named_child_count())
        .unwrap_or(0)
}

fn argument_names(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(args) = node.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut names = Vec::new();
    let mut cursor = args.walk();
    for child in args.named_children(&mut cursor) {
        if child.kind() == "identifier" {
            names.push(node_text(child, source).to_string());
        }
    }
    names
}

fn has_optional_chain(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| c.kind() == "optional_chain");
    found
}

/// Build the dotted chain for nested member expressions, innermost
/// object first.
fn property_chain(node: Node<'_>, source: &str, language: Language) -> Vec<String> {
    let (object_field, member_field) = member_fields(language, node.kind());
    let mut chain = Vec::new();
    if let Some(object) = node.child_by_field_name(object_field) {
        if member_fields_apply(language, object.kind()) {
            chain = property_chain(object, source, language);
        } else {
            chain.push(node_text(object, source).to_string());
        }
    }
    if let Some(member) = node.child_by_field_name(member_field) {
        chain.push(node_text(member, source).to_string());
    }
    chain
}

fn member_fields(language: Language, kind: &str) -> (&'static str, &'static str) {
    match language {
        Language::Python => match kind {
            "subscript" => ("value", "subscript"),
            _ => ("object", "attribute"),
        },
        Language::Rust => match kind {
            "index_expression" => ("value", "index"),
            _ => ("value", "field"),
        },
        _ => match kind {
            "subscript_expression" => ("object", "index"),
            _ => ("object", "property"),
        },
    }
}

fn member_fields_apply(language: Language, kind: &str) -> bool {
    matches!(
        (language, kind),
        (Language::Python, "attribute")
            | (Language::Rust, "field_expression")
            | (Language::JavaScript | Language::TypeScript, "member_expression")
    )
}

fn is_member_node(language: Language, kind: &str) -> bool {
    match language {
        Language::Python => kind == "attribute" || kind == "subscript",
        Language::Rust => kind == "field_expression" || kind == "index_expression",
        _ => kind == "member_expression" || kind == "subscript_expression",
    }
}

fn is_call_node(language: Language, kind: &str) -> bool {
    match language {
        Language::Python => kind == "call",
        _ => kind == "call_expression",
    }
}

/// Find the variable an expression's value lands in, walking up through
/// the enclosing declaration or assignment.
fn assignment_target(
    node: Node<'_>,
    source: &str,
    file: &FilePath,
    language: Language,
) -> Option<AssignTarget> {
    let mut current = node.parent();
    for _ in 0..3 {
        let parent = current?;
        let name_node = match (language, parent.kind()) {
            (Language::JavaScript | Language::TypeScript, "variable_declarator") => {
                parent.child_by_field_name("name")
            }
            (Language::Rust, "let_declaration") => {
                parent.child_by_field_name("pattern").map(|p| {
                    if p.kind() == "mut_pattern" {
                        p.named_child(0).unwrap_or(p)
                    } else {
                        p
                    }
                })
            }
            (Language::Python, "assignment") => parent.child_by_field_name("left"),
            (_, "assignment_expression") => parent.child_by_field_name("left"),
            _ => None,
        };
        if let Some(name_node) = name_node {
            if name_node.kind() == "identifier" {
                return Some(AssignTarget {
                    name: node_text(name_node, source).to_string(),
                    location: location_of(name_node, file),
                });
            }
            return None;
        }
        current = parent.parent();
    }
    None
}

fn extract_call(
    node: Node<'_>,
    source: &str,
    file: &FilePath,
    scopes: &ScopeTree,
    behavior: &dyn LanguageBehavior,
    language: Language,
) -> Option<CallReference> {
    let mut callee = node.child_by_field_name("function")?;
    // `foo::<T>(x)` wraps the path in a generic_function node.
    if callee.kind() == "generic_function" {
        callee = callee.child_by_field_name("function")?;
    }

    let location = location_of(node, file);
    let scope_id = scopes.find_containing_scope(&location);
    let caller = caller_at(scopes, &location);
    let arity = call_arity(node);

    match callee.kind() {
        "identifier" => {
            let name = node_text(callee, source).to_string();
            if behavior.uppercase_call_is_constructor()
                && name.chars().next().is_some_and(|c| c.is_uppercase())
            {
                return Some(CallReference::ConstructorCall(ConstructorCall {
                    caller,
                    class_name: name,
                    location,
                    scope_id,
                    assigned_to: assignment_target(node, source, file, language),
                    arity,
                }));
            }
            Some(CallReference::FunctionCall(FunctionCall {
                caller,
                callee_name: name,
                location,
                scope_id,
                arity,
                argument_names: argument_names(node, source),
            }))
        }
        "scoped_identifier" => {
            // Rust `path::name(..)`: constructor for `Type::new`, static
            // method for other `Type::method`, plain call otherwise.
            let path = callee.child_by_field_name("path")?;
            let name_node = callee.child_by_field_name("name")?;
            let path_text = node_text(path, source).to_string();
            let name = node_text(name_node, source).to_string();
            let path_is_type = path_text
                .rsplit("::")
                .next()
                .and_then(|s| s.chars().next())
                .is_some_and(|c| c.is_uppercase());

            if path_is_type && name == "new" {
                return Some(CallReference::ConstructorCall(ConstructorCall {
                    caller,
                    class_name: path_text,
                    location,
                    scope_id,
                    assigned_to: assignment_target(node, source, file, language),
                    arity,
                }));
            }
            if path_is_type {
                return Some(CallReference::MethodCall(MethodCall {
                    caller,
                    method_name: name.clone(),
                    location,
                    scope_id,
                    receiver: path_text.clone(),
                    receiver_location: location_of(path, file),
                    receiver_call_name: None,
                    property_chain: vec![path_text, name],
                    is_optional_chain: false,
                    is_static: true,
                    arity,
                    argument_names: argument_names(node, source),
                }));
            }
            Some(CallReference::FunctionCall(FunctionCall {
                caller,
                callee_name: name,
                location,
                scope_id,
                arity,
                argument_names: argument_names(node, source),
            }))
        }
        kind if is_member_node(language, kind) => {
            let (object_field, member_field) = member_fields(language, kind);
            let receiver_node = callee.child_by_field_name(object_field)?;
            let member_node = callee.child_by_field_name(member_field)?;
            let receiver_text = node_text(receiver_node, source).to_string();
            let method_name = node_text(member_node, source).to_string();

            if behavior.is_self_keyword(&receiver_text)
                || (language == Language::Python && receiver_text.starts_with("super("))
            {
                return Some(CallReference::SelfReferenceCall(SelfReferenceCall {
                    caller,
                    keyword: receiver_text,
                    method_name,
                    location,
                    scope_id,
                    arity,
                }));
            }

            let receiver_call_name = if is_call_node(language, receiver_node.kind()) {
                receiver_node
                    .child_by_field_name("function")
                    .filter(|f| f.kind() == "identifier")
                    .map(|f| node_text(f, source).to_string())
            } else {
                None
            };

            Some(CallReference::MethodCall(MethodCall {
                caller,
                method_name,
                location,
                scope_id,
                receiver: receiver_text.clone(),
                receiver_location: location_of(receiver_node, file),
                receiver_call_name,
                property_chain: property_chain(callee, source, language),
                is_optional_chain: has_optional_chain(callee) || has_optional_chain(node),
                is_static: behavior.receiver_is_type_name(&receiver_text),
                arity,
                argument_names: argument_names(node, source),
            }))
        }
        _ => None,
    }
}

/// `new_expression` (JS/TS) and `struct_expression` (Rust).
fn extract_explicit_constructor(
    node: Node<'_>,
    source: &str,
    file: &FilePath,
    scopes: &ScopeTree,
    language: Language,
) -> Option<ConstructorCall> {
    let location = location_of(node, file);
    let scope_id = scopes.find_containing_scope(&location);
    let caller = caller_at(scopes, &location);

    let (class_name, arity) = match node.kind() {
        "new_expression" => {
            let ctor = node.child_by_field_name("constructor")?;
            let name = node_text(ctor, source);
            // `new ns.Class()` keeps only the final segment.
            let name = name.rsplit('.').next().unwrap_or(name).to_string();
            (name, call_arity(node))
        }
        "struct_expression" => {
            let name_node = node.child_by_field_name("name")?;
            let text = node_text(name_node, source);
            let base = text.split('<').next().unwrap_or(text);
            let base = base.rsplit("::").next().unwrap_or(base).to_string();
            let fields = node
                .child_by_field_name("body")
                .map(|b| b.named_child_count())
                .unwrap_or(0);
            (base, fields)
        }
        _ => return None,
    };

    Some(ConstructorCall {
        caller,
        class_name,
        location,
        scope_id,
        assigned_to: assignment_target(node, source, file, language),
        arity,
    })
}

fn extract_member_access(
    node: Node<'_>,
    source: &str,
    file: &FilePath,
    scopes: &ScopeTree,
    behavior: &dyn LanguageBehavior,
    language: Language,
) -> Option<MemberAccessReference> {
    let kind = node.kind();
    let (object_field, member_field) = member_fields(language, kind);
    let member_node = node.child_by_field_name(member_field)?;
    let object_node = node.child_by_field_name(object_field);
    let member_name = node_text(member_node, source).to_string();
    let location = location_of(node, file);
    let scope_id = scopes.find_containing_scope(&location);

    let is_computed = matches!(
        kind,
        "subscript_expression" | "subscript" | "index_expression"
    );
    let followed_by_call = node.parent().is_some_and(|p| {
        is_call_node(language, p.kind())
            && p.child_by_field_name("function")
                .is_some_and(|f| f.id() == node.id())
    });

    let receiver_text = object_node.map(|o| node_text(o, source)).unwrap_or("");

    Some(MemberAccessReference {
        location,
        member_name: member_name.clone(),
        scope_id,
        access_type: classify_access(&member_name, is_computed, followed_by_call),
        object_location: object_node.map(|o| location_of(o, file)),
        property_chain: property_chain(node, source, language),
        is_optional_chain: has_optional_chain(node),
        is_static: behavior.receiver_is_type_name(receiver_text),
    })
}

/// Access-type cascade: explicit computed access → followed-by-call →
/// numeric member name → conservative method-name patterns → property.
pub fn classify_access(member_name: &str, is_computed: bool, followed_by_call: bool) -> AccessType {
    if is_computed {
        return AccessType::Index;
    }
    if followed_by_call {
        return AccessType::Method;
    }
    if !member_name.is_empty() && member_name.bytes().all(|b| b.is_ascii_digit()) {
        return AccessType::Index;
    }
    if looks_like_method_name(member_name) {
        return AccessType::Method;
    }
    AccessType::Property
}

fn looks_like_method_name(name: &str) -> bool {
    for prefix in ["get", "set", "is", "has", "on"] {
        if let Some(rest) = name.strip_prefix(prefix) {
            if rest.chars().next().is_some_and(|c| c.is_uppercase() || c == '_') {
                return true;
            }
        }
    }
    false
}

fn extract_assignment(
    node: Node<'_>,
    source: &str,
    file: &FilePath,
    scopes: &ScopeTree,
    language: Language,
) -> Option<AssignmentReference> {
    let left = node.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let location = location_of(node, file);
    let scope_id = scopes.find_containing_scope(&location);
    let type_annotation = if language == Language::Python {
        node.child_by_field_name("type")
            .map(|t| node_text(t, source).to_string())
    } else {
        None
    };
    Some(AssignmentReference {
        name: node_text(left, source).to_string(),
        target_location: location_of(left, file),
        location,
        scope_id,
        type_annotation,
    })
}

fn extract_return(
    node: Node<'_>,
    source: &str,
    file: &FilePath,
    scopes: &ScopeTree,
) -> ReturnReference {
    let location = location_of(node, file);
    let scope_id = scopes.find_containing_scope(&location);
    let expression_text = node
        .named_child(0)
        .map(|c| node_text(c, source).to_string())
        .unwrap_or_default();
    ReturnReference {
        expression_text,
        caller: caller_at(scopes, &location),
        location,
        scope_id,
    }
}
