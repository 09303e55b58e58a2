//! Interface / trait / protocol implementation tracking.
//!
//! Driven by per-language configuration records rather than subclassing:
//! each config names how interfaces are declared and how implementation
//! is indicated (an `implements` keyword, membership of known protocol
//! bases, or impl blocks). Language-specific enhancement hooks run after
//! the generic extraction: TypeScript declaration merging, Python
//! `@runtime_checkable` / `ABCMeta.register` / abstract methods, Rust
//! default methods, supertraits, and negative-impl filtering.

use crate::index::definitions::{ClassInfo, ClassRecordKind};
use crate::index::file_index::SemanticIndex;
use crate::index::references::CallReference;
use crate::parsing::Language;
use crate::types::{FilePath, Location, SymbolId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// How a language marks a type as implementing an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationIndicator {
    /// `class C implements I`.
    Keyword,
    /// Deriving from a known protocol/ABC base.
    BaseClass,
    /// `impl Trait for Type`.
    ImplBlock,
}

/// Per-language tracker configuration. Adding a language means adding a
/// config (and optionally a hook), not changing the pipeline.
#[derive(Debug, Clone)]
pub struct LanguageInterfaceConfig {
    pub language: Language,
    pub indicator: ImplementationIndicator,
    /// Base names that turn a plain class into a protocol definition.
    pub protocol_bases: &'static [&'static str],
    pub abstract_decorator: Option<&'static str>,
}

/// The configuration set for all supported languages.
pub fn language_configs() -> Vec<LanguageInterfaceConfig> {
    vec![
        LanguageInterfaceConfig {
            language: Language::JavaScript,
            indicator: ImplementationIndicator::Keyword,
            protocol_bases: &[],
            abstract_decorator: None,
        },
        LanguageInterfaceConfig {
            language: Language::TypeScript,
            indicator: ImplementationIndicator::Keyword,
            protocol_bases: &[],
            abstract_decorator: None,
        },
        LanguageInterfaceConfig {
            language: Language::Python,
            indicator: ImplementationIndicator::BaseClass,
            protocol_bases: &["Protocol", "ABC", "ABCMeta"],
            abstract_decorator: Some("abstractmethod"),
        },
        LanguageInterfaceConfig {
            language: Language::Rust,
            indicator: ImplementationIndicator::ImplBlock,
            protocol_bases: &[],
            abstract_decorator: None,
        },
    ]
}

/// A required method on an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub arity: usize,
}

/// A unified interface / trait / protocol definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDefinition {
    pub name: String,
    pub location: Location,
    pub language: Language,
    pub file: FilePath,
    pub required_methods: Vec<MethodSignature>,
    pub required_properties: Vec<String>,
    /// Members with default implementations; absent members here do not
    /// make an implementation incomplete.
    pub optional_methods: Vec<String>,
    pub extends_interfaces: Vec<String>,
    pub generic_params: Vec<String>,
    pub associated_types: Vec<String>,
    pub associated_consts: Vec<String>,
    pub index_signatures: usize,
    pub construct_signatures: usize,
    pub is_runtime_checkable: bool,
}

/// What kind of member is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMember {
    Method(String),
    Property(String),
}

/// One implementor matched against one interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceImplementation {
    pub implementor: SymbolId,
    pub implementor_name: String,
    pub interface_name: String,
    /// Implemented required members with their definition sites.
    pub implemented_methods: BTreeMap<String, Location>,
    pub missing_members: Vec<MissingMember>,
    pub is_complete: bool,
    /// Registered via `ABCMeta.register(...)` instead of declared.
    pub is_synthetic: bool,
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplementationStatistics {
    pub total_interfaces: usize,
    pub total_implementations: usize,
    pub complete_implementations: usize,
    pub coverage_percent: f32,
}

/// The frozen tracker output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImplementationMapResult {
    pub interfaces_by_name: IndexMap<String, InterfaceDefinition>,
    pub implementations_by_interface: IndexMap<String, Vec<InterfaceImplementation>>,
    pub interfaces_by_class: IndexMap<String, Vec<String>>,
    pub incomplete_implementations: Vec<InterfaceImplementation>,
    pub statistics: ImplementationStatistics,
}

impl ImplementationMapResult {
    pub fn build(indexes: &IndexMap<FilePath, SemanticIndex>) -> Self {
        let configs = language_configs();
        let mut result = ImplementationMapResult::default();

        // 1. Interface definitions across all files.
        for (path, index) in indexes {
            let Some(config) = configs.iter().find(|c| c.language == index.language) else {
                continue;
            };
            for class in &index.classes {
                if let Some(interface) = extract_interface(class, config, path) {
                    merge_interface(&mut result.interfaces_by_name, interface);
                }
            }
        }

        // 2–4. Implementors, required sets, member matching.
        for (path, index) in indexes {
            let Some(config) = configs.iter().find(|c| c.language == index.language) else {
                continue;
            };
            match config.indicator {
                ImplementationIndicator::Keyword => {
                    for class in &index.classes {
                        for interface_name in &class.interfaces {
                            result.record(match_class(
                                class,
                                interface_name,
                                &result.interfaces_by_name,
                            ));
                        }
                    }
                }
                ImplementationIndicator::BaseClass => {
                    for class in &index.classes {
                        if is_protocol_class(class, config) {
                            continue;
                        }
                        for base in &class.bases {
                            if result.interfaces_by_name.contains_key(base) {
                                result.record(match_class(
                                    class,
                                    base,
                                    &result.interfaces_by_name,
                                ));
                            }
                        }
                    }
                }
                ImplementationIndicator::ImplBlock => {
                    for impl_block in &index.impls {
                        // Negative impls opt out of a trait.
                        if impl_block.is_negative {
                            continue;
                        }
                        let Some(trait_name) = &impl_block.trait_name else {
                            continue;
                        };
                        let implementor = index
                            .class_named(&impl_block.type_name)
                            .map(|c| c.symbol_id.clone())
                            .unwrap_or_else(|| SymbolId::unresolved(&impl_block.type_name));
                        let methods: BTreeMap<String, Location> = impl_block
                            .methods
                            .iter()
                            .map(|m| (m.name.clone(), m.location.clone()))
                            .collect();
                        result.record(match_members(
                            implementor,
                            impl_block.type_name.clone(),
                            trait_name,
                            &methods,
                            &BTreeSet::new(),
                            impl_block.location.clone(),
                            false,
                            &result.interfaces_by_name,
                        ));
                    }
                }
            }

            // Python hook: `SomeABC.register(SomeClass)` produces a
            // synthetic, complete implementation.
            if index.language == Language::Python {
                for call in &index.calls {
                    let CallReference::MethodCall(site) = call else {
                        continue;
                    };
                    if site.method_name != "register" {
                        continue;
                    }
                    if !result.interfaces_by_name.contains_key(&site.receiver) {
                        continue;
                    }
                    let Some(class_name) = site.argument_names.first() else {
                        continue;
                    };
                    let implementor = indexes
                        .values()
                        .find_map(|i| i.class_named(class_name))
                        .map(|c| c.symbol_id.clone())
                        .unwrap_or_else(|| SymbolId::unresolved(class_name));
                    result.record(Some(InterfaceImplementation {
                        implementor,
                        implementor_name: class_name.clone(),
                        interface_name: site.receiver.clone(),
                        implemented_methods: BTreeMap::new(),
                        missing_members: Vec::new(),
                        is_complete: true,
                        is_synthetic: true,
                        location: site.location.clone(),
                    }));
                }
            }
        }

        result.finish();
        result
    }

    fn record(&mut self, implementation: Option<InterfaceImplementation>) {
        let Some(implementation) = implementation else {
            return;
        };
        self.interfaces_by_class
            .entry(implementation.implementor_name.clone())
            .or_default()
            .push(implementation.interface_name.clone());
        if !implementation.is_complete {
            self.incomplete_implementations.push(implementation.clone());
        }
        self.implementations_by_interface
            .entry(implementation.interface_name.clone())
            .or_default()
            .push(implementation);
    }

    fn finish(&mut self) {
        let total_implementations: usize =
            self.implementations_by_interface.values().map(Vec::len).sum();
        let complete = total_implementations - self.incomplete_implementations.len();
        self.statistics = ImplementationStatistics {
            total_interfaces: self.interfaces_by_name.len(),
            total_implementations,
            complete_implementations: complete,
            coverage_percent: if total_implementations == 0 {
                0.0
            } else {
                complete as f32 / total_implementations as f32 * 100.0
            },
        };
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceDefinition> {
        self.interfaces_by_name.get(name)
    }

    pub fn implementations_of(&self, interface: &str) -> &[InterfaceImplementation] {
        self.implementations_by_interface
            .get(interface)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

fn is_protocol_class(class: &ClassInfo, config: &LanguageInterfaceConfig) -> bool {
    class
        .bases
        .iter()
        .any(|b| config.protocol_bases.contains(&b.as_str()))
        || class
            .metaclass
            .as_deref()
            .is_some_and(|m| config.protocol_bases.contains(&m))
}

/// Turn a class-shaped record into an interface definition when the
/// config says it is one.
fn extract_interface(
    class: &ClassInfo,
    config: &LanguageInterfaceConfig,
    path: &FilePath,
) -> Option<InterfaceDefinition> {
    let is_interface = match config.language {
        Language::Python => is_protocol_class(class, config),
        _ => class.kind == ClassRecordKind::Interface,
    };
    if !is_interface {
        return None;
    }

    let mut required_methods = Vec::new();
    let mut optional_methods = Vec::new();
    let is_abc = (config.language == Language::Python
        && class.bases.iter().any(|b| b == "ABC" || b == "ABCMeta"))
        || class.metaclass.as_deref() == Some("ABCMeta");

    for method in &class.methods {
        let required = match config.language {
            // Rust: default bodies make a method optional.
            Language::Rust => !method.has_body,
            // Python ABCs require only abstract methods; protocols
            // require everything declared.
            Language::Python => {
                if is_abc {
                    config
                        .abstract_decorator
                        .is_some_and(|d| method.decorators.iter().any(|m| m == d))
                } else {
                    true
                }
            }
            _ => true,
        };
        if required {
            required_methods.push(MethodSignature {
                name: method.name.clone(),
                arity: method.arity,
            });
        } else {
            optional_methods.push(method.name.clone());
        }
    }

    // Interface parents, minus the protocol machinery itself.
    let extends_interfaces: Vec<String> = class
        .bases
        .iter()
        .filter(|b| !config.protocol_bases.contains(&b.as_str()))
        .filter(|b| b.as_str() != "Generic")
        .cloned()
        .collect();

    Some(InterfaceDefinition {
        name: class.name.clone(),
        location: class.location.clone(),
        language: config.language,
        file: path.clone(),
        required_methods,
        required_properties: class
            .properties
            .iter()
            .filter(|p| !p.is_optional)
            .map(|p| p.name.clone())
            .collect(),
        optional_methods,
        extends_interfaces,
        generic_params: class.generic_params.clone(),
        associated_types: class.associated_types.clone(),
        associated_consts: class.associated_consts.clone(),
        index_signatures: class.index_signatures,
        construct_signatures: class.construct_signatures,
        is_runtime_checkable: class
            .decorators
            .iter()
            .any(|d| d == "runtime_checkable"),
    })
}

/// TypeScript declaration merging: interfaces sharing a name combine
/// their members.
fn merge_interface(
    interfaces: &mut IndexMap<String, InterfaceDefinition>,
    interface: InterfaceDefinition,
) {
    match interfaces.get_mut(&interface.name) {
        None => {
            interfaces.insert(interface.name.clone(), interface);
        }
        Some(existing) => {
            for method in interface.required_methods {
                if !existing.required_methods.iter().any(|m| m.name == method.name) {
                    existing.required_methods.push(method);
                }
            }
            for property in interface.required_properties {
                if !existing.required_properties.contains(&property) {
                    existing.required_properties.push(property);
                }
            }
            for optional in interface.optional_methods {
                if !existing.optional_methods.contains(&optional) {
                    existing.optional_methods.push(optional);
                }
            }
            for parent in interface.extends_interfaces {
                if !existing.extends_interfaces.contains(&parent) {
                    existing.extends_interfaces.push(parent);
                }
            }
            existing.index_signatures += interface.index_signatures;
            existing.construct_signatures += interface.construct_signatures;
        }
    }
}

/// Required members of an interface including inherited parents.
fn required_members(
    name: &str,
    interfaces: &IndexMap<String, InterfaceDefinition>,
    seen: &mut HashSet<String>,
) -> (Vec<MethodSignature>, Vec<String>, Vec<String>) {
    if !seen.insert(name.to_string()) {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    let Some(interface) = interfaces.get(name) else {
        return (Vec::new(), Vec::new(), Vec::new());
    };
    let mut methods = interface.required_methods.clone();
    let mut properties = interface.required_properties.clone();
    let mut optional = interface.optional_methods.clone();
    for parent in &interface.extends_interfaces {
        let (parent_methods, parent_properties, parent_optional) =
            required_members(parent, interfaces, seen);
        for method in parent_methods {
            if !methods.iter().any(|m| m.name == method.name) {
                methods.push(method);
            }
        }
        for property in parent_properties {
            if !properties.contains(&property) {
                properties.push(property);
            }
        }
        for name in parent_optional {
            if !optional.contains(&name) {
                optional.push(name);
            }
        }
    }
    (methods, properties, optional)
}

fn match_class(
    class: &ClassInfo,
    interface_name: &str,
    interfaces: &IndexMap<String, InterfaceDefinition>,
) -> Option<InterfaceImplementation> {
    let methods: BTreeMap<String, Location> = class
        .methods
        .iter()
        .map(|m| (m.name.clone(), m.location.clone()))
        .collect();
    let properties: BTreeSet<String> =
        class.properties.iter().map(|p| p.name.clone()).collect();
    match_members(
        class.symbol_id.clone(),
        class.name.clone(),
        interface_name,
        &methods,
        &properties,
        class.location.clone(),
        false,
        interfaces,
    )
}

#[allow(clippy::too_many_arguments)]
fn match_members(
    implementor: SymbolId,
    implementor_name: String,
    interface_name: &str,
    methods: &BTreeMap<String, Location>,
    properties: &BTreeSet<String>,
    location: Location,
    is_synthetic: bool,
    interfaces: &IndexMap<String, InterfaceDefinition>,
) -> Option<InterfaceImplementation> {
    let (required_methods, required_properties, optional) =
        required_members(interface_name, interfaces, &mut HashSet::new());

    let mut implemented = BTreeMap::new();
    let mut missing = Vec::new();
    for signature in &required_methods {
        match methods.get(&signature.name) {
            Some(site) => {
                implemented.insert(signature.name.clone(), site.clone());
            }
            None if optional.contains(&signature.name) => {}
            None => missing.push(MissingMember::Method(signature.name.clone())),
        }
    }
    for property in &required_properties {
        if !properties.contains(property) && !methods.contains_key(property) {
            missing.push(MissingMember::Property(property.clone()));
        }
    }

    Some(InterfaceImplementation {
        implementor,
        implementor_name,
        interface_name: interface_name.to_string(),
        implemented_methods: implemented,
        is_complete: missing.is_empty(),
        missing_members: missing,
        is_synthetic,
        location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::file_index::index_file;
    use crate::parsing::parser::QuerySet;

    fn build(files: &[(&str, Language, &str)]) -> ImplementationMapResult {
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
        ImplementationMapResult::build(&indexes)
    }

    #[test]
    fn incomplete_ts_implementation_reports_missing_members() {
        let result = build(&[(
            "app.ts",
            Language::TypeScript,
            "interface Vehicle {\n  start(): void;\n  stop(): void;\n  speed: number;\n}\nclass Car implements Vehicle {\n  speed = 0;\n  start() {}\n}\n",
        )]);
        let vehicle = result.interface("Vehicle").expect("interface extracted");
        assert_eq!(vehicle.required_methods.len(), 2);
        assert_eq!(vehicle.required_properties, vec!["speed"]);

        let impls = result.implementations_of("Vehicle");
        assert_eq!(impls.len(), 1);
        let car = &impls[0];
        assert!(!car.is_complete);
        assert_eq!(
            car.missing_members,
            vec![MissingMember::Method("stop".to_string())]
        );
        assert!(car.implemented_methods.contains_key("start"));
        assert_eq!(result.statistics.complete_implementations, 0);
    }

    #[test]
    fn rust_default_methods_are_optional() {
        let result = build(&[(
            "lib.rs",
            Language::Rust,
            "trait Greet {\n    fn name(&self) -> String;\n    fn greet(&self) -> String { format!(\"hi {}\", self.name()) }\n}\nstruct Person;\nimpl Greet for Person {\n    fn name(&self) -> String { String::new() }\n}\n",
        )]);
        let greet = result.interface("Greet").unwrap();
        assert_eq!(greet.required_methods.len(), 1);
        assert_eq!(greet.optional_methods, vec!["greet"]);

        let impls = result.implementations_of("Greet");
        assert_eq!(impls.len(), 1);
        assert!(impls[0].is_complete, "{:?}", impls[0].missing_members);
    }

    #[test]
    fn negative_impls_are_filtered() {
        let result = build(&[(
            "lib.rs",
            Language::Rust,
            "trait Marker {}\nstruct Plain;\nimpl !Marker for Plain {}\n",
        )]);
        assert!(result.implementations_of("Marker").is_empty());
    }

    #[test]
    fn python_protocol_and_abc() {
        let result = build(&[(
            "app.py",
            Language::Python,
            "from abc import ABC, abstractmethod\n\nclass Saver(ABC):\n    @abstractmethod\n    def save(self):\n        pass\n    def helper(self):\n        pass\n\nclass DiskSaver(Saver):\n    def save(self):\n        pass\n",
        )]);
        let saver = result.interface("Saver").expect("ABC is an interface");
        assert_eq!(saver.required_methods.len(), 1);
        assert_eq!(saver.required_methods[0].name, "save");

        let impls = result.implementations_of("Saver");
        assert_eq!(impls.len(), 1);
        assert!(impls[0].is_complete);
    }

    #[test]
    fn python_register_creates_synthetic_implementation() {
        let result = build(&[(
            "app.py",
            Language::Python,
            "from abc import ABC\n\nclass Port(ABC):\n    pass\n\nclass Adapter:\n    pass\n\nPort.register(Adapter)\n",
        )]);
        let impls = result.implementations_of("Port");
        assert_eq!(impls.len(), 1);
        assert!(impls[0].is_synthetic);
        assert!(impls[0].is_complete);
        assert_eq!(impls[0].implementor_name, "Adapter");
    }

    #[test]
    fn ts_declaration_merging_combines_members() {
        let result = build(&[(
            "app.ts",
            Language::TypeScript,
            "interface Box { open(): void; }\ninterface Box { close(): void; }\n",
        )]);
        let merged = result.interface("Box").unwrap();
        let names: Vec<&str> = merged.required_methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["open", "close"]);
        assert_eq!(result.statistics.total_interfaces, 1);
    }

    #[test]
    fn interface_inheritance_extends_required_set() {
        let result = build(&[(
            "app.ts",
            Language::TypeScript,
            "interface Base { id(): string; }\ninterface Derived extends Base { run(): void; }\nclass Impl implements Derived { run() {} }\n",
        )]);
        let impls = result.implementations_of("Derived");
        assert_eq!(impls.len(), 1);
        assert!(!impls[0].is_complete);
        assert_eq!(
            impls[0].missing_members,
            vec![MissingMember::Method("id".to_string())]
        );
    }
}
