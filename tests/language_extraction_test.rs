//! Per-language extraction behavior through the public surface: imports,
//! exports, scoping, and the language-specific call shapes.

use semgraph::index::CallReference;
use semgraph::types::ScopeId;
use semgraph::{FilePath, ProjectIndexer, SemanticGraph, SourceFile};

fn index(files: &[(&str, &str)]) -> SemanticGraph {
    let indexer = ProjectIndexer::new().unwrap();
    let sources: Vec<SourceFile> = files
        .iter()
        .map(|(path, content)| SourceFile::new(FilePath::new(*path), *content))
        .collect();
    indexer.index_files(&sources).unwrap()
}

mod javascript {
    use super::*;

    #[test]
    fn arrow_function_variable_is_a_callable_symbol() {
        let graph = index(&[(
            "app.js",
            "const handler = () => { work(); };\nfunction work() {}\n",
        )]);
        let file = FilePath::new("app.js");
        let index = graph.file_index(&file).unwrap();
        let handler = index
            .symbols
            .values()
            .find(|d| d.name == "handler")
            .expect("handler indexed");
        assert_eq!(handler.kind, semgraph::SymbolKind::Function);

        // Calls inside the arrow body attribute to the variable's symbol.
        let call = index.calls.first().expect("work() extracted");
        assert_eq!(call.caller(), &handler.id);
    }

    #[test]
    fn optional_chain_and_property_chain() {
        let graph = index(&[("app.js", "function f(a) { a.b?.c(); }\n")]);
        let index = graph.file_index(&FilePath::new("app.js")).unwrap();
        let site = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::MethodCall(m) => Some(m),
                _ => None,
            })
            .expect("method call");
        assert!(site.is_optional_chain);
        assert_eq!(site.property_chain, vec!["a", "b", "c"]);
        assert_eq!(site.method_name, "c");
    }

    #[test]
    fn member_access_types() {
        let graph = index(&[(
            "app.js",
            "function f(o) {\n  o.name;\n  o[0];\n  o.getValue;\n}\n",
        )]);
        let index = graph.file_index(&FilePath::new("app.js")).unwrap();
        use semgraph::index::AccessType;
        let types: Vec<AccessType> = index.member_accesses.iter().map(|m| m.access_type).collect();
        assert!(types.contains(&AccessType::Property));
        assert!(types.contains(&AccessType::Index));
        assert!(types.contains(&AccessType::Method));
    }

    #[test]
    fn default_import_binds_default_export() {
        let graph = index(&[
            ("lib.js", "export default function boot() {}\n"),
            ("main.js", "import boot from './lib';\nboot();\n"),
        ]);
        let main = FilePath::new("main.js");
        let bound = graph
            .resolve_name(&main, ScopeId::ROOT, "boot")
            .expect("default import resolved");
        assert!(bound.as_str().contains("lib.js"));
    }
}

mod typescript {
    use super::*;

    #[test]
    fn annotation_feeds_method_resolution() {
        let graph = index(&[(
            "app.ts",
            "class Store { load() {} }\nclass Cache { load() {} }\nfunction f() {\n  const s: Store = make();\n  s.load();\n}\nfunction make() { return null; }\n",
        )]);
        let index = graph.file_index(&FilePath::new("app.ts")).unwrap();
        let site = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::MethodCall(m) if m.method_name == "load" => Some(m),
                _ => None,
            })
            .unwrap();
        let resolution = graph.method_calls_at(&site.location).expect("bound");
        assert!(resolution.symbol_id.as_str().contains("Store.load"));
    }

    #[test]
    fn return_type_annotation_resolves_chained_call() {
        let graph = index(&[(
            "app.ts",
            "class Conn { query() {} }\nclass Pool { drain() {} }\nfunction connect(): Conn { return new Conn(); }\nfunction go() { connect().query(); }\n",
        )]);
        let index = graph.file_index(&FilePath::new("app.ts")).unwrap();
        let site = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::MethodCall(m) if m.method_name == "query" => Some(m),
                _ => None,
            })
            .unwrap();
        assert_eq!(site.receiver_call_name.as_deref(), Some("connect"));
        let resolution = graph.method_calls_at(&site.location).expect("bound");
        assert!(resolution.symbol_id.as_str().contains("Conn.query"));
    }

    #[test]
    fn generic_type_arguments_are_referenced() {
        let graph = index(&[(
            "app.ts",
            "class User {}\nconst xs: Array<User> = [];\nfunction load(): Promise<User> { return Promise.resolve(new User()); }\n",
        )]);
        let index = graph.file_index(&FilePath::new("app.ts")).unwrap();
        use semgraph::index::TypeContext;

        let generics: Vec<&str> = index
            .type_references
            .iter()
            .filter(|t| t.context == TypeContext::Generic)
            .map(|t| t.name.as_str())
            .collect();
        // Both the annotation and the return type carry `User` as a
        // generic argument.
        assert!(generics.iter().filter(|n| **n == "User").count() >= 2, "{generics:?}");

        assert!(index
            .type_references
            .iter()
            .any(|t| t.context == TypeContext::Annotation && t.name == "Array"));
        assert!(index
            .type_references
            .iter()
            .any(|t| t.context == TypeContext::Return && t.name == "Promise"));
    }

    #[test]
    fn reexport_chain_binds_through_index_file() {
        let graph = index(&[
            ("src/engine.ts", "export class Engine { start() {} }\n"),
            ("src/index.ts", "export { Engine } from './engine';\n"),
            (
                "src/app.ts",
                "import { Engine } from './index';\nconst e = new Engine();\n",
            ),
        ]);
        let app = FilePath::new("src/app.ts");
        let bound = graph.resolve_name(&app, ScopeId::ROOT, "Engine").unwrap();
        assert!(bound.as_str().contains("engine.ts"));
    }
}

mod python {
    use super::*;

    #[test]
    fn aliased_import_binds_alias() {
        let graph = index(&[
            ("pkg/models.py", "class User:\n    pass\n"),
            (
                "pkg/app.py",
                "from pkg.models import User as Account\n\nu = Account()\n",
            ),
        ]);
        let app = FilePath::new("pkg/app.py");
        let bound = graph
            .resolve_name(&app, ScopeId::ROOT, "Account")
            .expect("alias bound");
        assert!(bound.as_str().contains("models.py"));
    }

    #[test]
    fn method_and_constructor_shapes() {
        let graph = index(&[(
            "app.py",
            "class Queue:\n    def push(self, item):\n        pass\n\ndef run():\n    q = Queue()\n    q.push(1)\n",
        )]);
        let index = graph.file_index(&FilePath::new("app.py")).unwrap();

        let ctor = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::ConstructorCall(ctor) => Some(ctor),
                _ => None,
            })
            .expect("Queue() is a constructor call");
        assert_eq!(ctor.class_name, "Queue");
        assert_eq!(ctor.assigned_to.as_ref().map(|t| t.name.as_str()), Some("q"));

        let site = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::MethodCall(m) => Some(m),
                _ => None,
            })
            .expect("q.push is a method call");
        assert_eq!(site.arity, 1);
        let resolution = graph.method_calls_at(&site.location).expect("bound");
        assert!(resolution.symbol_id.as_str().contains("Queue.push"));
    }

    #[test]
    fn subscripted_annotation_produces_generic_reference() {
        let graph = index(&[(
            "m.py",
            "from typing import List\n\nclass User:\n    pass\n\ndef go():\n    users: List[User] = []\n",
        )]);
        let index = graph.file_index(&FilePath::new("m.py")).unwrap();
        use semgraph::index::TypeContext;
        assert!(index
            .type_references
            .iter()
            .any(|t| t.context == TypeContext::Annotation && t.name == "List"));
        assert!(index
            .type_references
            .iter()
            .any(|t| t.context == TypeContext::Generic && t.name == "User"));
    }

    #[test]
    fn underscore_names_are_private() {
        let graph = index(&[(
            "m.py",
            "def public_fn():\n    pass\n\ndef _hidden():\n    pass\n",
        )]);
        let index = graph.file_index(&FilePath::new("m.py")).unwrap();
        let public = index.symbols.values().find(|d| d.name == "public_fn").unwrap();
        let hidden = index.symbols.values().find(|d| d.name == "_hidden").unwrap();
        assert_eq!(public.visibility, semgraph::Visibility::Public);
        assert_eq!(hidden.visibility, semgraph::Visibility::Private);
    }
}

mod rust {
    use super::*;

    #[test]
    fn static_call_and_struct_literal_are_constructors() {
        let graph = index(&[(
            "lib.rs",
            "struct Point { x: i32 }\nimpl Point {\n    fn new() -> Self { Point { x: 0 } }\n}\nfn main() {\n    let a = Point::new();\n    let b = Point { x: 1 };\n}\n",
        )]);
        let index = graph.file_index(&FilePath::new("lib.rs")).unwrap();
        let ctors: Vec<&semgraph::index::ConstructorCall> = index
            .calls
            .iter()
            .filter_map(|c| match c {
                CallReference::ConstructorCall(ctor) => Some(ctor),
                _ => None,
            })
            .collect();
        assert!(ctors.len() >= 2, "both construction forms extracted");
        assert!(ctors.iter().all(|c| c.class_name == "Point"));
        let assigned: Vec<&str> = ctors
            .iter()
            .filter_map(|c| c.assigned_to.as_ref().map(|t| t.name.as_str()))
            .collect();
        assert!(assigned.contains(&"a"));
        assert!(assigned.contains(&"b"));
    }

    #[test]
    fn use_declarations_resolve_across_modules() {
        let graph = index(&[
            ("src/store.rs", "pub struct Store;\nimpl Store {\n    pub fn open() {}\n}\n"),
            (
                "src/lib.rs",
                "use crate::store::Store;\nfn run() {\n    Store::open();\n}\n",
            ),
        ]);
        let lib = FilePath::new("src/lib.rs");
        let bound = graph
            .resolve_name(&lib, ScopeId::ROOT, "Store")
            .expect("use resolves");
        assert!(bound.as_str().contains("store.rs"));
    }

    #[test]
    fn pub_visibility_is_extracted() {
        let graph = index(&[(
            "lib.rs",
            "pub fn exported() {}\nfn internal() {}\n",
        )]);
        let index = graph.file_index(&FilePath::new("lib.rs")).unwrap();
        let exported = index.symbols.values().find(|d| d.name == "exported").unwrap();
        let internal = index.symbols.values().find(|d| d.name == "internal").unwrap();
        assert_eq!(exported.visibility, semgraph::Visibility::Public);
        assert_eq!(internal.visibility, semgraph::Visibility::Private);
    }

    #[test]
    fn self_method_calls_are_self_references() {
        let graph = index(&[(
            "lib.rs",
            "struct W;\nimpl W {\n    fn a(&self) { self.b(); }\n    fn b(&self) {}\n}\n",
        )]);
        let index = graph.file_index(&FilePath::new("lib.rs")).unwrap();
        let site = index
            .calls
            .iter()
            .find_map(|c| match c {
                CallReference::SelfReferenceCall(s) => Some(s),
                _ => None,
            })
            .expect("self call");
        assert_eq!(site.keyword, "self");
        let resolution = graph.method_calls_at(&site.location).expect("bound");
        assert!(resolution.symbol_id.as_str().contains("W.b"));
    }
}
