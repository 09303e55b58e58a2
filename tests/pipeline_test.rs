//! End-to-end pipeline scenarios: each one drives the full four-phase
//! pipeline through `ProjectIndexer` and checks the assembled graph.

use semgraph::types::ScopeId;
use semgraph::{CallChain, FilePath, ProjectIndexer, SemanticGraph, SourceFile, SymbolId};

fn index(files: &[(&str, &str)]) -> SemanticGraph {
    let indexer = ProjectIndexer::new().unwrap();
    let sources: Vec<SourceFile> = files
        .iter()
        .map(|(path, content)| SourceFile::new(FilePath::new(*path), *content))
        .collect();
    indexer.index_files(&sources).unwrap()
}

fn chain_names(graph: &SemanticGraph, chain: &CallChain) -> Vec<String> {
    chain
        .symbol_sequence()
        .iter()
        .map(|id| {
            graph
                .symbol(id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| id.as_str().to_string())
        })
        .collect()
}

#[test]
fn linear_chain_main_foo_bar() {
    let graph = index(&[(
        "app.js",
        "function main() { foo(); }\nfunction foo() { bar(); }\nfunction bar() {}\n",
    )]);

    let analysis = graph.call_chain_analysis();
    assert_eq!(analysis.max_chain_depth, 2);
    assert!(analysis.recursive_chains.is_empty());

    let paths: Vec<Vec<String>> = analysis
        .chains
        .iter()
        .map(|c| chain_names(&graph, c))
        .collect();
    assert!(
        paths.iter().any(|p| p == &["main", "foo", "bar"]),
        "expected main → foo → bar, got {paths:?}"
    );

    for chain in &analysis.chains {
        for (i, node) in chain.nodes.iter().enumerate() {
            assert_eq!(node.depth, i + 1);
        }
    }
}

#[test]
fn direct_recursion_factorial() {
    let graph = index(&[(
        "fact.js",
        "function factorial(n) { return factorial(n - 1); }\n",
    )]);

    let analysis = graph.call_chain_analysis();
    assert_eq!(analysis.recursive_chains.len(), 1);

    let chain = &analysis.recursive_chains[0];
    let cycle = chain.cycle_point.as_ref().expect("cycle point recorded");
    assert_eq!(
        graph.symbol(cycle).map(|d| d.name.as_str()),
        Some("factorial")
    );

    let recursive = graph.recursive_functions();
    assert_eq!(recursive.len(), 1);
    assert!(recursive.contains(cycle));
}

#[test]
fn indirect_recursion_is_even_is_odd() {
    let graph = index(&[(
        "parity.js",
        "function isEven(n) { return isOdd(n - 1); }\nfunction isOdd(n) { return isEven(n - 1); }\n",
    )]);

    let analysis = graph.call_chain_analysis();
    let is_even_id = graph
        .definitions_by_file(&FilePath::new("parity.js"))
        .unwrap()
        .values()
        .find(|d| d.name == "isEven")
        .unwrap()
        .id
        .clone();

    let from_even: Vec<&CallChain> = analysis
        .recursive_chains
        .iter()
        .filter(|c| c.entry_point == is_even_id)
        .collect();
    assert_eq!(from_even.len(), 1);
    let chain = from_even[0];
    assert_eq!(chain.cycle_point.as_ref(), Some(&is_even_id));
    assert_eq!(chain.nodes.len(), 2);

    let names: Vec<String> = graph
        .recursive_functions()
        .iter()
        .filter_map(|id| graph.symbol(id).map(|d| d.name.clone()))
        .collect();
    assert!(names.contains(&"isEven".to_string()));
    assert!(names.contains(&"isOdd".to_string()));
}

#[test]
fn unique_method_name_binds_across_classes() {
    let graph = index(&[(
        "app.ts",
        "class User { getName() { return 'u'; } }\nclass Order { place() {} }\nfunction go(x) { x.getName(); }\n",
    )]);

    let file = FilePath::new("app.ts");
    let index = graph.file_index(&file).unwrap();
    let site = index
        .calls
        .iter()
        .find_map(|c| match c {
            semgraph::index::CallReference::MethodCall(m) if m.method_name == "getName" => Some(m),
            _ => None,
        })
        .expect("method call extracted");

    let resolution = graph.method_calls_at(&site.location).expect("bound");
    assert_eq!(resolution.confidence, 1.0);
    assert!(resolution.symbol_id.as_str().contains("User.getName"));
}

#[test]
fn constructor_track_back_disambiguates() {
    let graph = index(&[(
        "app.js",
        "class User { getName() {} }\nclass Admin { getName() {} }\nconst u = new User();\nu.getName();\n",
    )]);

    let file = FilePath::new("app.js");
    let index = graph.file_index(&file).unwrap();
    let site = index
        .calls
        .iter()
        .find_map(|c| match c {
            semgraph::index::CallReference::MethodCall(m) => Some(m),
            _ => None,
        })
        .expect("method call extracted");

    let resolution = graph.method_calls_at(&site.location).expect("bound");
    assert!(
        resolution.confidence >= 0.9,
        "constructor strategy confidence: {}",
        resolution.confidence
    );
    assert!(resolution.symbol_id.as_str().contains("User.getName"));
}

#[test]
fn interface_completeness_vehicle_car() {
    let graph = index(&[(
        "app.ts",
        "interface Vehicle {\n  start(): void;\n  stop(): void;\n  speed: number;\n}\nclass Car implements Vehicle {\n  speed = 0;\n  start() {}\n}\n",
    )]);

    let implementations = graph.interface_implementations();
    let car_impls = implementations.implementations_of("Vehicle");
    assert_eq!(car_impls.len(), 1);
    let car = &car_impls[0];
    assert!(!car.is_complete);
    assert!(car
        .missing_members
        .iter()
        .any(|m| matches!(m, semgraph::analysis::MissingMember::Method(name) if name == "stop")));
    assert_eq!(implementations.statistics.total_interfaces, 1);
}

#[test]
fn empty_input_empty_graph() {
    let graph = index(&[]);
    assert_eq!(graph.statistics().files, 0);
    assert!(graph.call_chains(None).is_empty());
    assert!(graph.recursive_functions().is_empty());
    assert!(graph.class_hierarchy().is_empty());
}

#[test]
fn empty_file_indexes_without_errors() {
    let graph = index(&[("empty.py", "")]);
    assert_eq!(graph.statistics().files, 1);
    assert_eq!(graph.statistics().symbols, 0);
    assert!(graph.skipped_files().is_empty());
}

#[test]
fn max_depth_zero_disables_chains() {
    let mut settings = semgraph::Settings::default();
    settings.indexing.max_call_depth = 0;
    let indexer = ProjectIndexer::with_settings(settings).unwrap();
    let graph = indexer
        .index_files(&[SourceFile::new(
            FilePath::new("a.js"),
            "function f() { g(); }\nfunction g() {}\n",
        )])
        .unwrap();
    assert!(graph.call_chains(None).is_empty());
    assert_eq!(graph.call_chain_analysis().max_chain_depth, 0);
}

#[test]
fn module_level_calls_use_sentinel_caller() {
    let graph = index(&[("top.py", "def helper():\n    pass\n\nhelper()\n")]);
    let file = FilePath::new("top.py");
    let index = graph.file_index(&file).unwrap();
    let call = index.calls.first().expect("module-level call extracted");
    assert!(call.caller().is_module_sentinel());
}

#[test]
fn cross_file_resolution_through_imports() {
    let graph = index(&[
        (
            "src/user.ts",
            "export class User {\n  getName() { return 'u'; }\n}\n",
        ),
        (
            "src/main.ts",
            "import { User } from './user';\nconst u = new User();\nu.getName();\n",
        ),
    ]);

    let main = FilePath::new("src/main.ts");
    let bound = graph
        .resolve_name(&main, ScopeId::ROOT, "User")
        .expect("import resolved");
    assert!(bound.as_str().contains("user.ts"));

    let index = graph.file_index(&main).unwrap();
    let ctor = index
        .calls
        .iter()
        .find_map(|c| match c {
            semgraph::index::CallReference::ConstructorCall(ctor) => Some(ctor),
            _ => None,
        })
        .unwrap();
    let resolution = graph.constructor_calls_at(&ctor.location).expect("bound");
    assert!(resolution.symbol_id.as_str().contains("user.ts"));
}

#[test]
fn exports_round_trip_and_dot() {
    let graph = index(&[(
        "loop.js",
        "function ping() { pong(); }\nfunction pong() { ping(); }\n",
    )]);

    let json = graph.to_json().unwrap();
    let parsed = semgraph::CallChainAnalysis::from_json(&json).unwrap();
    assert_eq!(parsed.recursive_chains, graph.call_chain_analysis().recursive_chains);
    assert_eq!(parsed.max_chain_depth, graph.call_chain_analysis().max_chain_depth);

    let dot = graph.to_dot();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("shape=box"));
    assert!(dot.contains("color=red"));
}

#[test]
fn unresolved_sites_are_data_not_errors() {
    let graph = index(&[(
        "app.js",
        "import { helper } from 'external-pkg';\nfunction go(x) { x.mystery(); }\n",
    )]);
    assert_eq!(graph.unresolved_imports().len(), 1);
    assert!(graph.unresolved_calls().iter().any(|u| u.name == "mystery"));
    assert!(graph.skipped_files().is_empty());
}

#[test]
fn every_caller_id_has_a_definition_or_sentinel() {
    let graph = index(&[
        (
            "a.py",
            "class Task:\n    def run(self):\n        self.done()\n    def done(self):\n        pass\n\ndef main():\n    t = Task()\n    t.run()\n\nmain()\n",
        ),
        ("b.rs", "struct S;\nimpl S {\n    fn go(&self) {}\n}\nfn main() {\n    let s = S;\n    s.go();\n}\n"),
    ]);

    for file in [FilePath::new("a.py"), FilePath::new("b.rs")] {
        let index = graph.file_index(&file).unwrap();
        for call in &index.calls {
            let caller = call.caller();
            assert!(
                caller.is_module_sentinel() || index.symbol(caller).is_some(),
                "caller {caller} has no definition in {file}"
            );
        }
    }
}

#[test]
fn same_name_sites_do_not_collide_across_files() {
    let graph = index(&[
        ("x.js", "class A { run() {} }\nconst a = new A();\na.run();\n"),
        ("y.js", "class B { run() {} }\nconst b = new B();\nb.run();\n"),
    ]);

    let x_index = graph.file_index(&FilePath::new("x.js")).unwrap();
    let y_index = graph.file_index(&FilePath::new("y.js")).unwrap();
    let x_site = x_index
        .calls
        .iter()
        .find_map(|c| match c {
            semgraph::index::CallReference::MethodCall(m) => Some(m),
            _ => None,
        })
        .unwrap();
    let y_site = y_index
        .calls
        .iter()
        .find_map(|c| match c {
            semgraph::index::CallReference::MethodCall(m) => Some(m),
            _ => None,
        })
        .unwrap();

    let x_res = graph.method_calls_at(&x_site.location).unwrap();
    let y_res = graph.method_calls_at(&y_site.location).unwrap();
    assert!(x_res.symbol_id.as_str().contains("A.run"));
    assert!(y_res.symbol_id.as_str().contains("B.run"));
}

#[test]
fn recursive_chain_cycle_point_appears_twice() {
    let graph = index(&[(
        "cycle.js",
        "function a() { b(); }\nfunction b() { c(); }\nfunction c() { a(); }\n",
    )]);
    for chain in &graph.call_chain_analysis().recursive_chains {
        let cycle = chain.cycle_point.as_ref().unwrap();
        let occurrences = chain
            .symbol_sequence()
            .iter()
            .filter(|s| ***s == *cycle)
            .count();
        assert!(
            occurrences >= 2,
            "cycle point must appear at least twice in {:?}",
            chain
        );
    }
}

#[test]
fn scope_ids_and_symbol_scopes_are_consistent() {
    let graph = index(&[(
        "nested.ts",
        "function outer() {\n  function inner() {\n    const x = 1;\n  }\n}\n",
    )]);
    let file = FilePath::new("nested.ts");
    let index = graph.file_index(&file).unwrap();
    for def in index.symbols.values() {
        let scope = index.scopes.scope(def.scope_id);
        assert!(
            scope.location.contains(&def.location),
            "scope of {} must contain its location",
            def.name
        );
    }
    for scope in index.scopes.iter().skip(1) {
        assert!(scope.parent.is_some());
    }
}

fn _assert_send_sync<T: Send + Sync>() {}

#[test]
fn graph_is_shareable_across_threads() {
    _assert_send_sync::<SemanticGraph>();
    _assert_send_sync::<SymbolId>();
}
