//! Phase 3: call-chain derivation.
//!
//! Builds an adjacency map over resolved (and name-keyed unresolved)
//! calls, then walks it depth-first from every root with branch-local
//! visited sets. Chains are bounded by `max_depth`; cycles become
//! recursive-chain records carrying their `cycle_point`.

use crate::index::file_index::SemanticIndex;
use crate::index::references::CallReference;
use crate::resolve::methods::ResolvedCalls;
use crate::resolve::names::NameResolutions;
use crate::types::{FilePath, Location, SymbolId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

/// One step of a chain. `depth` starts at 1 for the first callee under
/// the entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallChainNode {
    pub symbol_id: SymbolId,
    /// Definition location when the callee is resolved.
    pub location: Option<Location>,
    pub depth: usize,
    pub is_recursive: bool,
}

/// An ordered path from an entry point to a leaf callee or a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallChain {
    pub entry_point: SymbolId,
    /// Callees along the path; the entry point is not repeated here.
    pub nodes: Vec<CallChainNode>,
    pub depth: usize,
    pub has_recursion: bool,
    pub cycle_point: Option<SymbolId>,
}

impl CallChain {
    /// The full symbol sequence including the entry point.
    pub fn symbol_sequence(&self) -> Vec<&SymbolId> {
        std::iter::once(&self.entry_point)
            .chain(self.nodes.iter().map(|n| &n.symbol_id))
            .collect()
    }
}

/// The frozen result of phase 3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallChainAnalysis {
    /// `caller → callees`, deterministic order.
    adjacency: IndexMap<SymbolId, BTreeSet<SymbolId>>,
    /// Definition locations for resolved callees.
    locations: HashMap<SymbolId, Location>,
    pub chains: Vec<CallChain>,
    pub recursive_chains: Vec<CallChain>,
    pub max_chain_depth: usize,
    max_depth: usize,
}

impl CallChainAnalysis {
    /// Build the graph and run the traversal.
    pub fn analyze(
        indexes: &IndexMap<FilePath, SemanticIndex>,
        resolutions: &NameResolutions,
        resolved: &ResolvedCalls,
        max_depth: usize,
    ) -> Self {
        let mut analysis = CallChainAnalysis {
            max_depth,
            ..Default::default()
        };
        analysis.build_graph(indexes, resolutions, resolved);
        analysis.traverse();
        analysis
    }

    fn build_graph(
        &mut self,
        indexes: &IndexMap<FilePath, SemanticIndex>,
        resolutions: &NameResolutions,
        resolved: &ResolvedCalls,
    ) {
        for (path, index) in indexes {
            for def in index.symbols.values() {
                self.locations
                    .entry(def.id.clone())
                    .or_insert_with(|| def.location.clone());
            }
            for call in &index.calls {
                let (source, target) = match call {
                    CallReference::FunctionCall(site) => {
                        let target = resolutions
                            .resolve(path, site.scope_id, &site.callee_name)
                            .cloned()
                            .unwrap_or_else(|| SymbolId::unresolved(&site.callee_name));
                        (site.caller.clone(), target)
                    }
                    CallReference::MethodCall(site) => {
                        let target = resolved
                            .method_call_at(&site.location.key())
                            .map(|r| r.symbol_id.clone())
                            .unwrap_or_else(|| SymbolId::unresolved(&site.method_name));
                        (site.caller.clone(), target)
                    }
                    CallReference::SelfReferenceCall(site) => {
                        let target = resolved
                            .method_call_at(&site.location.key())
                            .map(|r| r.symbol_id.clone())
                            .unwrap_or_else(|| SymbolId::unresolved(&site.method_name));
                        (site.caller.clone(), target)
                    }
                    CallReference::ConstructorCall(site) => {
                        let target = resolved
                            .constructor_call_at(&site.location.key())
                            .map(|r| r.symbol_id.clone())
                            .unwrap_or_else(|| SymbolId::unresolved(&site.class_name));
                        // An assigned construction hangs off the variable
                        // when it resolves, else off the enclosing caller.
                        let source = site
                            .assigned_to
                            .as_ref()
                            .and_then(|t| {
                                resolutions.resolve(path, site.scope_id, &t.name).cloned()
                            })
                            .unwrap_or_else(|| site.caller.clone());
                        (source, target)
                    }
                };
                self.adjacency.entry(source).or_default().insert(target);
            }
        }
    }

    fn traverse(&mut self) {
        let callees: HashSet<&SymbolId> = self.adjacency.values().flatten().collect();
        let mut roots: Vec<SymbolId> = self
            .adjacency
            .keys()
            .filter(|caller| !callees.contains(caller))
            .cloned()
            .collect();
        if roots.is_empty() {
            // Fully-cyclic graph: every caller is a root.
            roots = self.adjacency.keys().cloned().collect();
        }

        let mut chains = Vec::new();
        let mut recursive = Vec::new();
        for root in roots {
            self.walk(&root, &root, 0, &HashSet::new(), &[], &mut chains, &mut recursive);
        }

        self.max_chain_depth = chains
            .iter()
            .chain(recursive.iter())
            .map(|c| c.depth)
            .max()
            .unwrap_or(0);
        self.chains = chains;
        self.recursive_chains = recursive;
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        entry: &SymbolId,
        current: &SymbolId,
        depth: usize,
        visited: &HashSet<SymbolId>,
        path: &[CallChainNode],
        chains: &mut Vec<CallChain>,
        recursive: &mut Vec<CallChain>,
    ) {
        if depth == self.max_depth {
            save_chain(entry, path, None, chains);
            return;
        }
        if visited.contains(current) {
            save_chain(entry, path, Some(current.clone()), recursive);
            return;
        }
        let Some(callees) = self.adjacency.get(current).filter(|c| !c.is_empty()) else {
            save_chain(entry, path, None, chains);
            return;
        };

        for callee in callees {
            // Branch-local copies: sibling branches never see each
            // other's visits.
            let mut branch_visited = visited.clone();
            branch_visited.insert(current.clone());
            let mut branch_path = path.to_vec();
            branch_path.push(CallChainNode {
                symbol_id: callee.clone(),
                location: self.locations.get(callee).cloned(),
                depth: depth + 1,
                is_recursive: branch_visited.contains(callee),
            });
            self.walk(
                entry,
                callee,
                depth + 1,
                &branch_visited,
                &branch_path,
                chains,
                recursive,
            );
        }
    }

    pub fn adjacency(&self) -> &IndexMap<SymbolId, BTreeSet<SymbolId>> {
        &self.adjacency
    }

    /// Chains filtered to an entry point.
    pub fn chains_from(&self, root: &SymbolId) -> Vec<&CallChain> {
        self.chains
            .iter()
            .chain(self.recursive_chains.iter())
            .filter(|c| &c.entry_point == root)
            .collect()
    }

    /// Chains where any node repeats.
    pub fn detect_recursion(&self) -> Vec<&CallChain> {
        self.recursive_chains.iter().collect()
    }

    /// Every function inside any recursive chain's cycle region: from the
    /// first occurrence of the cycle point onward.
    pub fn get_recursive_functions(&self) -> BTreeSet<SymbolId> {
        let mut out = BTreeSet::new();
        for chain in &self.recursive_chains {
            let Some(cycle_point) = &chain.cycle_point else {
                continue;
            };
            let sequence = chain.symbol_sequence();
            if let Some(start) = sequence.iter().position(|s| *s == cycle_point) {
                for symbol in &sequence[start..] {
                    out.insert((*symbol).clone());
                }
            }
        }
        out
    }

    pub fn get_longest_chain(&self) -> Option<&CallChain> {
        self.chains
            .iter()
            .chain(self.recursive_chains.iter())
            .max_by_key(|c| c.depth)
    }

    /// All simple paths from `start` to `end`, bounded by `max_depth`.
    pub fn find_paths_between(
        &self,
        start: &SymbolId,
        end: &SymbolId,
        max_depth: usize,
    ) -> Vec<Vec<SymbolId>> {
        let mut paths = Vec::new();
        let mut current = vec![start.clone()];
        let mut visited = HashSet::new();
        visited.insert(start.clone());
        self.paths_dfs(start, end, max_depth, &mut visited, &mut current, &mut paths);
        paths
    }

    fn paths_dfs(
        &self,
        current: &SymbolId,
        end: &SymbolId,
        remaining: usize,
        visited: &mut HashSet<SymbolId>,
        path: &mut Vec<SymbolId>,
        paths: &mut Vec<Vec<SymbolId>>,
    ) {
        if current == end && path.len() > 1 {
            paths.push(path.clone());
            return;
        }
        if remaining == 0 {
            return;
        }
        let Some(callees) = self.adjacency.get(current) else {
            return;
        };
        for callee in callees {
            if callee != end && visited.contains(callee) {
                continue;
            }
            visited.insert(callee.clone());
            path.push(callee.clone());
            self.paths_dfs(callee, end, remaining - 1, visited, path, paths);
            path.pop();
            visited.remove(callee);
        }
    }

    /// Graphviz DOT rendering: box nodes, bold red edges inside cycle
    /// regions, orange edges entering one.
    pub fn to_dot(&self) -> String {
        let recursive = self.get_recursive_functions();
        let mut cycle_edges: HashSet<(SymbolId, SymbolId)> = HashSet::new();
        for chain in &self.recursive_chains {
            let sequence = chain.symbol_sequence();
            let Some(cycle_point) = &chain.cycle_point else {
                continue;
            };
            if let Some(start) = sequence.iter().position(|s| *s == cycle_point) {
                for pair in sequence[start..].windows(2) {
                    cycle_edges.insert((pair[0].clone(), pair[1].clone()));
                }
            }
        }

        let mut dot = String::from("digraph call_chains {\n    node [shape=box];\n");
        for (caller, callees) in &self.adjacency {
            for callee in callees {
                let style = if cycle_edges.contains(&(caller.clone(), callee.clone())) {
                    " [style=bold, color=red]"
                } else if recursive.contains(caller) || recursive.contains(callee) {
                    " [color=orange]"
                } else {
                    ""
                };
                let _ = writeln!(
                    dot,
                    "    \"{}\" -> \"{}\"{style};",
                    escape_dot(caller.as_str()),
                    escape_dot(callee.as_str())
                );
            }
        }
        dot.push_str("}\n");
        dot
    }

    /// JSON rendering with the adjacency reified as `{caller, callees}`
    /// pairs. Parsing it back preserves all chain and recursion fields.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonGraph::from(self))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let graph: JsonGraph = serde_json::from_str(json)?;
        Ok(graph.into())
    }
}

fn save_chain(
    entry: &SymbolId,
    path: &[CallChainNode],
    cycle_point: Option<SymbolId>,
    out: &mut Vec<CallChain>,
) {
    // Chains are non-empty by definition.
    if path.is_empty() {
        return;
    }
    let mut nodes = path.to_vec();
    let has_recursion = cycle_point.is_some();
    if has_recursion {
        if let Some(last) = nodes.last_mut() {
            last.is_recursive = true;
        }
    }
    out.push(CallChain {
        entry_point: entry.clone(),
        depth: nodes.last().map(|n| n.depth).unwrap_or(0),
        nodes,
        has_recursion,
        cycle_point,
    });
}

fn escape_dot(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Serialized form of the analysis.
#[derive(Debug, Serialize, Deserialize)]
struct JsonGraph {
    graph: Vec<GraphEntry>,
    chains: Vec<CallChain>,
    recursive_chains: Vec<CallChain>,
    max_chain_depth: usize,
    max_depth: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphEntry {
    caller: SymbolId,
    callees: Vec<SymbolId>,
}

impl From<&CallChainAnalysis> for JsonGraph {
    fn from(analysis: &CallChainAnalysis) -> Self {
        Self {
            graph: analysis
                .adjacency
                .iter()
                .map(|(caller, callees)| GraphEntry {
                    caller: caller.clone(),
                    callees: callees.iter().cloned().collect(),
                })
                .collect(),
            chains: analysis.chains.clone(),
            recursive_chains: analysis.recursive_chains.clone(),
            max_chain_depth: analysis.max_chain_depth,
            max_depth: analysis.max_depth,
        }
    }
}

impl From<JsonGraph> for CallChainAnalysis {
    fn from(graph: JsonGraph) -> Self {
        Self {
            adjacency: graph
                .graph
                .into_iter()
                .map(|entry| (entry.caller, entry.callees.into_iter().collect()))
                .collect(),
            locations: HashMap::new(),
            chains: graph.chains,
            recursive_chains: graph.recursive_chains,
            max_chain_depth: graph.max_chain_depth,
            max_depth: graph.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis_from_edges(edges: &[(&str, &str)], max_depth: usize) -> CallChainAnalysis {
        let mut analysis = CallChainAnalysis {
            max_depth,
            ..Default::default()
        };
        for (caller, callee) in edges {
            analysis
                .adjacency
                .entry(SymbolId::unresolved(caller))
                .or_default()
                .insert(SymbolId::unresolved(callee));
        }
        analysis.traverse();
        analysis
    }

    fn sym(name: &str) -> SymbolId {
        SymbolId::unresolved(name)
    }

    #[test]
    fn linear_chain() {
        let analysis = analysis_from_edges(&[("main", "foo"), ("foo", "bar")], 10);
        assert_eq!(analysis.max_chain_depth, 2);
        assert!(analysis.recursive_chains.is_empty());
        assert_eq!(analysis.chains.len(), 1);
        let chain = &analysis.chains[0];
        assert_eq!(chain.entry_point, sym("main"));
        let names: Vec<&str> = chain.nodes.iter().map(|n| n.symbol_id.as_str()).collect();
        assert_eq!(names, vec!["?:foo", "?:bar"]);
        for (i, node) in chain.nodes.iter().enumerate() {
            assert_eq!(node.depth, i + 1);
        }
    }

    #[test]
    fn direct_recursion() {
        let analysis = analysis_from_edges(&[("factorial", "factorial")], 10);
        assert_eq!(analysis.recursive_chains.len(), 1);
        let chain = &analysis.recursive_chains[0];
        assert_eq!(chain.cycle_point, Some(sym("factorial")));
        let recursive = analysis.get_recursive_functions();
        assert_eq!(recursive.len(), 1);
        assert!(recursive.contains(&sym("factorial")));
    }

    #[test]
    fn indirect_recursion() {
        let analysis = analysis_from_edges(&[("isEven", "isOdd"), ("isOdd", "isEven")], 10);
        let from_even: Vec<&CallChain> = analysis
            .recursive_chains
            .iter()
            .filter(|c| c.entry_point == sym("isEven"))
            .collect();
        assert_eq!(from_even.len(), 1);
        let chain = from_even[0];
        assert_eq!(chain.cycle_point, Some(sym("isEven")));
        assert_eq!(chain.nodes.len(), 2);

        let recursive = analysis.get_recursive_functions();
        assert!(recursive.contains(&sym("isEven")));
        assert!(recursive.contains(&sym("isOdd")));
    }

    #[test]
    fn zero_max_depth_yields_no_chains() {
        let analysis = analysis_from_edges(&[("a", "b")], 0);
        assert!(analysis.chains.is_empty());
        assert!(analysis.recursive_chains.is_empty());
        assert_eq!(analysis.max_chain_depth, 0);
    }

    #[test]
    fn depth_bound_truncates() {
        let analysis = analysis_from_edges(&[("a", "b"), ("b", "c"), ("c", "d")], 2);
        assert_eq!(analysis.max_chain_depth, 2);
        let longest = analysis.get_longest_chain().unwrap();
        assert_eq!(longest.nodes.len(), 2);
    }

    #[test]
    fn branching_produces_one_chain_per_leaf() {
        let analysis = analysis_from_edges(&[("main", "a"), ("main", "b"), ("a", "leaf")], 10);
        assert_eq!(analysis.chains.len(), 2);
        // Sibling branches carry independent visited sets.
        assert!(analysis.recursive_chains.is_empty());
    }

    #[test]
    fn paths_between_enumerates_simple_paths() {
        let analysis =
            analysis_from_edges(&[("a", "b"), ("b", "d"), ("a", "c"), ("c", "d")], 10);
        let paths = analysis.find_paths_between(&sym("a"), &sym("d"), 10);
        assert_eq!(paths.len(), 2);
        for path in &paths {
            assert_eq!(path.first(), Some(&sym("a")));
            assert_eq!(path.last(), Some(&sym("d")));
        }
    }

    #[test]
    fn json_round_trip_preserves_chains() {
        let analysis = analysis_from_edges(&[("isEven", "isOdd"), ("isOdd", "isEven")], 10);
        let json = analysis.to_json().unwrap();
        let parsed = CallChainAnalysis::from_json(&json).unwrap();
        assert_eq!(parsed.chains, analysis.chains);
        assert_eq!(parsed.recursive_chains, analysis.recursive_chains);
        assert_eq!(parsed.max_chain_depth, analysis.max_chain_depth);
        assert_eq!(parsed.adjacency, analysis.adjacency);
    }

    #[test]
    fn dot_styles_recursive_edges() {
        let analysis = analysis_from_edges(&[("f", "f"), ("g", "f")], 10);
        let dot = analysis.to_dot();
        assert!(dot.contains("shape=box"));
        assert!(dot.contains("style=bold, color=red"));
        assert!(dot.contains("color=orange"));
    }
}
