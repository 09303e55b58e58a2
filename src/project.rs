//! Project-level orchestration.
//!
//! [`ProjectIndexer`] drives the four phases over an already-enumerated
//! set of source files: per-file indexing (parallel), name resolution,
//! reference resolution (after the global-method-index barrier), and
//! structural analysis. The result is a frozen [`SemanticGraph`];
//! cancellation between files and phases never exposes a partial graph.

use crate::analysis::call_chains::{CallChain, CallChainAnalysis};
use crate::analysis::hierarchy::ClassHierarchy;
use crate::analysis::interfaces::ImplementationMapResult;
use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::index::file_index::{index_file, SemanticIndex};
use crate::parsing::parser::QuerySet;
use crate::parsing::Language;
use crate::resolve::imports::{ExportResolver, ImportGraph, UnresolvedImport};
use crate::resolve::methods::{
    resolve_calls, GlobalMethodIndex, Resolution, ResolvedCalls, UnresolvedSite,
};
use crate::resolve::names::{resolve_project, NameResolutions};
use crate::symbol::SymbolDefinition;
use crate::types::{FilePath, Location, LocationKey, ScopeId, SymbolId};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One input file: a canonical path, its content, and an optional
/// explicit language tag (detected from the extension otherwise).
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: FilePath,
    pub content: String,
    pub language: Option<Language>,
}

impl SourceFile {
    pub fn new(path: impl Into<FilePath>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }
}

/// Cooperative cancellation, consulted between files and phases.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn check(&self) -> IndexResult<()> {
        if self.is_cancelled() {
            Err(IndexError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A file skipped with a recoverable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: FilePath,
    pub reason: String,
}

/// Per-language and total counts over the final graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub files: usize,
    pub symbols: usize,
    pub references: usize,
    pub files_by_language: IndexMap<String, usize>,
}

/// Drives the pipeline. Compiling the query set validates every bundled
/// capture pattern, so construction fails fast on a corrupted install.
pub struct ProjectIndexer {
    settings: Settings,
    queries: QuerySet,
    cancel: CancellationToken,
}

impl ProjectIndexer {
    pub fn new() -> IndexResult<Self> {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> IndexResult<Self> {
        let queries = QuerySet::compile()?;
        Ok(Self {
            settings,
            queries,
            cancel: CancellationToken::new(),
        })
    }

    /// A token callers can use to cancel a running indexing pass.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the full pipeline over the given files.
    pub fn index_files(&self, files: &[SourceFile]) -> IndexResult<SemanticGraph> {
        self.index_with_previous(files, None)
    }

    /// Like [`index_files`](Self::index_files), but reuses per-file
    /// indexes from a previous graph for files whose content hash is
    /// unchanged.
    pub fn index_files_incremental(
        &self,
        files: &[SourceFile],
        previous: &SemanticGraph,
    ) -> IndexResult<SemanticGraph> {
        self.index_with_previous(files, Some(previous))
    }

    fn index_with_previous(
        &self,
        files: &[SourceFile],
        previous: Option<&SemanticGraph>,
    ) -> IndexResult<SemanticGraph> {
        self.cancel.check()?;

        // Phase 0–1: per-file indexing, embarrassingly parallel.
        let outcomes: Vec<IndexResult<FileOutcome>> = files
            .par_iter()
            .map(|file| self.index_one(file, previous))
            .collect();

        let mut indexes: IndexMap<FilePath, SemanticIndex> = IndexMap::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome? {
                FileOutcome::Indexed(index) => {
                    indexes.insert(index.file.clone(), *index);
                }
                FileOutcome::Skipped(skip) => {
                    warn!(file = %skip.path, reason = %skip.reason, "skipping file");
                    skipped.push(skip);
                }
            }
        }
        self.cancel.check()?;

        debug!(files = indexes.len(), "per-file indexing complete");
        let imports = ImportGraph::build(&indexes);
        self.cancel.check()?;

        // Phase 1: lexical name resolution with export chains.
        let resolutions = {
            let exports = ExportResolver::new(
                &indexes,
                self.settings.indexing.max_export_chain_depth,
                self.settings.indexing.follow_reexports,
            );
            resolve_project(&indexes, &imports, &exports)
        };
        self.cancel.check()?;

        // Phase 2: the global method index is the barrier; resolution
        // runs per site afterwards.
        let global_methods = GlobalMethodIndex::build(&indexes);
        let resolved_calls = resolve_calls(
            &indexes,
            &resolutions,
            &global_methods,
            &self.settings.indexing,
        );
        self.cancel.check()?;

        // Phase 3 and the structural maps.
        let call_chains = CallChainAnalysis::analyze(
            &indexes,
            &resolutions,
            &resolved_calls,
            self.settings.indexing.max_call_depth,
        );
        self.cancel.check()?;
        let hierarchy = ClassHierarchy::build(&indexes, &resolutions);
        let interfaces = ImplementationMapResult::build(&indexes);

        let statistics = compute_statistics(&indexes);
        info!(
            files = statistics.files,
            symbols = statistics.symbols,
            references = statistics.references,
            "semantic graph assembled"
        );

        Ok(SemanticGraph {
            indexes,
            imports,
            resolutions,
            resolved_calls,
            call_chains,
            hierarchy,
            interfaces,
            skipped,
            statistics,
        })
    }

    fn index_one(
        &self,
        file: &SourceFile,
        previous: Option<&SemanticGraph>,
    ) -> IndexResult<FileOutcome> {
        self.cancel.check()?;

        let language = match file.language.or_else(|| Language::from_path(file.path.as_str())) {
            Some(language) => language,
            None => {
                return Ok(FileOutcome::Skipped(SkippedFile {
                    path: file.path.clone(),
                    reason: IndexError::UnsupportedLanguage {
                        language: file
                            .path
                            .extension()
                            .unwrap_or("unknown")
                            .to_string(),
                    }
                    .to_string(),
                }));
            }
        };
        if !self.settings.language_enabled(language.config_key()) {
            return Ok(FileOutcome::Skipped(SkippedFile {
                path: file.path.clone(),
                reason: format!("language {language} disabled by configuration"),
            }));
        }

        // Unchanged content reuses the previous write-once index.
        if let Some(previous) = previous {
            if let Some(old) = previous.indexes.get(&file.path) {
                let hash = {
                    use sha2::{Digest, Sha256};
                    let mut hasher = Sha256::new();
                    hasher.update(file.content.as_bytes());
                    format!("{:x}", hasher.finalize())
                };
                if old.content_hash == hash {
                    debug!(file = %file.path, "content unchanged; reusing index");
                    return Ok(FileOutcome::Indexed(Box::new(old.clone())));
                }
            }
        }

        match index_file(file.path.clone(), &file.content, language, &self.queries) {
            Ok(index) => Ok(FileOutcome::Indexed(Box::new(index))),
            Err(err) if !err.is_project_fatal() => Ok(FileOutcome::Skipped(SkippedFile {
                path: file.path.clone(),
                reason: err.to_string(),
            })),
            Err(err) => Err(err),
        }
    }
}

enum FileOutcome {
    Indexed(Box<SemanticIndex>),
    Skipped(SkippedFile),
}

fn compute_statistics(indexes: &IndexMap<FilePath, SemanticIndex>) -> GraphStatistics {
    let mut statistics = GraphStatistics {
        files: indexes.len(),
        ..Default::default()
    };
    for index in indexes.values() {
        statistics.symbols += index.symbols.len();
        statistics.references += index.calls.len()
            + index.member_accesses.len()
            + index.assignments.len()
            + index.returns.len()
            + index.type_references.len();
        *statistics
            .files_by_language
            .entry(index.language.config_key().to_string())
            .or_insert(0) += 1;
    }
    statistics
}

/// The assembled, immutable semantic graph.
#[derive(Debug, Clone)]
pub struct SemanticGraph {
    indexes: IndexMap<FilePath, SemanticIndex>,
    imports: ImportGraph,
    resolutions: NameResolutions,
    resolved_calls: ResolvedCalls,
    call_chains: CallChainAnalysis,
    hierarchy: ClassHierarchy,
    interfaces: ImplementationMapResult,
    skipped: Vec<SkippedFile>,
    statistics: GraphStatistics,
}

impl SemanticGraph {
    pub fn file_index(&self, file: &FilePath) -> Option<&SemanticIndex> {
        self.indexes.get(file)
    }

    pub fn files(&self) -> impl Iterator<Item = &FilePath> {
        self.indexes.keys()
    }

    /// All definitions of a file, in extraction order.
    pub fn definitions_by_file(
        &self,
        file: &FilePath,
    ) -> Option<&IndexMap<SymbolId, SymbolDefinition>> {
        self.indexes.get(file).map(|i| &i.symbols)
    }

    /// Look up a definition across all files.
    pub fn symbol(&self, id: &SymbolId) -> Option<&SymbolDefinition> {
        self.indexes.values().find_map(|i| i.symbol(id))
    }

    /// Phase-1 binding of a name visible at a scope.
    pub fn resolve_name(&self, file: &FilePath, scope: ScopeId, name: &str) -> Option<&SymbolId> {
        self.resolutions.resolve(file, scope, name)
    }

    /// Phase-2 binding of a method call site.
    pub fn method_calls_at(&self, location: &Location) -> Option<&Resolution> {
        self.resolved_calls.method_call_at(&location.key())
    }

    pub fn method_call_at_key(&self, key: &LocationKey) -> Option<&Resolution> {
        self.resolved_calls.method_call_at(key)
    }

    /// Phase-2 binding of a constructor site.
    pub fn constructor_calls_at(&self, location: &Location) -> Option<&Resolution> {
        self.resolved_calls.constructor_call_at(&location.key())
    }

    /// Every site that binds to a method.
    pub fn calls_to_method(&self, id: &SymbolId) -> &[Location] {
        self.resolved_calls
            .calls_to_method
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Derived call chains, optionally filtered by entry point.
    pub fn call_chains(&self, root: Option<&SymbolId>) -> Vec<&CallChain> {
        match root {
            Some(root) => self.call_chains.chains_from(root),
            None => self
                .call_chains
                .chains
                .iter()
                .chain(self.call_chains.recursive_chains.iter())
                .collect(),
        }
    }

    pub fn call_chain_analysis(&self) -> &CallChainAnalysis {
        &self.call_chains
    }

    pub fn recursive_functions(&self) -> BTreeSet<SymbolId> {
        self.call_chains.get_recursive_functions()
    }

    pub fn class_hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    pub fn interface_implementations(&self) -> &ImplementationMapResult {
        &self.interfaces
    }

    pub fn import_graph(&self) -> &ImportGraph {
        &self.imports
    }

    pub fn unresolved_imports(&self) -> &[UnresolvedImport] {
        self.imports.unresolved_imports()
    }

    pub fn unresolved_calls(&self) -> &[UnresolvedSite] {
        &self.resolved_calls.unresolved
    }

    pub fn skipped_files(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn statistics(&self) -> &GraphStatistics {
        &self.statistics
    }

    /// Graphviz DOT rendering of the call graph.
    pub fn to_dot(&self) -> String {
        self.call_chains.to_dot()
    }

    /// JSON rendering of the call-chain data.
    pub fn to_json(&self) -> serde_json::Result<String> {
        self.call_chains.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexer() -> ProjectIndexer {
        ProjectIndexer::new().unwrap()
    }

    #[test]
    fn unknown_extension_is_skipped_not_fatal() {
        let graph = indexer()
            .index_files(&[
                SourceFile::new(FilePath::new("notes.txt"), "hello"),
                SourceFile::new(FilePath::new("ok.js"), "function a() {}"),
            ])
            .unwrap();
        assert_eq!(graph.skipped_files().len(), 1);
        assert_eq!(graph.statistics().files, 1);
    }

    #[test]
    fn explicit_language_tag_overrides_extension() {
        let graph = indexer()
            .index_files(&[SourceFile::new(FilePath::new("script"), "def f():\n    pass\n")
                .with_language(Language::Python)])
            .unwrap();
        assert_eq!(graph.statistics().files, 1);
        assert_eq!(graph.statistics().symbols, 1);
    }

    #[test]
    fn cancelled_token_yields_no_graph() {
        let indexer = indexer();
        indexer.cancellation_token().cancel();
        let result = indexer.index_files(&[SourceFile::new(
            FilePath::new("a.js"),
            "function a() {}",
        )]);
        assert!(matches!(result, Err(IndexError::Cancelled)));
    }

    #[test]
    fn incremental_reuse_preserves_ids() {
        let indexer = indexer();
        let files = [SourceFile::new(
            FilePath::new("a.js"),
            "function a() { b(); }\nfunction b() {}\n",
        )];
        let first = indexer.index_files(&files).unwrap();
        let second = indexer.index_files_incremental(&files, &first).unwrap();
        let file = FilePath::new("a.js");
        assert_eq!(
            first.definitions_by_file(&file).unwrap().keys().collect::<Vec<_>>(),
            second.definitions_by_file(&file).unwrap().keys().collect::<Vec<_>>(),
        );
    }

    #[test]
    fn statistics_count_by_language() {
        let graph = indexer()
            .index_files(&[
                SourceFile::new(FilePath::new("a.py"), "def f():\n    pass\n"),
                SourceFile::new(FilePath::new("b.py"), "def g():\n    pass\n"),
                SourceFile::new(FilePath::new("c.rs"), "fn h() {}\n"),
            ])
            .unwrap();
        assert_eq!(graph.statistics().files_by_language["python"], 2);
        assert_eq!(graph.statistics().files_by_language["rust"], 1);
    }
}
