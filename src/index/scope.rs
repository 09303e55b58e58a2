//! Lexical scope tree for one file.
//!
//! Scopes are arena-allocated and addressed by [`ScopeId`]; the module
//! root is always id 0 and spans the whole file. Scope locations are
//! nested or disjoint, never partially overlapping, so containment lookup
//! can descend one child per level.

use crate::parsing::capture::{name_text, NormalizedCapture};
use crate::parsing::{CaptureCategory, CaptureEntity, LanguageBehavior};
use crate::types::{Location, LocationKey, ScopeId, SymbolId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Module,
    Function,
    Method,
    Constructor,
    Class,
    Block,
}

impl ScopeKind {
    /// Scopes that own a callable symbol and therefore act as the caller
    /// context for references inside them.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            ScopeKind::Function | ScopeKind::Method | ScopeKind::Constructor
        )
    }
}

/// One node of the scope tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalScope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub location: Location,
    pub parent: Option<ScopeId>,
    /// Children ordered by open position.
    pub children: Vec<ScopeId>,
    /// Local symbols keyed by name; a later definition shadows an earlier
    /// one here, though both remain queryable by id.
    pub symbols: HashMap<String, SymbolId>,
    /// The symbol whose definition opened this scope, once known.
    pub owner: Option<SymbolId>,
}

/// Arena of scopes for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<LexicalScope>,
    /// Open-position index for finding the scope a definition opened.
    by_location: HashMap<LocationKey, ScopeId>,
}

impl ScopeTree {
    /// Create a tree containing only the synthetic module root.
    pub fn new(file_span: Location) -> Self {
        let root = LexicalScope {
            id: ScopeId::ROOT,
            kind: ScopeKind::Module,
            location: file_span,
            parent: None,
            children: Vec::new(),
            symbols: HashMap::new(),
            owner: None,
        };
        Self {
            scopes: vec![root],
            by_location: HashMap::new(),
        }
    }

    /// Build the scope tree from a document-ordered capture stream.
    ///
    /// Scope-bearing definitions (functions, methods, classes, impl
    /// blocks, inline modules) open scopes alongside the explicit
    /// `scope.*` captures.
    pub fn build(
        file_span: Location,
        captures: &[NormalizedCapture<'_>],
        source: &str,
        behavior: &dyn LanguageBehavior,
    ) -> Self {
        let mut tree = Self::new(file_span);
        let mut open_stack: Vec<ScopeId> = vec![ScopeId::ROOT];

        for capture in captures {
            if !matches!(
                capture.category,
                CaptureCategory::Scope | CaptureCategory::Definition
            ) {
                continue;
            }
            // Close scopes that no longer contain the current position
            // before deciding what kind of scope (if any) this opens.
            while open_stack.len() > 1 {
                let top = *open_stack.last().expect("stack never empties");
                if tree.scope(top).location.contains(&capture.location) {
                    break;
                }
                open_stack.pop();
            }
            let Some(kind) = scope_kind_for(capture, source, behavior, &tree, &open_stack) else {
                continue;
            };
            let parent = *open_stack.last().expect("root always open");
            let id = tree.push_scope(kind, capture.location.clone(), parent);
            open_stack.push(id);
        }
        tree
    }

    fn push_scope(&mut self, kind: ScopeKind, location: Location, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.by_location.insert(location.key(), id);
        self.scopes.push(LexicalScope {
            id,
            kind,
            location,
            parent: Some(parent),
            children: Vec::new(),
            symbols: HashMap::new(),
            owner: None,
        });
        self.scopes[parent.index()].children.push(id);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &LexicalScope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut LexicalScope {
        &mut self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LexicalScope> {
        self.scopes.iter()
    }

    /// The deepest scope whose span contains the location. Runs in time
    /// proportional to tree depth.
    pub fn find_containing_scope(&self, location: &Location) -> ScopeId {
        let mut current = ScopeId::ROOT;
        'descend: loop {
            for &child in &self.scope(current).children {
                if self.scope(child).location.contains(location) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// The scope a definition's symbol belongs to: the containing scope,
    /// except that a definition which itself opened a scope attaches to
    /// that scope's parent.
    pub fn scope_for_definition(&self, location: &Location) -> ScopeId {
        let containing = self.find_containing_scope(location);
        if self.scope(containing).location == *location {
            self.scope(containing).parent.unwrap_or(ScopeId::ROOT)
        } else {
            containing
        }
    }

    /// The scope opened exactly at this location, if any.
    pub fn scope_opened_at(&self, location: &Location) -> Option<ScopeId> {
        self.by_location.get(&location.key()).copied()
    }

    /// Walk up from `scope` to the nearest function/method/constructor
    /// scope. `None` means file level.
    pub fn nearest_callable_scope(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scope(id).kind.is_callable() {
                return Some(id);
            }
            current = self.scope(id).parent;
        }
        None
    }

    /// Walk up to the nearest class scope, if the location is inside one.
    pub fn enclosing_class_scope(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scope(id).kind == ScopeKind::Class {
                return Some(id);
            }
            current = self.scope(id).parent;
        }
        None
    }

    /// Insert a symbol into a scope's local map. Returns the shadowed id
    /// when the name was already bound in this scope.
    pub fn insert_symbol(
        &mut self,
        scope: ScopeId,
        name: &str,
        id: SymbolId,
    ) -> Option<SymbolId> {
        self.scope_mut(scope).symbols.insert(name.to_string(), id)
    }

    pub fn set_owner(&mut self, scope: ScopeId, owner: SymbolId) {
        self.scope_mut(scope).owner = Some(owner);
    }

    /// The symbol of the nearest enclosing callable, or `None` at file
    /// level (callers record the `<module>` sentinel).
    pub fn enclosing_caller(&self, location: &Location) -> Option<SymbolId> {
        let scope = self.find_containing_scope(location);
        let callable = self.nearest_callable_scope(scope)?;
        self.scope(callable).owner.clone()
    }
}

fn scope_kind_for(
    capture: &NormalizedCapture<'_>,
    source: &str,
    behavior: &dyn LanguageBehavior,
    tree: &ScopeTree,
    open_stack: &[ScopeId],
) -> Option<ScopeKind> {
    match capture.category {
        CaptureCategory::Scope => match capture.entity {
            CaptureEntity::Block => Some(ScopeKind::Block),
            CaptureEntity::Function => Some(ScopeKind::Function),
            _ => None,
        },
        CaptureCategory::Definition => {
            let in_class = open_stack
                .iter()
                .rev()
                .map(|&id| tree.scope(id).kind)
                .find(|k| *k != ScopeKind::Block)
                == Some(ScopeKind::Class);
            match capture.entity {
                CaptureEntity::Function | CaptureEntity::Method => {
                    let name = name_text(capture.node, source);
                    let is_ctor = behavior
                        .constructor_method_name()
                        .is_some_and(|ctor| name == Some(ctor));
                    if is_ctor && (in_class || capture.entity == CaptureEntity::Method) {
                        Some(ScopeKind::Constructor)
                    } else if in_class || capture.entity == CaptureEntity::Method {
                        Some(ScopeKind::Method)
                    } else {
                        Some(ScopeKind::Function)
                    }
                }
                CaptureEntity::Class | CaptureEntity::Interface | CaptureEntity::Impl => {
                    Some(ScopeKind::Class)
                }
                CaptureEntity::Module => Some(ScopeKind::Module),
                _ => None,
            }
        }
        _ => None,
    }
}
