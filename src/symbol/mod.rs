//! Symbol definitions and their modifier flags.

use crate::types::{Location, ScopeId, SymbolId, SymbolKind, Visibility};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Language-specific modifiers attached to a definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[repr(transparent)]
    pub struct SymbolModifiers: u16 {
        const STATIC    = 1 << 0;
        const ASYNC     = 1 << 1;
        const ABSTRACT  = 1 << 2;
        const EXPORTED  = 1 << 3;
        const OPTIONAL  = 1 << 4;
        const GENERATOR = 1 << 5;
        const CONST     = 1 << 6;
        /// `var`-style declarations that bind in the nearest function
        /// scope during resolution.
        const HOISTED   = 1 << 7;
    }
}

impl Default for SymbolModifiers {
    fn default() -> Self {
        Self::empty()
    }
}

/// A symbol definition extracted from one file.
///
/// The id is content-addressed (see [`SymbolId::derive`]); `scope_id`
/// refers to the scope that lexically contains the definition's location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    pub scope_id: ScopeId,
    pub visibility: Visibility,
    pub modifiers: SymbolModifiers,
    /// Owning class for methods, constructors, and fields.
    pub class_name: Option<String>,
    /// Declared or annotated return type, when the language surface has one.
    pub return_type: Option<String>,
    /// Declared parameter count for callable kinds.
    pub arity: Option<usize>,
}

impl SymbolDefinition {
    pub fn new(name: impl Into<String>, kind: SymbolKind, location: Location) -> Self {
        let name = name.into();
        let id = SymbolId::derive(kind, &name, None, &location);
        Self {
            id,
            name,
            kind,
            location,
            scope_id: ScopeId::ROOT,
            visibility: Visibility::default(),
            modifiers: SymbolModifiers::empty(),
            class_name: None,
            return_type: None,
            arity: None,
        }
    }

    /// Attach the owning class; re-derives the id so it stays
    /// content-addressed.
    pub fn in_class(mut self, class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        self.id = SymbolId::derive(self.kind, &self.name, Some(&class_name), &self.location);
        self.class_name = Some(class_name);
        self
    }

    pub fn with_scope(mut self, scope_id: ScopeId) -> Self {
        self.scope_id = scope_id;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_modifiers(mut self, modifiers: SymbolModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn is_exported(&self) -> bool {
        self.modifiers.contains(SymbolModifiers::EXPORTED) || self.visibility == Visibility::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FilePath;

    fn location() -> Location {
        Location::new(FilePath::new("src/user.ts"), 4, 2, 8, 3)
    }

    #[test]
    fn builder_sets_fields() {
        let def = SymbolDefinition::new("getName", SymbolKind::Method, location())
            .in_class("User")
            .with_scope(ScopeId(3))
            .with_visibility(Visibility::Public)
            .with_modifiers(SymbolModifiers::ASYNC)
            .with_return_type("string")
            .with_arity(0);

        assert_eq!(def.name, "getName");
        assert_eq!(def.class_name.as_deref(), Some("User"));
        assert_eq!(def.scope_id, ScopeId(3));
        assert!(def.modifiers.contains(SymbolModifiers::ASYNC));
        assert_eq!(def.return_type.as_deref(), Some("string"));
        assert_eq!(def.arity, Some(0));
        assert!(def.is_exported());
    }

    #[test]
    fn in_class_rederives_id() {
        let plain = SymbolDefinition::new("getName", SymbolKind::Method, location());
        let owned = SymbolDefinition::new("getName", SymbolKind::Method, location()).in_class("User");
        assert_ne!(plain.id, owned.id);
        assert!(owned.id.as_str().contains("User.getName"));
    }

    #[test]
    fn identical_source_identical_id() {
        let a = SymbolDefinition::new("run", SymbolKind::Function, location());
        let b = SymbolDefinition::new("run", SymbolKind::Function, location());
        assert_eq!(a.id, b.id);
    }
}
