pub mod definitions;
pub mod file_index;
pub mod references;
pub mod scope;

pub use definitions::{ClassInfo, ImplBlockInfo, ImportDeclaration, ImportKind, ReExport};
pub use file_index::{index_file, LocalTypeFlow, SemanticIndex};
pub use references::{
    AccessType, CallReference, ConstructorCall, FunctionCall, MemberAccessReference, MethodCall,
    SelfReferenceCall, TypeContext, TypeReference,
};
pub use scope::{LexicalScope, ScopeKind, ScopeTree};
