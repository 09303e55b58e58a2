pub mod imports;
pub mod methods;
pub mod names;

pub use imports::{ExportResolver, ImportEdge, ImportGraph, UnresolvedImport};
pub use methods::{
    GlobalMethodIndex, MethodCandidate, Resolution, ResolutionStrategy, ResolvedCalls,
    UnresolvedSite,
};
pub use names::NameResolutions;
