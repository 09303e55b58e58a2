pub mod call_chains;
pub mod hierarchy;
pub mod interfaces;

pub use call_chains::{CallChain, CallChainAnalysis, CallChainNode};
pub use hierarchy::{ClassHierarchy, ClassNode};
pub use interfaces::{
    ImplementationMapResult, ImplementationStatistics, InterfaceDefinition,
    InterfaceImplementation, MissingMember,
};
