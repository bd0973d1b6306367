#![forbid(unsafe_code)]

pub mod error;
pub mod graph;
pub mod order;
pub mod solve;
pub mod tiered;
pub mod types;

pub use error::ResolverError;
pub use graph::{build_graph, Graph, GraphInput, VersionNode};
pub use order::linearize;
pub use solve::solve;
pub use tiered::{resolve_with_preservation, TierContext};
pub use types::{FixedKind, FixedNode, PreserveLevel, RootRequirement, Solution, StdlibNode};
