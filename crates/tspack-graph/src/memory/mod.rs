//! In-memory DependencyGraph implementation.
//!
//! Modules live in an insertion-ordered map keyed by path and edges are kept
//! as path sets, so cycles are plain data rather than aliasing references.

mod construction;
mod graph;
mod mutations;
mod optimize;
mod queries;
mod serialization;
mod traversal;

pub use construction::ModuleLoader;
pub use graph::DependencyGraph;
pub use optimize::OptimizeReport;

// These wildcard imports are intentional - they add impl blocks to DependencyGraph
#[allow(unused_imports)]
use mutations::*;
#[allow(unused_imports)]
use queries::*;
#[allow(unused_imports)]
use serialization::*;
#[allow(unused_imports)]
use traversal::*;
