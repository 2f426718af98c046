//! # tspack-graph
//!
//! Module registry and dependency graph for the tspack bundler.
//!
//! This crate owns everything that can be decided without looking inside a
//! syntax tree:
//!
//! - [`Module`] / [`ModuleId`]: a registered source file and its canonical path
//! - [`Resolver`]: specifier → path resolution (extension inference,
//!   `node_modules` lookup, externals)
//! - [`DependencyGraph`]: forward/reverse edge sets, topological order, cycle
//!   detection, connected components, the optimizer and JSON persistence
//! - [`Runtime`]: the file-access abstraction shared by every tspack crate
//!
//! Work that needs a parser (measuring a module, merging two modules into one
//! printed file) is delegated to a [`ModuleSyntax`] implementation passed in by
//! the caller. `tspack-gen` provides the oxc-backed one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tspack_graph::{DependencyGraph, Module, ModuleId, ResolveOptions, Resolver, VirtualRuntime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = VirtualRuntime::new("/proj")
//!     .file("/proj/a.ts", "import { b } from './b';")
//!     .file("/proj/b.ts", "export const b = 1;");
//! let graph = DependencyGraph::with_resolver(Resolver::new(
//!     Arc::new(runtime),
//!     ResolveOptions::default(),
//! ));
//!
//! graph.update_module(Module::new(ModuleId::new("/proj/b.ts")?, "export const b = 1;", vec![]))?;
//! graph.update_module(Module::new(
//!     ModuleId::new("/proj/a.ts")?,
//!     "import { b } from './b';",
//!     vec!["./b".into()],
//! ))?;
//!
//! assert!(!graph.has_cycle());
//! let order = graph.topological_order();
//! assert_eq!(order.last().map(|id| id.path_string().into_owned()), Some("/proj/a.ts".into()));
//! # Ok(())
//! # }
//! ```

pub mod module;
pub mod module_id;
pub mod resolver;
pub mod runtime;
pub mod syntax;

mod memory;

pub use memory::{DependencyGraph, ModuleLoader, OptimizeReport};
pub use module::{Module, ModuleBuilder};
pub use module_id::{ModuleId, ModuleIdError};
pub use resolver::{ResolveOptions, Resolver, SourceExtension};
pub use syntax::{MergeRequest, ModuleSyntax};

pub use runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult, VirtualRuntime};

#[cfg(not(target_family = "wasm"))]
pub use runtime::native::NativeRuntime;

/// Insertion-ordered map keyed with the Fx hasher.
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, rustc_hash::FxBuildHasher>;

/// Insertion-ordered set keyed with the Fx hasher.
pub type FxIndexSet<T> = indexmap::IndexSet<T, rustc_hash::FxBuildHasher>;

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A specifier matched no file.
    #[error("Cannot resolve '{specifier}' imported from {importer}")]
    UnresolvedModule { specifier: String, importer: String },

    /// The module loader could not produce a module.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// The graph contains a cycle where none is allowed.
    #[error("Circular dependency: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// A path is referenced but was never registered.
    #[error("Module {path} (referenced by {referenced_by}) is not registered")]
    MissingModule { path: String, referenced_by: String },

    /// Persisted graph could not be read or written.
    #[error("Graph serialization error: {0}")]
    Serialization(String),

    /// File access failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The syntax service failed to measure or merge a module.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<ModuleIdError> for Error {
    fn from(err: ModuleIdError) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
