//! Syntax capability used by the optimizer.
//!
//! The graph never parses code itself. Measuring a module and printing two
//! modules as one are requested through [`ModuleSyntax`], which callers pass
//! explicitly to [`DependencyGraph::optimize_graph`](crate::DependencyGraph::optimize_graph).

use rustc_hash::FxHashMap;

use crate::{Module, Result};

/// Everything needed to print `source` into `target`.
#[derive(Debug, Clone, Copy)]
pub struct MergeRequest<'a> {
    /// The sole dependent; its statements are printed first.
    pub target: &'a Module,
    /// The absorbed module; its statements follow the target's.
    pub source: &'a Module,
    /// Specifiers in `target` that pointed at `source`. Imports and
    /// re-exports through them are rebound to the source's declarations.
    pub dropped_specifiers: &'a [String],
    /// Rewrites for `source` specifiers that were relative to its own
    /// directory (specifier → absolute path).
    pub relocations: &'a FxHashMap<String, String>,
}

/// Parse-and-print capability over module code.
pub trait ModuleSyntax: Send + Sync {
    /// Number of AST nodes in the module. Heavier modules are emitted first by
    /// [`DependencyGraph::optimize_module_order`](crate::DependencyGraph::optimize_module_order).
    fn weight(&self, module: &Module) -> Result<usize>;

    /// Print the target's top-level statements followed by the source's as a
    /// single file.
    ///
    /// `None` when the two modules cannot share one scope (clashing names, an
    /// export surface that cannot be bound statically). The pair then stays
    /// two modules.
    fn merge(&self, request: MergeRequest<'_>) -> Result<Option<String>>;
}
