//! Construction methods for DependencyGraph.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use super::graph::{DependencyGraph, GraphInner};
use crate::{Module, ModuleId, Resolver, Result};

/// Produces a [`Module`] for a resolved path.
///
/// This is the injected parse capability of [`DependencyGraph::build`]. A
/// loader that cannot read or parse a file should fail with
/// [`Error::Parse`](crate::Error::Parse).
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, id: &ModuleId) -> Result<Module>;
}

impl DependencyGraph {
    /// Create an empty graph resolving against the real filesystem.
    #[cfg(not(target_family = "wasm"))]
    pub fn new() -> Self {
        Self::with_resolver(Resolver::native())
    }

    /// Create an empty graph with an explicit resolver.
    pub fn with_resolver(resolver: Resolver) -> Self {
        Self {
            inner: Arc::new(RwLock::new(GraphInner::default())),
            resolver,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Register `entry` and everything reachable from it.
    ///
    /// Modules are registered depth-first in specifier order; each path is
    /// loaded at most once. Use [`topological_order`](Self::topological_order)
    /// for emission order. On error the graph may hold a partial build and
    /// should be discarded.
    pub async fn build(&self, entry: Module, loader: &dyn ModuleLoader) -> Result<()> {
        tracing::debug!(entry = %entry.id, "building dependency graph");

        let mut stack = self.register(entry)?;
        stack.reverse();
        let mut loaded: FxHashSet<ModuleId> = FxHashSet::default();

        while let Some(id) = stack.pop() {
            if self.contains(&id) || !loaded.insert(id.clone()) {
                continue;
            }

            let module = loader.load(&id).await?;
            let mut targets = self.register(module)?;
            targets.reverse();
            stack.extend(targets);
        }

        tracing::debug!(modules = self.len(), "dependency graph built");
        Ok(())
    }

    /// Upsert a module and return its resolved dependency paths in order.
    fn register(&self, module: Module) -> Result<Vec<ModuleId>> {
        let id = module.id.clone();
        self.update_module(module)?;
        Ok(self.dependencies(&id))
    }
}

#[cfg(not(target_family = "wasm"))]
impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
