//! Query methods for DependencyGraph.

use std::sync::Arc;

use super::graph::DependencyGraph;
use crate::{Module, ModuleId};

impl DependencyGraph {
    /// Retrieve a module by ID.
    pub fn module(&self, id: &ModuleId) -> Option<Arc<Module>> {
        self.inner.read().modules.get(id).cloned()
    }

    /// All modules in map order.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        self.inner.read().modules.values().cloned().collect()
    }

    /// All module paths in map order.
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.inner.read().modules.keys().cloned().collect()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.inner.read().modules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().modules.is_empty()
    }

    /// Resolved dependencies of a module, in specifier order.
    pub fn dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.inner.read().deps_of(id).cloned().collect()
    }

    /// Modules that import `id`.
    pub fn dependents(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.inner.read().dependents_of(id).cloned().collect()
    }

    /// Registered modules nothing else imports.
    pub fn entry_points(&self) -> Vec<ModuleId> {
        let inner = self.inner.read();
        inner
            .modules
            .keys()
            .filter(|id| inner.dependents_of(id).next().is_none())
            .cloned()
            .collect()
    }
}
