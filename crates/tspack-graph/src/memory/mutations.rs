//! Mutation methods for DependencyGraph.

use std::sync::Arc;

use super::graph::DependencyGraph;
use crate::{FxIndexSet, Module, ModuleId, Result};

impl DependencyGraph {
    /// Upsert `module` at its path and recompute its outgoing edges.
    ///
    /// Every raw specifier is resolved against the module's directory before
    /// anything is mutated, so a resolution failure leaves the graph
    /// untouched. Externals produce no edge. Reverse edges of targets the
    /// module no longer imports are removed.
    pub fn update_module(&self, module: Module) -> Result<()> {
        let targets = self.resolve_dependencies(&module)?;
        let id = module.id.clone();

        tracing::debug!(module = %id, dependencies = targets.len(), "updating module");

        let mut inner = self.inner.write();
        inner.modules.insert(id.clone(), Arc::new(module));
        inner.set_dependencies(&id, targets);
        Ok(())
    }

    /// Remove a module and every edge touching it.
    pub fn remove_module(&self, id: &ModuleId) -> Option<Arc<Module>> {
        self.inner.write().remove(id)
    }

    /// Remove every module.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.modules.clear();
        inner.dependencies.clear();
        inner.dependents.clear();
    }

    pub(super) fn resolve_dependencies(&self, module: &Module) -> Result<FxIndexSet<ModuleId>> {
        let mut targets = FxIndexSet::default();
        for specifier in module.specifiers() {
            if self.resolver.is_external(specifier) {
                continue;
            }
            targets.insert(self.resolver.resolve(specifier, &module.id)?);
        }
        Ok(targets)
    }
}
