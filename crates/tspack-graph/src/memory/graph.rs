//! Core DependencyGraph structure and inner state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::{FxIndexMap, FxIndexSet, Module, ModuleId, Resolver};

/// In-memory module dependency graph.
///
/// Cloning is cheap and clones share state. All operations are synchronous
/// except [`build`](DependencyGraph::build), which awaits the module loader
/// between registrations.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    pub(super) inner: Arc<RwLock<GraphInner>>,
    pub(super) resolver: Resolver,
}

#[derive(Debug, Clone, Default)]
pub(super) struct GraphInner {
    /// All modules, in insertion order (rebuilt by the optimizer)
    pub modules: FxIndexMap<ModuleId, Arc<Module>>,
    /// Forward edges: module -> resolved dependencies
    pub dependencies: FxIndexMap<ModuleId, FxIndexSet<ModuleId>>,
    /// Reverse edges: module -> modules that depend on it
    pub dependents: FxIndexMap<ModuleId, FxIndexSet<ModuleId>>,
}

impl GraphInner {
    pub(super) fn deps_of(&self, id: &ModuleId) -> impl Iterator<Item = &ModuleId> {
        self.dependencies.get(id).into_iter().flatten()
    }

    pub(super) fn dependents_of(&self, id: &ModuleId) -> impl Iterator<Item = &ModuleId> {
        self.dependents.get(id).into_iter().flatten()
    }

    /// Replace the outgoing edges of `from`, keeping `dependents` the exact
    /// transpose of `dependencies`.
    pub(super) fn set_dependencies(&mut self, from: &ModuleId, targets: FxIndexSet<ModuleId>) {
        let previous = self.dependencies.get(from).cloned().unwrap_or_default();

        for stale in previous.difference(&targets) {
            let now_empty = match self.dependents.get_mut(stale) {
                Some(set) => {
                    set.shift_remove(from);
                    set.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.dependents.shift_remove(stale);
            }
        }

        for added in targets.difference(&previous) {
            self.dependents
                .entry(added.clone())
                .or_default()
                .insert(from.clone());
        }

        if targets.is_empty() {
            self.dependencies.shift_remove(from);
        } else {
            self.dependencies.insert(from.clone(), targets);
        }
    }

    /// Drop a module and every edge touching it.
    pub(super) fn remove(&mut self, id: &ModuleId) -> Option<Arc<Module>> {
        self.set_dependencies(id, FxIndexSet::default());

        if let Some(importers) = self.dependents.shift_remove(id) {
            for importer in importers {
                let now_empty = match self.dependencies.get_mut(&importer) {
                    Some(set) => {
                        set.shift_remove(id);
                        set.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    self.dependencies.shift_remove(&importer);
                }
            }
        }

        self.modules.shift_remove(id)
    }
}
