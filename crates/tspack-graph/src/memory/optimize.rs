//! Graph optimizer: unused-module pruning, singleton-chain merging and
//! weight-based reordering.

use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::DependencyGraph;
use crate::{Error, FxIndexMap, MergeRequest, Module, ModuleId, ModuleSyntax, Result};

/// What [`DependencyGraph::optimize_graph`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    /// Modules unreachable from every entry point.
    pub removed: Vec<ModuleId>,
    /// `(absorbed, target)` pairs, in merge order.
    pub merged: Vec<(ModuleId, ModuleId)>,
}

impl DependencyGraph {
    /// Prune, merge and reorder, in that order.
    ///
    /// Afterwards [`modules`](Self::modules) reflects the new order and no
    /// absorbed path remains anywhere in the graph.
    pub fn optimize_graph(&self, syntax: &dyn ModuleSyntax) -> Result<OptimizeReport> {
        let removed = self.remove_unused_modules();
        let merged = self.merge_modules(syntax)?;
        self.optimize_module_order(syntax)?;

        tracing::debug!(
            removed = removed.len(),
            merged = merged.len(),
            modules = self.len(),
            "optimized dependency graph"
        );

        Ok(OptimizeReport { removed, merged })
    }

    /// Delete every module not reachable from a module with zero dependents.
    pub fn remove_unused_modules(&self) -> Vec<ModuleId> {
        let mut inner = self.inner.write();

        let unused: Vec<ModuleId> = {
            let view = &*inner;
            let entries = view
                .modules
                .keys()
                .filter(|id| view.dependents_of(id).next().is_none());
            let reachable = view.reachable_from(entries);
            view.modules
                .keys()
                .filter(|id| !reachable.contains(id))
                .cloned()
                .collect()
        };

        for id in &unused {
            tracing::debug!(module = %id, "removing unreachable module");
            inner.remove(id);
        }
        unused
    }

    /// Merge singleton chains until none remain.
    ///
    /// A chain is an edge `target -> source` where `source` is the only
    /// dependency of `target` and `target` is the only dependent of `source`.
    /// Chains the syntax declines to merge are left as they are.
    pub fn merge_modules(&self, syntax: &dyn ModuleSyntax) -> Result<Vec<(ModuleId, ModuleId)>> {
        let mut merged = Vec::new();
        let mut declined: FxHashSet<(ModuleId, ModuleId)> = FxHashSet::default();
        while let Some((target, source)) = self.find_singleton_chain(&declined) {
            if self.merge_module_pair(&source, &target, syntax)? {
                merged.push((source, target));
            } else {
                declined.insert((target, source));
            }
        }
        Ok(merged)
    }

    /// Stable-sort modules by weight, heaviest first, starting from
    /// topological order, and rebuild the module map in that order.
    pub fn optimize_module_order(&self, syntax: &dyn ModuleSyntax) -> Result<()> {
        let mut weighted = Vec::with_capacity(self.len());
        for id in self.topological_order() {
            let module = self.module(&id).ok_or_else(|| Error::MissingModule {
                path: id.to_string(),
                referenced_by: "topological order".to_string(),
            })?;
            weighted.push((syntax.weight(&module)?, id));
        }
        weighted.sort_by(|a, b| b.0.cmp(&a.0));

        let mut inner = self.inner.write();
        let mut rebuilt = FxIndexMap::default();
        for (_, id) in weighted {
            if let Some(module) = inner.modules.swap_remove(&id) {
                rebuilt.insert(id, module);
            }
        }
        rebuilt.extend(inner.modules.drain(..));
        inner.modules = rebuilt;
        Ok(())
    }

    fn find_singleton_chain(
        &self,
        declined: &FxHashSet<(ModuleId, ModuleId)>,
    ) -> Option<(ModuleId, ModuleId)> {
        let inner = self.inner.read();
        inner.modules.keys().find_map(|target| {
            let deps = inner.dependencies.get(target)?;
            if deps.len() != 1 {
                return None;
            }
            let source = deps.first()?;
            if declined.contains(&(target.clone(), source.clone())) {
                return None;
            }
            let private = inner.dependents.get(source).is_some_and(|d| d.len() == 1);
            let mutual = inner.deps_of(source).any(|dep| dep == target);
            (source != target && private && !mutual && inner.modules.contains_key(source))
                .then(|| (target.clone(), source.clone()))
        })
    }

    /// Absorb `source` into `target` and delete `source`. `false` when the
    /// syntax declined and the graph is unchanged.
    fn merge_module_pair(
        &self,
        source: &ModuleId,
        target: &ModuleId,
        syntax: &dyn ModuleSyntax,
    ) -> Result<bool> {
        let lookup = |id: &ModuleId| {
            self.module(id).ok_or_else(|| Error::MissingModule {
                path: id.to_string(),
                referenced_by: "merge".to_string(),
            })
        };
        let target_module = lookup(target)?;
        let source_module = lookup(source)?;

        let mut dependencies = Vec::new();
        let mut dropped = Vec::new();
        let mut seen_targets: FxHashSet<ModuleId> = FxHashSet::default();

        for specifier in target_module.specifiers() {
            if self.resolver.is_external(specifier) {
                push_unique(&mut dependencies, specifier.to_string());
                continue;
            }
            let resolved = self.resolver.resolve(specifier, target)?;
            if resolved == *source {
                dropped.push(specifier.to_string());
            } else if seen_targets.insert(resolved) {
                push_unique(&mut dependencies, specifier.to_string());
            }
        }

        // The source's specifiers were relative to its own location; pin them
        // to absolute paths so they still resolve from the target's directory.
        let mut relocations = FxHashMap::default();
        for specifier in source_module.specifiers() {
            if self.resolver.is_external(specifier) {
                push_unique(&mut dependencies, specifier.to_string());
                continue;
            }
            let resolved = self.resolver.resolve(specifier, source)?;
            let absolute = resolved.path_string().into_owned();
            if absolute != specifier {
                relocations.insert(specifier.to_string(), absolute.clone());
            }
            if seen_targets.insert(resolved) {
                push_unique(&mut dependencies, absolute);
            }
        }

        let Some(code) = syntax.merge(MergeRequest {
            target: &target_module,
            source: &source_module,
            dropped_specifiers: &dropped,
            relocations: &relocations,
        })?
        else {
            tracing::debug!(source = %source, target = %target, "merge declined");
            return Ok(false);
        };

        tracing::debug!(source = %source, target = %target, "merging singleton chain");

        self.update_module(Module::new(target.clone(), code, dependencies))?;
        self.remove_module(source);
        Ok(true)
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
