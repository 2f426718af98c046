//! Traversal methods for DependencyGraph.
//!
//! Every walk is iterative with an explicit stack so deep import chains
//! cannot overflow the call stack.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::{DependencyGraph, GraphInner};
use crate::{FxIndexSet, ModuleId};

impl GraphInner {
    /// Dependency-first DFS post-order over registered modules.
    ///
    /// Terminates on cyclic graphs thanks to the visited set, but the order is
    /// only meaningful when the graph is acyclic.
    pub(super) fn topological_order(&self) -> Vec<ModuleId> {
        let mut visited: FxHashSet<&ModuleId> = FxHashSet::default();
        let mut order = Vec::with_capacity(self.modules.len());

        for root in self.modules.keys() {
            if !visited.insert(root) {
                continue;
            }

            let mut stack: Vec<(&ModuleId, usize)> = vec![(root, 0)];
            while let Some(frame) = stack.last_mut() {
                let next = self
                    .dependencies
                    .get(frame.0)
                    .and_then(|deps| deps.get_index(frame.1));
                frame.1 += 1;

                match next {
                    Some(dep) => {
                        if self.modules.contains_key(dep) && visited.insert(dep) {
                            stack.push((dep, 0));
                        }
                    }
                    None => {
                        if let Some((done, _)) = stack.pop() {
                            order.push(done.clone());
                        }
                    }
                }
            }
        }

        order
    }

    /// One concrete cycle, first node repeated at the end, if any exists.
    ///
    /// Walks every node that has outgoing edges, registered or not, so it can
    /// validate graphs that are not yet known to be reference-consistent.
    pub(super) fn find_cycle(&self) -> Option<Vec<ModuleId>> {
        let mut done: FxHashSet<&ModuleId> = FxHashSet::default();
        let roots = self.modules.keys().chain(self.dependencies.keys());

        for root in roots {
            if done.contains(root) {
                continue;
            }

            let mut on_stack: FxHashMap<&ModuleId, usize> = FxHashMap::default();
            let mut stack: Vec<(&ModuleId, usize)> = vec![(root, 0)];
            on_stack.insert(root, 0);

            while let Some(frame) = stack.last_mut() {
                let next = self
                    .dependencies
                    .get(frame.0)
                    .and_then(|deps| deps.get_index(frame.1));
                frame.1 += 1;

                match next {
                    Some(dep) => {
                        if let Some(&start) = on_stack.get(dep) {
                            let mut cycle: Vec<ModuleId> =
                                stack[start..].iter().map(|(id, _)| (*id).clone()).collect();
                            cycle.push(dep.clone());
                            return Some(cycle);
                        }
                        if !done.contains(dep) {
                            on_stack.insert(dep, stack.len());
                            stack.push((dep, 0));
                        }
                    }
                    None => {
                        if let Some((finished, _)) = stack.pop() {
                            on_stack.remove(finished);
                            done.insert(finished);
                        }
                    }
                }
            }
        }

        None
    }

    /// Registered modules reachable from `roots` over forward edges.
    pub(super) fn reachable_from<'a>(
        &'a self,
        roots: impl IntoIterator<Item = &'a ModuleId>,
    ) -> FxHashSet<&'a ModuleId> {
        let mut seen: FxHashSet<&ModuleId> = FxHashSet::default();
        let mut stack: Vec<&ModuleId> = roots.into_iter().collect();

        while let Some(id) = stack.pop() {
            if !self.modules.contains_key(id) || !seen.insert(id) {
                continue;
            }
            stack.extend(self.deps_of(id).filter(|dep| !seen.contains(dep)));
        }

        seen
    }
}

impl DependencyGraph {
    /// Modules ordered so every module follows all of its dependencies.
    pub fn topological_order(&self) -> Vec<ModuleId> {
        self.inner.read().topological_order()
    }

    /// True iff a dependency edge leads back to a module on the current path.
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// One cycle as a path `a -> b -> ... -> a`.
    pub fn find_cycle(&self) -> Option<Vec<ModuleId>> {
        self.inner.read().find_cycle()
    }

    /// Partition of all modules into sets connected when edges are treated
    /// as undirected.
    pub fn connected_components(&self) -> Vec<Vec<ModuleId>> {
        let inner = self.inner.read();
        let mut assigned: FxHashSet<&ModuleId> = FxHashSet::default();
        let mut components = Vec::new();

        for root in inner.modules.keys() {
            if !assigned.insert(root) {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::from([root]);
            while let Some(id) = queue.pop_front() {
                component.push(id.clone());
                for next in inner.deps_of(id).chain(inner.dependents_of(id)) {
                    if inner.modules.contains_key(next) && assigned.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
            components.push(component);
        }

        components
    }

    /// Returns true if `from` depends on `to` (directly or transitively).
    pub fn depends_on(&self, from: &ModuleId, to: &ModuleId) -> bool {
        if from == to {
            return true;
        }
        self.transitive_dependencies(from).contains(to)
    }

    /// Collect transitive dependencies of a module, nearest first.
    pub fn transitive_dependencies(&self, id: &ModuleId) -> FxIndexSet<ModuleId> {
        let inner = self.inner.read();
        let mut visited = FxIndexSet::default();
        let mut queue: VecDeque<&ModuleId> = inner.deps_of(id).collect();

        while let Some(current) = queue.pop_front() {
            if current == id || !visited.insert(current.clone()) {
                continue;
            }
            queue.extend(inner.deps_of(current));
        }

        visited
    }
}
