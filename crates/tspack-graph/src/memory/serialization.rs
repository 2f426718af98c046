//! Serialization methods for DependencyGraph.
//!
//! The persisted format is a JSON object with three arrays of `[key, value]`
//! tuples:
//!
//! ```json
//! {
//!   "modules":      [["/proj/a.ts", { "id": "/proj/a.ts", "code": "...", "dependencies": ["./b"] }]],
//!   "dependencies": [["/proj/a.ts", ["/proj/b.ts"]]],
//!   "dependents":   [["/proj/b.ts", ["/proj/a.ts"]]]
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::graph::{DependencyGraph, GraphInner};
use crate::{Error, FxIndexMap, FxIndexSet, Module, ModuleId, Resolver, Result};

#[derive(Serialize, Deserialize)]
struct GraphJson {
    modules: Vec<(ModuleId, Module)>,
    dependencies: Vec<(ModuleId, Vec<ModuleId>)>,
    dependents: Vec<(ModuleId, Vec<ModuleId>)>,
}

/// Helper to escape labels for DOT format.
fn escape_label(label: &str) -> String {
    label.replace('"', "\\\"")
}

impl DependencyGraph {
    /// Export the graph as DOT format for visualization.
    pub fn to_dot_format(&self) -> String {
        let inner = self.inner.read();
        let mut output = String::from("digraph DependencyGraph {\n");

        for id in inner.modules.keys() {
            output.push_str("    \"");
            output.push_str(&escape_label(&id.path_string()));
            output.push_str("\";\n");
        }

        for (from, targets) in &inner.dependencies {
            for target in targets {
                output.push_str("    \"");
                output.push_str(&escape_label(&from.path_string()));
                output.push_str("\" -> \"");
                output.push_str(&escape_label(&target.path_string()));
                output.push_str("\";\n");
            }
        }

        output.push_str("}\n");
        output
    }

    /// Serialize modules and both edge maps.
    pub fn to_json(&self) -> Result<String> {
        let inner = self.inner.read();
        let json = GraphJson {
            modules: inner
                .modules
                .iter()
                .map(|(id, module)| (id.clone(), Module::clone(module)))
                .collect(),
            dependencies: edge_list(&inner.dependencies),
            dependents: edge_list(&inner.dependents),
        };

        Ok(serde_json::to_string_pretty(&json)?)
    }

    /// Rebuild a graph persisted with [`to_json`](Self::to_json), resolving
    /// future updates against the real filesystem.
    #[cfg(not(target_family = "wasm"))]
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_resolver(json, Resolver::native())
    }

    /// Rebuild a persisted graph.
    ///
    /// Fails with [`Error::CircularDependency`] if the edges contain a cycle
    /// and [`Error::MissingModule`] if any key or edge names an unregistered
    /// path. Nothing is repaired.
    pub fn from_json_with_resolver(json: &str, resolver: Resolver) -> Result<Self> {
        let parsed: GraphJson = serde_json::from_str(json)?;

        let mut inner = GraphInner::default();
        for (id, module) in parsed.modules {
            if id != module.id {
                return Err(Error::Serialization(format!(
                    "module stored under {} has id {}",
                    id, module.id
                )));
            }
            inner.modules.insert(id, Arc::new(module));
        }
        for (id, targets) in parsed.dependencies {
            inner.dependencies.insert(id, targets.into_iter().collect());
        }
        for (id, importers) in parsed.dependents {
            inner.dependents.insert(id, importers.into_iter().collect());
        }

        if let Some(cycle) = inner.find_cycle() {
            return Err(Error::CircularDependency {
                cycle: cycle.iter().map(ToString::to_string).collect(),
            });
        }
        validate_references(&inner)?;
        validate_transpose(&inner)?;

        Ok(Self {
            inner: Arc::new(parking_lot::RwLock::new(inner)),
            resolver,
        })
    }
}

fn edge_list(map: &FxIndexMap<ModuleId, FxIndexSet<ModuleId>>) -> Vec<(ModuleId, Vec<ModuleId>)> {
    map.iter()
        .map(|(key, set)| (key.clone(), set.iter().cloned().collect()))
        .collect()
}

fn validate_references(inner: &GraphInner) -> Result<()> {
    for edges in [&inner.dependencies, &inner.dependents] {
        for (key, values) in edges {
            if !inner.modules.contains_key(key) {
                return Err(Error::MissingModule {
                    path: key.to_string(),
                    referenced_by: "edge list".to_string(),
                });
            }
            if let Some(missing) = values.iter().find(|v| !inner.modules.contains_key(*v)) {
                return Err(Error::MissingModule {
                    path: missing.to_string(),
                    referenced_by: key.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn validate_transpose(inner: &GraphInner) -> Result<()> {
    let forward: usize = inner.dependencies.values().map(|s| s.len()).sum();
    let reverse: usize = inner.dependents.values().map(|s| s.len()).sum();

    let consistent = forward == reverse
        && inner.dependencies.iter().all(|(from, targets)| {
            targets
                .iter()
                .all(|to| inner.dependents_of(to).any(|importer| importer == from))
        });

    if consistent {
        Ok(())
    } else {
        Err(Error::Serialization(
            "dependents is not the transpose of dependencies".to_string(),
        ))
    }
}
