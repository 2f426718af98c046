//! Graph test suites and shared fixtures.

mod optimize_tests;
mod property_tests;
mod serialization_tests;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{
    DependencyGraph, Error, MergeRequest, Module, ModuleId, ModuleLoader, ModuleSyntax,
    ResolveOptions, Resolver, Result, VirtualRuntime,
};

/// A file in a fake project: path, code, raw specifiers.
pub(crate) type FileSpec<'a> = (&'a str, &'a str, &'a [&'a str]);

pub(crate) fn id(path: &str) -> ModuleId {
    ModuleId::new(path).unwrap()
}

pub(crate) fn module(path: &str, code: &str, deps: &[&str]) -> Module {
    Module::new(
        id(path),
        code,
        deps.iter().map(|d| d.to_string()).collect(),
    )
}

pub(crate) fn runtime_for(files: &[FileSpec<'_>]) -> VirtualRuntime {
    let runtime = VirtualRuntime::new("/proj");
    for (path, code, _) in files {
        runtime.add_file(path, *code);
    }
    runtime
}

pub(crate) fn empty_graph(files: &[FileSpec<'_>], externals: &[&str]) -> DependencyGraph {
    DependencyGraph::with_resolver(Resolver::new(
        Arc::new(runtime_for(files)),
        ResolveOptions {
            externals: externals.iter().map(|e| e.to_string()).collect(),
            ..ResolveOptions::default()
        },
    ))
}

/// Every file exists on the virtual disk and is registered, in the given order.
pub(crate) fn graph_of(files: &[FileSpec<'_>]) -> DependencyGraph {
    let graph = empty_graph(files, &[]);
    for (path, code, deps) in files {
        graph.update_module(module(path, code, deps)).unwrap();
    }
    graph
}

pub(crate) fn paths(ids: &[ModuleId]) -> Vec<String> {
    ids.iter().map(|id| id.path_string().into_owned()).collect()
}

/// Loader serving modules from a fixed table and counting loads per path.
pub(crate) struct TableLoader {
    modules: FxHashMap<ModuleId, Module>,
    pub(crate) loads: Mutex<Vec<ModuleId>>,
}

impl TableLoader {
    pub(crate) fn new(files: &[FileSpec<'_>]) -> Self {
        Self {
            modules: files
                .iter()
                .map(|(path, code, deps)| (id(path), module(path, code, deps)))
                .collect(),
            loads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModuleLoader for TableLoader {
    async fn load(&self, id: &ModuleId) -> Result<Module> {
        self.loads.lock().push(id.clone());
        self.modules.get(id).cloned().ok_or_else(|| Error::Parse {
            path: id.to_string(),
            message: "not in table".to_string(),
        })
    }
}

/// Syntax stand-in: weight is the code length, merge concatenates text.
#[derive(Default)]
pub(crate) struct TextSyntax {
    pub(crate) requests: Mutex<Vec<(Vec<String>, Vec<(String, String)>)>>,
    /// Sources this syntax refuses to absorb.
    pub(crate) refuse: Vec<ModuleId>,
}

impl ModuleSyntax for TextSyntax {
    fn weight(&self, module: &Module) -> Result<usize> {
        Ok(module.code.len())
    }

    fn merge(&self, request: MergeRequest<'_>) -> Result<Option<String>> {
        let mut relocations: Vec<(String, String)> = request
            .relocations
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        relocations.sort();
        self.requests
            .lock()
            .push((request.dropped_specifiers.to_vec(), relocations));
        if self.refuse.contains(&request.source.id) {
            return Ok(None);
        }
        Ok(Some(format!("{}\n{}", request.target.code, request.source.code)))
    }
}
