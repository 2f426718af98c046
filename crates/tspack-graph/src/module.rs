use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ModuleId;

/// A registered source file.
///
/// `dependencies` holds the raw specifiers exactly as written in the source
/// (`"./foo"`, `"bar-pkg"`); the graph resolves them into edges. A module is
/// never edited in place: re-parsing produces a new `Module` that replaces the
/// old one through [`DependencyGraph::update_module`](crate::DependencyGraph::update_module).
///
/// The code is kept behind an `Arc` so handing modules out of the graph is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub code: Arc<str>,
    pub dependencies: Vec<String>,
}

impl Module {
    /// Create a module builder for the given identifier.
    pub fn builder(id: ModuleId) -> ModuleBuilder {
        ModuleBuilder {
            module: Self {
                id,
                code: Arc::from(""),
                dependencies: Vec::new(),
            },
        }
    }

    /// Shorthand for a module with code and specifiers.
    pub fn new(id: ModuleId, code: impl Into<Arc<str>>, dependencies: Vec<String>) -> Self {
        Self {
            id,
            code: code.into(),
            dependencies,
        }
    }

    /// Iterate over the raw dependency specifiers.
    pub fn specifiers(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(String::as_str)
    }

    /// Size of the source text in bytes.
    pub fn size(&self) -> usize {
        self.code.len()
    }
}

/// Builder for [`Module`].
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.module.code = code.into();
        self
    }

    pub fn dependency(mut self, specifier: impl Into<String>) -> Self {
        self.module.dependencies.push(specifier.into());
        self
    }

    pub fn dependencies<I, S>(mut self, specifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module
            .dependencies
            .extend(specifiers.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}
