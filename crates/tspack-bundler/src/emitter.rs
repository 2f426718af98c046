//! Bundle emission: a module registry runtime followed by one registered
//! factory per module.
//!
//! Emitted layout:
//!
//! ```text
//! <runtime preamble: registry, __register, __require, helpers>
//! __register("/abs/b.ts", function (module, exports, require) {
//! <b.ts lowered to require/exports>
//! });
//! __register("/abs/a.ts", function (module, exports, require) { ... });
//! <postamble: __require("/abs/a.ts")>
//! ```

use indexmap::IndexMap;
use oxc_sourcemap::{SourceMap, SourceMapBuilder};
use tspack_gen::{ModuleFormat, RUNTIME_HELPERS, lower_to_commonjs};
use tspack_graph::{DependencyGraph, ModuleId};

use crate::{Error, Result};

/// Registry and loader shared by every bundle.
const PREAMBLE: &str = r#"var __tspack_modules = {};
var __tspack_cache = {};
var __tspack_host_require = typeof require === "function" ? require : function (id) {
  throw new Error("Cannot find module " + id);
};
function __register(id, factory) {
  __tspack_modules[id] = factory;
}
function __require(id) {
  var cached = __tspack_cache[id];
  if (cached) {
    return cached.exports;
  }
  var factory = __tspack_modules[id];
  if (!factory) {
    throw new Error("Module not registered: " + id);
  }
  var module = { exports: {} };
  __tspack_cache[id] = module;
  factory.call(module.exports, module, module.exports, function (specifier) {
    return Object.prototype.hasOwnProperty.call(__tspack_modules, specifier)
      ? __require(specifier)
      : __tspack_host_require(specifier);
  });
  return module.exports;
}"#;

/// Options for [`Bundler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerOptions {
    pub format: ModuleFormat,
    /// Module required by the postamble.
    pub entry_point: ModuleId,
    /// Module paths left out of the bundle.
    pub externals: Vec<String>,
    /// Build the coarse module-level map.
    pub source_map: bool,
    pub global_name: Option<String>,
}

impl BundlerOptions {
    pub fn new(entry_point: ModuleId) -> Self {
        Self {
            format: ModuleFormat::default(),
            entry_point,
            externals: Vec::new(),
            source_map: false,
            global_name: None,
        }
    }
}

/// Output of [`Bundler::bundle`].
#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub code: String,
    /// Each registered module's `__register(...)` call, keyed by path.
    pub modules: IndexMap<String, String>,
    /// Line-level map from `code` to the module files.
    pub map: Option<SourceMap>,
}

/// Emits the registry runtime and module factories for a graph.
#[derive(Debug, Clone)]
pub struct Bundler {
    options: BundlerOptions,
}

impl Bundler {
    pub fn new(options: BundlerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BundlerOptions {
        &self.options
    }

    /// Emit every module of `graph` in dependency order.
    ///
    /// Module code is lowered to `require`/`exports` form; specifiers of
    /// internal modules are rewritten to the registered path so the
    /// per-module `require` finds them.
    pub fn bundle(&self, graph: &DependencyGraph) -> Result<BundleOutput> {
        let mut code = String::with_capacity(PREAMBLE.len() + RUNTIME_HELPERS.len() + 256);
        code.push_str(PREAMBLE);
        code.push('\n');
        code.push_str(RUNTIME_HELPERS);
        code.push('\n');

        let mut line = line_count(&code);
        let mut builder = self.options.source_map.then(SourceMapBuilder::default);
        let mut modules = IndexMap::new();

        for id in graph.topological_order() {
            let path = id.path_string().into_owned();
            if self.is_external(&path) {
                tracing::debug!(path = %path, "skipping external module");
                continue;
            }
            let module = graph.module(&id).ok_or_else(|| {
                Error::Graph(tspack_graph::Error::MissingModule {
                    path: path.clone(),
                    referenced_by: "topological order".to_string(),
                })
            })?;

            let resolver = graph.resolver();
            let lowered = lower_to_commonjs(&path, &module.code, &|specifier| {
                if resolver.is_external(specifier) {
                    return specifier.to_string();
                }
                resolver
                    .resolve(specifier, &id)
                    .map(|target| target.path_string().into_owned())
                    .unwrap_or_else(|_| specifier.to_string())
            })?;
            let body = lowered.trim_end_matches('\n');

            let wrapped = format!(
                "__register({}, function (module, exports, require) {{\n{body}\n}});\n",
                js_string(&path)
            );

            if let Some(builder) = builder.as_mut() {
                let source = builder.add_source_and_content(&path, &module.code);
                builder.add_token(line, 0, 0, 0, Some(source), None);
                for offset in 0..line_count(body) + 1 {
                    builder.add_token(line + 1 + offset, 0, offset, 0, Some(source), None);
                }
            }

            line += line_count(&wrapped);
            code.push_str(&wrapped);
            modules.insert(path, wrapped);
        }

        code.push_str(&self.postamble());

        tracing::debug!(
            modules = modules.len(),
            bytes = code.len(),
            format = %self.options.format,
            "bundle emitted"
        );
        Ok(BundleOutput {
            code,
            modules,
            map: builder.map(SourceMapBuilder::into_sourcemap),
        })
    }

    fn postamble(&self) -> String {
        let entry = js_string(&self.options.entry_point.path_string());
        match self.options.format {
            ModuleFormat::Esm => format!("__require({entry});\n"),
            ModuleFormat::CommonJs | ModuleFormat::Umd => {
                format!("Object.assign(exports, __require({entry}));\n")
            }
        }
    }

    fn is_external(&self, path: &str) -> bool {
        self.options.externals.iter().any(|external| external == path)
    }
}

/// JSON string syntax is valid JavaScript string syntax.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn line_count(text: &str) -> u32 {
    text.matches('\n').count() as u32
}
