//! End-to-end build: graph, emission, generation.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tspack_gen::sourcemap::{from_json, merge_source_maps, to_json};
use tspack_gen::{BundleInput, CodeGenerator, OxcSyntax, SourceType, SourceUnit, collect_specifiers};
use tspack_graph::{
    DependencyGraph, Module, ModuleId, ModuleLoader, OptimizeReport, Resolver, Runtime,
    VirtualRuntime,
};

use crate::config::BuildConfig;
use crate::emitter::{Bundler, BundlerOptions};
use crate::{Error, Result};

/// File name of the emitted bundle while it is fed to the generator. It only
/// exists in memory.
pub const BUNDLE_VIRTUAL_FILE: &str = "__tspack_bundle__.ts";

/// Loads modules through a [`Runtime`] and extracts their specifiers with the
/// OXC parser.
pub struct FileModuleLoader {
    runtime: Arc<dyn Runtime>,
}

impl FileModuleLoader {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl ModuleLoader for FileModuleLoader {
    async fn load(&self, id: &ModuleId) -> tspack_graph::Result<Module> {
        let code = self.runtime.read_to_string(id.as_path()).await?;
        let path = id.path_string();
        let dependencies = collect_specifiers(&path, &code)?;
        tracing::debug!(path = %path, dependencies = dependencies.len(), "module loaded");
        Ok(Module::new(id.clone(), code, dependencies))
    }
}

/// Output of [`build`].
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Final bundle code.
    pub code: String,
    /// Final source map, composed back to the module files.
    pub map: Option<String>,
    pub warnings: Vec<String>,
    /// Files to publish next to the bundle (the map, when built).
    pub assets: IndexMap<String, Vec<u8>>,
    /// Bundled modules in emission order.
    pub modules: Vec<ModuleId>,
    /// What the optimizer did, when it ran.
    pub optimization: Option<OptimizeReport>,
    pub out_file: String,
}

impl BuildResult {
    /// Write the bundle and its assets into `dir`, returning the written
    /// paths.
    pub async fn write_to(&self, runtime: &dyn Runtime, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        runtime.create_dir(dir, true).await?;

        let mut written = Vec::with_capacity(self.assets.len() + 1);
        let files = std::iter::once((self.out_file.as_str(), self.code.as_bytes()))
            .chain(self.assets.iter().map(|(name, bytes)| (name.as_str(), bytes.as_slice())));
        for (name, bytes) in files {
            let path = output_path(dir, name)?;
            runtime
                .write_file(&path, bytes)
                .await
                .map_err(|err| Error::WriteFailure(format!("{}: {err}", path.display())))?;
            written.push(path);
        }

        tracing::info!(dir = %dir.display(), files = written.len(), "bundle written");
        Ok(written)
    }
}

/// Build `config` against the real filesystem.
#[cfg(not(target_family = "wasm"))]
pub async fn build(config: &BuildConfig) -> Result<BuildResult> {
    build_with_runtime(config, Arc::new(tspack_graph::NativeRuntime)).await
}

/// Build `config`, reading every file through `runtime`.
///
/// Steps: load the entry, build the graph, reject cycles, optionally
/// optimize, emit the bundle, then generate the final code and compose its
/// map with the bundle's module map.
pub async fn build_with_runtime(config: &BuildConfig, runtime: Arc<dyn Runtime>) -> Result<BuildResult> {
    config.validate()?;
    let cwd = match &config.cwd {
        Some(cwd) => cwd.clone(),
        None => runtime.get_cwd()?,
    };
    let entry = ModuleId::with_base(&cwd, &config.entry).map_err(tspack_graph::Error::from)?;
    tracing::info!(entry = %entry, format = %config.format, "build started");

    let resolver = Resolver::new(runtime.clone(), config.resolve_options());
    let graph = DependencyGraph::with_resolver(resolver);
    let loader = FileModuleLoader::new(runtime.clone());
    let entry_module = loader.load(&entry).await?;
    graph.build(entry_module, &loader).await?;

    if let Some(cycle) = graph.find_cycle() {
        return Err(tspack_graph::Error::CircularDependency {
            cycle: cycle.iter().map(|id| id.path_string().into_owned()).collect(),
        }
        .into());
    }

    let optimization = if config.optimize {
        let report = graph.optimize_graph(&OxcSyntax::new())?;
        tracing::debug!(
            removed = report.removed.len(),
            merged = report.merged.len(),
            "graph optimized"
        );
        Some(report)
    } else {
        None
    };

    let bundler = Bundler::new(BundlerOptions {
        format: config.format,
        entry_point: entry,
        externals: config.externals.clone(),
        source_map: config.sourcemap,
        global_name: config.global_name.clone(),
    });
    let bundle = bundler.bundle(&graph)?;

    let bundle_path = cwd.join(BUNDLE_VIRTUAL_FILE);
    let generator_runtime = VirtualRuntime::new(&cwd)
        .with_fallback(runtime.clone())
        .file(&bundle_path, bundle.code.clone());
    let input = BundleInput::new(
        SourceUnit::new(bundle_path.to_string_lossy(), bundle.code.clone())
            .with_source_type(SourceType::ts()),
    );
    let options = config.gen_options();
    let mut output = CodeGenerator::new(Arc::new(generator_runtime))
        .generate(&input, &options)
        .await?;

    let map = match (&bundle.map, output.map.take()) {
        (Some(modules_map), Some(generated)) => {
            let composed = merge_source_maps(modules_map, &from_json(&generated)?);
            Some(to_json(&composed, &[])?)
        }
        (_, generated) => generated,
    };
    let map_asset = format!("{}.map", options.file);
    if let Some(json) = &map {
        output.assets.insert(map_asset.clone(), json.clone().into_bytes());
        output.code.push_str(&format!("//# sourceMappingURL={map_asset}\n"));
    }

    for warning in &output.warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(
        modules = bundle.modules.len(),
        bytes = output.code.len(),
        warnings = output.warnings.len(),
        "build finished"
    );

    Ok(BuildResult {
        code: output.code,
        map,
        warnings: output.warnings,
        assets: output.assets,
        modules: graph
            .topological_order()
            .into_iter()
            .filter(|id| bundle.modules.contains_key(&*id.path_string()))
            .collect(),
        optimization,
        out_file: options.file,
    })
}

/// `dir/name`, refusing names that escape `dir`.
fn output_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || escapes {
        return Err(Error::InvalidOutputPath(name.to_string()));
    }
    Ok(dir.join(relative))
}
