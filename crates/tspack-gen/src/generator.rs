//! The code generation pipeline.
//!
//! Stages, in order:
//!
//! 1. collect fragments from the primary unit and every module unit
//! 2. join them into one text
//! 3. build the initial map (when maps are requested)
//! 4. strip types and lower to the target
//! 5. minify (failures degrade to a warning)
//!
//! and finally wrap the result in the requested module format.

use std::sync::Arc;

use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_sourcemap::SourceMap;
use oxc_span::SourceType;
use tspack_graph::Runtime;

use crate::error::Result;
use crate::format::{ModuleFormat, wrap};
use crate::fragment::{collect_code_fragments, merge_code_fragments};
use crate::minify::{MinifyLevel, minify_code};
use crate::parser::{ParseOptions, parse, source_type_for};
use crate::sourcemap::{generate_initial_source_map, merge_source_maps, shift_lines, to_json};
use crate::transform::{EsTarget, transform_code};

/// Options for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenOptions {
    /// Output file name; recorded as the map's `file` and used to name the
    /// map asset (`<file>.map`).
    pub file: String,
    pub target: EsTarget,
    pub minify: MinifyLevel,
    pub source_map: bool,
    pub format: ModuleFormat,
    /// Global assigned by the UMD wrapper.
    pub global_name: Option<String>,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            file: "bundle.js".to_string(),
            target: EsTarget::default(),
            minify: MinifyLevel::default(),
            source_map: false,
            format: ModuleFormat::default(),
            global_name: None,
        }
    }
}

impl GenOptions {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: EsTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_minify(mut self, minify: MinifyLevel) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_source_map(mut self, source_map: bool) -> Self {
        self.source_map = source_map;
        self
    }

    pub fn with_format(mut self, format: ModuleFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_global_name(mut self, name: impl Into<String>) -> Self {
        self.global_name = Some(name.into());
        self
    }
}

/// Source text handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: String,
    pub code: String,
    pub source_type: SourceType,
}

impl SourceUnit {
    /// Unit whose source type is detected from `path`.
    pub fn new(path: impl Into<String>, code: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            source_type: source_type_for(&path),
            path,
            code: code.into(),
        }
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }
}

/// The primary unit plus any per-module units, emitted in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInput {
    pub primary: SourceUnit,
    pub modules: Vec<SourceUnit>,
}

impl BundleInput {
    pub fn new(primary: SourceUnit) -> Self {
        Self {
            primary,
            modules: Vec::new(),
        }
    }

    pub fn with_module(mut self, unit: SourceUnit) -> Self {
        self.modules.push(unit);
        self
    }

    fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        std::iter::once(&self.primary).chain(&self.modules)
    }
}

/// Result of a generation run.
#[derive(Debug, Clone, Default)]
pub struct GeneratedOutput {
    pub code: String,
    /// Serialized source map, when maps were requested and could be built.
    pub map: Option<String>,
    /// Non-fatal problems: skipped nodes, a skipped minification, a lost map.
    pub warnings: Vec<String>,
    /// Extra files to publish next to the output, keyed by file name.
    pub assets: IndexMap<String, Vec<u8>>,
}

/// Runs the generation pipeline. Source content for maps is read through
/// the runtime.
pub struct CodeGenerator {
    runtime: Arc<dyn Runtime>,
}

impl CodeGenerator {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self { runtime }
    }

    /// Generate output for `input`.
    ///
    /// Parse and transform failures are fatal. A minifier failure only adds a
    /// warning and keeps the unminified code.
    pub async fn generate(&self, input: &BundleInput, options: &GenOptions) -> Result<GeneratedOutput> {
        let result = self.run(input, options).await;
        if let Err(err) = &result {
            tracing::error!(file = %options.file, error = %err, "code generation failed");
        }
        result
    }

    async fn run(&self, input: &BundleInput, options: &GenOptions) -> Result<GeneratedOutput> {
        let mut warnings = Vec::new();

        let mut fragments = Vec::new();
        for unit in input.units() {
            let allocator = Allocator::default();
            let parsed = parse(
                &allocator,
                &unit.code,
                &unit.path,
                ParseOptions::default().with_source_type(unit.source_type),
            )?;
            fragments.extend(collect_code_fragments(
                &parsed.program,
                &unit.code,
                &unit.path,
                &mut warnings,
            ));
        }
        let merged = merge_code_fragments(&fragments);
        tracing::debug!(fragments = fragments.len(), bytes = merged.len(), "fragments merged");

        let mut missing_content = Vec::new();
        let mut map = if options.source_map {
            let initial = generate_initial_source_map(&fragments, &options.file, self.runtime.as_ref()).await;
            missing_content = initial.missing_content;
            Some(initial.map)
        } else {
            None
        };

        let source_type = if input.units().any(|unit| unit.source_type.is_typescript()) {
            SourceType::ts()
        } else {
            input.primary.source_type
        };
        let transformed = transform_code(&options.file, &merged, source_type, options.target, options.source_map)?;
        map = chain(map, transformed.map, "transform", &mut warnings);
        let mut code = transformed.code;

        if options.minify.is_enabled() {
            match minify_code(&options.file, &code, options.minify, options.source_map) {
                Ok(minified) => {
                    map = chain(map, minified.map, "minify", &mut warnings);
                    code = minified.code;
                }
                Err(err) => {
                    tracing::warn!(file = %options.file, error = %err, "minification skipped");
                    warnings.push(format!("minification skipped: {err}"));
                }
            }
        }

        let wrapped = wrap(&code, options.format, options.global_name.as_deref());

        let mut output = GeneratedOutput {
            code: wrapped.code,
            warnings,
            ..GeneratedOutput::default()
        };
        if let Some(map) = map {
            let json = to_json(&shift_lines(&map, wrapped.prologue_lines), &missing_content)?;
            output
                .assets
                .insert(format!("{}.map", options.file), json.clone().into_bytes());
            output.map = Some(json);
        }
        Ok(output)
    }
}

/// Compose the map of a new stage onto the running map. A stage that
/// produced no map ends map generation for the run.
fn chain(
    current: Option<SourceMap>,
    stage: Option<SourceMap>,
    stage_name: &str,
    warnings: &mut Vec<String>,
) -> Option<SourceMap> {
    let current = current?;
    match stage {
        Some(stage) => Some(merge_source_maps(&current, &stage)),
        None => {
            warnings.push(format!("source map dropped: {stage_name} produced no map"));
            None
        }
    }
}
