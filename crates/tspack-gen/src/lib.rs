//! Code generation for tspack bundles.
//!
//! Turns parsed TypeScript into output JavaScript with a composed source map:
//!
//! - [`collect_code_fragments`] / [`merge_code_fragments`] turn each top-level
//!   node into a positioned fragment and join them
//! - [`generate_initial_source_map`] maps the joined text back to its files
//! - [`transform_code`] strips types and lowers syntax to an [`EsTarget`]
//! - [`minify_code`] compresses and mangles at a [`MinifyLevel`]
//! - [`wrap`] applies the [`ModuleFormat`] wrapper
//!
//! [`CodeGenerator`] chains all of them. Two more pieces serve the bundler:
//! [`lower_to_commonjs`] rewrites a module's import/export syntax into the
//! `require`/`exports` shape the bundle runtime executes, and [`OxcSyntax`]
//! gives the dependency-graph optimizer its parse-and-print capability.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tspack_gen::{BundleInput, CodeGenerator, GenOptions, ModuleFormat, SourceUnit};
//! use tspack_graph::VirtualRuntime;
//!
//! # async fn run() -> tspack_gen::Result<()> {
//! let runtime = Arc::new(VirtualRuntime::new("/proj"));
//! let input = BundleInput::new(SourceUnit::new("/proj/a.ts", "export const a: number = 1;"));
//! let options = GenOptions::new("out.js")
//!     .with_format(ModuleFormat::CommonJs)
//!     .with_source_map(true);
//!
//! let output = CodeGenerator::new(runtime).generate(&input, &options).await?;
//! assert!(output.assets.contains_key("out.js.map"));
//! # Ok(())
//! # }
//! ```

pub mod commonjs;
pub mod error;
pub mod format;
pub mod fragment;
pub mod generator;
mod line_index;
mod merge;
pub mod minify;
pub mod parser;
pub mod sourcemap;
pub mod syntax;
pub mod transform;

pub use commonjs::{RUNTIME_HELPERS, lower_to_commonjs};
pub use error::{GenError, Result};
pub use format::{DEFAULT_GLOBAL_NAME, ModuleFormat, Wrapped, wrap};
pub use fragment::{CodeFragment, collect_code_fragments, merge_code_fragments};
pub use generator::{BundleInput, CodeGenerator, GenOptions, GeneratedOutput, SourceUnit};
pub use minify::{MinifyLevel, minify_code};
pub use parser::{ParseOptions, ParsedProgram, parse, source_type_for};
pub use sourcemap::{InitialSourceMap, generate_initial_source_map, merge_source_maps, shift_lines};
pub use syntax::{OxcSyntax, collect_specifiers};
pub use transform::{EsTarget, StageOutput, transform_code};

// Re-export the map type callers compose against
pub use oxc_sourcemap::SourceMap;
pub use oxc_span::SourceType;
