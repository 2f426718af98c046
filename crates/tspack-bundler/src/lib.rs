#![cfg_attr(docsrs, feature(doc_cfg))]

//! # tspack-bundler
//!
//! Bundles a TypeScript entry and its imports into one script.
//!
//! The build loads the entry, follows its imports into a
//! [`DependencyGraph`](tspack_graph::DependencyGraph), emits every module as a
//! registered factory behind a small `require` runtime ([`Bundler`]), then runs
//! the result through [`tspack_gen::CodeGenerator`] for type stripping,
//! downleveling, minification and format wrapping. Source maps from both
//! halves are composed so positions land in the original module files.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tspack_bundler::{BuildConfig, ModuleFormat};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BuildConfig::new("src/index.ts")
//!     .format(ModuleFormat::CommonJs)
//!     .sourcemap(true)
//!     .minify(true);
//!
//! let result = tspack_bundler::build(&config).await?;
//! result.write_to(&tspack_graph::NativeRuntime, "dist").await?;
//! # Ok(()) }
//! ```
//!
//! ### Loading configuration
//!
//! [`BuildConfig::load`] layers defaults, `tspack.config.json` and `TSPACK_*`
//! environment variables:
//!
//! ```no_run
//! use std::path::Path;
//! use tspack_bundler::BuildConfig;
//!
//! let config = BuildConfig::load(Path::new("."), None)?;
//! # Ok::<(), tspack_bundler::Error>(())
//! ```

pub mod build;
pub mod config;
pub mod emitter;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LOG_ENV, LogLevel, init_logging, init_logging_from_env};

#[cfg(not(target_family = "wasm"))]
pub use build::build;
pub use build::{BUNDLE_VIRTUAL_FILE, BuildResult, FileModuleLoader, build_with_runtime};
pub use config::{BuildConfig, CONFIG_FILE, ENV_PREFIX};
pub use emitter::{BundleOutput, Bundler, BundlerOptions};

// Option types that appear in BuildConfig
pub use tspack_gen::{EsTarget, MinifyLevel, ModuleFormat};
pub use tspack_graph::SourceExtension;

/// Error types for tspack-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// File access outside of graph construction.
    #[error(transparent)]
    Runtime(#[from] tspack_graph::RuntimeError),

    /// Error from the dependency graph.
    #[error(transparent)]
    Graph(#[from] tspack_graph::Error),

    /// Error from code generation.
    #[error(transparent)]
    Gen(#[from] tspack_gen::GenError),
}

/// Result type alias for tspack-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::Runtime(_) => "IO_ERROR",
            Error::Graph(tspack_graph::Error::CircularDependency { .. }) => "CIRCULAR_DEPENDENCY",
            Error::Graph(tspack_graph::Error::UnresolvedModule { .. }) => "UNRESOLVED_IMPORT",
            Error::Graph(_) => "GRAPH_ERROR",
            Error::Gen(_) => "CODEGEN_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check tspack.config.json and TSPACK_* variables.\nError: {}",
                msg
            ))),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output name '{}' must stay inside the output directory and must not contain '..' components.",
                path
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            Error::Graph(tspack_graph::Error::CircularDependency { .. }) => Some(Box::new(
                "Bundles are emitted in dependency order; break the cycle by moving shared code into its own module.",
            )),
            Error::Graph(tspack_graph::Error::UnresolvedModule { specifier, .. }) => {
                Some(Box::new(format!(
                    "Check that '{}' exists, or list it in `externals` to leave it to the host require.",
                    specifier
                )))
            }
            Error::Gen(err) => miette::Diagnostic::help(err),
            _ => None,
        }
    }
}
