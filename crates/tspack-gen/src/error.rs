//! Errors raised while generating bundle code.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum GenError {
    /// Source text could not be parsed
    #[error("Failed to parse {path}: {message}")]
    #[diagnostic(code(tspack::gen::parse_failed))]
    Parse { path: String, message: String },

    /// A node's span does not fit the text it was parsed from
    #[error("Span {start}..{end} is outside {path}")]
    #[diagnostic(
        code(tspack::gen::span_out_of_range),
        help("the source text changed between parsing and printing")
    )]
    SpanOutOfRange { path: String, start: u32, end: u32 },

    /// The downlevel transform rejected the program
    #[error("Transform failed for {path}: {message}")]
    #[diagnostic(
        code(tspack::gen::transform_failed),
        help("check that the target is one of es5, es2015..es2022, esnext")
    )]
    Transform { path: String, message: String },

    /// The minifier failed
    #[error("Minification failed: {0}")]
    #[diagnostic(code(tspack::gen::minify_failed))]
    Minify(String),

    /// A source map could not be built, parsed or composed
    #[error("Source map error: {0}")]
    #[diagnostic(code(tspack::gen::sourcemap))]
    SourceMap(String),

    #[error(transparent)]
    #[diagnostic(code(tspack::gen::runtime))]
    Runtime(#[from] tspack_graph::RuntimeError),
}

impl GenError {
    pub fn span_out_of_range(path: impl Into<String>, span: oxc_span::Span) -> Self {
        Self::SpanOutOfRange {
            path: path.into(),
            start: span.start,
            end: span.end,
        }
    }
}

impl From<GenError> for tspack_graph::Error {
    fn from(err: GenError) -> Self {
        match err {
            GenError::Parse { path, message } => tspack_graph::Error::Parse { path, message },
            other => tspack_graph::Error::Syntax(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
