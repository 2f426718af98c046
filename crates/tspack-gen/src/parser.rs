//! Parser façade over `oxc_parser`.
//!
//! Every stage that needs a syntax tree (fragment extraction, CommonJS
//! lowering, node counting, merging) parses through here so source-type
//! detection and error reporting stay uniform.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::error::{GenError, Result};

/// Parse options for reading source code
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Source type (JavaScript, TypeScript, JSX, TSX)
    pub source_type: SourceType,
    /// Allow parsing errors (returns partial AST)
    pub allow_errors: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::typescript()
    }
}

impl ParseOptions {
    /// Detect the source type from a file path, falling back to TypeScript
    pub fn from_path(path: &str) -> Self {
        Self {
            source_type: source_type_for(path),
            allow_errors: false,
        }
    }

    /// Create parse options for TypeScript modules
    pub fn typescript() -> Self {
        Self {
            source_type: SourceType::ts(),
            allow_errors: false,
        }
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }
}

/// Source type for a path; unknown extensions are treated as TypeScript.
pub fn source_type_for(path: &str) -> SourceType {
    SourceType::from_path(path).unwrap_or(SourceType::ts())
}

/// Parsed program with AST and the text it borrows from
pub struct ParsedProgram<'a> {
    /// The parsed AST program
    pub program: Program<'a>,
    /// Parse diagnostics, only populated when `allow_errors` is set
    pub diagnostics: Vec<String>,
    /// Original source text
    pub source_text: &'a str,
}

impl<'a> ParsedProgram<'a> {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Parse source code into an AST allocated in `allocator`.
///
/// `path` is only used for error messages.
pub fn parse<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    path: &str,
    options: ParseOptions,
) -> Result<ParsedProgram<'a>> {
    let result = Parser::new(allocator, source, options.source_type).parse();

    let diagnostics: Vec<String> = result.errors.iter().map(|err| err.to_string()).collect();

    if result.panicked || (!options.allow_errors && !diagnostics.is_empty()) {
        return Err(GenError::Parse {
            path: path.to_string(),
            message: diagnostics.join(", "),
        });
    }

    Ok(ParsedProgram {
        program: result.program,
        diagnostics,
        source_text: source,
    })
}
