//! Fragment extraction.
//!
//! Walks the top level of a parsed program and emits one positioned
//! [`CodeFragment`] per directive or statement. Imports, exports, functions,
//! classes and variable statements are rebuilt from their parts in a
//! normalized shape; every other statement is copied verbatim.

use oxc_ast::ast::{
    Class, ClassElement, Declaration, ExportAllDeclaration, ExportNamedDeclaration, Function,
    ImportDeclaration, ImportDeclarationSpecifier, MethodDefinition, ModuleExportName, Program,
    PropertyDefinition, Statement, VariableDeclaration, VariableDeclarationKind,
    VariableDeclarator,
};
use oxc_span::{GetSpan, Span};

use crate::error::{GenError, Result};
use crate::line_index::LineIndex;

/// A positioned unit of generated code.
///
/// `line`/`column` are the 1-based start of the originating node in
/// `source_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    pub code: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub source_file: Option<String>,
}

impl CodeFragment {
    /// A fragment with no original position.
    pub fn synthetic(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            line: None,
            column: None,
            source_file: None,
        }
    }
}

/// Collect fragments for every top-level node of `program`.
///
/// A node whose formatter fails is skipped and reported in `warnings`;
/// its siblings are still processed.
pub fn collect_code_fragments(
    program: &Program<'_>,
    source: &str,
    path: &str,
    warnings: &mut Vec<String>,
) -> Vec<CodeFragment> {
    let extractor = FragmentExtractor::new(source, path);
    let mut fragments = Vec::with_capacity(program.body.len() + program.directives.len());

    if let Some(hashbang) = &program.hashbang {
        extractor.push(&mut fragments, hashbang.span, extractor.verbatim(hashbang.span), warnings);
    }
    for directive in &program.directives {
        extractor.push(&mut fragments, directive.span, extractor.verbatim(directive.span), warnings);
    }
    for statement in &program.body {
        extractor.push(&mut fragments, statement.span(), extractor.statement(statement), warnings);
    }

    fragments
}

/// Join non-empty fragment code with newlines.
pub fn merge_code_fragments(fragments: &[CodeFragment]) -> String {
    fragments
        .iter()
        .filter(|fragment| !fragment.code.is_empty())
        .map(|fragment| fragment.code.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

struct FragmentExtractor<'s> {
    source: &'s str,
    path: &'s str,
    index: LineIndex<'s>,
}

impl<'s> FragmentExtractor<'s> {
    fn new(source: &'s str, path: &'s str) -> Self {
        Self {
            source,
            path,
            index: LineIndex::new(source),
        }
    }

    fn push(
        &self,
        fragments: &mut Vec<CodeFragment>,
        span: Span,
        code: Result<String>,
        warnings: &mut Vec<String>,
    ) {
        match code {
            Ok(code) => {
                let (line, column) = self.index.line_col(span.start);
                fragments.push(CodeFragment {
                    code,
                    line: Some(line),
                    column: Some(column),
                    source_file: Some(self.path.to_string()),
                });
            }
            Err(err) => {
                tracing::warn!(path = self.path, error = %err, "skipping node during fragment generation");
                warnings.push(format!("{}: {}", self.path, err));
            }
        }
    }

    fn text(&self, span: Span) -> Result<&'s str> {
        self.source
            .get(span.start as usize..span.end as usize)
            .ok_or_else(|| GenError::span_out_of_range(self.path, span))
    }

    fn between(&self, start: u32, end: u32) -> Result<&'s str> {
        self.text(Span::new(start, end))
    }

    fn verbatim(&self, span: Span) -> Result<String> {
        self.text(span).map(str::to_string)
    }

    fn statement(&self, statement: &Statement<'_>) -> Result<String> {
        match statement {
            Statement::ImportDeclaration(decl) => self.import(decl),
            Statement::ExportNamedDeclaration(decl) => self.export_named(decl),
            Statement::ExportAllDeclaration(decl) => self.export_all(decl),
            Statement::FunctionDeclaration(func) => self.function(func),
            Statement::ClassDeclaration(class) => self.class(class),
            Statement::VariableDeclaration(var) => self.variable(var),
            other => self.verbatim(other.span()),
        }
    }

    fn declaration(&self, declaration: &Declaration<'_>) -> Result<String> {
        match declaration {
            Declaration::VariableDeclaration(var) => self.variable(var),
            Declaration::FunctionDeclaration(func) => self.function(func),
            Declaration::ClassDeclaration(class) => self.class(class),
            other => self.verbatim(other.span()),
        }
    }

    fn import(&self, decl: &ImportDeclaration<'_>) -> Result<String> {
        let keyword = if decl.import_kind.is_type() {
            "import type"
        } else {
            "import"
        };
        let source = quote(&decl.source.value);
        let attributes = match &decl.with_clause {
            Some(with) => format!(" {}", self.text(with.span)?),
            None => String::new(),
        };

        let Some(specifiers) = &decl.specifiers else {
            return Ok(format!("{keyword} {source}{attributes};"));
        };

        let mut default = None;
        let mut namespace = None;
        let mut named = Vec::new();
        for specifier in specifiers {
            match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                    default = Some(spec.local.name.as_str());
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                    namespace = Some(spec.local.name.as_str());
                }
                ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                    let prefix = if spec.import_kind.is_type() { "type " } else { "" };
                    let imported = export_name(&spec.imported);
                    let local = spec.local.name.as_str();
                    named.push(if imported == local {
                        format!("{prefix}{local}")
                    } else {
                        format!("{prefix}{imported} as {local}")
                    });
                }
            }
        }

        let clause = match (default, namespace) {
            (Some(default), Some(namespace)) => format!("{default}, * as {namespace}"),
            (None, Some(namespace)) => format!("* as {namespace}"),
            (Some(default), None) if named.is_empty() => default.to_string(),
            (Some(default), None) => format!("{default}, {{ {} }}", named.join(", ")),
            (None, None) if named.is_empty() => "{}".to_string(),
            (None, None) => format!("{{ {} }}", named.join(", ")),
        };

        Ok(format!("{keyword} {clause} from {source}{attributes};"))
    }

    fn export_named(&self, decl: &ExportNamedDeclaration<'_>) -> Result<String> {
        if let Some(declaration) = &decl.declaration {
            return Ok(format!("export {}", self.declaration(declaration)?));
        }
        if decl.specifiers.is_empty() {
            return Ok("export {};".to_string());
        }

        let keyword = if decl.export_kind.is_type() {
            "export type"
        } else {
            "export"
        };
        let names: Vec<String> = decl
            .specifiers
            .iter()
            .map(|spec| {
                let prefix = if spec.export_kind.is_type() && !decl.export_kind.is_type() {
                    "type "
                } else {
                    ""
                };
                let local = export_name(&spec.local);
                let exported = export_name(&spec.exported);
                if local == exported {
                    format!("{prefix}{local}")
                } else {
                    format!("{prefix}{local} as {exported}")
                }
            })
            .collect();

        Ok(match &decl.source {
            Some(source) => format!(
                "{keyword} {{ {} }} from {};",
                names.join(", "),
                quote(&source.value)
            ),
            None => format!("{keyword} {{ {} }};", names.join(", ")),
        })
    }

    fn export_all(&self, decl: &ExportAllDeclaration<'_>) -> Result<String> {
        let keyword = if decl.export_kind.is_type() {
            "export type"
        } else {
            "export"
        };
        let source = quote(&decl.source.value);
        Ok(match &decl.exported {
            Some(namespace) => format!("{keyword} * as {} from {source};", export_name(namespace)),
            None => format!("{keyword} * from {source};"),
        })
    }

    /// `function name<T>(params): ReturnType { body }`
    fn function(&self, func: &Function<'_>) -> Result<String> {
        let (Some(id), Some(body)) = (&func.id, &func.body) else {
            // Overload signatures and `declare function` have no body.
            return self.verbatim(func.span);
        };

        let prefix = collapse_whitespace(self.between(func.span.start, id.span.start)?);
        let type_parameters = match &func.type_parameters {
            Some(params) => self.text(params.span)?,
            None => "",
        };
        let params = self.text(func.params.span)?;
        let return_type = collapse_whitespace(self.between(func.params.span.end, body.span.start)?);
        let body = self.text(body.span)?;

        Ok(format!(
            "{prefix} {}{type_parameters}{params}{return_type} {body}",
            id.name
        ))
    }

    /// `class Name<T> extends Base implements Iface { members }`
    fn class(&self, class: &Class<'_>) -> Result<String> {
        let Some(id) = &class.id else {
            return self.verbatim(class.span);
        };

        let prefix = collapse_whitespace(self.between(class.span.start, id.span.start)?);
        let heritage = collapse_whitespace(self.between(id.span.end, class.body.span.start)?);

        let members = class
            .body
            .body
            .iter()
            .map(|member| self.class_member(member))
            .collect::<Result<Vec<_>>>()?;

        let body = if members.is_empty() {
            "{}".to_string()
        } else {
            let indented: Vec<String> = members.iter().map(|m| format!("  {m}")).collect();
            format!("{{\n{}\n}}", indented.join("\n"))
        };

        let heritage = match heritage.as_str() {
            "" => String::new(),
            h if h.starts_with('<') => h.to_string(),
            h => format!(" {h}"),
        };

        Ok(format!("{prefix} {}{heritage} {body}", id.name))
    }

    fn class_member(&self, member: &ClassElement<'_>) -> Result<String> {
        match member {
            ClassElement::MethodDefinition(method) => self.method(method),
            ClassElement::PropertyDefinition(property) => self.property(property),
            other => Ok(self.text(other.span())?.trim().to_string()),
        }
    }

    /// Methods, accessors and constructors: modifiers, key, signature, body.
    fn method(&self, method: &MethodDefinition<'_>) -> Result<String> {
        let Some(body) = &method.value.body else {
            return Ok(self.text(method.span)?.trim().to_string());
        };

        let key_span = method.key.span();
        let modifiers = collapse_whitespace(self.between(method.span.start, key_span.start)?);
        let key = self.text(key_span)?;
        let signature = self.between(key_span.end, body.span.start)?.trim();
        let body = self.text(body.span)?;

        let separator = if modifiers.is_empty() || modifiers.ends_with('[') {
            ""
        } else {
            " "
        };
        Ok(format!("{modifiers}{separator}{key}{signature} {body}"))
    }

    fn property(&self, property: &PropertyDefinition<'_>) -> Result<String> {
        let text = collapse_whitespace(self.text(property.span)?);
        Ok(if text.ends_with(';') {
            text
        } else {
            format!("{text};")
        })
    }

    /// `const|let|var a = init, b = init2;`
    fn variable(&self, var: &VariableDeclaration<'_>) -> Result<String> {
        let keyword = match var.kind {
            VariableDeclarationKind::Const => "const",
            VariableDeclarationKind::Let => "let",
            VariableDeclarationKind::Var => "var",
            _ => return self.verbatim(var.span),
        };
        let declare = if var.declare { "declare " } else { "" };

        let declarators = var
            .declarations
            .iter()
            .map(|declarator| self.declarator(declarator))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!("{declare}{keyword} {};", declarators.join(", ")))
    }

    fn declarator(&self, declarator: &VariableDeclarator<'_>) -> Result<String> {
        match &declarator.init {
            Some(init) => {
                let init_span = init.span();
                let binding = self.between(declarator.span.start, init_span.start)?.trim_end();
                let binding = binding.strip_suffix('=').unwrap_or(binding).trim_end();
                Ok(format!("{binding} = {}", self.text(init_span)?))
            }
            None => Ok(self.text(declarator.span)?.trim().to_string()),
        }
    }
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::StringLiteral(lit) => quote(&lit.value),
        other => other.name().to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Double-quoted JavaScript string literal.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
