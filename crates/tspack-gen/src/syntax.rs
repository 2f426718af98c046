//! [`ModuleSyntax`] backed by the OXC parser and printer.

use oxc_allocator::Allocator;
use oxc_ast::AstKind;
use oxc_ast::ast::{ImportDeclarationSpecifier, Statement, TSModuleReference};
use oxc_ast_visit::Visit;
use tspack_graph::{MergeRequest, Module, ModuleSyntax};

use crate::error::Result;
use crate::merge::merge_modules;
use crate::parser::{ParseOptions, parse};

/// Parses modules to weigh them and to print merged modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct OxcSyntax;

impl OxcSyntax {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Default)]
struct NodeCounter {
    count: usize,
}

impl<'a> Visit<'a> for NodeCounter {
    fn enter_node(&mut self, _kind: AstKind<'a>) {
        self.count += 1;
    }
}

impl ModuleSyntax for OxcSyntax {
    fn weight(&self, module: &Module) -> tspack_graph::Result<usize> {
        let allocator = Allocator::default();
        let path = module.id.path_string();
        let parsed = parse(&allocator, &module.code, &path, ParseOptions::from_path(&path))?;

        let mut counter = NodeCounter::default();
        counter.visit_program(&parsed.program);
        Ok(counter.count)
    }

    fn merge(&self, request: MergeRequest<'_>) -> tspack_graph::Result<Option<String>> {
        let merged = merge_modules(request)?;
        tracing::debug!(
            target = %request.target.id,
            source = %request.source.id,
            merged = merged.is_some(),
            "printed merged module"
        );
        Ok(merged)
    }
}

/// Specifiers a module loads at runtime, in source order without duplicates.
///
/// Type-only imports and re-exports are skipped, as are imports whose every
/// binding is type-only; the CommonJS lowering elides the same statements.
pub fn collect_specifiers(path: &str, code: &str) -> Result<Vec<String>> {
    let allocator = Allocator::default();
    let parsed = parse(&allocator, code, path, ParseOptions::from_path(path))?;

    let mut specifiers: Vec<String> = Vec::new();
    for statement in &parsed.program.body {
        let specifier = match statement {
            Statement::ImportDeclaration(decl) => {
                let type_only = decl.import_kind.is_type()
                    || decl.specifiers.as_ref().is_some_and(|specifiers| {
                        !specifiers.is_empty()
                            && specifiers.iter().all(|specifier| {
                                matches!(specifier, ImportDeclarationSpecifier::ImportSpecifier(spec) if spec.import_kind.is_type())
                            })
                    });
                (!type_only).then_some(decl.source.value.as_str())
            }
            Statement::ExportNamedDeclaration(decl) => {
                let type_only = decl.export_kind.is_type()
                    || (!decl.specifiers.is_empty()
                        && decl.specifiers.iter().all(|spec| spec.export_kind.is_type()));
                decl.source
                    .as_ref()
                    .filter(|_| !type_only)
                    .map(|source| source.value.as_str())
            }
            Statement::ExportAllDeclaration(decl) => {
                (!decl.export_kind.is_type()).then_some(decl.source.value.as_str())
            }
            Statement::TSImportEqualsDeclaration(decl) => match &decl.module_reference {
                TSModuleReference::ExternalModuleReference(external)
                    if !decl.import_kind.is_type() =>
                {
                    Some(external.expression.value.as_str())
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(specifier) = specifier {
            if !specifiers.iter().any(|known| known == specifier) {
                specifiers.push(specifier.to_string());
            }
        }
    }
    Ok(specifiers)
}
