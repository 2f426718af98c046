//! Printing a private dependency into its only importer.
//!
//! The absorbed module keeps its statements but loses its `export` syntax;
//! what it exported becomes plain top-level bindings. The importer is then
//! rewritten against those bindings: named and default imports by renaming
//! every reference, namespace imports through a frozen object of getters,
//! and re-exports through local `export { .. }` lists.
//!
//! A merge is refused (`None`) whenever the result would not behave like the
//! two modules did: clashing top-level names, a reference that would be
//! captured by a nested declaration, or an export surface that cannot be
//! listed statically (`export *` inside the absorbed module).

use oxc_allocator::Allocator;
use oxc_ast::AstKind;
use oxc_ast::ast::{
    Declaration, ExportDefaultDeclaration, ExportDefaultDeclarationKind, Expression,
    ImportDeclarationSpecifier, ModuleExportName, Statement, TSModuleReference,
};
use oxc_codegen::Codegen;
use oxc_semantic::SemanticBuilder;
use oxc_span::{GetSpan, Span};
use rustc_hash::FxHashSet;
use tspack_graph::{FxIndexMap, MergeRequest};

use crate::error::Result;
use crate::fragment::quote;
use crate::parser::{ParseOptions, parse};

/// Local name given to an anonymous default export.
const DEFAULT_LOCAL: &str = "__tspack_default";

/// Merge `request.source` into `request.target`, or `None` when the pair
/// cannot share one scope.
pub(crate) fn merge_modules(request: MergeRequest<'_>) -> Result<Option<String>> {
    let target_path = request.target.id.path_string();
    let source_path = request.source.id.path_string();

    let relocated = relocate_specifiers(&request.source.code, &source_path, request)?;
    let Some(absorbed) = absorb(&relocated, &source_path)? else {
        tracing::debug!(source = %source_path, "export surface cannot be inlined");
        return Ok(None);
    };
    let Some(rebound) = rebind(
        &request.target.code,
        &target_path,
        request.dropped_specifiers,
        &absorbed,
    )?
    else {
        return Ok(None);
    };

    if let Some(name) = clash(&rebound.scope, &absorbed.scope) {
        tracing::debug!(target = %target_path, source = %source_path, name, "top-level names clash");
        return Ok(None);
    }

    let allocator = Allocator::default();
    let target = parse(
        &allocator,
        &rebound.code,
        &target_path,
        ParseOptions::from_path(&target_path),
    )?;
    let source = parse(
        &allocator,
        &absorbed.code,
        &source_path,
        ParseOptions::from_path(&source_path),
    )?;

    let mut merged = target.program;
    for statement in source.program.body {
        merged.body.push(statement);
    }
    Ok(Some(Codegen::new().build(&merged).code))
}

/// Top-level names a module declares and the free names it reads.
#[derive(Debug, Default)]
struct ScopeNames {
    declared: FxHashSet<String>,
    free: FxHashSet<String>,
}

/// First name that would change meaning once both modules share a scope.
fn clash(target: &ScopeNames, source: &ScopeNames) -> Option<String> {
    target
        .declared
        .iter()
        .find(|name| source.declared.contains(*name) || source.free.contains(*name))
        .or_else(|| target.free.iter().find(|name| source.declared.contains(*name)))
        .cloned()
}

/// One export of the absorbed module.
#[derive(Debug, Clone)]
struct Binding {
    local: String,
    type_only: bool,
}

/// The absorbed module with its export syntax removed.
#[derive(Debug)]
struct Absorbed {
    code: String,
    /// Export name to the top-level binding that now holds it, in source order.
    exports: FxIndexMap<String, Binding>,
    scope: ScopeNames,
}

impl Absorbed {
    /// Getter object standing in for `import * as name`.
    fn namespace_object(&self) -> String {
        let getters: Vec<String> = self
            .exports
            .iter()
            .filter(|(_, binding)| !binding.type_only)
            .map(|(name, binding)| format!("get {}() {{ return {}; }}", quote(name), binding.local))
            .collect();
        if getters.is_empty() {
            "Object.freeze({ __proto__: null })".to_string()
        } else {
            format!("Object.freeze({{ __proto__: null, {} }})", getters.join(", "))
        }
    }

    /// Specifier list re-exporting every runtime export except `default`.
    fn star_specifiers(&self) -> Vec<String> {
        self.exports
            .iter()
            .filter(|(name, binding)| name.as_str() != "default" && !binding.type_only)
            .map(|(name, binding)| export_specifier(&binding.local, name))
            .collect()
    }
}

fn absorb(code: &str, path: &str) -> Result<Option<Absorbed>> {
    let allocator = Allocator::default();
    let parsed = parse(&allocator, code, path, ParseOptions::from_path(path))?;
    let program = &parsed.program;
    let semantic = SemanticBuilder::new().build(program).semantic;
    let scoping = semantic.scoping();

    let mut scope = ScopeNames {
        declared: scoping
            .get_bindings(scoping.root_scope_id())
            .keys()
            .map(|name| name.to_string())
            .collect(),
        free: scoping
            .root_unresolved_references()
            .keys()
            .map(|name| name.to_string())
            .collect(),
    };
    if scope.declared.contains(DEFAULT_LOCAL) {
        return Ok(None);
    }
    let is_type = |local: &str| {
        scoping
            .get_root_binding(local)
            .is_some_and(|symbol| !scoping.symbol_flags(symbol).is_value())
    };

    let mut exports: FxIndexMap<String, Binding> = FxIndexMap::default();
    let mut edits = Edits::default();
    let mut reexports = 0usize;

    for statement in &program.body {
        match statement {
            Statement::ExportNamedDeclaration(decl) => {
                if decl.with_clause.is_some() {
                    return Ok(None);
                }
                if let Some(declaration) = &decl.declaration {
                    edits.remove(Span::new(decl.span.start, declaration.span().start));
                    let type_only = decl.export_kind.is_type() || !declaration_is_value(declaration);
                    for name in declared_names(declaration) {
                        exports.insert(name.clone(), Binding { local: name, type_only });
                    }
                } else if let Some(from) = &decl.source {
                    let mut specifiers = Vec::with_capacity(decl.specifiers.len());
                    for spec in &decl.specifiers {
                        let local = format!("__tspack_reexport_{reexports}");
                        reexports += 1;
                        let type_only = decl.export_kind.is_type() || spec.export_kind.is_type();
                        specifiers.push(format!(
                            "{}{} as {local}",
                            if spec.export_kind.is_type() { "type " } else { "" },
                            export_name(&spec.local)
                        ));
                        scope.declared.insert(local.clone());
                        exports.insert(spec.exported.name().to_string(), Binding { local, type_only });
                    }
                    let keyword = if decl.export_kind.is_type() { "import type" } else { "import" };
                    edits.replace(
                        decl.span,
                        format!("{keyword} {{ {} }} from {};", specifiers.join(", "), from.span.source_text(code)),
                    );
                } else {
                    for spec in &decl.specifiers {
                        let local = spec.local.name().to_string();
                        let type_only =
                            decl.export_kind.is_type() || spec.export_kind.is_type() || is_type(&local);
                        exports.insert(spec.exported.name().to_string(), Binding { local, type_only });
                    }
                    edits.remove(decl.span);
                }
            }
            Statement::ExportDefaultDeclaration(decl) => {
                let local = absorb_default(code, decl, &mut edits);
                let type_only = matches!(decl.declaration, ExportDefaultDeclarationKind::TSInterfaceDeclaration(_))
                    || is_type(&local);
                if local == DEFAULT_LOCAL {
                    scope.declared.insert(local.clone());
                }
                exports.insert("default".to_string(), Binding { local, type_only });
            }
            Statement::ExportAllDeclaration(decl) => {
                if decl.with_clause.is_some() {
                    return Ok(None);
                }
                match &decl.exported {
                    Some(ModuleExportName::IdentifierName(name)) if name.name != "default" => {
                        let keyword = if decl.export_kind.is_type() { "import type" } else { "import" };
                        edits.replace(
                            decl.span,
                            format!("{keyword} * as {} from {};", name.name, decl.source.span.source_text(code)),
                        );
                        scope.declared.insert(name.name.to_string());
                        exports.insert(
                            name.name.to_string(),
                            Binding {
                                local: name.name.to_string(),
                                type_only: decl.export_kind.is_type(),
                            },
                        );
                    }
                    None if decl.export_kind.is_type() => edits.remove(decl.span),
                    _ => return Ok(None),
                }
            }
            Statement::TSExportAssignment(_) | Statement::TSNamespaceExportDeclaration(_) => {
                return Ok(None);
            }
            _ => {}
        }
    }

    Ok(Some(Absorbed {
        code: edits.apply(code),
        exports,
        scope,
    }))
}

/// Turn `export default ...` into a plain declaration and return the local
/// name that holds the default export.
fn absorb_default(
    code: &str,
    decl: &ExportDefaultDeclaration<'_>,
    edits: &mut Edits,
) -> String {
    let prefix = |start: u32| Span::new(decl.span.start, start);
    match &decl.declaration {
        ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
            edits.remove(prefix(func.span.start));
            match &func.id {
                Some(id) => id.name.to_string(),
                None => {
                    // Keep it a hoisted declaration by naming it.
                    let at = func
                        .type_parameters
                        .as_ref()
                        .map_or(func.params.span.start, |params| params.span.start);
                    edits.insert(at, format!(" {DEFAULT_LOCAL}"));
                    DEFAULT_LOCAL.to_string()
                }
            }
        }
        ExportDefaultDeclarationKind::ClassDeclaration(class) => match &class.id {
            Some(id) => {
                edits.remove(prefix(class.span.start));
                id.name.to_string()
            }
            None => {
                edits.replace(prefix(class.span.start), format!("const {DEFAULT_LOCAL} = "));
                edits.insert(decl.span.end, ";");
                DEFAULT_LOCAL.to_string()
            }
        },
        ExportDefaultDeclarationKind::TSInterfaceDeclaration(interface) => {
            edits.remove(prefix(interface.span.start));
            interface.id.name.to_string()
        }
        kind => match kind.as_expression() {
            Some(Expression::Identifier(ident)) => {
                edits.remove(decl.span);
                ident.name.to_string()
            }
            Some(expression) => {
                edits.replace(prefix(expression.span().start), format!("const {DEFAULT_LOCAL} = "));
                if !decl.span.source_text(code).trim_end().ends_with(';') {
                    edits.insert(decl.span.end, ";");
                }
                DEFAULT_LOCAL.to_string()
            }
            None => DEFAULT_LOCAL.to_string(),
        },
    }
}

/// The importer, rewritten to read the absorbed module's bindings.
#[derive(Debug)]
struct Rebound {
    code: String,
    scope: ScopeNames,
}

fn rebind(
    code: &str,
    path: &str,
    dropped: &[String],
    absorbed: &Absorbed,
) -> Result<Option<Rebound>> {
    let allocator = Allocator::default();
    let parsed = parse(&allocator, code, path, ParseOptions::from_path(path))?;
    let program = &parsed.program;
    let semantic = SemanticBuilder::new().build(program).semantic;
    let scoping = semantic.scoping();
    let nodes = semantic.nodes();

    let is_dropped = |specifier: &str| dropped.iter().any(|d| d == specifier);
    let lookup = |name: &str| {
        let binding = absorbed.exports.get(name);
        if binding.is_none() {
            tracing::debug!(path, name, "imported name is not exported by the merged module");
        }
        binding
    };

    let mut edits = Edits::default();
    let mut renames = Vec::new();
    let mut removed: FxHashSet<String> = FxHashSet::default();
    let mut introduced: FxHashSet<String> = FxHashSet::default();
    let mut namespaces = 0usize;

    for statement in &program.body {
        match statement {
            Statement::ImportDeclaration(decl) if is_dropped(decl.source.value.as_str()) => {
                let mut replacement = String::new();
                for specifier in decl.specifiers.iter().flatten() {
                    let (imported, local) = match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                            (spec.imported.name().to_string(), &spec.local)
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                            ("default".to_string(), &spec.local)
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                            if !decl.import_kind.is_type() {
                                replacement.push_str(&format!(
                                    "const {} = {};",
                                    spec.local.name,
                                    absorbed.namespace_object()
                                ));
                            } else {
                                removed.insert(spec.local.name.to_string());
                            }
                            continue;
                        }
                    };
                    let (Some(binding), Some(symbol)) = (lookup(&imported), local.symbol_id.get()) else {
                        return Ok(None);
                    };
                    removed.insert(local.name.to_string());
                    renames.push((symbol, binding.local.clone()));
                }
                edits.replace(decl.span, replacement);
            }
            Statement::ExportNamedDeclaration(decl)
                if decl.source.as_ref().is_some_and(|from| is_dropped(from.value.as_str())) =>
            {
                let mut specifiers = Vec::with_capacity(decl.specifiers.len());
                for spec in &decl.specifiers {
                    let Some(binding) = lookup(spec.local.name().as_str()) else {
                        return Ok(None);
                    };
                    let exported = spec.exported.name();
                    specifiers.push(format!(
                        "{}{}",
                        if spec.export_kind.is_type() { "type " } else { "" },
                        export_specifier(&binding.local, exported.as_str())
                    ));
                }
                let keyword = if decl.export_kind.is_type() { "export type" } else { "export" };
                edits.replace(decl.span, format!("{keyword} {{ {} }};", specifiers.join(", ")));
            }
            Statement::ExportAllDeclaration(decl) if is_dropped(decl.source.value.as_str()) => {
                if decl.export_kind.is_type() {
                    edits.remove(decl.span);
                    continue;
                }
                let replacement = match &decl.exported {
                    Some(exported) => {
                        let local = format!("__tspack_ns_{namespaces}");
                        namespaces += 1;
                        let text = format!(
                            "const {local} = {}; export {{ {} }};",
                            absorbed.namespace_object(),
                            export_specifier(&local, exported.name().as_str())
                        );
                        introduced.insert(local);
                        text
                    }
                    None => {
                        let specifiers = absorbed.star_specifiers();
                        if specifiers.is_empty() {
                            String::new()
                        } else {
                            format!("export {{ {} }};", specifiers.join(", "))
                        }
                    }
                };
                edits.replace(decl.span, replacement);
            }
            Statement::TSImportEqualsDeclaration(decl) => {
                if let TSModuleReference::ExternalModuleReference(external) = &decl.module_reference {
                    if is_dropped(external.expression.value.as_str()) {
                        return Ok(None);
                    }
                }
            }
            _ => {}
        }
    }

    for (symbol, name) in renames {
        if scoping.symbol_name(symbol) == name {
            continue;
        }
        for reference in scoping.get_resolved_references(symbol) {
            let node = nodes.get_node(reference.node_id());
            let AstKind::IdentifierReference(ident) = node.kind() else {
                continue;
            };
            if scoping.find_binding(node.scope_id(), &name).is_some() {
                tracing::debug!(path, name, "renamed import would be shadowed");
                return Ok(None);
            }
            match nodes.parent_kind(node.id()) {
                AstKind::ObjectProperty(prop) if prop.shorthand => {
                    edits.replace(prop.span, format!("{}: {name}", ident.name));
                }
                AstKind::ExportSpecifier(spec) => {
                    let kind = if spec.export_kind.is_type() { "type " } else { "" };
                    edits.replace(
                        spec.span,
                        format!("{kind}{}", export_specifier(&name, spec.exported.name().as_str())),
                    );
                }
                _ => edits.replace(ident.span, name.clone()),
            }
        }
    }

    let declared = scoping
        .get_bindings(scoping.root_scope_id())
        .keys()
        .map(|name| name.to_string())
        .filter(|name| !removed.contains(name))
        .chain(introduced)
        .collect();
    let free = scoping
        .root_unresolved_references()
        .keys()
        .map(|name| name.to_string())
        .collect();

    Ok(Some(Rebound {
        code: edits.apply(code),
        scope: ScopeNames { declared, free },
    }))
}

/// `local as exported`, or just `local` when the names agree.
fn export_specifier(local: &str, exported: &str) -> String {
    if local == exported {
        local.to_string()
    } else if is_identifier_name(exported) {
        format!("{local} as {exported}")
    } else {
        format!("{local} as {}", quote(exported))
    }
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$')
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::StringLiteral(literal) => quote(&literal.value),
        other => other.name().to_string(),
    }
}

fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    match declaration {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .flat_map(|declarator| declarator.id.get_binding_identifiers())
            .map(|ident| ident.name.to_string())
            .collect(),
        other => other.id().map(|id| id.name.to_string()).into_iter().collect(),
    }
}

fn declaration_is_value(declaration: &Declaration<'_>) -> bool {
    !matches!(
        declaration,
        Declaration::TSTypeAliasDeclaration(_) | Declaration::TSInterfaceDeclaration(_)
    ) && !declaration.declare()
}

/// Rewrite the module specifiers of the absorbed module with the request's
/// relocations, so they stay valid from the target's directory.
fn relocate_specifiers(code: &str, path: &str, request: MergeRequest<'_>) -> Result<String> {
    if request.relocations.is_empty() {
        return Ok(code.to_string());
    }

    let allocator = Allocator::default();
    let parsed = parse(&allocator, code, path, ParseOptions::from_path(path))?;

    let mut edits = Edits::default();
    for statement in &parsed.program.body {
        let literal = match statement {
            Statement::ImportDeclaration(decl) => Some(&decl.source),
            Statement::ExportNamedDeclaration(decl) => decl.source.as_ref(),
            Statement::ExportAllDeclaration(decl) => Some(&decl.source),
            _ => None,
        };
        let Some(literal) = literal else {
            continue;
        };
        if let Some(target) = request.relocations.get(literal.value.as_str()) {
            edits.replace(literal.span(), quote(target));
        }
    }
    Ok(edits.apply(code))
}

/// Non-overlapping span replacements over one text.
#[derive(Debug, Default)]
struct Edits(Vec<(Span, String)>);

impl Edits {
    fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.0.push((span, text.into()));
    }

    fn remove(&mut self, span: Span) {
        self.replace(span, String::new());
    }

    fn insert(&mut self, at: u32, text: impl Into<String>) {
        self.replace(Span::new(at, at), text);
    }

    /// Apply back to front so earlier offsets stay valid.
    fn apply(mut self, code: &str) -> String {
        self.0
            .sort_by_key(|(span, _)| std::cmp::Reverse((span.start, span.end)));
        let mut out = code.to_string();
        for (span, text) in self.0 {
            out.replace_range(span.start as usize..span.end as usize, &text);
        }
        out
    }
}
