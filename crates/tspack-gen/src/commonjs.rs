//! ES module syntax lowered to the CommonJS shape the bundle runtime
//! executes.
//!
//! Only top-level module declarations are rewritten, each in place, so the
//! rest of the module keeps its exact text and line layout. Imports become
//! `require` calls, exports become getters installed by `__export`.
//! Specifiers are passed through a caller-supplied rewrite so internal
//! modules can be addressed by their registered path.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, BindingPatternKind, Declaration, ExportAllDeclaration,
    ExportDefaultDeclaration, ExportDefaultDeclarationKind, ExportNamedDeclaration,
    ImportDeclaration, ImportDeclarationSpecifier, Program, Statement,
    TSModuleReference,
};
use oxc_span::{GetSpan, Span};
use rustc_hash::FxHashSet;

use crate::error::{GenError, Result};
use crate::fragment::quote;
use crate::parser::{ParseOptions, parse};

/// Helpers referenced by lowered modules. The bundle preamble defines them
/// once for every module.
pub const RUNTIME_HELPERS: &str = r#"function __interopDefault(m) {
  return m && m.__esModule ? m["default"] : m;
}
function __export(target, getters) {
  Object.defineProperty(target, "__esModule", { value: true });
  for (var name in getters) {
    Object.defineProperty(target, name, { enumerable: true, get: getters[name] });
  }
}
function __exportStar(target, source) {
  Object.keys(source).forEach(function (name) {
    if (name !== "default" && !Object.prototype.hasOwnProperty.call(target, name)) {
      Object.defineProperty(target, name, {
        enumerable: true,
        get: function () {
          return source[name];
        }
      });
    }
  });
  return target;
}"#;

/// Rewrite the module syntax of `code` (read from `path`) into
/// `require`/`exports` form.
///
/// `rewrite` maps every import specifier to the string passed to `require`.
/// Code without module syntax is returned unchanged.
pub fn lower_to_commonjs(path: &str, code: &str, rewrite: &dyn Fn(&str) -> String) -> Result<String> {
    let allocator = Allocator::default();
    let parsed = parse(&allocator, code, path, ParseOptions::from_path(path))?;

    let mut lowering = Lowering {
        source: code,
        path,
        rewrite,
        edits: Vec::new(),
        exports: Vec::new(),
        type_names: type_only_names(&parsed.program),
        temp_count: 0,
        module_syntax: false,
    };
    lowering.program(&parsed.program)?;
    Ok(lowering.finish(&parsed.program))
}

struct Lowering<'s> {
    source: &'s str,
    path: &'s str,
    rewrite: &'s dyn Fn(&str) -> String,
    edits: Vec<(Span, String)>,
    /// `(exported name, expression read by the getter)`
    exports: Vec<(String, String)>,
    type_names: FxHashSet<String>,
    temp_count: usize,
    module_syntax: bool,
}

impl<'s> Lowering<'s> {
    fn program(&mut self, program: &Program<'_>) -> Result<()> {
        if let Some(hashbang) = &program.hashbang {
            self.edits.push((hashbang.span, String::new()));
        }

        for statement in &program.body {
            match statement {
                Statement::ImportDeclaration(decl) => self.import(decl),
                Statement::ExportNamedDeclaration(decl) => self.export_named(decl)?,
                Statement::ExportDefaultDeclaration(decl) => self.export_default(decl)?,
                Statement::ExportAllDeclaration(decl) => self.export_all(decl),
                Statement::TSExportAssignment(assign) => {
                    self.module_syntax = true;
                    let value = self.text(assign.expression.span())?;
                    self.edits.push((assign.span, format!("module.exports = {value};")));
                }
                Statement::TSNamespaceExportDeclaration(decl) => {
                    self.edits.push((decl.span, String::new()));
                }
                Statement::TSImportEqualsDeclaration(decl) => {
                    if let TSModuleReference::ExternalModuleReference(external) =
                        &decl.module_reference
                    {
                        let replacement = if decl.import_kind.is_type() {
                            String::new()
                        } else {
                            format!(
                                "const {} = {};",
                                decl.id.name,
                                self.require(&external.expression.value)
                            )
                        };
                        self.edits.push((decl.span, replacement));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn finish(mut self, program: &Program<'_>) -> String {
        if self.module_syntax || !self.exports.is_empty() {
            let getters = self
                .exports
                .iter()
                .map(|(name, expr)| format!("{}: function () {{ return {expr}; }}", quote(name)))
                .collect::<Vec<_>>()
                .join(", ");
            let header = if getters.is_empty() {
                "__export(exports, {});".to_string()
            } else {
                format!("__export(exports, {{ {getters} }});")
            };

            match program.directives.last() {
                Some(directive) => {
                    let at = directive.span.end;
                    self.edits.push((Span::new(at, at), format!(" {header}")));
                }
                None => self.edits.push((Span::new(0, 0), format!("{header} "))),
            }
        }

        apply_edits(self.source, self.edits)
    }

    fn text(&self, span: Span) -> Result<&'s str> {
        self.source
            .get(span.start as usize..span.end as usize)
            .ok_or_else(|| GenError::span_out_of_range(self.path, span))
    }

    fn require(&self, specifier: &str) -> String {
        format!("require({})", quote(&(self.rewrite)(specifier)))
    }

    fn temp(&mut self) -> String {
        let name = format!("__tspack_import_{}", self.temp_count);
        self.temp_count += 1;
        name
    }

    fn import(&mut self, decl: &ImportDeclaration<'_>) {
        self.module_syntax = true;
        if decl.import_kind.is_type() {
            self.edits.push((decl.span, String::new()));
            return;
        }

        let require = self.require(&decl.source.value);
        let Some(specifiers) = &decl.specifiers else {
            self.edits.push((decl.span, format!("{require};")));
            return;
        };

        let values: Vec<_> = specifiers
            .iter()
            .filter(|specifier| {
                !matches!(specifier, ImportDeclarationSpecifier::ImportSpecifier(spec) if spec.import_kind.is_type())
            })
            .collect();
        if values.is_empty() {
            // `import { type A } from "..."` is elided entirely, like the
            // compiler does without `verbatimModuleSyntax`.
            self.edits.push((decl.span, String::new()));
            return;
        }

        let holder = match values.as_slice() {
            [ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec)] => {
                self.edits
                    .push((decl.span, format!("const {} = {require};", spec.local.name)));
                return;
            }
            _ => self.temp(),
        };

        let mut statements = vec![format!("const {holder} = {require};")];
        for specifier in values {
            statements.push(match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                    format!("const {} = __interopDefault({holder});", spec.local.name)
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                    format!("const {} = {holder};", spec.local.name)
                }
                ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                    format!(
                        "const {} = {};",
                        spec.local.name,
                        member(&holder, &spec.imported.name())
                    )
                }
            });
        }
        self.edits.push((decl.span, statements.join(" ")));
    }

    fn export_named(&mut self, decl: &ExportNamedDeclaration<'_>) -> Result<()> {
        self.module_syntax = true;
        if decl.export_kind.is_type() {
            self.edits.push((decl.span, String::new()));
            return Ok(());
        }

        if let Some(declaration) = &decl.declaration {
            let text = self.text(declaration.span())?.to_string();
            for name in declared_value_names(declaration) {
                self.exports.push((name.clone(), name));
            }
            self.edits.push((decl.span, text));
            return Ok(());
        }

        let specifiers: Vec<_> = decl
            .specifiers
            .iter()
            .filter(|spec| !spec.export_kind.is_type())
            .collect();
        if specifiers.is_empty() && !decl.specifiers.is_empty() {
            self.edits.push((decl.span, String::new()));
            return Ok(());
        }

        match &decl.source {
            Some(source) => {
                let holder = self.temp();
                let require = self.require(&source.value);
                for spec in specifiers {
                    let exported = spec.exported.name().to_string();
                    let expr = member(&holder, &spec.local.name());
                    self.exports.push((exported, expr));
                }
                self.edits
                    .push((decl.span, format!("const {holder} = {require};")));
            }
            None => {
                for spec in specifiers {
                    let local = spec.local.name().to_string();
                    if self.type_names.contains(&local) {
                        continue;
                    }
                    self.exports.push((spec.exported.name().to_string(), local));
                }
                self.edits.push((decl.span, String::new()));
            }
        }
        Ok(())
    }

    fn export_default(&mut self, decl: &ExportDefaultDeclaration<'_>) -> Result<()> {
        self.module_syntax = true;
        let replacement = match &decl.declaration {
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => String::new(),
            ExportDefaultDeclarationKind::FunctionDeclaration(func) if func.id.is_some() => {
                if let Some(id) = &func.id {
                    self.exports.push(("default".to_string(), id.name.to_string()));
                }
                self.text(func.span)?.to_string()
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) if class.id.is_some() => {
                if let Some(id) = &class.id {
                    self.exports.push(("default".to_string(), id.name.to_string()));
                }
                self.text(class.span)?.to_string()
            }
            other => format!("exports.default = {};", self.text(other.span())?),
        };
        self.edits.push((decl.span, replacement));
        Ok(())
    }

    fn export_all(&mut self, decl: &ExportAllDeclaration<'_>) {
        self.module_syntax = true;
        if decl.export_kind.is_type() {
            self.edits.push((decl.span, String::new()));
            return;
        }

        let require = self.require(&decl.source.value);
        let replacement = match &decl.exported {
            Some(exported) => {
                let holder = self.temp();
                self.exports.push((exported.name().to_string(), holder.clone()));
                format!("const {holder} = {require};")
            }
            None => format!("__exportStar(exports, {require});"),
        };
        self.edits.push((decl.span, replacement));
    }
}

/// Runtime names bound by an exported declaration. Type-level and ambient
/// declarations bind nothing at runtime.
fn declared_value_names(declaration: &Declaration<'_>) -> Vec<String> {
    let mut names = Vec::new();
    match declaration {
        Declaration::VariableDeclaration(var) if !var.declare => {
            for declarator in &var.declarations {
                binding_names(&declarator.id, &mut names);
            }
        }
        Declaration::FunctionDeclaration(func) if !func.declare => {
            names.extend(func.id.iter().map(|id| id.name.to_string()));
        }
        Declaration::ClassDeclaration(class) if !class.declare => {
            names.extend(class.id.iter().map(|id| id.name.to_string()));
        }
        Declaration::TSEnumDeclaration(decl) if !decl.declare => {
            names.push(decl.id.name.to_string());
        }
        _ => {}
    }
    names
}

fn binding_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(id) => names.push(id.name.to_string()),
        BindingPatternKind::ObjectPattern(object) => {
            for property in &object.properties {
                binding_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                binding_names(element, names);
            }
            if let Some(rest) = &array.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assign) => binding_names(&assign.left, names),
    }
}

/// Names that only exist at the type level: interfaces, type aliases,
/// ambient declarations and type-only imports.
fn type_only_names(program: &Program<'_>) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    for statement in &program.body {
        let declaration = match statement {
            Statement::ExportNamedDeclaration(decl) => decl.declaration.as_ref(),
            Statement::ImportDeclaration(decl) => {
                for specifier in decl.specifiers.iter().flatten() {
                    let (local, type_only) = match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                            (&spec.local, spec.import_kind.is_type())
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => (&spec.local, false),
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => (&spec.local, false),
                    };
                    if type_only || decl.import_kind.is_type() {
                        names.insert(local.name.to_string());
                    }
                }
                None
            }
            other => other.as_declaration(),
        };
        let Some(declaration) = declaration else {
            continue;
        };
        match declaration {
            Declaration::TSInterfaceDeclaration(decl) => {
                names.insert(decl.id.name.to_string());
            }
            Declaration::TSTypeAliasDeclaration(decl) => {
                names.insert(decl.id.name.to_string());
            }
            Declaration::VariableDeclaration(var) if var.declare => {
                for declarator in &var.declarations {
                    let mut bound = Vec::new();
                    binding_names(&declarator.id, &mut bound);
                    names.extend(bound);
                }
            }
            Declaration::FunctionDeclaration(func) if func.declare => {
                names.extend(func.id.iter().map(|id| id.name.to_string()));
            }
            Declaration::ClassDeclaration(class) if class.declare => {
                names.extend(class.id.iter().map(|id| id.name.to_string()));
            }
            _ => {}
        }
    }
    names
}

/// Property read of `name` on `object`, bracketed when `name` is not an
/// identifier.
fn member(object: &str, name: &str) -> String {
    let is_identifier = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        format!("{object}.{name}")
    } else {
        format!("{object}[{}]", quote(name))
    }
}

fn apply_edits(source: &str, mut edits: Vec<(Span, String)>) -> String {
    edits.sort_by_key(|(span, _)| (span.start, span.end));
    let mut out = String::with_capacity(source.len() + 64);
    let mut cursor = 0usize;
    for (span, replacement) in edits {
        let start = span.start as usize;
        if start < cursor {
            continue;
        }
        out.push_str(source.get(cursor..start).unwrap_or_default());
        out.push_str(&replacement);
        // Keep the line count of the replaced text.
        let removed = source
            .get(start..span.end as usize)
            .map_or(0, |text| text.matches('\n').count());
        let added = replacement.matches('\n').count();
        for _ in added..removed {
            out.push('\n');
        }
        cursor = span.end as usize;
    }
    out.push_str(source.get(cursor..).unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(code: &str) -> String {
        lower_to_commonjs("/proj/src/a.ts", code, &|spec| {
            if spec.starts_with('.') {
                format!("/proj/src/{}.ts", spec.trim_start_matches("./"))
            } else {
                spec.to_string()
            }
        })
        .unwrap()
    }

    #[test]
    fn imports_become_requires() {
        let out = lower(
            "import def, { a, b as c } from './dep';\nimport * as ns from 'lodash';\nimport './side';\nconsole.log(def, a, c, ns);\n",
        );
        assert_eq!(
            out,
            "__export(exports, {}); const __tspack_import_0 = require(\"/proj/src/dep.ts\"); \
             const def = __interopDefault(__tspack_import_0); const a = __tspack_import_0.a; \
             const c = __tspack_import_0.b;\nconst ns = require(\"lodash\");\n\
             require(\"/proj/src/side.ts\");\nconsole.log(def, a, c, ns);\n"
        );
    }

    #[test]
    fn type_only_imports_are_removed() {
        let out = lower("import type { T } from './t';\nimport { type U } from './u';\nlet x: T;\n");
        assert_eq!(out, "__export(exports, {}); \n\nlet x: T;\n");
    }

    #[test]
    fn exported_declarations_get_getters() {
        let out = lower(
            "export const { a, b: [c] } = obj;\nexport function f() {}\nexport class K {}\nexport interface I {}\n",
        );
        assert!(out.starts_with(
            "__export(exports, { \"a\": function () { return a; }, \"c\": function () { return c; }, \
             \"f\": function () { return f; }, \"K\": function () { return K; } });"
        ));
        assert!(out.contains("const { a, b: [c] } = obj;\nfunction f() {}\nclass K {}\ninterface I {}"));
        assert!(!out.contains("export "));
    }

    #[test]
    fn export_lists_skip_type_names() {
        let out = lower("interface Props {}\nconst value = 1;\nexport { value as renamed, Props };\n");
        assert!(out.contains("\"renamed\": function () { return value; }"));
        assert!(!out.contains("return Props"));
    }

    #[test]
    fn default_exports() {
        let named = lower("export default function main() {}\n");
        assert!(named.contains("\"default\": function () { return main; }"));
        assert!(named.ends_with("function main() {}\n"));

        let expression = lower("export default 40 + 2;\n");
        assert!(expression.ends_with("exports.default = 40 + 2;\n"));
    }

    #[test]
    fn re_exports() {
        let out = lower("export * from './all';\nexport * as ns from './ns';\nexport { x as y, default as z } from './m';\n");
        assert!(out.contains("__exportStar(exports, require(\"/proj/src/all.ts\"));"));
        assert!(out.contains("const __tspack_import_0 = require(\"/proj/src/ns.ts\");"));
        assert!(out.contains("\"ns\": function () { return __tspack_import_0; }"));
        assert!(out.contains("\"y\": function () { return __tspack_import_1.x; }"));
        assert!(out.contains("\"z\": function () { return __tspack_import_1.default; }"));
    }

    #[test]
    fn directives_stay_first() {
        let out = lower("\"use strict\";\nexport const a = 1;\n");
        assert!(out.starts_with("\"use strict\"; __export(exports, {"));
    }

    #[test]
    fn scripts_are_untouched() {
        let code = "const a = require('x');\nmodule.exports = a;\n";
        assert_eq!(lower(code), code);
    }

    #[test]
    fn line_layout_is_preserved() {
        let code = "import {\n  a,\n  b,\n} from './a';\n\nexport const c = a + b;\nconsole.log(c);\n";
        let out = lower(code);
        assert_eq!(out.lines().count(), code.lines().count());
        assert_eq!(out.lines().nth(6), Some("console.log(c);"));
    }
}
