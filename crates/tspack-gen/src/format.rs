//! Output module format wrappers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fragment::quote;

/// Module format of the emitted bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// Emitted as is; the host is expected to load it as an ES module.
    #[default]
    #[serde(alias = "es6", alias = "es2015")]
    Esm,
    #[serde(alias = "cjs")]
    CommonJs,
    Umd,
}

impl ModuleFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Esm => "esm",
            Self::CommonJs => "commonjs",
            Self::Umd => "umd",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "esm" | "es6" | "es2015" | "module" => Ok(Self::Esm),
            "commonjs" | "cjs" => Ok(Self::CommonJs),
            "umd" => Ok(Self::Umd),
            other => Err(format!("unknown module format: {other}")),
        }
    }
}

/// Wrapped code and how many lines were placed before the original first
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    pub code: String,
    pub prologue_lines: u32,
}

/// Global used by the UMD wrapper when none is configured.
pub const DEFAULT_GLOBAL_NAME: &str = "bundle";

/// Wrap `code` for `format`.
///
/// CommonJS output marks `exports` as an ES module and, when the body set no
/// `default`, exposes the whole exports object as `default`. UMD output
/// defines through AMD when available, fills `exports` under CommonJS and
/// otherwise assigns `root[global_name]`.
pub fn wrap(code: &str, format: ModuleFormat, global_name: Option<&str>) -> Wrapped {
    match format {
        ModuleFormat::Esm => Wrapped {
            code: code.to_string(),
            prologue_lines: 0,
        },
        ModuleFormat::CommonJs => {
            let prologue = "\"use strict\";\nObject.defineProperty(exports, \"__esModule\", { value: true });\n";
            let epilogue = "if (!Object.prototype.hasOwnProperty.call(exports, \"default\")) {\n  exports.default = exports;\n}\n";
            Wrapped {
                code: format!("{prologue}{}\n{epilogue}", code.trim_end_matches('\n')),
                prologue_lines: line_count(prologue),
            }
        }
        ModuleFormat::Umd => {
            let name = quote(global_name.unwrap_or(DEFAULT_GLOBAL_NAME));
            let prologue = format!(
                "(function (root, factory) {{\n\
                 \x20 if (typeof define === 'function' && define.amd) {{\n\
                 \x20   define(['exports'], factory);\n\
                 \x20 }} else if (typeof exports === 'object' && typeof module !== 'undefined') {{\n\
                 \x20   factory(exports);\n\
                 \x20 }} else {{\n\
                 \x20   factory((root[{name}] = root[{name}] || {{}}));\n\
                 \x20 }}\n\
                 }})(typeof globalThis !== 'undefined' ? globalThis : typeof self !== 'undefined' ? self : this, function (exports) {{\n\
                 var module = {{ exports: exports }};\n"
            );
            Wrapped {
                code: format!("{prologue}{}\n}});\n", code.trim_end_matches('\n')),
                prologue_lines: line_count(&prologue),
            }
        }
    }
}

fn line_count(prologue: &str) -> u32 {
    prologue.matches('\n').count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn esm_is_untouched() {
        let wrapped = wrap("__require(\"/a.ts\");", ModuleFormat::Esm, None);
        assert_eq!(wrapped.code, "__require(\"/a.ts\");");
        assert_eq!(wrapped.prologue_lines, 0);
    }

    #[test]
    fn commonjs_marks_exports_and_defaults() {
        let wrapped = wrap("body();\n", ModuleFormat::CommonJs, None);
        assert!(wrapped.code.starts_with("\"use strict\";\nObject.defineProperty(exports, \"__esModule\""));
        assert!(wrapped.code.contains("\nbody();\nif (!Object.prototype.hasOwnProperty.call(exports, \"default\"))"));
        assert_eq!(wrapped.prologue_lines, 2);
        assert_eq!(wrapped.code.lines().nth(2), Some("body();"));
    }

    #[test]
    fn umd_covers_amd_commonjs_and_globals() {
        let wrapped = wrap("body();", ModuleFormat::Umd, Some("MyLib"));
        assert!(wrapped.code.contains("define.amd"));
        assert!(wrapped.code.contains("typeof exports === 'object'"));
        assert!(wrapped.code.contains("root[\"MyLib\"]"));
        let body_line = wrapped.code.lines().position(|line| line == "body();").unwrap();
        assert_eq!(body_line as u32, wrapped.prologue_lines);
        assert!(wrapped.code.ends_with("});\n"));
    }

    #[test]
    fn formats_parse_with_aliases() {
        assert_eq!("cjs".parse::<ModuleFormat>().unwrap(), ModuleFormat::CommonJs);
        assert_eq!("ES6".parse::<ModuleFormat>().unwrap(), ModuleFormat::Esm);
        let format: ModuleFormat = serde_json::from_str("\"umd\"").unwrap();
        assert_eq!(format, ModuleFormat::Umd);
        assert!("amd".parse::<ModuleFormat>().is_err());
    }
}
