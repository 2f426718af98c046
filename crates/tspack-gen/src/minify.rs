//! Minification over `oxc_minifier`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_span::SourceType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GenError, Result};
use crate::parser::{ParseOptions, parse};
use crate::transform::StageOutput;

/// How aggressively to minify.
///
/// Each level includes the ones before it: `whitespace` only reprints
/// compactly, `syntax` also compresses, `identifiers` also mangles local
/// names. In configuration `true` means `identifiers` and `false` means
/// `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinifyLevel {
    #[default]
    None,
    Whitespace,
    Syntax,
    Identifiers,
}

impl MinifyLevel {
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Whitespace => "whitespace",
            Self::Syntax => "syntax",
            Self::Identifiers => "identifiers",
        }
    }

    fn options(self) -> MinifierOptions {
        MinifierOptions {
            mangle: (self == Self::Identifiers).then(MangleOptions::default),
            compress: matches!(self, Self::Syntax | Self::Identifiers)
                .then(CompressOptions::default),
        }
    }
}

impl From<bool> for MinifyLevel {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Identifiers
        } else {
            Self::None
        }
    }
}

impl fmt::Display for MinifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MinifyLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "false" => Ok(Self::None),
            "whitespace" => Ok(Self::Whitespace),
            "syntax" => Ok(Self::Syntax),
            "identifiers" | "true" => Ok(Self::Identifiers),
            other => Err(format!(
                "unknown minify level '{other}' (expected none, whitespace, syntax or identifiers)"
            )),
        }
    }
}

impl Serialize for MinifyLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MinifyLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Level(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(enabled) => Ok(enabled.into()),
            Raw::Level(level) => level.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Minify already-downleveled JavaScript.
///
/// `MinifyLevel::None` returns the input unchanged and without a map.
pub fn minify_code(path: &str, code: &str, level: MinifyLevel, source_map: bool) -> Result<StageOutput> {
    if !level.is_enabled() {
        return Ok(StageOutput {
            code: code.to_string(),
            map: None,
        });
    }

    let allocator = Allocator::default();
    let parsed = parse(
        &allocator,
        code,
        path,
        ParseOptions::default().with_source_type(SourceType::mjs()),
    )
    .map_err(|err| GenError::Minify(err.to_string()))?;
    let mut program = parsed.program;

    let minified = Minifier::new(level.options()).minify(&allocator, &mut program);

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: source_map.then(|| PathBuf::from(path)),
            ..CodegenOptions::minify()
        })
        .with_scoping(minified.scoping)
        .build(&program);

    tracing::debug!(path, %level, before = code.len(), after = printed.code.len(), "minified");
    Ok(StageOutput {
        code: printed.code,
        map: printed.map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_accepts_flags_and_names() {
        let level: MinifyLevel = serde_json::from_str("true").unwrap();
        assert_eq!(level, MinifyLevel::Identifiers);
        let level: MinifyLevel = serde_json::from_str("false").unwrap();
        assert_eq!(level, MinifyLevel::None);
        let level: MinifyLevel = serde_json::from_str("\"syntax\"").unwrap();
        assert_eq!(level, MinifyLevel::Syntax);
        assert!(serde_json::from_str::<MinifyLevel>("\"max\"").is_err());
        assert_eq!(serde_json::to_string(&MinifyLevel::Whitespace).unwrap(), "\"whitespace\"");
    }

    #[test]
    fn none_is_a_passthrough() {
        let out = minify_code("out.js", "let  a = 1;", MinifyLevel::None, true).unwrap();
        assert_eq!(out.code, "let  a = 1;");
        assert!(out.map.is_none());
    }

    #[test]
    fn whitespace_level_drops_formatting() {
        let code = "function add(first, second) {\n  return first + second;\n}\nadd(1, 2);\n";
        let out = minify_code("out.js", code, MinifyLevel::Whitespace, true).unwrap();
        assert!(out.code.len() < code.len());
        assert!(!out.code.contains("\n  return"));
        assert!(out.map.is_some());
    }

    #[test]
    fn identifier_level_shortens_locals() {
        let code = "export function run() {\n  const someLongLocalName = 40;\n  return someLongLocalName + 2;\n}\n";
        let out = minify_code("out.js", code, MinifyLevel::Identifiers, false).unwrap();
        assert!(!out.code.contains("someLongLocalName"));
        assert!(out.code.contains("run"));
    }

    #[test]
    fn unparsable_input_reports_a_minify_error() {
        let err = minify_code("out.js", "let = ;", MinifyLevel::Syntax, false).unwrap_err();
        assert!(matches!(err, GenError::Minify(_)));
    }
}
