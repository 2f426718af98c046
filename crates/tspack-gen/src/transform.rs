//! Downlevel transform: strip TypeScript and lower syntax to a target.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_semantic::SemanticBuilder;
use oxc_sourcemap::SourceMap;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};
use crate::parser::{ParseOptions, parse};

/// ECMAScript language level emitted by the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsTarget {
    Es5,
    Es2015,
    Es2016,
    Es2017,
    Es2018,
    Es2019,
    Es2020,
    Es2021,
    Es2022,
    #[default]
    EsNext,
}

impl EsTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Es5 => "es5",
            Self::Es2015 => "es2015",
            Self::Es2016 => "es2016",
            Self::Es2017 => "es2017",
            Self::Es2018 => "es2018",
            Self::Es2019 => "es2019",
            Self::Es2020 => "es2020",
            Self::Es2021 => "es2021",
            Self::Es2022 => "es2022",
            Self::EsNext => "esnext",
        }
    }
}

impl fmt::Display for EsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EsTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "es5" => Ok(Self::Es5),
            "es6" | "es2015" => Ok(Self::Es2015),
            "es2016" => Ok(Self::Es2016),
            "es2017" => Ok(Self::Es2017),
            "es2018" => Ok(Self::Es2018),
            "es2019" => Ok(Self::Es2019),
            "es2020" => Ok(Self::Es2020),
            "es2021" => Ok(Self::Es2021),
            "es2022" => Ok(Self::Es2022),
            "esnext" | "latest" => Ok(Self::EsNext),
            other => Err(format!("unknown target: {other}")),
        }
    }
}

/// Printed output of one stage, with the map back to that stage's input.
#[derive(Debug)]
pub struct StageOutput {
    pub code: String,
    pub map: Option<SourceMap>,
}

/// Strip types and lower `code` to `target`.
///
/// `path` names the input in errors and in the emitted map's `sources`.
pub fn transform_code(
    path: &str,
    code: &str,
    source_type: SourceType,
    target: EsTarget,
    source_map: bool,
) -> Result<StageOutput> {
    let allocator = Allocator::default();
    let parsed = parse(
        &allocator,
        code,
        path,
        ParseOptions::default().with_source_type(source_type),
    )?;
    let mut program = parsed.program;

    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();

    let options = TransformOptions::from_target(target.as_str()).map_err(|message| {
        GenError::Transform {
            path: path.to_string(),
            message,
        }
    })?;
    let transformed =
        Transformer::new(&allocator, Path::new(path), &options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        let message = transformed
            .errors
            .iter()
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(GenError::Transform {
            path: path.to_string(),
            message,
        });
    }

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: source_map.then(|| PathBuf::from(path)),
            ..CodegenOptions::default()
        })
        .with_scoping(Some(transformed.scoping))
        .build(&program);

    tracing::debug!(path, %target, bytes = printed.code.len(), "transformed");
    Ok(StageOutput {
        code: printed.code,
        map: printed.map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_parse_case_insensitively() {
        assert_eq!("ES2015".parse::<EsTarget>().unwrap(), EsTarget::Es2015);
        assert_eq!("es6".parse::<EsTarget>().unwrap(), EsTarget::Es2015);
        assert_eq!("ESNext".parse::<EsTarget>().unwrap(), EsTarget::EsNext);
        assert!("es3".parse::<EsTarget>().is_err());
        assert_eq!(EsTarget::default().to_string(), "esnext");
    }

    #[test]
    fn type_annotations_are_stripped() {
        let out = transform_code(
            "/proj/a.ts",
            "interface P { x: number }\nexport const double = (p: P): number => p.x * 2;\n",
            SourceType::ts(),
            EsTarget::EsNext,
            false,
        )
        .unwrap();
        assert!(!out.code.contains("interface"));
        assert!(!out.code.contains(": number"));
        assert!(out.code.contains("double"));
        assert!(out.map.is_none());
    }

    #[test]
    fn es2015_lowers_exponentiation() {
        let out = transform_code(
            "/proj/a.ts",
            "const square = (n: number) => n ** 2;\n",
            SourceType::ts(),
            EsTarget::Es2015,
            true,
        )
        .unwrap();
        assert!(!out.code.contains("**"));
        assert!(out.code.contains("Math.pow"));
        assert!(out.map.is_some());
    }

    #[test]
    fn parse_errors_are_fatal() {
        let err = transform_code("/proj/a.ts", "let = ;", SourceType::ts(), EsTarget::EsNext, false)
            .unwrap_err();
        assert!(matches!(err, GenError::Parse { .. }));
    }
}
