//! Specifier resolution.
//!
//! Turns the raw specifiers stored on a [`Module`](crate::Module) into the
//! canonical [`ModuleId`]s used as graph keys.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::runtime::Runtime;
use crate::{Error, ModuleId, Result};

/// Extension inferred for extensionless relative/absolute specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceExtension {
    /// Source build: `./foo` → `./foo.ts`
    #[default]
    Ts,
    /// Compiled build: `./foo` → `./foo.js`
    Js,
}

impl SourceExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceExtension::Ts => "ts",
            SourceExtension::Js => "js",
        }
    }
}

impl std::str::FromStr for SourceExtension {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "ts" => Ok(SourceExtension::Ts),
            "js" => Ok(SourceExtension::Js),
            other => Err(format!("Invalid source extension: {}", other)),
        }
    }
}

/// Resolution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveOptions {
    pub extension: SourceExtension,
    /// Bare specifiers left to the host environment. `"react"` also covers
    /// subpaths such as `"react/jsx-runtime"`.
    #[serde(default)]
    pub externals: Vec<String>,
}

/// Resolves specifiers against an importer through a [`Runtime`].
#[derive(Debug, Clone)]
pub struct Resolver {
    runtime: Arc<dyn Runtime>,
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(runtime: Arc<dyn Runtime>, options: ResolveOptions) -> Self {
        Self { runtime, options }
    }

    /// Resolver over the real filesystem with default options.
    #[cfg(not(target_family = "wasm"))]
    pub fn native() -> Self {
        Self::new(
            Arc::new(crate::runtime::native::NativeRuntime),
            ResolveOptions::default(),
        )
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// Whether the specifier is configured as external.
    pub fn is_external(&self, specifier: &str) -> bool {
        self.options.externals.iter().any(|external| {
            specifier == external
                || specifier
                    .strip_prefix(external.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Resolve `specifier` as written in `importer`.
    ///
    /// Fails with [`Error::UnresolvedModule`] naming both when no candidate
    /// file exists.
    pub fn resolve(&self, specifier: &str, importer: &ModuleId) -> Result<ModuleId> {
        let found = if is_path_like(specifier) {
            self.resolve_path(importer.dir().join(specifier).clean())
        } else {
            self.resolve_bare(specifier, importer.dir())
        };

        match found {
            Some(path) => Ok(ModuleId::new(path)?),
            None => Err(Error::UnresolvedModule {
                specifier: specifier.to_string(),
                importer: importer.path_string().into_owned(),
            }),
        }
    }

    fn resolve_path(&self, base: PathBuf) -> Option<PathBuf> {
        if base.extension().is_some() && self.runtime.is_file(&base) {
            return Some(base);
        }

        let with_ext = append_extension(&base, self.options.extension.as_str());
        if self.runtime.is_file(&with_ext) {
            return Some(with_ext);
        }

        let index = base.join(format!("index.{}", self.options.extension.as_str()));
        self.runtime.is_file(&index).then_some(index)
    }

    fn resolve_bare(&self, specifier: &str, from_dir: &Path) -> Option<PathBuf> {
        for dir in from_dir.ancestors() {
            let candidate = dir.join("node_modules").join(specifier).clean();

            if self.runtime.is_file(&candidate) {
                return Some(candidate);
            }

            let with_ext = append_extension(&candidate, self.options.extension.as_str());
            if self.runtime.is_file(&with_ext) {
                return Some(with_ext);
            }

            for index in ["index.ts", "index.js"] {
                let index = candidate.join(index);
                if self.runtime.is_file(&index) {
                    return Some(index);
                }
            }
        }

        None
    }
}

fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// `foo.service` + `ts` → `foo.service.ts` (appends instead of replacing).
fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualRuntime;

    fn resolver(runtime: VirtualRuntime, extension: SourceExtension) -> Resolver {
        Resolver::new(
            Arc::new(runtime),
            ResolveOptions {
                extension,
                externals: vec!["react".to_string()],
            },
        )
    }

    fn importer() -> ModuleId {
        ModuleId::new("/proj/src/a.ts").unwrap()
    }

    #[test]
    fn relative_specifier_infers_ts_extension() {
        let r = resolver(
            VirtualRuntime::new("/proj").file("/proj/src/sibling.ts", ""),
            SourceExtension::Ts,
        );
        let id = r.resolve("./sibling", &importer()).unwrap();
        assert_eq!(id.path_string(), "/proj/src/sibling.ts");
    }

    #[test]
    fn relative_specifier_infers_js_extension_in_js_mode() {
        let r = resolver(
            VirtualRuntime::new("/proj").file("/proj/src/sibling.js", ""),
            SourceExtension::Js,
        );
        let id = r.resolve("./sibling", &importer()).unwrap();
        assert_eq!(id.path_string(), "/proj/src/sibling.js");
    }

    #[test]
    fn explicit_extension_and_parent_dirs_resolve() {
        let r = resolver(
            VirtualRuntime::new("/proj").file("/proj/lib/util.ts", ""),
            SourceExtension::Ts,
        );
        assert_eq!(
            r.resolve("../lib/util.ts", &importer()).unwrap().path_string(),
            "/proj/lib/util.ts"
        );
        assert_eq!(
            r.resolve("/proj/lib/util", &importer()).unwrap().path_string(),
            "/proj/lib/util.ts"
        );
    }

    #[test]
    fn directory_specifier_falls_back_to_index() {
        let r = resolver(
            VirtualRuntime::new("/proj").file("/proj/src/widgets/index.ts", ""),
            SourceExtension::Ts,
        );
        assert_eq!(
            r.resolve("./widgets", &importer()).unwrap().path_string(),
            "/proj/src/widgets/index.ts"
        );
    }

    #[test]
    fn bare_specifier_uses_node_modules_index() {
        let r = resolver(
            VirtualRuntime::new("/proj").file("/proj/node_modules/pkg/index.js", ""),
            SourceExtension::Ts,
        );
        assert_eq!(
            r.resolve("pkg", &importer()).unwrap().path_string(),
            "/proj/node_modules/pkg/index.js"
        );
    }

    #[test]
    fn bare_specifier_prefers_direct_file() {
        let r = resolver(
            VirtualRuntime::new("/proj")
                .file("/proj/node_modules/pkg.ts", "")
                .file("/proj/node_modules/pkg/index.ts", ""),
            SourceExtension::Ts,
        );
        assert_eq!(
            r.resolve("pkg", &importer()).unwrap().path_string(),
            "/proj/node_modules/pkg.ts"
        );
    }

    #[test]
    fn unresolved_error_names_specifier_and_importer() {
        let r = resolver(VirtualRuntime::new("/proj"), SourceExtension::Ts);
        let err = r.resolve("./missing", &importer()).unwrap_err();
        match err {
            Error::UnresolvedModule {
                specifier,
                importer,
            } => {
                assert_eq!(specifier, "./missing");
                assert_eq!(importer, "/proj/src/a.ts");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn externals_match_exact_and_subpaths() {
        let r = resolver(VirtualRuntime::new("/proj"), SourceExtension::Ts);
        assert!(r.is_external("react"));
        assert!(r.is_external("react/jsx-runtime"));
        assert!(!r.is_external("react-dom"));
    }
}
