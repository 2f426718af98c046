//! Build configuration.
//!
//! Sources, lowest priority first: built-in defaults, `tspack.config.json`
//! (or an explicit file), then `TSPACK_*` environment variables
//! (`TSPACK_FORMAT=umd`, `TSPACK_OUT_FILE=lib.js`, ...).

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format as _, Json, Serialized};
use serde::{Deserialize, Serialize};
use tspack_gen::{EsTarget, GenOptions, MinifyLevel, ModuleFormat};
use tspack_graph::{ResolveOptions, SourceExtension};

use crate::{Error, Result};

/// Name of the config file picked up from the working directory.
pub const CONFIG_FILE: &str = "tspack.config.json";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "TSPACK_";

/// Everything a build needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Entry module, relative to `cwd` unless absolute.
    pub entry: PathBuf,
    pub format: ModuleFormat,
    pub target: EsTarget,
    /// Extension tried for extensionless specifiers.
    pub extension: SourceExtension,
    /// Specifiers left to the host `require`.
    pub externals: Vec<String>,
    pub sourcemap: bool,
    pub minify: MinifyLevel,
    /// Run the graph optimizer (prune, merge, reorder) before emitting.
    ///
    /// Merged modules print the importer first, so a top-level read of an
    /// absorbed `const`, `let` or `class` throws at runtime. Off by default.
    pub optimize: bool,
    /// Global assigned by UMD output.
    pub global_name: Option<String>,
    /// Output file name, relative to the directory passed to
    /// [`BuildResult::write_to`](crate::BuildResult::write_to).
    pub out_file: String,
    /// Base directory; the runtime's working directory when unset.
    pub cwd: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("src/index.ts"),
            format: ModuleFormat::default(),
            target: EsTarget::default(),
            extension: SourceExtension::default(),
            externals: Vec::new(),
            sourcemap: false,
            minify: MinifyLevel::default(),
            optimize: false,
            global_name: None,
            out_file: "bundle.js".to_string(),
            cwd: None,
        }
    }
}

impl BuildConfig {
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            ..Self::default()
        }
    }

    /// Load configuration from defaults, the config file and the environment.
    ///
    /// `config_path` overrides the file lookup; otherwise `tspack.config.json`
    /// in `cwd` is used when present.
    pub fn load(cwd: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = Self::figment(cwd, config_path)
            .extract::<Self>()
            .map_err(|err| Error::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The layered provider stack behind [`load`](Self::load).
    pub fn figment(cwd: &Path, config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = config_path.map(Path::to_path_buf).or_else(|| {
            let default_path = cwd.join(CONFIG_FILE);
            default_path.exists().then_some(default_path)
        });
        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Reject settings no build can run with.
    pub fn validate(&self) -> Result<()> {
        if self.entry.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("entry must not be empty".to_string()));
        }
        if self.out_file.trim().is_empty() {
            return Err(Error::InvalidConfig("out_file must not be empty".to_string()));
        }
        if let Some(name) = &self.global_name {
            if name.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "global_name must not be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn format(mut self, format: ModuleFormat) -> Self {
        self.format = format;
        self
    }

    pub fn target(mut self, target: EsTarget) -> Self {
        self.target = target;
        self
    }

    pub fn extension(mut self, extension: SourceExtension) -> Self {
        self.extension = extension;
        self
    }

    pub fn external<I, S>(mut self, specifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.externals.extend(specifiers.into_iter().map(Into::into));
        self
    }

    pub fn sourcemap(mut self, enabled: bool) -> Self {
        self.sourcemap = enabled;
        self
    }

    pub fn minify(mut self, level: impl Into<MinifyLevel>) -> Self {
        self.minify = level.into();
        self
    }

    pub fn optimize(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }

    pub fn global_name(mut self, name: impl Into<String>) -> Self {
        self.global_name = Some(name.into());
        self
    }

    pub fn out_file(mut self, name: impl Into<String>) -> Self {
        self.out_file = name.into();
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub(crate) fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            extension: self.extension,
            externals: self.externals.clone(),
        }
    }

    pub(crate) fn gen_options(&self) -> GenOptions {
        GenOptions {
            file: self.out_file.clone(),
            target: self.target,
            minify: self.minify,
            source_map: self.sourcemap,
            format: self.format,
            global_name: self.global_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::figment(dir.path(), None)
            .extract::<BuildConfig>()
            .unwrap();
        assert_eq!(config.entry, PathBuf::from("src/index.ts"));
        assert_eq!(config.out_file, "bundle.js");
        assert_eq!(config.minify, MinifyLevel::None);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        #[allow(clippy::disallowed_methods)]
        std::fs::write(
            &path,
            r#"{ "entry": "lib/main.ts", "format": "umd", "minify": true, "externals": ["react"], "global_name": "Lib" }"#,
        )
        .unwrap();

        let config = BuildConfig::figment(dir.path(), Some(&path))
            .extract::<BuildConfig>()
            .unwrap();
        assert_eq!(config.entry, PathBuf::from("lib/main.ts"));
        assert_eq!(config.format, ModuleFormat::Umd);
        assert_eq!(config.minify, MinifyLevel::Identifiers);
        assert_eq!(config.externals, vec!["react".to_string()]);
        assert_eq!(config.global_name.as_deref(), Some("Lib"));
        assert_eq!(config.target, EsTarget::EsNext);
    }

    #[test]
    fn default_file_is_found_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        #[allow(clippy::disallowed_methods)]
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{ "target": "es2015", "sourcemap": true }"#)
            .unwrap();

        let config = BuildConfig::figment(dir.path(), None)
            .extract::<BuildConfig>()
            .unwrap();
        assert_eq!(config.target, EsTarget::Es2015);
        assert!(config.sourcemap);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        #[allow(clippy::disallowed_methods)]
        std::fs::write(&path, r#"{ "format": "amd" }"#).unwrap();

        let err = BuildConfig::load(dir.path(), Some(&path)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn validation_rejects_empty_fields() {
        assert!(BuildConfig::new("a.ts").validate().is_ok());
        assert!(BuildConfig::new("").validate().is_err());
        assert!(BuildConfig::new("a.ts").out_file(" ").validate().is_err());
        assert!(BuildConfig::new("a.ts").global_name("").validate().is_err());
    }

    #[test]
    fn builder_feeds_generator_options() {
        let config = BuildConfig::new("a.ts")
            .format(ModuleFormat::CommonJs)
            .minify(MinifyLevel::Syntax)
            .sourcemap(true)
            .out_file("out.js");
        let options = config.gen_options();
        assert_eq!(options.file, "out.js");
        assert_eq!(options.format, ModuleFormat::CommonJs);
        assert_eq!(options.minify, MinifyLevel::Syntax);
        assert!(options.source_map);
    }
}
