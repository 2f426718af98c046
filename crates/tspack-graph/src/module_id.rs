use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Graph key of a module: its absolute, lexically cleaned path.
///
/// Modules reached through different specifiers (`./a`, `../src/a.ts`,
/// `/proj/src/a.ts`) get equal ids. Cleaning never touches the disk; the
/// [`Runtime`](crate::Runtime) that confirmed the file may be virtual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleId(PathBuf);

impl ModuleId {
    /// Id for `path`; relative paths are taken from the process working
    /// directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ModuleIdError> {
        let path = path.as_ref();
        if path.is_absolute() {
            return Self::with_base(Path::new("/"), path);
        }
        let cwd = std::env::current_dir().map_err(|err| ModuleIdError::CurrentDir(err.to_string()))?;
        Self::with_base(&cwd, path)
    }

    /// Id for `path` relative to `base`.
    pub fn with_base(base: &Path, path: impl AsRef<Path>) -> Result<Self, ModuleIdError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ModuleIdError::EmptyPath);
        }
        Ok(Self(base.join(path).clean()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }

    /// Base directory for the module's relative specifiers.
    pub fn dir(&self) -> &Path {
        self.0.parent().unwrap_or(Path::new("/"))
    }

    pub fn path_string(&self) -> Cow<'_, str> {
        self.0.to_string_lossy()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_string())
    }
}

impl TryFrom<String> for ModuleId {
    type Error = ModuleIdError;

    /// Persisted ids must already be absolute.
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let path = PathBuf::from(value);
        if !path.is_absolute() {
            return Err(ModuleIdError::Relative(path));
        }
        Ok(Self(path.clean()))
    }
}

impl From<ModuleId> for String {
    fn from(id: ModuleId) -> Self {
        id.path_string().into_owned()
    }
}

#[derive(Debug, Error)]
pub enum ModuleIdError {
    #[error("module id path is empty")]
    EmptyPath,

    #[error("module id {} is not absolute", .0.display())]
    Relative(PathBuf),

    #[error("failed to resolve current directory: {0}")]
    CurrentDir(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_dot_segments() {
        let id = ModuleId::new("/proj/src/../src/./a.ts").unwrap();
        assert_eq!(id.as_path(), Path::new("/proj/src/a.ts"));
    }

    #[test]
    fn relative_paths_join_base() {
        let id = ModuleId::with_base(Path::new("/proj/src"), "../lib/b.ts").unwrap();
        assert_eq!(id.path_string(), "/proj/lib/b.ts");
        assert_eq!(id.dir(), Path::new("/proj/lib"));

        let absolute = ModuleId::with_base(Path::new("/proj/src"), "/other/c.ts").unwrap();
        assert_eq!(absolute.path_string(), "/other/c.ts");
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(ModuleId::new(""), Err(ModuleIdError::EmptyPath)));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ModuleId::new("/proj/a.ts").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"/proj/a.ts\"");
        let back: ModuleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn relative_ids_do_not_deserialize() {
        assert!(serde_json::from_str::<ModuleId>("\"src/a.ts\"").is_err());
    }
}
