//! In-memory Runtime with optional filesystem fallback.
//!
//! Virtual files are checked first, then the fallback runtime (if any). The
//! bundler uses this to expose generated code (which never touches disk) to
//! stages that read sources by path, and tests use it as a fake project tree.

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

#[derive(Debug, Clone)]
pub struct VirtualRuntime {
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
    cwd: PathBuf,
    fallback: Option<Arc<dyn Runtime>>,
}

impl VirtualRuntime {
    /// Create an empty runtime rooted at `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: Arc::new(RwLock::new(FxHashMap::default())),
            cwd: cwd.into(),
            fallback: None,
        }
    }

    /// Layer the virtual files over another runtime.
    pub fn with_fallback(mut self, fallback: Arc<dyn Runtime>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Add (or replace) a virtual file. The path is normalized before storage.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let normalized = self.normalize(path.as_ref());
        self.files.write().insert(normalized, content.into());
    }

    /// Builder-style variant of [`add_file`](Self::add_file).
    pub fn file(self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, content);
        self
    }

    /// Check if a path exists as a virtual file.
    pub fn has_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(&self.normalize(path))
    }

    /// Snapshot of a virtual file's content.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().get(&self.normalize(path)).cloned()
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }

    fn is_virtual_dir(&self, path: &Path) -> bool {
        let dir = self.normalize(path);
        self.files
            .read()
            .keys()
            .any(|file| file != &dir && file.starts_with(&dir))
    }
}

#[async_trait]
impl Runtime for VirtualRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        if let Some(content) = self.get_file(path) {
            return Ok(content);
        }

        match &self.fallback {
            Some(fallback) => fallback.read_file(&self.normalize(path)).await,
            None => Err(RuntimeError::NotFound(self.normalize(path))),
        }
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        match &self.fallback {
            Some(fallback) => fallback.write_file(&self.normalize(path), content).await,
            None => {
                self.add_file(path, content.to_vec());
                Ok(())
            }
        }
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        if let Some(content) = self.get_file(path) {
            return Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
            });
        }

        if self.is_virtual_dir(path) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
            });
        }

        match &self.fallback {
            Some(fallback) => fallback.metadata(&self.normalize(path)).await,
            None => Err(RuntimeError::NotFound(self.normalize(path))),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.has_file(path)
            || self.is_virtual_dir(path)
            || self
                .fallback
                .as_ref()
                .is_some_and(|fallback| fallback.exists(&self.normalize(path)))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.has_file(path)
            || self
                .fallback
                .as_ref()
                .is_some_and(|fallback| fallback.is_file(&self.normalize(path)))
    }

    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        match &self.fallback {
            Some(fallback) => fallback.create_dir(&self.normalize(path), recursive).await,
            // Directories are implied by the files they contain.
            None => Ok(()),
        }
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
