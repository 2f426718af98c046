//! Platform runtime abstraction.
//!
//! Every file access made by the graph (resolution probes), the generator
//! (embedding source content into maps) and the bundler (loading and writing
//! files) goes through the [`Runtime`] trait, so the whole pipeline can run
//! against an in-memory file set as easily as against the real filesystem.

#[cfg(not(target_family = "wasm"))]
pub mod native;

mod virtual_fs;

pub use virtual_fs::VirtualRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// File access failure.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("No such file: {}", .0.display())]
    NotFound(PathBuf),

    /// The OS refused an operation on `path`.
    #[error("Failed to {action} {}: {message}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("{} is not valid UTF-8", .0.display())]
    InvalidUtf8(PathBuf),

    #[error("Runtime error: {0}")]
    Other(String),
}

/// What [`Runtime::metadata`] reports about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub is_dir: bool,
}

impl FileMetadata {
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// File access used by resolution, map embedding and output writing.
///
/// Probes (`exists`, `is_file`) are synchronous because resolution runs inside
/// synchronous graph mutations; reads and writes are async.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()>;

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    fn exists(&self, path: &Path) -> bool;

    /// `path` exists and is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create `path`, and its parents when `recursive`.
    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()>;

    /// Base directory for relative paths.
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;

    async fn read_to_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|_| RuntimeError::InvalidUtf8(path.to_path_buf()))
    }
}
