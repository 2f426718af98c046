//! [`Runtime`] over the real filesystem.

// The one place allowed to touch std::fs directly.
#![allow(clippy::disallowed_methods)]

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// Filesystem access for native targets. Every call runs on tokio's
/// blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

/// Run `op` on `path` off the async executor, tagging failures with `action`.
async fn blocking<T, F>(action: &'static str, path: &Path, op: F) -> RuntimeResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> io::Result<T> + Send + 'static,
{
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || op(&path).map_err(|err| io_error(action, path, err)))
        .await
        .map_err(|err| RuntimeError::Other(format!("blocking task failed: {err}")))?
}

fn io_error(action: &'static str, path: PathBuf, err: io::Error) -> RuntimeError {
    if err.kind() == io::ErrorKind::NotFound && action != "create" {
        RuntimeError::NotFound(path)
    } else {
        RuntimeError::Io {
            action,
            path,
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        blocking("read", path, |path| std::fs::read(path)).await
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let content = content.to_vec();
        blocking("write", path, move |path| std::fs::write(path, content)).await
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        blocking("stat", path, |path| {
            std::fs::metadata(path).map(|meta| FileMetadata {
                size: meta.len(),
                is_dir: meta.is_dir(),
            })
        })
        .await
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        blocking("create", path, move |path| {
            if recursive {
                std::fs::create_dir_all(path)
            } else {
                std::fs::create_dir(path)
            }
        })
        .await
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        std::env::current_dir().map_err(|err| io_error("resolve", PathBuf::from("."), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_and_writes_through_blocking_pool() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("out").join("a.ts");
        let runtime = NativeRuntime::new();

        runtime
            .create_dir(file.parent().unwrap(), true)
            .await
            .unwrap();
        runtime.write_file(&file, b"export {};").await.unwrap();

        assert!(runtime.is_file(&file));
        assert!(!runtime.is_file(temp.path()));
        assert_eq!(runtime.read_to_string(&file).await.unwrap(), "export {};");

        let meta = runtime.metadata(&file).await.unwrap();
        assert_eq!(meta.size, 10);
        assert!(meta.is_file());
        assert!(runtime.metadata(temp.path()).await.unwrap().is_dir);
    }

    #[tokio::test]
    async fn missing_file_maps_to_not_found() {
        let temp = TempDir::new().unwrap();
        let err = NativeRuntime
            .read_file(&temp.path().join("nope.ts"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_recursive_create_reports_the_path() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let err = NativeRuntime.create_dir(&nested, false).await.unwrap_err();
        assert!(
            matches!(&err, RuntimeError::Io { action: "create", path, .. } if *path == nested),
            "{err}"
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_reported() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("bin.ts");
        NativeRuntime.write_file(&file, &[0xff, 0xfe]).await.unwrap();
        let err = NativeRuntime.read_to_string(&file).await.unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidUtf8(_)));
    }
}
