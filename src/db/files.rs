//! On-disk file storage under `media_dir/<bucket>/<path>`.

use super::StoreError;
use anyhow::Result;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    public_base: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `bucket/path` under the root. Only plain relative
    /// components are accepted.
    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(path);
        let plain = !bucket.is_empty()
            && !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(StoreError::PathEscape(relative.display().to_string()).into());
        }
        Ok(self.root.join(relative))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base.trim_end_matches('/'), bucket, path)
    }

    /// Write a file, replacing any existing one. Returns its public URL.
    pub fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String> {
        let target = self.resolve(bucket, path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;
        debug!(path = %target.display(), size = bytes.len(), "Stored file");
        Ok(self.public_url(bucket, path))
    }

    /// Remove files. Missing files are not an error.
    pub fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let targets = paths
            .iter()
            .map(|p| self.resolve(bucket, p))
            .collect::<Result<Vec<_>>>()?;
        for target in targets {
            match std::fs::remove_file(&target) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(path = %target.display(), "File already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upload_and_remove() {
        let temp = TempDir::new().unwrap();
        let files = FileStore::new(temp.path(), "https://cdn.test/");

        let url = files.upload("task-attachments", "t1/report.pdf", b"%PDF").unwrap();
        assert_eq!(url, "https://cdn.test/task-attachments/t1/report.pdf");
        let on_disk = temp.path().join("task-attachments/t1/report.pdf");
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"%PDF");

        files
            .remove("task-attachments", &["t1/report.pdf".to_string()])
            .unwrap();
        assert!(!on_disk.exists());
        // Second removal is a no-op.
        files
            .remove("task-attachments", &["t1/report.pdf".to_string()])
            .unwrap();
    }

    #[test]
    fn test_traversal_is_rejected() {
        let temp = TempDir::new().unwrap();
        let files = FileStore::new(temp.path(), "file://media");

        for (bucket, path) in [
            ("logos", "../escape.png"),
            ("..", "x.png"),
            ("logos", "/etc/passwd"),
            ("", "x.png"),
        ] {
            let err = files.upload(bucket, path, b"x").unwrap_err();
            assert!(
                matches!(err.downcast_ref::<StoreError>(), Some(StoreError::PathEscape(_))),
                "{}/{} was accepted",
                bucket,
                path
            );
        }
    }
}
