use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{error, info};

use crate::error::Result;

/// Subdirectory of the module data root that receives exports.
pub const TEMP_DIR: &str = "temp";

/// Where finished timetables are stored for download.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores `content` as `filename`, replacing any previous file of that
    /// name, and returns the path relative to the store root.
    async fn write(&self, filename: &str, content: &str) -> Result<String>;

    /// Reads a document back by its relative path. `Ok(None)` when it does
    /// not exist.
    async fn read(&self, relative_path: &str) -> Result<Option<Vec<u8>>>;
}

/// Documents kept under `<root>/temp` on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn write(&self, filename: &str, content: &str) -> Result<String> {
        let dir = self.root.join(TEMP_DIR);

        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            error!("Failed to create directory {}: {}", dir.display(), e);
            return Err(e.into());
        }

        let path = dir.join(filename);
        match tokio::fs::write(&path, content).await {
            Ok(()) => {
                info!(
                    "Wrote {} bytes to {}",
                    content.len(),
                    path.display()
                );
                Ok(relative_path(filename))
            }
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }

    async fn read(&self, relative_path: &str) -> Result<Option<Vec<u8>>> {
        let path = self.root.join(relative_path);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }
}

/// Path of an export relative to the store root.
pub fn relative_path(filename: &str) -> String {
    format!("{TEMP_DIR}/{filename}")
}

/// Accepts only plain `temp/<file>` paths, so a download request cannot
/// reach outside the export directory.
pub fn is_export_path(relative_path: &str) -> bool {
    let mut components = Path::new(relative_path).components();
    matches!(
        (components.next(), components.next(), components.next()),
        (Some(Component::Normal(dir)), Some(Component::Normal(_)), None) if dir == TEMP_DIR
    )
}

/// Download URL for an export, e.g.
/// `/document?modulepart=timetable&file=temp%2Ftimetable-March.csv`.
pub fn download_url(document_url: &str, relative_path: &str) -> String {
    let file: String = url::form_urlencoded::byte_serialize(relative_path.as_bytes()).collect();
    format!("{document_url}?modulepart=timetable&file={file}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_temp_dir_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FsDocumentStore::new(dir.path().join("timetable"));

        let path = store.write("timetable-March.csv", "first").await.unwrap();
        assert_eq!(path, "temp/timetable-March.csv");

        store.write("timetable-March.csv", "second").await.unwrap();
        let on_disk = std::fs::read_to_string(dir.path().join("timetable/temp/timetable-March.csv")).unwrap();
        assert_eq!(on_disk, "second");

        assert_eq!(store.read(&path).await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.read("temp/missing.csv").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_fails_when_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, "x").unwrap();

        let store = FsDocumentStore::new(&root);
        let err = store.write("timetable-March.csv", "data").await.unwrap_err();
        assert!(matches!(err, crate::error::ExportError::Write(_)));
    }

    #[test]
    fn test_export_paths() {
        assert!(is_export_path("temp/timetable-March.csv"));
        assert!(!is_export_path("temp/../secret.csv"));
        assert!(!is_export_path("../temp/x.csv"));
        assert!(!is_export_path("/etc/passwd"));
        assert!(!is_export_path("other/x.csv"));
        assert!(!is_export_path("temp"));
    }

    #[test]
    fn test_download_url() {
        assert_eq!(
            download_url("/document", "temp/timetable-March-to-April.csv"),
            "/document?modulepart=timetable&file=temp%2Ftimetable-March-to-April.csv"
        );
    }
}
