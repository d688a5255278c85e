// File-backed store
// One JSON document on disk, read and rewritten whole on every call

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{StoreDocument, StoreError, UrlStore};
use crate::logger;

/// Store persisted as a single JSON file
///
/// There is no locking and no atomic rename; a crash mid-write can leave a
/// truncated file, which the next read treats as empty.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UrlStore for FileStore {
    fn read(&self) -> StoreDocument {
        best_effort_read(&self.path)
    }

    fn write(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let content = serde_json::to_vec(document)?;
        fs::write(&self.path, content).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Fail-open read of the store file
///
/// A missing file, an I/O error, invalid JSON, or a falsy/non-object value
/// all read as the empty mapping. Problems other than absence are logged
/// but never returned.
pub fn best_effort_read(path: &Path) -> StoreDocument {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return StoreDocument::new(),
        Err(e) => {
            logger::log_warning(&format!(
                "Failed to read store file {}: {e}; treating as empty",
                path.display()
            ));
            return StoreDocument::new();
        }
    };

    match serde_json::from_slice(&content) {
        Ok(value) => StoreDocument::from_value(value),
        Err(e) => {
            logger::log_warning(&format!(
                "Failed to parse store file {}: {e}; treating as empty",
                path.display()
            ));
            StoreDocument::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> (FileStore, PathBuf) {
        let path = dir.path().join("data.json");
        (FileStore::new(&path), path)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = store_in(&dir);
        assert!(store.read().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = store_in(&dir);
        fs::write(&path, "{not json").unwrap();
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_empty_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = store_in(&dir);
        fs::write(&path, "").unwrap();
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_falsy_document_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = store_in(&dir);
        for content in ["null", "false", "0", "[]", "\"\""] {
            fs::write(&path, content).unwrap();
            assert!(store.read().is_empty(), "content {content} should read empty");
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(&dir);

        let mut doc = StoreDocument::new();
        doc.set_urls("2024-05-01", vec![json!("https://a"), json!("https://b")]);
        doc.set_urls("2024-05-02", vec![]);
        store.write(&doc).unwrap();

        let loaded = store.read();
        assert_eq!(loaded, doc);
        assert_eq!(
            loaded.urls("2024-05-01"),
            vec![json!("https://a"), json!("https://b")]
        );
    }

    #[test]
    fn test_write_is_compact_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = store_in(&dir);

        let mut doc = StoreDocument::new();
        doc.set_urls("2024-05-01", vec![json!("https://例え.jp")]);
        store.write(&doc).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"tweets_2024-05-01":["https://例え.jp"]}"#);
    }

    #[test]
    fn test_write_overwrites_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = store_in(&dir);
        fs::write(&path, "garbage garbage garbage").unwrap();

        let mut doc = store.read();
        doc.set_urls("2024-05-01", vec![json!("u")]);
        store.write(&doc).unwrap();

        assert_eq!(store.read().urls("2024-05-01"), vec![json!("u")]);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing").join("data.json"));
        let err = store.write(&StoreDocument::new()).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(err.to_string().contains("data.json"));
    }
}
