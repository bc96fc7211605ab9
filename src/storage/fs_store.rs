// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Filesystem-backed document store for marketplace records.
//!
//! Every record is one JSON file under the data directory. Writes go to a
//! temp file first and are renamed into place, so a crashed write never
//! leaves a half-written record behind. The wallet ledger does NOT live
//! here; balances and ledger entries are kept in the redb database (see
//! `crate::ledger`), which gives them ACID write transactions.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for document store operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Entity not found
    NotFound(String),
    /// Entity already exists
    AlreadyExists(String),
    /// Storage not initialized
    NotInitialized,
    /// Permission denied (ownership check failed)
    PermissionDenied { user_id: String, resource: String },
    /// Generic serialization error
    SerializationError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::NotFound(entity) => write!(f, "Not found: {entity}"),
            StorageError::AlreadyExists(entity) => write!(f, "Already exists: {entity}"),
            StorageError::NotInitialized => write!(f, "Storage not initialized"),
            StorageError::PermissionDenied { user_id, resource } => {
                write!(f, "Permission denied: user {user_id} cannot access {resource}")
            }
            StorageError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Document store for marketplace records.
///
/// All operations use standard filesystem I/O against the data directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    paths: StoragePaths,
    initialized: bool,
}

impl DocumentStore {
    /// Create a new DocumentStore instance.
    ///
    /// Does NOT initialize the directory structure. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Initialize the storage directory structure.
    ///
    /// Creates all required directories under the data root.
    /// Safe to call multiple times (idempotent).
    pub fn initialize(&mut self) -> StorageResult<()> {
        let dirs = [
            self.paths.properties_dir(),
            self.paths.promotions_dir(),
            self.paths.social_dir(),
            self.paths.handovers_dir(),
            self.paths.bank_accounts_dir(),
            self.paths.ledger_dir(),
            self.paths.audit_dir(),
        ];

        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Check if the data directory is available and writable.
    ///
    /// Performs a write-read-delete round trip used by the health endpoint.
    pub fn health_check(&self) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::SerializationError(
                "Health check data mismatch".to_string(),
            ));
        }

        Ok(())
    }

    // ========== Generic JSON Operations ==========

    /// Read a JSON file and deserialize it.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)?;
        Ok(value)
    }

    /// Write a JSON file (atomic write via rename).
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Check if a file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        File::open(path.as_ref()).is_ok()
    }

    /// Delete a file.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// List all file stems in a directory matching an extension.
    pub fn list_files(&self, dir: impl AsRef<Path>, extension: &str) -> StorageResult<Vec<String>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == extension {
                        if let Some(stem) = path.file_stem() {
                            if let Some(id) = stem.to_str() {
                                ids.push(id.to_string());
                            }
                        }
                    }
                }
            }
        }
        Ok(ids)
    }

    /// List all subdirectories in a directory.
    pub fn list_dirs(&self, dir: impl AsRef<Path>) -> StorageResult<Vec<String>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    // ========== Raw File Operations (audit JSONL) ==========

    /// Write raw bytes to a file.
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Read raw bytes from a file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        Ok(fs::read(path.as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    fn test_store() -> (TempDir, DocumentStore) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut store = DocumentStore::new(paths);
        store.initialize().expect("Failed to initialize test store");
        (temp, store)
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        id: String,
        value: i32,
    }

    #[test]
    fn initialize_creates_directories() {
        let (_temp, store) = test_store();

        assert!(store.paths().properties_dir().exists());
        assert!(store.paths().promotions_dir().exists());
        assert!(store.paths().social_dir().exists());
        assert!(store.paths().handovers_dir().exists());
        assert!(store.paths().bank_accounts_dir().exists());
        assert!(store.paths().ledger_dir().exists());
        assert!(store.paths().audit_dir().exists());
    }

    #[test]
    fn write_and_read_json() {
        let (_temp, store) = test_store();
        let data = TestData {
            id: "test-1".to_string(),
            value: 42,
        };

        let path = store.paths().property("test-1");
        store.write_json(&path, &data).unwrap();

        let read: TestData = store.read_json(&path).unwrap();
        assert_eq!(read, data);
    }

    #[test]
    fn health_check_works() {
        let (_temp, store) = test_store();
        store.health_check().expect("Health check should pass");
    }

    #[test]
    fn list_files_returns_ids() {
        let (_temp, store) = test_store();

        for i in 1..=3 {
            let path = store.paths().promotion(&format!("promo-{i}"));
            store
                .write_json(&path, &TestData {
                    id: format!("promo-{i}"),
                    value: i,
                })
                .unwrap();
        }

        let ids = store
            .list_files(store.paths().promotions_dir(), "json")
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&"promo-1".to_string()));
        assert!(ids.contains(&"promo-3".to_string()));
    }

    #[test]
    fn delete_file_removes_it() {
        let (_temp, store) = test_store();

        let path = store.paths().property("to-delete");
        store
            .write_json(&path, &TestData {
                id: "del".to_string(),
                value: 0,
            })
            .unwrap();

        assert!(store.exists(&path));
        store.delete(&path).unwrap();
        assert!(!store.exists(&path));
    }

    #[test]
    fn uninitialized_store_returns_error() {
        let paths = StoragePaths::new("/tmp/never-init");
        let store = DocumentStore::new(paths);

        let result = store.read_json::<TestData>("/tmp/any.json");
        assert!(matches!(result, Err(StorageError::NotInitialized)));
    }
}
