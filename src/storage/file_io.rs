//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure, and
//! quarantine of files that no longer parse.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

/// Read JSON from a file, returning `None` if the file doesn't exist
///
/// A file that exists but does not parse is reported as
/// [`StoreError::CorruptState`]; an unreadable one as
/// [`StoreError::StorageUnavailable`].
pub fn read_json<T, P>(path: P) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| {
        StoreError::StorageUnavailable(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map(Some)
        .map_err(|e| StoreError::CorruptState {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Write JSON to a file atomically (write to temp, then rename)
///
/// The file is either completely written or not modified at all, even if
/// the process dies mid-write.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), StoreError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            StoreError::StorageUnavailable(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target, so the rename never crosses filesystems
    let temp_path = temp_path_for(path);

    let file = File::create(&temp_path).map_err(|e| {
        StoreError::StorageUnavailable(format!("Failed to create temp file: {}", e))
    })?;

    if let Err(e) = write_and_sync(file, data) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StoreError::StorageUnavailable(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

/// Move a corrupt file aside under a timestamped name
///
/// Returns the quarantine path. The original is preserved for inspection.
pub fn quarantine<P: AsRef<Path>>(path: P) -> Result<PathBuf, StoreError> {
    let path = path.as_ref();
    let stamp = Local::now().format("%Y%m%d_%H%M%S");

    let mut target = sibling_with_suffix(path, &format!("corrupt-{}", stamp));
    let mut attempt = 1;
    while target.exists() {
        target = sibling_with_suffix(path, &format!("corrupt-{}-{}", stamp, attempt));
        attempt += 1;
    }

    fs::rename(path, &target).map_err(|e| {
        StoreError::StorageUnavailable(format!(
            "Failed to quarantine {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(target)
}

fn write_and_sync<T: Serialize>(file: File, data: &T) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| StoreError::Json(format!("Failed to serialize data: {}", e)))?;

    writer
        .flush()
        .map_err(|e| StoreError::StorageUnavailable(format!("Failed to flush data: {}", e)))?;

    // Sync to disk before rename
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| StoreError::StorageUnavailable(format!("Failed to sync data: {}", e)))
}

fn temp_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_read_nonexistent_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.json");

        let data: Option<TestData> = read_json(&path).unwrap();
        assert!(data.is_none());
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        write_json_atomic(&path, &data).unwrap();
        assert!(path.exists());

        let loaded: Option<TestData> = read_json(&path).unwrap();
        assert_eq!(Some(data), loaded);
    }

    #[test]
    fn test_atomic_write_no_temp_file_left() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");
        let temp_path = temp_dir.path().join("test.json.tmp");

        write_json_atomic(&path, &TestData::default()).unwrap();

        assert!(path.exists());
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("test.json");

        write_json_atomic(&path, &TestData::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_overwrite_replaces_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        let long = TestData {
            name: "x".repeat(500),
            value: 1,
        };
        write_json_atomic(&path, &long).unwrap();

        let short = TestData {
            name: "y".into(),
            value: 2,
        };
        write_json_atomic(&path, &short).unwrap();

        let loaded: Option<TestData> = read_json(&path).unwrap();
        assert_eq!(loaded, Some(short));
    }

    #[test]
    fn test_corrupt_file_reports_corrupt_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        fs::write(&path, "{\"users\": {").unwrap();

        let err = read_json::<TestData, _>(&path).unwrap_err();
        assert!(matches!(err, StoreError::CorruptState { .. }));
    }

    #[test]
    fn test_quarantine_preserves_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");
        fs::write(&path, "garbage").unwrap();

        let moved = quarantine(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(fs::read_to_string(&moved).unwrap(), "garbage");
        assert!(moved
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("db.json.corrupt-"));

        // A second quarantine in the same second gets a distinct name
        fs::write(&path, "more garbage").unwrap();
        let second = quarantine(&path).unwrap();
        assert_ne!(moved, second);
        assert!(second.exists());
    }
}
