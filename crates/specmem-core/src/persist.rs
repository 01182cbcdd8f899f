//! Atomic JSON persistence.
//!
//! Every store writes its full state to a sibling temp file, fsyncs it and
//! renames it over the target. A reader sees either the previous file or the
//! new one, never a partial write.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Current on-disk format version for every SpecMem store.
pub const FORMAT_VERSION: u32 = 1;

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| StoreError::access(path, format!("serializing: {e}")))?;
    write_atomic(path, &json)
}

/// Atomically replace `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .map_err(|e| StoreError::access(&parent, format!("creating directory: {e}")))?;

    let temp_path = temp_path_for(path, &parent);
    let result = write_and_rename(&temp_path, path, bytes);
    if result.is_err() {
        // best effort; the target is untouched either way
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(temp_path: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = File::create(temp_path)
        .map_err(|e| StoreError::access(temp_path, format!("creating temp file: {e}")))?;
    file.write_all(bytes)
        .map_err(|e| StoreError::access(temp_path, format!("writing: {e}")))?;
    file.sync_all()
        .map_err(|e| StoreError::access(temp_path, format!("syncing: {e}")))?;
    drop(file);

    std::fs::rename(temp_path, target)
        .map_err(|e| StoreError::access(target, format!("renaming into place: {e}")))?;
    tracing::debug!(path = %target.display(), bytes = bytes.len(), "store written");
    Ok(())
}

fn temp_path_for(path: &Path, parent: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    parent.join(format!(".{name}.{}.tmp", std::process::id()))
}

/// Read and deserialize a JSON store.
///
/// An unreadable file is a [`StoreError::Access`]; a file that does not
/// parse into `T` is a [`StoreError::Corrupt`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let data = std::fs::read(path).map_err(|e| StoreError::access(path, format!("reading: {e}")))?;
    serde_json::from_slice(&data).map_err(|e| StoreError::corrupt(path, e))
}

/// Reject files written by a newer, incompatible format.
pub fn check_format_version(path: &Path, version: u32) -> Result<(), StoreError> {
    if version == 0 || version > FORMAT_VERSION {
        return Err(StoreError::corrupt(
            path,
            format!("unsupported format version {version} (supported: {FORMAT_VERSION})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        let doc = Doc {
            name: "a".into(),
            count: 3,
        };
        write_json_atomic(&path, &doc).unwrap();
        let back: Doc = read_json(&path).unwrap();
        assert_eq!(back, doc);

        // no temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_atomic(&path, b"{\"name\":\"a\",\"count\":1}").unwrap();
        write_atomic(&path, b"{\"name\":\"b\",\"count\":2}").unwrap();
        let back: Doc = read_json(&path).unwrap();
        assert_eq!(back.name, "b");
    }

    #[test]
    fn missing_file_is_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<Doc>(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, StoreError::Access { .. }));
    }

    #[test]
    fn malformed_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, b"{\"name\": ").unwrap();
        let err = read_json::<Doc>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn unwritable_target_is_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        // a regular file where a directory is expected
        let err = write_atomic(&blocker.join("doc.json"), b"{}").unwrap_err();
        assert!(matches!(err, StoreError::Access { .. }));
    }

    #[test]
    fn format_version_check() {
        let p = Path::new("x.json");
        assert!(check_format_version(p, 1).is_ok());
        assert!(check_format_version(p, 0).is_err());
        assert!(check_format_version(p, FORMAT_VERSION + 1).is_err());
    }
}
