//! Overwrite-atomically JSON persistence, shared by the benchmark record
//! and app preferences stores (spec.md §6: both are "overwrite-atomically"
//! / stored "not backed up").

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::StoreError;

/// Reads and deserializes `path` as JSON. Returns `Ok(None)` when the file
/// does not exist yet (first run).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|source| StoreError::Malformed { path: path.to_owned(), source })?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io { path: path.to_owned(), source }),
    }
}

/// Serializes `value` to JSON and writes it to `path` atomically: write to
/// a temp file in the same directory, then rename over the destination, so
/// a crash or concurrent reader never observes a partial file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = path.parent().ok_or_else(|| StoreError::Io {
        path: path.to_owned(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent directory"),
    })?;
    std::fs::create_dir_all(dir).map_err(|source| StoreError::Io { path: dir.to_owned(), source })?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|source| StoreError::Io { path: dir.to_owned(), source })?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .map_err(|source| StoreError::Malformed { path: path.to_owned(), source })?;
    tmp.persist(path)
        .map_err(|e| StoreError::Io { path: path.to_owned(), source: e.error })?;
    debug!(path = %path.display(), "wrote store file atomically");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn round_trips_through_atomic_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        write_json_atomic(&path, &Sample { value: 7 }).unwrap();
        let read: Option<Sample> = read_json(&path).unwrap();
        assert_eq!(read, Some(Sample { value: 7 }));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let read: Option<Sample> = read_json(&path).unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn a_second_write_fully_replaces_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        write_json_atomic(&path, &Sample { value: 1 }).unwrap();
        write_json_atomic(&path, &Sample { value: 2 }).unwrap();
        let read: Option<Sample> = read_json(&path).unwrap();
        assert_eq!(read, Some(Sample { value: 2 }));
    }
}
