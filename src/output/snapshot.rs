//! Corpus snapshot persistence
//!
//! Snapshots are written to a sibling temporary file and renamed over the
//! target, so a reader never observes a half-written corpus.

use crate::OutputError;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const INDENT: &[u8] = b"    ";

/// Single-writer handle for the corpus output file
pub struct SnapshotWriter {
    path: PathBuf,
    /// Generation of the newest snapshot on disk; also serializes writers
    last_written: Mutex<Option<u64>>,
}

impl SnapshotWriter {
    /// Prepares a writer for `path`, creating missing parent directories
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::Access {
                path: parent.display().to_string(),
                source,
            })?;
        }

        Ok(Self {
            path,
            last_written: Mutex::new(None),
        })
    }

    /// Writes a snapshot tagged with `generation`
    ///
    /// Snapshots are taken outside this writer's guard, so an older one can
    /// arrive after a newer one has been written; it is skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The snapshot was written
    /// * `Ok(false)` - A newer snapshot is already on disk
    /// * `Err(OutputError)` - Serialization or file access failed
    pub fn write<T: Serialize>(&self, generation: u64, value: &T) -> Result<bool, OutputError> {
        let mut last_written = self
            .last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if matches!(*last_written, Some(last) if last >= generation) {
            tracing::trace!(
                "Skipping snapshot generation {} (already wrote {:?})",
                generation,
                *last_written
            );
            return Ok(false);
        }

        let bytes = to_pretty_json(value)?;
        let tmp = self.temp_path();

        std::fs::write(&tmp, &bytes).map_err(|source| self.access_error(&tmp, source))?;
        std::fs::rename(&tmp, &self.path).map_err(|source| self.access_error(&self.path, source))?;

        *last_written = Some(generation);
        tracing::trace!(
            "Wrote snapshot generation {} to {}",
            generation,
            self.path.display()
        );
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn access_error(&self, path: &Path, source: std::io::Error) -> OutputError {
        OutputError::Access {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Serializes with four-space indentation; non-ASCII text is written as-is
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, OutputError> {
    let mut bytes = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_uses_four_space_indent() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::create(dir.path().join("out.json")).unwrap();

        writer.write(1, &json!(["a"])).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content, "[\n    \"a\"\n]\n");
    }

    #[test]
    fn test_non_ascii_is_not_escaped() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::create(dir.path().join("out.json")).unwrap();

        writer
            .write(1, &json!({"ꦲꦏ꧀ꦱꦫ": {"translations": {"English": "script"}}}))
            .unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert!(content.contains("ꦲꦏ꧀ꦱꦫ"));
        assert!(!content.contains("\\u"));
    }

    #[test]
    fn test_older_generation_is_skipped() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::create(dir.path().join("out.json")).unwrap();

        assert!(writer.write(2, &json!(["a", "b"])).unwrap());
        assert!(!writer.write(1, &json!(["a"])).unwrap());

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(writer.path()).unwrap()).unwrap();
        assert_eq!(on_disk, json!(["a", "b"]));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::create(dir.path().join("out.json")).unwrap();
        writer.write(1, &json!([])).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("out.json")]);
    }

    #[test]
    fn test_unwritable_path_is_an_access_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let result = SnapshotWriter::create(blocker.join("out.json"));
        assert!(matches!(result, Err(OutputError::Access { .. })));
    }
}
