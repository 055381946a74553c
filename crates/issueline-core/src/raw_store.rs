//! Raw item storage: one JSON file per item, written tmp → rename

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::checkpoint::write_atomic;

#[derive(Debug)]
pub enum RawStoreError {
    Io(io::Error),
    /// Payload is not a JSON object; nothing was written
    NotAnObject,
    /// Identifier cannot be used as a file name
    InvalidKey(String),
}

impl fmt::Display for RawStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::NotAnObject => write!(f, "payload is not a JSON object"),
            Self::InvalidKey(k) => write!(f, "invalid item key: {k:?}"),
        }
    }
}

impl std::error::Error for RawStoreError {}

impl From<io::Error> for RawStoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl RawStoreError {
    /// Rejections concern a single payload; I/O errors concern the disk.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// `{base}/{project}/{key}.json`
#[derive(Debug, Clone)]
pub struct RawStore {
    base: PathBuf,
}

impl RawStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.base.join(project)
    }

    pub fn path_for(&self, project: &str, key: &str) -> Result<PathBuf, RawStoreError> {
        validate_key(key)?;
        Ok(self.project_dir(project).join(format!("{key}.json")))
    }

    /// Persist one item. The payload must be a JSON object.
    pub fn write(&self, project: &str, key: &str, item: &Value) -> Result<PathBuf, RawStoreError> {
        if !item.is_object() {
            return Err(RawStoreError::NotAnObject);
        }
        let path = self.path_for(project, key)?;
        let json = serde_json::to_vec_pretty(item).map_err(io::Error::other)?;
        write_atomic(&path, &json)?;
        Ok(path)
    }

    pub fn exists(&self, project: &str, key: &str) -> bool {
        self.path_for(project, key).is_ok_and(|p| p.exists())
    }

    /// Read and parse one stored record.
    pub fn read(path: &Path) -> Result<Value, RawStoreError> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if !value.is_object() {
            return Err(RawStoreError::NotAnObject);
        }
        Ok(value)
    }

    /// Stored record paths for a project, sorted by file name.
    pub fn list(&self, project: &str) -> io::Result<Vec<PathBuf>> {
        let dir = self.project_dir(project);
        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Remove stale `.tmp` files left by an interrupted write.
    pub fn cleanup_tmp_files(&self, project: &str) -> io::Result<usize> {
        let dir = self.project_dir(project);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "tmp") {
                log::warn!("Removing stale tmp file: {}", path.display());
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn validate_key(key: &str) -> Result<(), RawStoreError> {
    let bad = key.is_empty()
        || key.starts_with('.')
        || key
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control());
    if bad {
        return Err(RawStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
