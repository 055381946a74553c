//! Per-project fetch progress, persisted after every unit of work.
//!
//! A checkpoint holds two facts:
//! - `last_start`: the listing offset up to which every page was fully persisted
//! - `downloaded_keys`: identifiers whose raw record is already on disk
//!
//! The store sits on a key-value [`CheckpointBackend`] that replaces a whole
//! document atomically. The file backend writes `{dir}/{project}.json` via
//! tmp + fsync + rename, so a reader never sees a half-written document and a
//! crash leaves the previous version intact.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress record for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub last_start: u64,
    #[serde(default)]
    pub downloaded_keys: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    pub fn is_downloaded(&self, key: &str) -> bool {
        self.downloaded_keys.contains(key)
    }
}

#[derive(Debug)]
pub enum CheckpointError {
    Io { project: String, source: io::Error },
    /// Stored document exists but does not parse
    Corrupt { project: String, message: String },
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { project, source } => write!(f, "checkpoint {project}: IO: {source}"),
            Self::Corrupt { project, message } => {
                write!(f, "checkpoint {project}: corrupt document: {message}")
            }
        }
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Corrupt { .. } => None,
        }
    }
}

/// Durable key-value storage of checkpoint documents, one key per project.
pub trait CheckpointBackend: Send + Sync {
    /// `Ok(None)` when the project has never been checkpointed.
    fn read(&self, project: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Replace the whole document. Must be durable when it returns `Ok`.
    fn replace(&self, project: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Projects with a stored document, sorted.
    fn projects(&self) -> Result<Vec<String>, CheckpointError>;
}

/// One JSON document per project under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, project: &str) -> PathBuf {
        self.dir.join(format!("{project}.json"))
    }
}

impl CheckpointBackend for JsonFileBackend {
    fn read(&self, project: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(project);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Io {
                    project: project.to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CheckpointError::Corrupt {
                project: project.to_string(),
                message: e.to_string(),
            })
    }

    fn replace(&self, project: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let io_err = |source| CheckpointError::Io {
            project: project.to_string(),
            source,
        };
        let json = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| io_err(io::Error::other(e)))?;
        write_atomic(&self.path_for(project), &json).map_err(io_err)
    }

    fn projects(&self) -> Result<Vec<String>, CheckpointError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CheckpointError::Io {
                    project: String::new(),
                    source,
                });
            }
        };
        let mut projects: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        projects.sort();
        Ok(projects)
    }
}

/// Write `bytes` to `path` via a sibling `.tmp` file, fsync, then rename.
///
/// The parent directory is fsynced after the rename so the new entry itself
/// survives a power loss.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result?;
    sync_parent_dir(path)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Volatile backend for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    docs: Mutex<HashMap<String, Checkpoint>>,
}

impl CheckpointBackend for MemoryBackend {
    fn read(&self, project: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self
            .docs
            .lock()
            .expect("checkpoint lock poisoned")
            .get(project)
            .cloned())
    }

    fn replace(&self, project: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.docs
            .lock()
            .expect("checkpoint lock poisoned")
            .insert(project.to_string(), checkpoint.clone());
        Ok(())
    }

    fn projects(&self) -> Result<Vec<String>, CheckpointError> {
        let mut projects: Vec<String> = self
            .docs
            .lock()
            .expect("checkpoint lock poisoned")
            .keys()
            .cloned()
            .collect();
        projects.sort();
        Ok(projects)
    }
}

/// Checkpoint operations with write-through caching.
///
/// Every `record_*` call persists before returning. The cached copy is only
/// updated after the backend accepted the write, so a failed write never
/// leaves the in-memory view ahead of what is on disk.
pub struct CheckpointStore<B> {
    backend: B,
    cache: Mutex<HashMap<String, Checkpoint>>,
}

impl<B: CheckpointBackend> CheckpointStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current checkpoint, or the empty one on first run.
    pub fn load(&self, project: &str) -> Result<Checkpoint, CheckpointError> {
        let mut cache = self.cache.lock().expect("checkpoint lock poisoned");
        Self::cached(&self.backend, &mut cache, project).cloned()
    }

    pub fn is_item_done(&self, project: &str, key: &str) -> Result<bool, CheckpointError> {
        let mut cache = self.cache.lock().expect("checkpoint lock poisoned");
        Ok(Self::cached(&self.backend, &mut cache, project)?.is_downloaded(key))
    }

    /// Mark `key` as persisted. Returns `false` (and writes nothing) if it
    /// was already recorded.
    pub fn record_item_done(&self, project: &str, key: &str) -> Result<bool, CheckpointError> {
        self.update(project, |cp| cp.downloaded_keys.insert(key.to_string()))
    }

    /// Mark every page before `start` as fully persisted. Offsets at or
    /// behind the stored one are ignored.
    pub fn record_page_done(&self, project: &str, start: u64) -> Result<bool, CheckpointError> {
        self.update(project, |cp| {
            if start <= cp.last_start {
                return false;
            }
            cp.last_start = start;
            true
        })
    }

    fn update(
        &self,
        project: &str,
        mutate: impl FnOnce(&mut Checkpoint) -> bool,
    ) -> Result<bool, CheckpointError> {
        let mut cache = self.cache.lock().expect("checkpoint lock poisoned");
        let mut next = Self::cached(&self.backend, &mut cache, project)?.clone();
        if !mutate(&mut next) {
            return Ok(false);
        }
        next.updated_at = Some(Utc::now());
        self.backend.replace(project, &next)?;
        cache.insert(project.to_string(), next);
        Ok(true)
    }

    fn cached<'a>(
        backend: &B,
        cache: &'a mut HashMap<String, Checkpoint>,
        project: &str,
    ) -> Result<&'a Checkpoint, CheckpointError> {
        if !cache.contains_key(project) {
            let loaded = backend.read(project)?.unwrap_or_default();
            cache.insert(project.to_string(), loaded);
        }
        Ok(&cache[project])
    }
}
