//! File-backed collection stored as an append-only JSONL log.
//!
//! ```text
//! <dir>/
//!   tasks.jsonl    # one operation per line: put / del / clear
//!   tasks.lock     # exclusive lock while a handle is open
//! ```
//!
//! Every mutation appends its line to the log before returning, so the OS
//! has the bytes immediately; `flush` is the fsync. When dead lines outnumber
//! live keys the log is rewritten atomically during `flush`.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

use serde::{Deserialize, Serialize};

use super::{validate_collection_name, Backend};
use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

const LOG_EXTENSION: &str = "jsonl";
const LOCK_EXTENSION: &str = "lock";
/// Logs shorter than this are never compacted
const COMPACT_MIN_LINES: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntry {
    Put { key: String, value: String },
    Del { key: String },
    Clear,
}

#[derive(Debug)]
struct OpenLog {
    records: BTreeMap<String, String>,
    file: File,
    lines: usize,
    _lock: FileLock,
}

#[derive(Debug)]
pub struct FileBackend {
    name: String,
    log_path: PathBuf,
    state: Mutex<Option<OpenLog>>,
}

fn open_handles() -> &'static Mutex<HashMap<PathBuf, Weak<FileBackend>>> {
    static HANDLES: OnceLock<Mutex<HashMap<PathBuf, Weak<FileBackend>>>> = OnceLock::new();
    HANDLES.get_or_init(|| Mutex::new(HashMap::new()))
}

impl FileBackend {
    /// Open the collection `name` under `dir`, creating it if needed.
    ///
    /// Opening a collection that already has a live, open handle in this
    /// process returns that same handle.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> Result<Arc<Self>> {
        validate_collection_name(name)?;
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let log_path = dir.join(format!("{name}.{LOG_EXTENSION}"));

        let mut handles = open_handles()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = handles.get(&log_path).and_then(Weak::upgrade) {
            if !existing.is_closed() {
                return Ok(existing);
            }
        }

        let lock = FileLock::acquire(
            dir.join(format!("{name}.{LOCK_EXTENSION}")),
            DEFAULT_LOCK_TIMEOUT_MS,
        )?;
        let (records, lines) = replay(&log_path, name)?;
        let file = open_append(&log_path)?;

        tracing::debug!(collection = name, records = records.len(), lines, "opened collection");

        let backend = Arc::new(Self {
            name: name.to_string(),
            log_path: log_path.clone(),
            state: Mutex::new(Some(OpenLog {
                records,
                file,
                lines,
                _lock: lock,
            })),
        });
        handles.retain(|_, handle| handle.strong_count() > 0);
        handles.insert(log_path, Arc::downgrade(&backend));
        Ok(backend)
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn guard(&self) -> MutexGuard<'_, Option<OpenLog>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut OpenLog) -> Result<R>) -> Result<R> {
        let mut guard = self.guard();
        let log = guard
            .as_mut()
            .ok_or_else(|| Error::NotInitialized(self.name.clone()))?;
        f(log)
    }
}

impl OpenLog {
    fn append(&mut self, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&serde_json::to_string(entry)?);
            buf.push('\n');
        }
        self.file.write_all(buf.as_bytes())?;
        self.lines += entries.len();
        Ok(())
    }

    fn needs_compaction(&self) -> bool {
        self.lines >= COMPACT_MIN_LINES && self.lines > self.records.len() * 2
    }

    fn compact(&mut self, path: &Path) -> Result<()> {
        // Sync the old log first so a lost rename still leaves every write.
        self.file.sync_data()?;
        let mut buf = String::new();
        for (key, value) in &self.records {
            let entry = LogEntry::Put {
                key: key.clone(),
                value: value.clone(),
            };
            buf.push_str(&serde_json::to_string(&entry)?);
            buf.push('\n');
        }
        lock::write_atomic(path, buf.as_bytes())?;
        self.file = open_append(path)?;
        self.lines = self.records.len();
        Ok(())
    }
}

impl Backend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_log(|log| Ok(log.records.get(key).cloned()))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.with_log(|log| {
            log.append(&[LogEntry::Put {
                key: key.to_string(),
                value: value.to_string(),
            }])?;
            log.records.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn put_all(&self, entries: &[(String, String)]) -> Result<()> {
        self.with_log(|log| {
            let lines: Vec<LogEntry> = entries
                .iter()
                .map(|(key, value)| LogEntry::Put {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect();
            log.append(&lines)?;
            for (key, value) in entries {
                log.records.insert(key.clone(), value.clone());
            }
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.delete_all(&[key.to_string()])
    }

    fn delete_all(&self, keys: &[String]) -> Result<()> {
        self.with_log(|log| {
            let present: Vec<LogEntry> = keys
                .iter()
                .filter(|key| log.records.contains_key(key.as_str()))
                .map(|key| LogEntry::Del { key: key.clone() })
                .collect();
            log.append(&present)?;
            for key in keys {
                log.records.remove(key);
            }
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_log(|log| Ok(log.records.keys().cloned().collect()))
    }

    fn contains(&self, key: &str) -> Result<bool> {
        self.with_log(|log| Ok(log.records.contains_key(key)))
    }

    fn clear(&self) -> Result<()> {
        self.with_log(|log| {
            log.append(&[LogEntry::Clear])?;
            log.records.clear();
            Ok(())
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_log(|log| Ok(log.records.len()))
    }

    fn flush(&self) -> Result<()> {
        self.with_log(|log| {
            if log.needs_compaction() {
                tracing::debug!(
                    collection = %self.name,
                    lines = log.lines,
                    records = log.records.len(),
                    "compacting log"
                );
                log.compact(&self.log_path)
            } else {
                log.file.sync_data()?;
                Ok(())
            }
        })
    }

    fn close(&self) -> Result<()> {
        if self.guard().take().is_some() {
            tracing::debug!(collection = %self.name, "closed collection");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.guard().is_none()
    }
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Rebuild the key map from the log. Lines that fail to parse are skipped;
/// a torn final line is terminated so later appends start on a fresh line.
fn replay(path: &Path, name: &str) -> Result<(BTreeMap<String, String>, usize)> {
    let mut records = BTreeMap::new();
    if !path.exists() {
        return Ok((records, 0));
    }

    let content = fs::read_to_string(path)?;
    let mut lines = 0;
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        match serde_json::from_str::<LogEntry>(line) {
            Ok(LogEntry::Put { key, value }) => {
                records.insert(key, value);
            }
            Ok(LogEntry::Del { key }) => {
                records.remove(&key);
            }
            Ok(LogEntry::Clear) => records.clear(),
            Err(err) => {
                tracing::warn!(
                    collection = name,
                    line = idx + 1,
                    error = %err,
                    "skipping unreadable log line"
                );
            }
        }
    }

    if !content.is_empty() && !content.ends_with('\n') {
        let mut file = open_append(path)?;
        file.write_all(b"\n")?;
    }

    Ok((records, lines))
}
