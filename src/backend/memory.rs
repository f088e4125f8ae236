//! In-process backend with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

use super::{validate_collection_name, Backend};
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct MemoryBackend {
    name: String,
    records: Mutex<Option<BTreeMap<String, String>>>,
    flushes: AtomicU64,
}

fn open_handles() -> &'static Mutex<HashMap<String, Weak<MemoryBackend>>> {
    static HANDLES: OnceLock<Mutex<HashMap<String, Weak<MemoryBackend>>>> = OnceLock::new();
    HANDLES.get_or_init(|| Mutex::new(HashMap::new()))
}

impl MemoryBackend {
    /// Open the collection `name`. While a live, open handle for `name`
    /// exists in this process, the same handle is returned.
    pub fn open(name: &str) -> Result<Arc<Self>> {
        validate_collection_name(name)?;

        let mut handles = open_handles()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = handles.get(name).and_then(Weak::upgrade) {
            if !existing.is_closed() {
                return Ok(existing);
            }
        }

        let backend = Arc::new(Self {
            name: name.to_string(),
            records: Mutex::new(Some(BTreeMap::new())),
            flushes: AtomicU64::new(0),
        });
        handles.retain(|_, handle| handle.strong_count() > 0);
        handles.insert(name.to_string(), Arc::downgrade(&backend));
        Ok(backend)
    }

    /// How many times `flush` has succeeded on this handle
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }

    fn guard(&self) -> MutexGuard<'_, Option<BTreeMap<String, String>>> {
        // A poisoned map is still structurally valid.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_records<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> Result<R> {
        let mut guard = self.guard();
        let records = guard
            .as_mut()
            .ok_or_else(|| Error::NotInitialized(self.name.clone()))?;
        Ok(f(records))
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_records(|records| records.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.with_records(|records| {
            records.insert(key.to_string(), value.to_string());
        })
    }

    fn put_all(&self, entries: &[(String, String)]) -> Result<()> {
        self.with_records(|records| {
            for (key, value) in entries {
                records.insert(key.clone(), value.clone());
            }
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_records(|records| {
            records.remove(key);
        })
    }

    fn delete_all(&self, keys: &[String]) -> Result<()> {
        self.with_records(|records| {
            for key in keys {
                records.remove(key);
            }
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_records(|records| records.keys().cloned().collect())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        self.with_records(|records| records.contains_key(key))
    }

    fn clear(&self) -> Result<()> {
        self.with_records(|records| records.clear())
    }

    fn len(&self) -> Result<usize> {
        self.with_records(|records| records.len())
    }

    fn flush(&self) -> Result<()> {
        self.with_records(|_| ())?;
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.guard().take();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.guard().is_none()
    }
}
