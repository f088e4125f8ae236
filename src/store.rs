//! Generic keyed entity store.
//!
//! [`EntityStore`] writes every mutation straight through to its backend and
//! leaves durability to the auto-save scheduler, which flushes once the store
//! has been quiet for the configured period. Reads always go to the backend.
//!
//! Records that no longer decode are tolerated: `get_all`, `get_by_id` and
//! `export_to_json` log and skip them, while `count` and `exists_by_id` still
//! see them because they only look at keys.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::Backend;
use crate::codec::{self, Entity};
use crate::config::StorageConfig;
use crate::error::Result;
use crate::scheduler::{AutoSaveScheduler, SchedulerStats, DEFAULT_QUIET_PERIOD};

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// How long the store must be idle before an automatic flush
    pub quiet_period: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

impl From<&StorageConfig> for StoreOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            quiet_period: config.quiet_period(),
        }
    }
}

#[derive(Debug)]
pub struct EntityStore<T: Entity> {
    backend: Arc<dyn Backend>,
    scheduler: AutoSaveScheduler,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityStore<T> {
    /// Attach to an already-open backend and start auto-save.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(backend: Arc<dyn Backend>, options: StoreOptions) -> Result<Self> {
        let scheduler = AutoSaveScheduler::spawn(Arc::clone(&backend), options.quiet_period)?;
        tracing::debug!(
            collection = %backend.name(),
            kind = T::KIND,
            quiet_ms = options.quiet_period.as_millis() as u64,
            "store opened"
        );
        Ok(Self {
            backend,
            scheduler,
            _entity: PhantomData,
        })
    }

    pub fn collection(&self) -> &str {
        self.backend.name()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every decodable record, in backend key order
    pub fn get_all(&self) -> Result<Vec<T>> {
        let keys = self.backend.keys()?;
        let mut entities = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(text) = self.backend.get(&key)? {
                if let Some(entity) = codec::decode_or_skip(self.collection(), &key, &text) {
                    entities.push(entity);
                }
            }
        }
        Ok(entities)
    }

    /// The record stored under `id`, or `None` if it is absent or unreadable
    pub fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self
            .backend
            .get(id)?
            .and_then(|text| codec::decode_or_skip(self.collection(), id, &text)))
    }

    pub fn exists_by_id(&self, id: &str) -> Result<bool> {
        self.backend.contains(id)
    }

    /// Stored key count, including records that fail to decode
    pub fn count(&self) -> Result<usize> {
        self.backend.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.backend.is_empty()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn save(&self, entity: &T) -> Result<()> {
        let text = codec::encode(entity)?;
        self.backend.put(entity.id(), &text)?;
        self.scheduler.mark_dirty();
        Ok(())
    }

    pub fn save_many(&self, entities: &[T]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let entries = entities
            .iter()
            .map(|entity| Ok((entity.id().to_string(), codec::encode(entity)?)))
            .collect::<Result<Vec<_>>>()?;
        self.backend.put_all(&entries)?;
        self.scheduler.mark_dirty();
        Ok(())
    }

    pub fn delete_by_id(&self, id: &str) -> Result<()> {
        self.backend.delete(id)?;
        self.scheduler.mark_dirty();
        Ok(())
    }

    pub fn delete_many(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.backend.delete_all(ids)?;
        self.scheduler.mark_dirty();
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.clear()?;
        self.scheduler.mark_dirty();
        Ok(())
    }

    // =========================================================================
    // Bulk transfer
    // =========================================================================

    /// All decodable records as a JSON array
    pub fn export_to_json(&self) -> Result<String> {
        codec::encode_array(&self.get_all()?)
    }

    /// Load records from an exported JSON array and return how many distinct
    /// ids were written. A repeated id keeps its last element.
    ///
    /// The payload is fully parsed before anything is touched, so a rejected
    /// payload leaves the store unchanged.
    pub fn import_from_json(&self, text: &str, clear_first: bool) -> Result<usize> {
        let entities: Vec<T> = codec::decode_array(text)?;
        if clear_first {
            self.clear()?;
        }
        self.save_many(&entities)?;
        let imported = entities
            .iter()
            .map(|entity| entity.id())
            .collect::<HashSet<_>>()
            .len();
        tracing::debug!(
            collection = %self.collection(),
            imported,
            elements = entities.len(),
            clear_first,
            "import complete"
        );
        Ok(imported)
    }

    // =========================================================================
    // Durability and teardown
    // =========================================================================

    /// Cancel any pending auto-save and flush now
    pub async fn force_flush(&self) -> Result<()> {
        self.scheduler.force_flush().await
    }

    /// True from the first unflushed mutation until a flush succeeds
    pub fn is_dirty(&self) -> bool {
        self.scheduler.is_dirty()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Cancel any pending auto-save and close the backend.
    ///
    /// This does not flush: mutations made during the quiet period that
    /// precedes `dispose` reach the backend but are not synced. Call
    /// [`force_flush`](Self::force_flush) first when that matters.
    pub fn dispose(self) -> Result<()> {
        self.scheduler.cancel();
        if self.scheduler.is_dirty() {
            tracing::warn!(
                collection = %self.collection(),
                "disposing store with unflushed changes"
            );
        }
        self.backend.close()
    }
}
