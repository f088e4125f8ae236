//! Debounced auto-save.
//!
//! The scheduler is a tokio task holding at most one pending deadline. Each
//! mutation re-arms the deadline for a full quiet period; when the deadline
//! passes with the dirty flag still set, the backend is flushed once. The
//! flush itself runs on the blocking pool so it never stalls the caller.
//!
//! ```text
//! Clean --mark_dirty--> Dirty+Armed --quiet period--> Flushing --ok--> Clean
//!                        ^      |                         |
//!                        +------+ mark_dirty (re-arm)     +--err--> Dirty (unarmed)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backend::Backend;
use crate::error::{Error, Result};

/// Quiet period used when none is configured
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(3);

enum Command {
    MarkDirty,
    ForceFlush(oneshot::Sender<Result<()>>),
}

#[derive(Debug, Default)]
struct Shared {
    dirty: AtomicBool,
    armed: AtomicBool,
    flushes: AtomicU64,
    failures: AtomicU64,
}

/// Counters describing what the scheduler has done so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub flushes: u64,
    pub failures: u64,
    pub dirty: bool,
    pub armed: bool,
}

#[derive(Debug)]
pub struct AutoSaveScheduler {
    tx: mpsc::UnboundedSender<Command>,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl AutoSaveScheduler {
    /// Start the scheduler on the current tokio runtime
    pub fn spawn(backend: Arc<dyn Backend>, quiet_period: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| Error::SchedulerUnavailable(err.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        let task = runtime.spawn(run(backend, quiet_period, rx, Arc::clone(&shared)));
        Ok(Self { tx, shared, task })
    }

    /// Record an uncommitted mutation and restart the quiet period
    pub fn mark_dirty(&self) {
        self.shared.dirty.store(true, Ordering::SeqCst);
        if self.tx.send(Command::MarkDirty).is_err() {
            tracing::warn!("auto-save task has stopped; mutation will not be flushed");
        }
    }

    /// Cancel the pending deadline and flush now, even if nothing is dirty
    pub async fn force_flush(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(Command::ForceFlush(reply))
            .map_err(|_| Error::SchedulerUnavailable("auto-save task has stopped".to_string()))?;
        done.await.map_err(|_| {
            Error::SchedulerUnavailable("auto-save task exited during flush".to_string())
        })?
    }

    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.load(Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.shared.armed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            flushes: self.shared.flushes.load(Ordering::SeqCst),
            failures: self.shared.failures.load(Ordering::SeqCst),
            dirty: self.is_dirty(),
            armed: self.is_armed(),
        }
    }

    /// Drop any pending deadline and stop the task without flushing
    pub fn cancel(&self) {
        self.task.abort();
        self.shared.armed.store(false, Ordering::SeqCst);
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    backend: Arc<dyn Backend>,
    quiet_period: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    shared: Arc<Shared>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => {
                tokio::select! {
                    command = rx.recv() => command,
                    _ = tokio::time::sleep_until(at) => {
                        deadline = None;
                        shared.armed.store(false, Ordering::SeqCst);
                        if shared.dirty.swap(false, Ordering::SeqCst) {
                            // Failure is already logged and leaves the store dirty.
                            let _ = flush(&backend, &shared).await;
                        }
                        continue;
                    }
                }
            }
            None => rx.recv().await,
        };

        match command {
            Some(Command::MarkDirty) => {
                deadline = Some(Instant::now() + quiet_period);
                shared.armed.store(true, Ordering::SeqCst);
            }
            Some(Command::ForceFlush(reply)) => {
                deadline = None;
                shared.armed.store(false, Ordering::SeqCst);
                shared.dirty.store(false, Ordering::SeqCst);
                let result = flush(&backend, &shared).await;
                let _ = reply.send(result);
            }
            None => break,
        }
    }
}

async fn flush(backend: &Arc<dyn Backend>, shared: &Shared) -> Result<()> {
    let target = Arc::clone(backend);
    let outcome = tokio::task::spawn_blocking(move || target.flush())
        .await
        .unwrap_or_else(|err| {
            Err(Error::FlushFailure {
                collection: backend.name().to_string(),
                reason: err.to_string(),
            })
        });

    match outcome {
        Ok(()) => {
            shared.flushes.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(collection = %backend.name(), "flushed");
            Ok(())
        }
        Err(err) => {
            // Stay dirty so the next mutation or forced flush retries.
            shared.dirty.store(true, Ordering::SeqCst);
            shared.failures.fetch_add(1, Ordering::SeqCst);
            tracing::error!(collection = %backend.name(), error = %err, "flush failed");
            Err(match err {
                failure @ Error::FlushFailure { .. } => failure,
                other => Error::FlushFailure {
                    collection: backend.name().to_string(),
                    reason: other.to_string(),
                },
            })
        }
    }
}
