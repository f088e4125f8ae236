#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use taskbox::backend::MemoryBackend;
use taskbox::{StoreOptions, TaskRecord, TaskStatus, TaskStore};

pub const QUIET: Duration = Duration::from_secs(3);

/// A collection name no other test in this binary uses, since memory
/// backends with the same name share one handle.
pub fn unique_collection(prefix: &str) -> String {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    format!("{prefix}-{}", NEXT.fetch_add(1, Ordering::SeqCst))
}

pub fn memory_task_store() -> (TaskStore, Arc<MemoryBackend>) {
    let backend = MemoryBackend::open(&unique_collection("tasks")).expect("open backend");
    let store = TaskStore::open(
        backend.clone(),
        StoreOptions {
            quiet_period: QUIET,
        },
    )
    .expect("open store");
    (store, backend)
}

pub fn task(id: &str) -> TaskRecord {
    TaskRecord::new(id, format!("Task {id}"))
}

pub fn task_in(id: &str, project: &str, status: TaskStatus) -> TaskRecord {
    let mut task = task(id);
    task.project_id = Some(project.to_string());
    task.set_status(status);
    task
}

/// Let the auto-save task and any blocking flush run to completion.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
}
