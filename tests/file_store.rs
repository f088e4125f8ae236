mod support;

use std::time::Duration;

use support::{settle, task, QUIET};
use taskbox::backend::{Backend, FileBackend};
use taskbox::{StoreOptions, TaskStore};

fn options() -> StoreOptions {
    StoreOptions {
        quiet_period: QUIET,
    }
}

#[tokio::test]
async fn records_persist_across_store_instances() {
    let dir = tempfile::tempdir().expect("tempdir");

    let store = TaskStore::open(FileBackend::open(dir.path(), "tasks").unwrap(), options()).unwrap();
    let kept = task("t2");
    store.save_many(&[task("t1"), kept.clone()]).unwrap();
    store.delete_by_id("t1").unwrap();
    store.force_flush().await.unwrap();
    store.dispose().unwrap();

    let reopened =
        TaskStore::open(FileBackend::open(dir.path(), "tasks").unwrap(), options()).unwrap();
    assert_eq!(reopened.count().unwrap(), 1);
    assert_eq!(reopened.get_by_id("t2").unwrap(), Some(kept));
    assert!(reopened.get_by_id("t1").unwrap().is_none());
}

#[tokio::test]
async fn writes_reach_the_log_before_any_flush() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = FileBackend::open(dir.path(), "tasks").unwrap();
    let store = TaskStore::open(backend.clone(), options()).unwrap();

    let original = task("t1");
    store.save(&original).unwrap();
    assert!(store.is_dirty());

    let log = std::fs::read_to_string(backend.log_path()).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("\"t1\""));

    // Disposing without a flush still leaves the write in the log.
    store.dispose().unwrap();
    let reopened = TaskStore::open(FileBackend::open(dir.path(), "tasks").unwrap(), options()).unwrap();
    assert_eq!(reopened.get_by_id("t1").unwrap(), Some(original));
}

#[tokio::test(start_paused = true)]
async fn auto_save_flushes_file_backend() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TaskStore::open(FileBackend::open(dir.path(), "tasks").unwrap(), options()).unwrap();

    store.save(&task("t1")).unwrap();
    tokio::time::sleep(QUIET + Duration::from_millis(10)).await;
    // The fsync runs on the blocking pool; give it real time to land.
    for _ in 0..200 {
        if !store.is_dirty() {
            break;
        }
        settle().await;
    }
    assert!(!store.is_dirty());
    assert_eq!(store.scheduler_stats().flushes, 1);
}

#[tokio::test]
async fn corrupted_payload_in_log_is_tolerated() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let backend = FileBackend::open(dir.path(), "tasks").unwrap();
        backend
            .put("t1", &serde_json::to_string(&task("t1")).unwrap())
            .unwrap();
        backend.put("t2", "{\"id\":").unwrap();
        backend.flush().unwrap();
        backend.close().unwrap();
    }

    let store = TaskStore::open(FileBackend::open(dir.path(), "tasks").unwrap(), options()).unwrap();
    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(store.get_all().unwrap().len(), 1);
    assert!(store.get_by_id("t2").unwrap().is_none());
    assert!(store.exists_by_id("t2").unwrap());
}
