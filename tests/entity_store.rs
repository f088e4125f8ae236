mod support;

use std::time::Duration;

use support::{memory_task_store, settle, task, QUIET};
use taskbox::backend::Backend;
use taskbox::{Error, TaskStore};

#[tokio::test]
async fn save_then_get_round_trips() {
    let (store, _backend) = memory_task_store();
    let mut original = task("t1");
    original.description = Some("details".to_string());
    original.priority = "P0".to_string();

    store.save(&original).unwrap();

    assert_eq!(store.get_by_id("t1").unwrap(), Some(original));
    assert_eq!(store.get_by_id("nope").unwrap(), None);
}

#[tokio::test]
async fn saving_twice_keeps_one_record() {
    let (store, _backend) = memory_task_store();
    let mut record = task("t1");
    store.save(&record).unwrap();
    record.title = "Renamed".to_string();
    store.save(&record).unwrap();

    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.get_by_id("t1").unwrap().unwrap().title, "Renamed");
}

#[tokio::test]
async fn corrupted_record_is_skipped_but_counted() {
    let (store, backend) = memory_task_store();
    store.save_many(&[task("t1"), task("t2")]).unwrap();
    backend.put("t2", "{\"id\":\"t2\",\"title\":").unwrap();

    let all = store.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "t1");
    assert_eq!(store.count().unwrap(), 2);
    assert!(store.exists_by_id("t2").unwrap());
    assert_eq!(store.get_by_id("t2").unwrap(), None);

    let exported: Vec<serde_json::Value> =
        serde_json::from_str(&store.export_to_json().unwrap()).unwrap();
    assert_eq!(exported.len(), 1);
}

#[tokio::test]
async fn deleting_missing_ids_is_a_no_op() {
    let (store, _backend) = memory_task_store();
    store.save(&task("t1")).unwrap();

    store.delete_by_id("ghost").unwrap();
    store
        .delete_many(&["ghost".to_string(), "t1".to_string()])
        .unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

#[tokio::test]
async fn delete_scenario() {
    let (store, _backend) = memory_task_store();
    store.save_many(&[task("t1"), task("t2")]).unwrap();

    store.delete_by_id("t1").unwrap();

    assert_eq!(store.count().unwrap(), 1);
    assert!(!store.exists_by_id("t1").unwrap());
    assert_eq!(store.get_by_id("t1").unwrap(), None);
}

#[tokio::test]
async fn export_then_import_into_fresh_store() {
    let (source, _a) = memory_task_store();
    let originals = vec![task("t1"), task("t2")];
    source.save_many(&originals).unwrap();
    assert_eq!(source.count().unwrap(), 2);

    let exported = source.export_to_json().unwrap();
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&exported).unwrap();
    assert_eq!(parsed.len(), 2);
    assert!(parsed.iter().all(|value| value.is_object()));

    let (target, _b) = memory_task_store();
    target.save(&task("stale")).unwrap();
    let imported = target.import_from_json(&exported, true).unwrap();

    assert_eq!(imported, 2);
    assert_eq!(target.count().unwrap(), 2);
    for original in &originals {
        assert_eq!(target.get_by_id(&original.id).unwrap().as_ref(), Some(original));
    }
}

#[tokio::test]
async fn import_without_clear_merges() {
    let (store, _backend) = memory_task_store();
    store.save(&task("keep")).unwrap();
    let payload = serde_json::to_string(&vec![task("t1")]).unwrap();

    store.import_from_json(&payload, false).unwrap();

    assert_eq!(store.count().unwrap(), 2);
}

#[tokio::test]
async fn import_counts_repeated_ids_once() {
    let (store, _backend) = memory_task_store();
    let mut newer = task("t1");
    newer.title = "Renamed".to_string();
    let payload = serde_json::to_string(&vec![task("t1"), task("t2"), newer.clone()]).unwrap();

    let imported = store.import_from_json(&payload, true).unwrap();

    assert_eq!(imported, 2);
    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(store.get_by_id("t1").unwrap(), Some(newer));
}

#[tokio::test]
async fn rejected_import_leaves_store_unchanged() {
    let (store, _backend) = memory_task_store();
    store.save(&task("keep")).unwrap();
    let before = store.export_to_json().unwrap();

    let payloads = [
        "not json".to_string(),
        "{\"id\":\"t1\"}".to_string(),
        format!(
            "[{}, {{\"id\":\"broken\"}}]",
            serde_json::to_string(&task("t1")).unwrap()
        ),
    ];
    for payload in payloads {
        let err = store.import_from_json(&payload, true).unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)), "payload {payload}");
    }

    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.export_to_json().unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn saves_within_quiet_period_flush_once() {
    let (store, backend) = memory_task_store();

    for idx in 0..5 {
        store.save(&task(&format!("t{idx}"))).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert!(store.is_dirty());
    assert_eq!(backend.flush_count(), 0);

    tokio::time::sleep(QUIET).await;
    settle().await;
    assert_eq!(backend.flush_count(), 1);
    assert!(!store.is_dirty());

    tokio::time::sleep(QUIET * 5).await;
    settle().await;
    assert_eq!(backend.flush_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn spaced_saves_flush_each_time() {
    let (store, backend) = memory_task_store();

    for idx in 0..3 {
        store.save(&task(&format!("t{idx}"))).unwrap();
        tokio::time::sleep(QUIET + Duration::from_millis(500)).await;
        settle().await;
    }

    assert_eq!(backend.flush_count(), 3);
    assert_eq!(store.scheduler_stats().flushes, 3);
}

async fn assert_auto_saved(store: &TaskStore, label: &str) {
    assert!(store.is_dirty(), "{label} should mark the store dirty");
    tokio::time::sleep(QUIET + Duration::from_millis(100)).await;
    settle().await;
    assert!(!store.is_dirty(), "{label} should be flushed after the quiet period");
}

#[tokio::test(start_paused = true)]
async fn every_mutation_kind_arms_auto_save() {
    let (store, backend) = memory_task_store();
    store.save(&task("t1")).unwrap();
    store.force_flush().await.unwrap();
    assert!(!store.is_dirty());

    store.save_many(&[task("t2"), task("t3")]).unwrap();
    assert_auto_saved(&store, "save_many").await;
    store.delete_by_id("t2").unwrap();
    assert_auto_saved(&store, "delete_by_id").await;
    store.delete_many(&["t3".to_string()]).unwrap();
    assert_auto_saved(&store, "delete_many").await;
    store.clear().unwrap();
    assert_auto_saved(&store, "clear").await;

    assert_eq!(backend.flush_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn force_flush_always_flushes_and_cancels_timer() {
    let (store, backend) = memory_task_store();

    store.force_flush().await.unwrap();
    assert_eq!(backend.flush_count(), 1);

    store.save(&task("t1")).unwrap();
    store.force_flush().await.unwrap();
    assert_eq!(backend.flush_count(), 2);

    tokio::time::sleep(QUIET * 2).await;
    settle().await;
    assert_eq!(backend.flush_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_pending_flush_and_closes_backend() {
    let (store, backend) = memory_task_store();
    store.save(&task("t1")).unwrap();

    store.dispose().unwrap();
    tokio::time::sleep(QUIET * 2).await;
    settle().await;

    assert_eq!(backend.flush_count(), 0);
    assert!(backend.is_closed());
}

#[tokio::test]
async fn closed_backend_reports_not_initialized() {
    let (store, backend) = memory_task_store();
    backend.close().unwrap();

    assert!(matches!(store.get_all(), Err(Error::NotInitialized(_))));
    assert!(matches!(store.save(&task("t1")), Err(Error::NotInitialized(_))));
    assert!(matches!(store.count(), Err(Error::NotInitialized(_))));
    assert!(matches!(
        store.force_flush().await,
        Err(Error::FlushFailure { .. })
    ));
}
