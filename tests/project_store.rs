mod support;

use taskbox::backend::{Backend, MemoryBackend};
use taskbox::config::ProjectsConfig;
use taskbox::{ProjectRecord, ProjectStore, StoreOptions};

fn project_store() -> (ProjectStore, std::sync::Arc<MemoryBackend>) {
    let backend = MemoryBackend::open(&support::unique_collection("projects")).expect("open backend");
    let store = ProjectStore::open(backend.clone(), StoreOptions::default()).expect("open store");
    (store, backend)
}

#[tokio::test]
async fn seed_default_only_when_empty() {
    let (store, _backend) = project_store();
    let config = ProjectsConfig::default();

    let seeded = store.seed_default(&config).unwrap().expect("seeded");
    assert_eq!(seeded.id, "prj-inbox");
    assert_eq!(seeded.name, "Inbox");
    assert_eq!(store.count().unwrap(), 1);

    assert!(store.seed_default(&config).unwrap().is_none());
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn seed_default_respects_config_and_unreadable_records() {
    let (store, backend) = project_store();
    let disabled = ProjectsConfig {
        seed_default: false,
        ..ProjectsConfig::default()
    };
    assert!(store.seed_default(&disabled).unwrap().is_none());
    assert_eq!(store.count().unwrap(), 0);

    backend.put("broken", "nope").unwrap();
    assert!(store
        .seed_default(&ProjectsConfig::default())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn archived_projects_are_not_active() {
    let (store, _backend) = project_store();
    store
        .save_many(&[
            ProjectRecord::new("prj-a", "Home"),
            ProjectRecord::new("prj-b", "Work"),
        ])
        .unwrap();

    let archived = store.set_archived("prj-b", true).unwrap();
    assert!(archived.archived);

    let active = store.get_active().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "prj-a");

    store.set_archived("prj-b", false).unwrap();
    assert_eq!(store.get_active().unwrap().len(), 2);
    assert!(store.set_archived("prj-zzz", true).is_err());
}
