use std::{
    env, fs,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use console_state::{transition::request_collection, ConsoleState, SessionSnapshot};
use shared::protocol::{CollectionQuery, SortDirection};

use super::*;
use crate::fake_transport::FakeTransport;

fn fresh_store() -> Arc<ConsoleStore> {
    ConsoleStore::with_timeout(Arc::new(FakeTransport::default()), Duration::from_secs(5))
}

fn bridge(storage: Arc<dyn SessionStorage>) -> SessionBridge {
    SessionBridge::new(storage, "console-session", vec![ViewKey::from("users-table")])
}

#[tokio::test]
async fn persisted_queries_come_back_after_reload() {
    let storage: Arc<dyn SessionStorage> = Arc::new(MemorySessionStorage::default());
    let query = CollectionQuery::page(3)
        .sorted_by("name", SortDirection::Desc)
        .with_filter("active", true);

    let before = fresh_store();
    before
        .dispatch(request_collection("users-table", query.clone()))
        .await;
    before
        .dispatch(request_collection("audit-log", CollectionQuery::page(9)))
        .await;
    bridge(Arc::clone(&storage))
        .persist(&before)
        .await
        .expect("persist");

    let after = fresh_store();
    assert!(bridge(storage).restore(&after).await);

    let state = after.snapshot().await;
    let view = state.view(&"users-table".into()).expect("restored view");
    assert_eq!(view.query.as_ref(), Some(&query));
    assert!(view.ids.is_empty());
    assert!(state.view(&"audit-log".into()).is_none());
}

#[tokio::test]
async fn missing_snapshot_leaves_state_alone() {
    let store = fresh_store();
    let restored = bridge(Arc::new(MemorySessionStorage::default()))
        .restore(&store)
        .await;

    assert!(!restored);
    assert_eq!(store.snapshot().await, ConsoleState::default());
}

#[tokio::test]
async fn malformed_snapshot_is_ignored() {
    let storage = Arc::new(MemorySessionStorage::default());
    storage
        .save("console-session", "{not json")
        .await
        .expect("save");
    let store = fresh_store();

    assert!(!bridge(storage).restore(&store).await);
    assert_eq!(store.snapshot().await, ConsoleState::default());
}

#[tokio::test]
async fn views_outside_the_whitelist_are_not_restored() {
    let storage = Arc::new(MemorySessionStorage::default());
    let mut snapshot = SessionSnapshot::default();
    snapshot.views.insert(
        ViewKey::from("groups-table"),
        console_state::PersistedView {
            query: Some(CollectionQuery::page(1)),
        },
    );
    storage
        .save("console-session", &snapshot.to_blob().expect("encode"))
        .await
        .expect("save");
    let store = fresh_store();

    assert!(!bridge(storage).restore(&store).await);
    assert!(store.snapshot().await.view(&"groups-table".into()).is_none());
}

#[tokio::test]
async fn file_storage_round_trips_blobs_on_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("admin_console_session_test_{suffix}"));
    let storage = FileSessionStorage::new(temp_root.join("nested"));

    assert_eq!(storage.load("console/session").await.expect("load"), None);
    storage
        .save("console/session", "{\"version\":1}")
        .await
        .expect("save");

    assert!(temp_root.join("nested").join("console_session.json").exists());
    assert_eq!(
        storage.load("console/session").await.expect("load").as_deref(),
        Some("{\"version\":1}")
    );

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn from_settings_takes_key_and_whitelist() {
    let settings = ConsoleSettings {
        persisted_views: vec![ViewKey::from("users-table")],
        ..ConsoleSettings::default()
    };
    let bridge = SessionBridge::from_settings(&settings);
    assert_eq!(bridge.key, "console-session");
    assert_eq!(bridge.whitelist, settings.persisted_views);
}
