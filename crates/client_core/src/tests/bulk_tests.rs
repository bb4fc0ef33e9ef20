use std::time::Duration;

use console_state::{selectors, transition::receive_collection};
use shared::{domain::Entity, error::ErrorCode, protocol::CollectionQuery};
use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::{fake_transport::FakeTransport, StoreEvent};

fn user(id: &str) -> Entity {
    Entity::new(id).with_field("name", id)
}

async fn seeded_store(fake: Arc<FakeTransport>, ids: &[&str]) -> Arc<ConsoleStore> {
    let store = ConsoleStore::with_timeout(fake, Duration::from_secs(5));
    store
        .dispatch(receive_collection(
            "users-table",
            "users",
            ids.iter().copied().map(user).collect(),
            ids.len() as u64,
            CollectionQuery::default(),
        ))
        .await;
    store
}

fn last_notification(events: &mut tokio::sync::broadcast::Receiver<StoreEvent>) -> Option<Notification> {
    let mut last = None;
    loop {
        match events.try_recv() {
            Ok(StoreEvent::Notification(notification)) => last = Some(notification),
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return last,
        }
    }
}

#[tokio::test]
async fn partial_failure_keeps_failed_rows_and_reports_counts() {
    let fake = Arc::new(FakeTransport::with_records([user("u1"), user("u2")]));
    fake.fail_for("u2").await;
    let store = seeded_store(Arc::clone(&fake), &["u1", "u2"]).await;
    let mut events = store.subscribe_events();
    let users = EntityType::from("users");

    let summary = BulkOrchestrator::with_unit_timeout(Arc::clone(&store), Duration::from_secs(5))
        .bulk_delete(&users, vec!["u1".into(), "u2".into()])
        .await;

    assert_eq!(summary.to_string(), "1 of 2 succeeded.");
    assert_eq!(summary.failed_ids, vec![EntityId::from("u2")]);

    let state = store.snapshot().await;
    let run = state.bulk().expect("bulk run recorded");
    assert!(!run.running);
    assert_eq!(run.processed_count, 2);
    assert_eq!(run.total_count, 2);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].error.code, ErrorCode::NotFound);

    assert!(selectors::get_entity(&state, &users, &"u1".into()).is_none());
    assert!(selectors::get_entity(&state, &users, &"u2".into()).is_some());
    let view = state.view(&"users-table".into()).expect("view");
    assert_eq!(view.ids.iter().cloned().collect::<Vec<_>>(), vec![EntityId::from("u2")]);

    assert!(!fake.contains("u1").await);
    assert!(fake.contains("u2").await);

    let notification = last_notification(&mut events).expect("completion notification");
    assert_eq!(notification.level, NotificationLevel::Warning);
    assert_eq!(notification.title, "Delete users");
    assert_eq!(notification.message, "1 of 2 succeeded.");
}

#[tokio::test]
async fn units_run_one_after_another_in_selection_order() {
    let fake = Arc::new(FakeTransport::with_records([user("a"), user("b"), user("c")]));
    let store = seeded_store(Arc::clone(&fake), &["a", "b", "c"]).await;

    let summary = BulkOrchestrator::with_unit_timeout(Arc::clone(&store), Duration::from_secs(5))
        .bulk_delete(&EntityType::from("users"), vec!["c".into(), "a".into(), "b".into()])
        .await;

    assert!(summary.all_succeeded());
    assert_eq!(
        fake.calls().await,
        vec!["delete users/c", "delete users/a", "delete users/b"]
    );
    assert_eq!(selectors::bulk_progress(&store.snapshot().await), Some((3, 3)));
}

#[tokio::test]
async fn slow_unit_times_out_and_the_run_moves_on() {
    let fake = Arc::new(FakeTransport::default());
    let store = ConsoleStore::with_timeout(fake, Duration::from_secs(5));
    let mut events = store.subscribe_events();
    let orchestrator =
        BulkOrchestrator::with_unit_timeout(Arc::clone(&store), Duration::from_millis(50));

    let summary = orchestrator
        .run(
            BulkAction::new("disable", "Disable accounts"),
            vec!["slow".into(), "fast".into()],
            |id| async move {
                if id.as_str() == "slow" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok::<(), TransportError>(())
            },
        )
        .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed_ids, vec![EntityId::from("slow")]);

    let state = store.snapshot().await;
    let run = state.bulk().expect("bulk run recorded");
    assert_eq!(run.processed_count, 2);
    assert_eq!(run.failures[0].error.code, ErrorCode::Timeout);
    assert!(!selectors::bulk_running(&state));

    let notification = last_notification(&mut events).expect("completion notification");
    assert_eq!(notification.message, "1 of 2 succeeded.");
}

#[tokio::test]
async fn run_where_every_unit_fails_is_reported_as_error() {
    let fake = Arc::new(FakeTransport::default());
    let store = ConsoleStore::with_timeout(fake, Duration::from_secs(5));
    let mut events = store.subscribe_events();

    let summary = BulkOrchestrator::with_unit_timeout(Arc::clone(&store), Duration::from_secs(1))
        .run(
            BulkAction::new("reset", "Reset passwords"),
            vec!["x".into()],
            |id| async move {
                Err::<(), _>(TransportError::Status {
                    status: 409,
                    message: format!("{id} is locked"),
                })
            },
        )
        .await;

    assert_eq!(summary.to_string(), "0 of 1 succeeded.");
    let notification = last_notification(&mut events).expect("completion notification");
    assert_eq!(notification.level, NotificationLevel::Error);
}
