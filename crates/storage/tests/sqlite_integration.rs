use chrono::Duration;
use revise_core::model::{AppState, Confidence, QuestionId};
use revise_core::scheduler::{apply_grade, create_default_progress};
use revise_core::time::fixed_now;
use std::sync::Arc;
use storage::repository::StateStore;
use storage::sqlite::{STATE_KEY, SqliteRepository};
use storage::{InMemoryStateStore, TieredStore};

fn sample_state() -> AppState {
    let t = fixed_now();
    let first = apply_grade(
        &create_default_progress(QuestionId::new("q1"), t),
        true,
        Confidence::High,
        t,
    )
    .unwrap();
    let second = apply_grade(&first, true, Confidence::Low, t + Duration::days(1)).unwrap();
    AppState::default().with_item(second)
}

#[tokio::test]
async fn sqlite_round_trips_state_with_history() {
    let repo = SqliteRepository::open("sqlite:file:memdb_state_roundtrip?mode=memory&cache=shared")
        .await
        .expect("open");

    assert!(repo.load_state().await.unwrap().is_none());

    let state = sample_state();
    repo.save_state(&state).await.unwrap();

    let loaded = repo.load_state().await.unwrap().expect("state saved");
    assert_eq!(loaded, state);
    let item = loaded.item(&QuestionId::new("q1")).unwrap();
    assert_eq!(item.history().len(), 2);
    assert_eq!(item.history()[1].confidence, Confidence::Low);
}

#[tokio::test]
async fn sqlite_load_keeps_good_items_beside_an_unreadable_one() {
    let repo = SqliteRepository::open("sqlite:file:memdb_state_partial?mode=memory&cache=shared")
        .await
        .expect("open");
    let raw = r#"{"progress":{
        "q1":{"questionId":"q1","box":2,"nextReviewDate":1700000000000,"lastReviewed":0,"history":[]},
        "q2":{"questionId":"q2","box":5,"nextReviewDate":9000000000000000,"lastReviewed":0,"history":[]}}}"#;
    repo.set_value(STATE_KEY, raw).await.unwrap();

    let loaded = repo.load_state().await.unwrap().expect("state saved");

    assert_eq!(loaded.progress.len(), 2);
    assert_eq!(loaded.item(&QuestionId::new("q1")).unwrap().box_level().level(), 2);
    let repaired = loaded.item(&QuestionId::new("q2")).unwrap();
    assert_eq!(repaired.box_level().level(), 0);
    assert!(repaired.next_review_at() > fixed_now());
}

#[tokio::test]
async fn sqlite_save_replaces_previous_value() {
    let repo = SqliteRepository::open("sqlite:file:memdb_state_replace?mode=memory&cache=shared")
        .await
        .expect("open");

    repo.save_state(&sample_state()).await.unwrap();
    repo.save_state(&AppState::default()).await.unwrap();

    let loaded = repo.load_state().await.unwrap().expect("state saved");
    assert!(loaded.progress.is_empty());
    assert!(repo.get_value(STATE_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn sqlite_keys_are_isolated() {
    let url = "sqlite:file:memdb_state_keys?mode=memory&cache=shared";
    let alice = SqliteRepository::open(url).await.expect("open").with_state_key("alice");
    let bob = SqliteRepository::open(url).await.expect("open").with_state_key("bob");

    alice.save_state(&sample_state()).await.unwrap();

    assert!(bob.load_state().await.unwrap().is_none());
    assert!(alice.load_state().await.unwrap().is_some());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::open("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("open");
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn tiered_store_writes_local_sqlite_and_remote_mirror() {
    let local = SqliteRepository::open("sqlite:file:memdb_tiered?mode=memory&cache=shared")
        .await
        .expect("open");
    let remote = InMemoryStateStore::new();
    let store = TieredStore::local_only(Arc::new(local.clone())).with_remote(Arc::new(remote.clone()));

    let state = sample_state();
    let report = store.save(&state).await.unwrap();

    assert!(!report.remote.is_failed());
    assert_eq!(local.load_state().await.unwrap(), Some(state.clone()));
    assert_eq!(remote.load_state().await.unwrap(), Some(state));
}
