// tests/store_tests.rs

use std::sync::Arc;

use quiz_backend::{
    config::AttemptPolicy,
    services::{content, progression, scoring},
    store::{ChangeKind, ChildWatcher, DocumentStore, SqliteStore},
};
use serde_json::{Map, Value, json};
use sqlx::sqlite::SqlitePoolOptions;

/// Every connection to `sqlite::memory:` is its own database, so the pool
/// is pinned to one connection.
async fn memory_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    SqliteStore::from_pool(pool)
        .await
        .expect("Failed to migrate database")
}

#[tokio::test]
async fn subtrees_round_trip() {
    let store = memory_store().await;

    store
        .set(
            "users/u1",
            json!({
                "displayName": "Ada",
                "totalScore": 0,
                "badges": {"History": {"label1": 70}}
            }),
        )
        .await
        .unwrap();

    assert_eq!(store.get("users/u1/displayName").await.unwrap(), Some(json!("Ada")));
    assert_eq!(
        store.get("users/u1/badges").await.unwrap(),
        Some(json!({"History": {"label1": 70}}))
    );
    assert_eq!(store.get("users/u2").await.unwrap(), None);
}

#[tokio::test]
async fn prefix_match_does_not_leak_into_siblings() {
    let store = memory_store().await;
    store.set("users/u1", json!({"displayName": "A"})).await.unwrap();
    store.set("users/u10", json!({"displayName": "B"})).await.unwrap();

    store.remove("users/u1").await.unwrap();

    assert_eq!(store.get("users/u1").await.unwrap(), None);
    assert_eq!(
        store.get("users/u10/displayName").await.unwrap(),
        Some(json!("B"))
    );
}

#[tokio::test]
async fn arrays_read_back_as_arrays() {
    let store = memory_store().await;
    store
        .set("list", json!([{"q": "a"}, {"q": "b"}, {"q": "c"}]))
        .await
        .unwrap();

    assert_eq!(
        store.get("list").await.unwrap(),
        Some(json!([{"q": "a"}, {"q": "b"}, {"q": "c"}]))
    );
}

#[tokio::test]
async fn multi_path_update_merges() {
    let store = memory_store().await;
    store
        .set("users/u1", json!({"displayName": "Ada", "lastActive": 1}))
        .await
        .unwrap();

    let mut fields = Map::new();
    fields.insert("badges/History/label1".into(), json!(70));
    fields.insert("lastActive".into(), json!(2));
    fields.insert("displayName".into(), Value::Null);
    store.update("users/u1", fields).await.unwrap();

    assert_eq!(
        store.get("users/u1").await.unwrap(),
        Some(json!({"lastActive": 2, "badges": {"History": {"label1": 70}}}))
    );
}

#[tokio::test]
async fn reserved_characters_are_rejected() {
    let store = memory_store().await;
    for path in ["users/a.b", "users/a#b", "users/$x", "users/[0]"] {
        assert!(store.set(path, json!(1)).await.is_err(), "{}", path);
    }
}

#[tokio::test]
async fn scoring_and_content_work_on_sqlite() {
    let store = memory_store().await;

    let questions: Vec<Value> = (0..10)
        .map(|i| json!({"question": format!("Q{}", i), "options": ["a", "b", "c", "d"], "answer": "b"}))
        .collect();
    store
        .set("categories/History/labels/label1/quizzes", Value::Array(questions))
        .await
        .unwrap();
    let slots = content::load_label(&store, "History", "label1").await.unwrap();
    assert_eq!(slots[9].answer, "b");

    store.set("users/u1", json!({"displayName": "Ada"})).await.unwrap();
    scoring::record_attempt(&store, AttemptPolicy::Overwrite, "u1", "History", "label1", 70, 1)
        .await
        .unwrap();

    let labels = progression::labels_for(&store, "History").await.unwrap();
    assert_eq!(labels, vec!["label1"]);
    let total = store.get("users/u1/totalScore").await.unwrap();
    assert_eq!(total, Some(json!(70)));
}

#[tokio::test]
async fn watcher_sees_sqlite_writes() {
    let store: Arc<dyn DocumentStore> = Arc::new(memory_store().await);
    store.set("users/u1", json!({"displayName": "A"})).await.unwrap();

    let mut watcher = ChildWatcher::open(store.clone(), "users").await.unwrap();
    let first = watcher.next().await.unwrap().unwrap();
    assert_eq!((first.key.as_str(), first.kind), ("u1", ChangeKind::Added));

    store.set("users/u1/displayName", json!("Ada")).await.unwrap();
    let changed = watcher.next().await.unwrap().unwrap();
    assert_eq!(changed.kind, ChangeKind::Changed);
    assert_eq!(changed.value, json!({"displayName": "Ada"}));
}
