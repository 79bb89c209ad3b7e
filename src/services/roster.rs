// src/services/roster.rs

//! In-memory copy of `users/*`, kept current by a single reducer task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::RwLock, task::JoinHandle};

use crate::{
    models::user::UserRecord,
    store::{ChangeKind, ChildEvent, ChildWatcher, DocumentStore, StoreError},
};

type Roster = HashMap<String, UserRecord>;

const RETRY_DELAY: Duration = Duration::from_millis(500);

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Live user roster for the admin list. Clones share one reducer; the task
/// stops when the last clone is dropped.
#[derive(Clone)]
pub struct LiveRoster {
    users: Arc<RwLock<Roster>>,
    _task: Arc<AbortOnDrop>,
}

/// Folds one child event into the roster. Records that do not parse are
/// dropped from the map rather than kept stale.
pub fn apply(roster: &mut Roster, event: ChildEvent) {
    match event.kind {
        ChangeKind::Removed => {
            roster.remove(&event.key);
        }
        ChangeKind::Added | ChangeKind::Changed => {
            match serde_json::from_value::<UserRecord>(event.value) {
                Ok(user) => {
                    roster.insert(event.key, user);
                }
                Err(e) => {
                    tracing::warn!(uid = %event.key, "Skipping unreadable user record: {}", e);
                    roster.remove(&event.key);
                }
            }
        }
    }
}

impl LiveRoster {
    /// Applies the initial burst before returning, then follows changes in the background.
    pub async fn spawn(store: Arc<dyn DocumentStore>) -> Result<Self, StoreError> {
        let mut watcher = ChildWatcher::open(store, "users").await?;

        let mut initial = Roster::new();
        for event in watcher.drain_ready() {
            apply(&mut initial, event);
        }
        tracing::info!(users = initial.len(), "Roster loaded");

        let users = Arc::new(RwLock::new(initial));
        let shared = users.clone();
        let handle = tokio::spawn(async move {
            while let Some(next) = watcher.next().await {
                match next {
                    Ok(event) => apply(&mut *shared.write().await, event),
                    Err(e) => {
                        tracing::warn!("Roster update failed, resyncing: {}", e);
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
            tracing::debug!("Roster watcher closed");
        });

        Ok(Self {
            users,
            _task: Arc::new(AbortOnDrop(handle)),
        })
    }

    pub async fn snapshot(&self) -> Roster {
        self.users.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn wait_for<F>(roster: &LiveRoster, done: F) -> Roster
    where
        F: Fn(&Roster) -> bool,
    {
        for _ in 0..100 {
            let snapshot = roster.snapshot().await;
            if done(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("roster never converged");
    }

    #[test]
    fn reducer_handles_each_kind() {
        let mut roster = Roster::new();
        apply(
            &mut roster,
            ChildEvent {
                key: "u1".into(),
                value: json!({"displayName": "Ada"}),
                kind: ChangeKind::Added,
            },
        );
        apply(
            &mut roster,
            ChildEvent {
                key: "u1".into(),
                value: json!({"displayName": "Ada L."}),
                kind: ChangeKind::Changed,
            },
        );
        assert_eq!(roster["u1"].display_name, "Ada L.");

        apply(
            &mut roster,
            ChildEvent {
                key: "u1".into(),
                value: json!({"displayName": "Ada L."}),
                kind: ChangeKind::Removed,
            },
        );
        assert!(roster.is_empty());
    }

    #[tokio::test]
    async fn initial_state_is_loaded_before_spawn_returns() {
        let store = Arc::new(MemoryStore::new());
        store.set("users/u1", json!({"displayName": "Ada"})).await.unwrap();
        store.set("users/u2", json!({"displayName": "Bo"})).await.unwrap();

        let roster = LiveRoster::spawn(store).await.unwrap();
        assert_eq!(roster.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn follows_later_writes() {
        let store = Arc::new(MemoryStore::new());
        let roster = LiveRoster::spawn(store.clone()).await.unwrap();

        store.set("users/u1", json!({"displayName": "Ada"})).await.unwrap();
        wait_for(&roster, |r| r.contains_key("u1")).await;

        store.set("users/u1/totalScore", json!(70)).await.unwrap();
        let snapshot = wait_for(&roster, |r| r.get("u1").is_some_and(|u| u.total_score == 70)).await;
        assert_eq!(snapshot["u1"].display_name, "Ada");

        store.remove("users/u1").await.unwrap();
        wait_for(&roster, |r| r.is_empty()).await;
    }
}
