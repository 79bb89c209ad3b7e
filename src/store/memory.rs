// src/store/memory.rs

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};

use super::{
    DocumentStore, StoreError, WriteEvent,
    tree::{denormalize, get_at, join, normalize, set_at, split_path},
};

/// In-process store. Used by tests and local runs without a database.
///
/// `go_offline` makes every call fail with [`StoreError::Transport`], which
/// is the only way the hosted store ever fails from a caller's perspective.
pub struct MemoryStore {
    root: RwLock<Value>,
    events: broadcast::Sender<WriteEvent>,
    offline: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            root: RwLock::new(Value::Null),
            events,
            offline: AtomicBool::new(false),
        }
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("store is offline".to_string()));
        }
        Ok(())
    }

    fn notify(&self, path: String) {
        // No receivers is fine.
        let _ = self.events.send(WriteEvent { path });
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.ensure_online()?;
        let segments = split_path(path)?;
        let root = self.root.read().await;
        Ok(get_at(&root, &segments).cloned().map(denormalize))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.ensure_online()?;
        let segments = split_path(path)?;
        let value = normalize(value)?;
        if segments.is_empty() && !(value.is_object() || value.is_null()) {
            return Err(StoreError::InvalidPath("root must hold an object".to_string()));
        }

        {
            let mut root = self.root.write().await;
            set_at(&mut root, &segments, value);
        }
        self.notify(join(&segments));
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.ensure_online()?;
        let base = split_path(path)?;

        // Validate everything before touching the tree.
        let mut writes = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let mut segments: Vec<String> = base.iter().map(|s| s.to_string()).collect();
            segments.extend(split_path(&key)?.into_iter().map(str::to_string));
            if segments.is_empty() {
                return Err(StoreError::InvalidPath(key));
            }
            writes.push((segments, normalize(value)?));
        }

        let mut written = Vec::with_capacity(writes.len());
        {
            let mut root = self.root.write().await;
            for (segments, value) in writes {
                let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
                set_at(&mut root, &segments, value);
                written.push(join(&segments));
            }
        }
        for path in written {
            self.notify(path);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<WriteEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_subtree() {
        let store = MemoryStore::new();
        store
            .set("users/u1", json!({"displayName": "Ana", "totalScore": 0}))
            .await
            .unwrap();

        assert_eq!(
            store.get("users/u1/displayName").await.unwrap(),
            Some(json!("Ana"))
        );
        assert_eq!(store.get("users/u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_merges_relative_paths() {
        let store = MemoryStore::new();
        store.set("users/u1", json!({"email": "a@b.c"})).await.unwrap();

        let mut fields = Map::new();
        fields.insert("badges/History/label1".into(), json!(70));
        fields.insert("lastActive".into(), json!(5));
        store.update("users/u1", fields).await.unwrap();

        assert_eq!(
            store.get("users/u1").await.unwrap(),
            Some(json!({"email": "a@b.c", "lastActive": 5, "badges": {"History": {"label1": 70}}}))
        );
    }

    #[tokio::test]
    async fn update_with_bad_key_applies_nothing() {
        let store = MemoryStore::new();
        let mut fields = Map::new();
        fields.insert("good".into(), json!(1));
        fields.insert("bad.key".into(), json!(2));

        assert!(store.update("x", fields).await.is_err());
        assert_eq!(store.get("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn offline_store_rejects_everything() {
        let store = MemoryStore::new();
        store.set("a", json!(1)).await.unwrap();
        store.go_offline();

        assert!(matches!(
            store.set("a", json!(2)).await,
            Err(StoreError::Transport(_))
        ));
        assert!(store.get("a").await.is_err());

        store.go_online();
        assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn push_appends_under_distinct_keys() {
        let store = MemoryStore::new();
        let a = store.push("users/u1/sessions", json!({"duration": 1})).await.unwrap();
        let b = store.push("users/u1/sessions", json!({"duration": 2})).await.unwrap();

        assert_ne!(a, b);
        let sessions = store.get("users/u1/sessions").await.unwrap().unwrap();
        assert_eq!(sessions.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn writes_are_broadcast() {
        let store = MemoryStore::new();
        let mut rx = store.changes();
        store.set("users/u1/email", json!("x@y.z")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().path, "users/u1/email");
    }
}
