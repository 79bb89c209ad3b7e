// src/store/mod.rs

//! Hierarchical JSON document store.
//!
//! Every piece of application state lives under slash-separated paths such as
//! `users/{uid}/badges/{category}/{label}`. The store offers one-shot reads,
//! subtree replacement, multi-path merges, appends under generated keys and a
//! broadcast of write notifications that [`watch::ChildWatcher`] turns into
//! per-child change events.

pub mod memory;
pub mod sqlite;
pub mod tree;
pub mod watch;

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use watch::{ChangeKind, ChildEvent, ChildWatcher};

/// Errors surfaced by store backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Emitted once per written path, after the write is visible to readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEvent {
    pub path: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads the subtree at `path`. `None` when nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces the subtree at `path`. Writing `null` removes it.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merges `fields` below `path`. Keys may be relative paths.
    /// Either every field is applied or none is.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.set(path, Value::Null).await
    }

    /// Stores `value` under a fresh, time-ordered child key and returns the key.
    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let key = push_key();
        self.set(&child_path(path, &key), value).await?;
        Ok(key)
    }

    fn changes(&self) -> broadcast::Receiver<WriteEvent>;
}

/// Joins a parent path and one child key.
pub fn child_path(parent: &str, key: &str) -> String {
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", parent, key)
    }
}

static PUSH_SEQ: AtomicU32 = AtomicU32::new(0);

/// Lexicographically sortable by creation time: millis, then a wrapping sequence.
pub fn push_key() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0);
    let seq = PUSH_SEQ.fetch_add(1, Ordering::Relaxed) & 0xff_ffff;
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{:012x}{:06x}{}", millis, seq, &salt[..6])
}

/// Reads and deserializes the value at `path`.
pub async fn read<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    path: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(path).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub fn to_value<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

/// Direct child keys under `path`, in key order.
pub async fn child_keys(store: &dyn DocumentStore, path: &str) -> Result<Vec<String>, StoreError> {
    Ok(match store.get(path).await? {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(Value::Array(items)) => (0..items.len()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    })
}
