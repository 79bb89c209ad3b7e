// src/store/watch.rs

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{
    DocumentStore, StoreError, WriteEvent, child_path,
    tree::{join, split_path},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// One child-level change below a watched path. For removals `value` holds
/// the last known value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildEvent {
    pub key: String,
    pub value: Value,
    pub kind: ChangeKind,
}

enum Scope {
    Unrelated,
    Child(String),
    Everything,
}

/// Turns raw write notifications into per-child events for one path.
///
/// The first events after [`ChildWatcher::open`] are an `Added` burst for
/// every existing child. Afterwards each write below the path is re-read and
/// diffed against the last known child value. Writes above the path, or a
/// lagging receiver, trigger a full resync. A failed re-read also forces a
/// resync on the next call, since the write it missed is gone from the channel.
pub struct ChildWatcher {
    store: Arc<dyn DocumentStore>,
    path: String,
    rx: broadcast::Receiver<WriteEvent>,
    known: HashMap<String, Value>,
    pending: VecDeque<ChildEvent>,
    needs_resync: bool,
}

impl ChildWatcher {
    pub async fn open(store: Arc<dyn DocumentStore>, path: &str) -> Result<Self, StoreError> {
        let path = join(&split_path(path)?);
        // Subscribe before the snapshot so no write slips in between.
        let rx = store.changes();
        let mut watcher = Self {
            store,
            path,
            rx,
            known: HashMap::new(),
            pending: VecDeque::new(),
            needs_resync: false,
        };
        watcher.resync().await?;
        Ok(watcher)
    }

    /// Next change, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Result<ChildEvent, StoreError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            if self.needs_resync {
                if let Err(e) = self.resync().await {
                    return Some(Err(e));
                }
                self.needs_resync = false;
                continue;
            }

            let scope = match self.rx.recv().await {
                Ok(event) => self.scope_of(&event.path),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(path = %self.path, skipped, "watcher lagged, resyncing");
                    Scope::Everything
                }
                Err(RecvError::Closed) => return None,
            };

            let refreshed = match scope {
                Scope::Unrelated => Ok(()),
                Scope::Child(key) => self.refresh_child(key).await,
                Scope::Everything => self.resync().await,
            };
            if let Err(e) = refreshed {
                self.needs_resync = true;
                return Some(Err(e));
            }
        }
    }

    /// Events already computed, without waiting. Right after `open` this is the
    /// initial burst.
    pub fn drain_ready(&mut self) -> Vec<ChildEvent> {
        self.pending.drain(..).collect()
    }

    fn scope_of(&self, written: &str) -> Scope {
        if self.path.is_empty() {
            return match written.split('/').next() {
                Some(key) if !key.is_empty() => Scope::Child(key.to_string()),
                _ => Scope::Everything,
            };
        }
        if written.is_empty()
            || written == self.path
            || self.path.starts_with(&format!("{}/", written))
        {
            return Scope::Everything;
        }
        match written.strip_prefix(&format!("{}/", self.path)) {
            Some(rest) => Scope::Child(rest.split('/').next().unwrap_or(rest).to_string()),
            None => Scope::Unrelated,
        }
    }

    async fn refresh_child(&mut self, key: String) -> Result<(), StoreError> {
        let current = self.store.get(&child_path(&self.path, &key)).await?;
        self.diff_child(key, current);
        Ok(())
    }

    async fn resync(&mut self) -> Result<(), StoreError> {
        let mut children: Vec<(String, Value)> = match self.store.get(&self.path).await? {
            Some(Value::Object(map)) => map.into_iter().collect(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        };

        let mut gone: Vec<String> = self
            .known
            .keys()
            .filter(|k| !children.iter().any(|(key, _)| key == *k))
            .cloned()
            .collect();
        gone.sort();
        for key in gone {
            self.diff_child(key, None);
        }

        children.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in children {
            self.diff_child(key, Some(value));
        }
        Ok(())
    }

    fn diff_child(&mut self, key: String, current: Option<Value>) {
        let previous = self.known.get(&key).cloned();
        let event = match (previous, current) {
            (None, Some(value)) => ChildEvent {
                key: key.clone(),
                value,
                kind: ChangeKind::Added,
            },
            (Some(old), Some(value)) if old != value => ChildEvent {
                key: key.clone(),
                value,
                kind: ChangeKind::Changed,
            },
            (Some(old), None) => ChildEvent {
                key: key.clone(),
                value: old,
                kind: ChangeKind::Removed,
            },
            _ => return,
        };

        if event.kind == ChangeKind::Removed {
            self.known.remove(&key);
        } else {
            self.known.insert(key, event.value.clone());
        }
        self.pending.push_back(event);
    }
}
