// src/store/sqlite.rs

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use tokio::sync::broadcast;

use super::{
    DocumentStore, StoreError, WriteEvent,
    tree::{denormalize, flatten, join, normalize, set_at, split_path},
};

/// Document tree persisted as JSON leaves in a single `nodes` table.
///
/// A subtree is every row whose path equals the subtree path or starts with
/// it followed by `/`. Writes replace the whole subtree inside one
/// transaction, so a failed call leaves the previous content untouched.
pub struct SqliteStore {
    pool: SqlitePool,
    events: broadcast::Sender<WriteEvent>,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool and applies the embedded migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let (events, _) = broadcast::channel(256);
        Ok(Self { pool, events })
    }

    fn notify(&self, path: String) {
        let _ = self.events.send(WriteEvent { path });
    }
}

/// `substr` in SQLite counts characters, not bytes.
fn subtree_prefix(path: &str) -> (String, i64) {
    let prefix = format!("{}/", path);
    let len = prefix.chars().count() as i64;
    (prefix, len)
}

async fn write_subtree(
    tx: &mut Transaction<'_, Sqlite>,
    segments: &[&str],
    value: &Value,
) -> Result<(), sqlx::Error> {
    let path = join(segments);

    if path.is_empty() {
        sqlx::query("DELETE FROM nodes").execute(&mut **tx).await?;
    } else {
        let (prefix, prefix_len) = subtree_prefix(&path);
        sqlx::query("DELETE FROM nodes WHERE path = ?1 OR substr(path, 1, ?2) = ?3")
            .bind(&path)
            .bind(prefix_len)
            .bind(&prefix)
            .execute(&mut **tx)
            .await?;
    }

    if value.is_null() {
        return Ok(());
    }

    // A scalar stored at an ancestor would shadow the new children.
    for depth in 1..segments.len() {
        sqlx::query("DELETE FROM nodes WHERE path = ?1")
            .bind(join(&segments[..depth]))
            .execute(&mut **tx)
            .await?;
    }

    for (leaf_path, leaf) in flatten(value, &path) {
        sqlx::query("INSERT INTO nodes (path, value) VALUES (?1, ?2)")
            .bind(leaf_path)
            .bind(leaf.to_string())
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        let path = join(&segments);

        let rows: Vec<(String, String)> = if path.is_empty() {
            sqlx::query_as("SELECT path, value FROM nodes")
                .fetch_all(&self.pool)
                .await?
        } else {
            let (prefix, prefix_len) = subtree_prefix(&path);
            sqlx::query_as(
                "SELECT path, value FROM nodes WHERE path = ?1 OR substr(path, 1, ?2) = ?3",
            )
            .bind(&path)
            .bind(prefix_len)
            .bind(&prefix)
            .fetch_all(&self.pool)
            .await?
        };

        let mut tree = Value::Null;
        for (row_path, raw) in rows {
            let leaf: Value = serde_json::from_str(&raw)?;
            if row_path == path {
                return Ok(Some(leaf));
            }
            let relative = if path.is_empty() {
                row_path.as_str()
            } else {
                &row_path[path.len() + 1..]
            };
            let relative: Vec<&str> = relative.split('/').collect();
            set_at(&mut tree, &relative, leaf);
        }

        Ok((!tree.is_null()).then(|| denormalize(tree)))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let value = normalize(value)?;
        if segments.is_empty() && !(value.is_object() || value.is_null()) {
            return Err(StoreError::InvalidPath("root must hold an object".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        write_subtree(&mut tx, &segments, &value).await?;
        tx.commit().await?;

        self.notify(join(&segments));
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let base = split_path(path)?;

        let mut writes = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let mut segments: Vec<String> = base.iter().map(|s| s.to_string()).collect();
            segments.extend(split_path(&key)?.into_iter().map(str::to_string));
            if segments.is_empty() {
                return Err(StoreError::InvalidPath(key));
            }
            writes.push((segments, normalize(value)?));
        }

        let mut tx = self.pool.begin().await?;
        let mut written = Vec::with_capacity(writes.len());
        for (segments, value) in &writes {
            let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
            write_subtree(&mut tx, &segments, value).await?;
            written.push(join(&segments));
        }
        tx.commit().await?;

        for path in written {
            self.notify(path);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<WriteEvent> {
        self.events.subscribe()
    }
}
