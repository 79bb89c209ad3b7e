// src/state.rs

use std::sync::Arc;

use crate::{
    auth::{AuthProvider, SessionTracker},
    config::Config,
    services::roster::LiveRoster,
    store::{DocumentStore, StoreError},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub config: Config,
    pub sessions: SessionTracker,
    pub roster: LiveRoster,
}

impl AppState {
    /// Starts the roster watcher, so it needs a running tokio runtime.
    pub async fn new(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        config: Config,
    ) -> Result<Self, StoreError> {
        let roster = LiveRoster::spawn(store.clone()).await?;
        Ok(Self {
            store,
            auth,
            config,
            sessions: SessionTracker::new(),
            roster,
        })
    }
}
