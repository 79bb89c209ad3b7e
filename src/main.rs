// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use quiz_backend::auth::LocalAuthProvider;
use quiz_backend::config::Config;
use quiz_backend::routes;
use quiz_backend::services::identity;
use quiz_backend::state::AppState;
use quiz_backend::store::SqliteStore;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Open the document store with retry; migrations run on connect
    let mut retry_count = 0;
    let store = loop {
        match SqliteStore::connect(&config.database_url).await {
            Ok(store) => break store,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to open the store after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Store not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };
    tracing::info!("Document store ready");

    let store: Arc<dyn quiz_backend::store::DocumentStore> = Arc::new(store);
    let auth = Arc::new(LocalAuthProvider::new(store.clone()));
    let state = AppState::new(store, auth, config.clone()).await?;

    // Seed Admin User
    if let Err(e) = identity::seed_admin(&state).await {
        tracing::error!("Failed to seed admin user: {}", e);
    }

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
