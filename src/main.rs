use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launch_watch::api::{create_router, AppState};
use launch_watch::config::Config;
use launch_watch::services::{
    BroadcastSink, ModerationClient, NotificationGate, PageVisibility, Poller,
    StaticPermission, TokenStore,
};
use launch_watch::sources::HttpBackend;

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::warn!("{} not found, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(path).with_context(|| format!("loading {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,launch_watch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = load_config(&config_path)?;
    tracing::info!("✓ Configuration loaded (backend {})", config.backend.base_url);

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let store = Arc::new(TokenStore::with_initial_announce(
        config.notifications.notify_on_first_load,
    ));
    let visibility = Arc::new(PageVisibility::new(config.notifications.start_hidden));
    let notices = Arc::new(BroadcastSink::new(64));
    let gate = Arc::new(NotificationGate::new(
        Arc::new(StaticPermission(config.notifications.permission)),
        notices.clone(),
    ));

    // Permission is negotiated once, before the first poll can notify.
    gate.request_permission().await;

    let poller = Poller::new(backend.clone(), store.clone(), gate.clone(), visibility.clone())
        .with_stale_guard(config.poller.discard_stale);
    let moderation = Arc::new(ModerationClient::new(backend, store.clone(), poller.clone()));

    poller.start(config.poller.interval());

    let state = Arc::new(AppState {
        store,
        poller: poller.clone(),
        moderation,
        gate,
        visibility,
        notices,
    });
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("✓ View API ready on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    poller.stop();
    tracing::info!("shut down");
    Ok(())
}
