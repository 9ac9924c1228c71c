//! Beatify game-core binary entrypoint: wires the config, clock, media
//! player, analytics/stats stores, and shared game state behind the HTTP
//! and WebSocket routers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beatify_core::analytics::AnalyticsStore;
use beatify_core::clock::SystemClock;
use beatify_core::config::AppConfig;
use beatify_core::media_player::{Platform, RoutedMediaPlayer};
use beatify_core::routes;
use beatify_core::state::AppState;
use beatify_core::stats::StatsStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::load());
    let clock: Arc<dyn beatify_core::clock::Clock> = Arc::new(SystemClock);
    let media_player = Arc::new(RoutedMediaPlayer::new(configured_platform()));
    let analytics = AnalyticsStore::load(config.analytics_path.clone()).await;
    let stats = StatsStore::load(config.stats_path.clone()).await;

    let app_state = AppState::new(config, clock, media_player, analytics, stats);

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Resolve the routed media player's platform from the environment. The
/// host platform normally configures this out of band; absent any hint,
/// the player stays unrouted and `play_song` fails with
/// `UNSUPPORTED_PLATFORM` until configured.
fn configured_platform() -> Option<Platform> {
    match env::var("BEATIFY_MEDIA_PLATFORM").ok()?.trim().to_lowercase().as_str() {
        "music_assistant" | "musicassistant" => Some(Platform::MusicAssistant),
        "sonos" => Some(Platform::Sonos),
        "alexa_media" | "alexamedia" => Some(Platform::AlexaMedia),
        _ => None,
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: beatify_core::state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
