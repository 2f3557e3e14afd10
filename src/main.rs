use std::sync::Arc;

use anyhow::Context;
use axum::http::Method;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use daily_tracker::agent::{Agent, AgentDeps};
use daily_tracker::channels::{ChannelManager, CliChannel, TelegramChannel};
use daily_tracker::charts::SvgChartRenderer;
use daily_tracker::config::TrackerConfig;
use daily_tracker::eventlog::EventLog;
use daily_tracker::llm::YandexGptEstimator;
use daily_tracker::routes::{ApiState, api_routes};
use daily_tracker::scheduler;
use daily_tracker::store::{InMemoryUserStore, UserStore};
use daily_tracker::weather::OpenWeatherClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the real environment may already be set.
    let _ = dotenvy::dotenv();

    let config = TrackerConfig::from_env().context("Invalid configuration")?;
    let _trace_guard = daily_tracker::logging::init(config.trace_dir.as_deref());

    eprintln!("💧 Daily Tracker v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Event log: {}", config.event_log_path.display());
    eprintln!("   Charts: {}", config.charts_dir.display());
    eprintln!("   API: http://0.0.0.0:{}/api/health", config.http_port);

    let events = Arc::new(
        EventLog::open(&config.event_log_path)
            .await
            .with_context(|| format!("Failed to open {}", config.event_log_path.display()))?,
    );

    // ── Collaborators ────────────────────────────────────────────────────
    let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let deps = AgentDeps {
        store: store.clone(),
        weather: Arc::new(OpenWeatherClient::new(config.weather_api_key.clone())),
        estimator: Arc::new(YandexGptEstimator::new(
            config.yandex_api_key.clone(),
            config.yandex_folder_id.clone(),
            config.yandex_model.clone(),
        )),
        charts: Arc::new(SvgChartRenderer::new(config.charts_dir.clone())),
        events: events.clone(),
    };

    // ── Channels ─────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();
    let mut active_channels = vec!["telegram"];
    eprintln!(
        "   Telegram: allowed {}",
        if config.allowed_users.iter().any(|u| u == "*") {
            "everyone".to_string()
        } else {
            config.allowed_users.join(", ")
        }
    );
    channels.add(Arc::new(TelegramChannel::new(
        config.bot_token.clone(),
        config.allowed_users.clone(),
    )));
    if config.enable_cli {
        channels.add(Arc::new(CliChannel::new()));
        active_channels.push("cli");
    }
    eprintln!("   Channels: {}\n", active_channels.join(", "));
    for (name, health) in channels.health_check_all().await {
        if let Err(e) = health {
            tracing::warn!(channel = %name, "Channel health check failed: {}", e);
        }
    }

    let agent = Arc::new(Agent::new(deps, channels));
    let shutdown = CancellationToken::new();

    // ── Daily reset ──────────────────────────────────────────────────────
    let reset = scheduler::spawn_daily_reset(store.clone(), events.clone(), &config.reset_schedule)?;

    // ── HTTP API ─────────────────────────────────────────────────────────
    let app = api_routes(ApiState {
        store,
        tracking: agent.tracking(),
    })
    .layer(
        CorsLayer::new()
            .allow_methods([Method::GET])
            .allow_origin(Any),
    )
    .layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("Failed to bind API port {}", config.http_port))?;
    tracing::info!(port = config.http_port, "HTTP API started");
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await;
        if let Err(e) = result {
            tracing::error!("HTTP API stopped: {}", e);
        }
    });

    // ── Ctrl+C ───────────────────────────────────────────────────────────
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Ctrl+C received, shutting down...");
                signal_shutdown.cancel();
            }
            Err(e) => tracing::warn!("Could not listen for Ctrl+C: {}", e),
        }
    });

    events.info("Bot started").await;
    let result = agent.run(shutdown.clone()).await;

    shutdown.cancel();
    reset.shutdown().await;
    if let Err(e) = server.await {
        tracing::warn!("HTTP API task ended abnormally: {}", e);
    }
    events.info("Bot stopped").await;

    result?;
    Ok(())
}
