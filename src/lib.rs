//! botwatch -- liveness monitor for remote bot services.
//!
//! Probes a fixed registry of HTTP health endpoints on a cron cadence,
//! reports incidents and daily summaries to a single Telegram chat, answers
//! on-demand `/report` commands, and serves a small status endpoint.

pub mod api;
pub mod commands;
pub mod config;
pub mod monitor;
pub mod notify;
pub mod probes;
pub mod report;
pub mod scheduler;
pub mod targets;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::monitor::Monitor;
use crate::notify::{Notifier, TelegramClient};
use crate::probes::http::HttpProbe;
use crate::scheduler::Engine;

/// Build the aggregator from configuration.
pub fn build_monitor(config: &Config) -> Result<Monitor> {
    let probe = HttpProbe::new(config.probe.timeout()).context("failed to build HTTP client")?;
    tracing::debug!(timeout_ms = probe.timeout().as_millis() as u64, "HTTP probe ready");
    Ok(Monitor::new(config.targets.clone(), Arc::new(probe)).with_spacing(config.probe.spacing()))
}

/// Start the daemon: status endpoint, startup cycle, triggers, command listener.
///
/// Returns only on shutdown (Ctrl-C) or if the listener cannot be bound.
pub async fn serve(config: Config) -> Result<()> {
    let zone = config.zone()?;
    let spec = config.schedule_spec()?;
    let schedule = spec.describe();
    let monitor = Arc::new(build_monitor(&config)?);

    tracing::info!(
        telegram = config.telegram.bot_token.is_some(),
        notifications = config.notifications_enabled(),
        chat_id = config.telegram.chat_id.as_deref().unwrap_or("not set"),
        incident_check = %schedule.incident_check,
        full_report = %schedule.full_report,
        timezone = %schedule.timezone,
        targets = monitor.targets().len(),
        "Starting bot monitor"
    );

    // 1. Messaging transport (optional)
    let client = match &config.telegram.bot_token {
        Some(token) => {
            let poll_timeout = std::time::Duration::from_secs(config.telegram.poll_timeout_sec);
            let client = TelegramClient::with_api_base(&config.telegram.api_base, token, poll_timeout)
                .context("failed to build Telegram client")?;
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, notifications and commands are disabled");
            None
        }
    };

    let notifier = match (&client, &config.telegram.chat_id) {
        (Some(client), Some(chat_id)) => Notifier::new(client.clone(), chat_id.clone()),
        (Some(_), None) => {
            tracing::warn!("TELEGRAM_CHAT_ID not set, notifications are disabled");
            Notifier::disabled()
        }
        _ => Notifier::disabled(),
    };
    if notifier.is_enabled() {
        tracing::info!("Notifications will be pushed to the authorized chat");
    }

    // 2. Bind the status endpoint first so a bad port fails startup.
    let addr: std::net::SocketAddr = config
        .service
        .bind_address()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.service.bind_address()))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let state = api::state::AppState::new(&config.service.name, monitor.targets(), schedule.clone(), zone.clone());
    let app = api::router(state);

    // 3. Startup notification + first cycle, then the recurring triggers.
    let engine = Arc::new(Engine::new(monitor.clone(), notifier, zone.clone()));
    tokio::spawn(async move {
        engine.startup(&spec).await;
        scheduler::spawn_triggers(engine, &spec);
        tracing::info!("Monitoring is running");
    });

    // 4. Command listener
    if let Some(client) = &client {
        let handler = Arc::new(CommandHandler::new(
            monitor.clone(),
            client.clone(),
            config.telegram.chat_id.clone(),
            zone,
            schedule,
        ));
        let client = client.clone();
        let poll_timeout = config.telegram.poll_timeout_sec;
        tokio::spawn(async move {
            commands::listen(client, handler, poll_timeout).await;
        });
    }

    tracing::info!(%addr, "Status endpoint listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
