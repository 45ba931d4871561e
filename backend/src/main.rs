use std::sync::Arc;
use std::time::Duration;

use common::logger::{child_span, init_logger, warn_if_slow};
use scheduler::clock::SystemClock;
use scheduler::engine::SignalEngine;
use scheduler::service::{ServiceHandle, spawn_service};
use signal_backend::{
    config::AppConfig, demo_feed::RandomWalkFeed, event_log::log_events,
    feed_supervisor::supervise_feed,
};
use tracing::{Instrument, error, info, warn};

/// Periodically logs the service status snapshot.
fn start_status_reporter(handle: ServiceHandle, every: Duration) {
    tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval(every);

            loop {
                ticker.tick().await;

                let status =
                    match warn_if_slow("service_status", Duration::from_millis(100), handle.status())
                        .await
                    {
                        Ok(status) => status,
                        Err(e) => {
                            warn!(error = %e, "status reporter stopping");
                            return;
                        }
                    };

                match serde_json::to_string(&status) {
                    Ok(json) => info!(status = %json, "service status"),
                    Err(e) => warn!(error = %e, "failed to encode status"),
                }
            }
        }
        .instrument(child_span("status_reporter")),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;
    init_logger("signal-backend", cfg.json_logs);

    info!(
        timeframe = %cfg.engine.scheduler.timeframe_label(),
        candles = cfg.engine.scheduler.candles,
        ma_len = cfg.engine.trend.ma_len,
        "Starting signal backend..."
    );

    let allowed = cfg.allowed_assets();
    if allowed.is_empty() {
        warn!("allowed asset set is empty; no signals will be produced");
    }
    let assets: Vec<String> = allowed.iter().map(str::to_string).collect();

    let engine = SignalEngine::new(cfg.engine.clone(), allowed)?;
    let (handle, service_task) = spawn_service(engine, SystemClock, cfg.service.clone());

    let sub = handle.subscribe().await?;
    tokio::spawn(log_events(sub).instrument(child_span("event_log")));

    start_status_reporter(handle.clone(), cfg.status_interval);

    let feed = Arc::new(RandomWalkFeed::new(cfg.demo_tick));
    let feed_handle = handle.clone();
    let reconnect_delay = cfg.reconnect_delay;
    tokio::spawn(
        async move {
            if let Err(e) = supervise_feed(feed, feed_handle, assets, reconnect_delay).await {
                error!(error = ?e, "quote feed supervisor stopped");
            }
        }
        .instrument(child_span("quote_feed")),
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    if let Err(e) = handle.disconnect().await {
        warn!(error = %e, "disconnect on shutdown failed");
    }
    service_task.abort();

    Ok(())
}
