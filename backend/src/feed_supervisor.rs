//! Keeps a quote source attached to the signal service.
//!
//! Each attempt connects the service, streams until the source fails or
//! ends, then reports the connection as lost (which resets the lock and
//! drops pending evaluations) and retries after a delay.

use std::sync::Arc;
use std::time::Duration;

use market::feed::QuoteSource;
use scheduler::service::ServiceHandle;
use tracing::{info, warn};

/// Runs until the service shuts down.
pub async fn supervise_feed<S: QuoteSource>(
    source: Arc<S>,
    handle: ServiceHandle,
    assets: Vec<String>,
    reconnect_delay: Duration,
) -> anyhow::Result<()> {
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        handle.connect().await?;
        info!(attempt, assets = assets.len(), "quote feed attached");

        let reason = match source
            .stream_quotes(assets.clone(), handle.quote_sender())
            .await
        {
            Ok(()) => "quote feed ended".to_string(),
            Err(e) => format!("{e:#}"),
        };

        warn!(attempt, %reason, "quote feed detached");
        handle.connection_lost(reason).await?;

        tokio::time::sleep(reconnect_delay).await;
    }
}
