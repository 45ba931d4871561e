//! Quote-stream seam. Broker connectivity lives outside the core; anything
//! that can push `{asset_id, price}` updates implements [`QuoteSource`].

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::Quote;

#[async_trait]
pub trait QuoteSource: Send + Sync + 'static {
    /// Streams quotes for `assets` into `sender` until the source ends or the
    /// receiver is dropped.
    async fn stream_quotes(
        &self,
        assets: Vec<String>,
        sender: mpsc::Sender<Quote>,
    ) -> anyhow::Result<()>;
}
