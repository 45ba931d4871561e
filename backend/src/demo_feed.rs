//! Demo quote feed.
//!
//! Random-walk prices for every requested asset on a fixed cadence. Used
//! when no broker connection is wired in.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use market::feed::QuoteSource;
use market::types::Quote;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct RandomWalkFeed {
    tick: Duration,
    start_price: f64,
    /// Largest relative move per tick.
    max_step: f64,
    seed: Option<u64>,
}

impl RandomWalkFeed {
    /// `tick` is floored at 1 ms.
    pub fn new(tick: Duration) -> Self {
        Self {
            tick: tick.max(Duration::from_millis(1)),
            start_price: 100.0,
            max_step: 0.001,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }
}

#[async_trait]
impl QuoteSource for RandomWalkFeed {
    async fn stream_quotes(
        &self,
        assets: Vec<String>,
        sender: mpsc::Sender<Quote>,
    ) -> anyhow::Result<()> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut prices: BTreeMap<String, f64> = assets
            .into_iter()
            .map(|a| (a, self.start_price))
            .collect();

        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            assets = prices.len(),
            every_ms = self.tick.as_millis() as u64,
            "demo feed started"
        );

        loop {
            ticker.tick().await;

            for (asset, price) in prices.iter_mut() {
                let step = rng.gen_range(-self.max_step..=self.max_step);
                *price = (*price * (1.0 + step)).max(f64::EPSILON);

                if sender.send(Quote::new(asset.clone(), *price)).await.is_err() {
                    debug!("quote receiver dropped; demo feed stopping");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn quotes_every_asset_each_tick() {
        let feed = RandomWalkFeed::new(Duration::from_millis(500)).with_seed(1);
        let (tx, mut rx) = mpsc::channel(16);

        let task = tokio::spawn(async move {
            feed.stream_quotes(vec!["A".into(), "B".into()], tx).await
        });

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rx.recv().await.unwrap());
        }
        drop(rx);

        let ids: Vec<&str> = seen.iter().map(|q| q.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "A", "B"]);
        assert!(seen.iter().all(|q| q.price.is_finite() && q.price > 0.0));

        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tick_is_floored() {
        let feed = RandomWalkFeed::new(Duration::ZERO).with_seed(5);
        let (tx, mut rx) = mpsc::channel(4);

        let task = tokio::spawn(async move { feed.stream_quotes(vec!["A".into()], tx).await });

        assert!(rx.recv().await.is_some());
        drop(rx);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn steps_stay_within_bounds() {
        let feed = RandomWalkFeed::new(Duration::from_millis(10))
            .with_seed(9)
            .with_start_price(1.0);
        let (tx, mut rx) = mpsc::channel(16);

        tokio::spawn(async move { feed.stream_quotes(vec!["A".into()], tx).await });

        let mut prev = 1.0;
        for _ in 0..50 {
            let q = rx.recv().await.unwrap();
            assert!((q.price / prev - 1.0).abs() <= 0.001 + 1e-12);
            prev = q.price;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn same_seed_same_walk() {
        let run = |seed| async move {
            let feed = RandomWalkFeed::new(Duration::from_millis(10)).with_seed(seed);
            let (tx, mut rx) = mpsc::channel(16);
            tokio::spawn(async move { feed.stream_quotes(vec!["A".into()], tx).await });

            let mut out = Vec::new();
            for _ in 0..5 {
                out.push(rx.recv().await.unwrap().price);
            }
            out
        };

        assert_eq!(run(3).await, run(3).await);
    }
}
