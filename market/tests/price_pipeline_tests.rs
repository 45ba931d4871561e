use tokio::sync::mpsc;

use market::{
    buffer_store::{BufferConfig, PriceBufferStore},
    feed::QuoteSource,
    pulse::{
        Crossing, ProbabilityConfig, ProbabilityScorer, Pulse, PulseValidity, TrendConfig,
        TrendPulse,
    },
    types::Quote,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Clone)]
struct MockQuoteSource {
    prices: Vec<f64>,
}

#[async_trait::async_trait]
impl QuoteSource for MockQuoteSource {
    async fn stream_quotes(
        &self,
        assets: Vec<String>,
        sender: mpsc::Sender<Quote>,
    ) -> anyhow::Result<()> {
        for p in &self.prices {
            for asset in &assets {
                if sender.send(Quote::new(asset.clone(), *p)).await.is_err() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// 18 samples alternating 101/100, then 99.5 and 99: average sits near 100.4
/// and neither of the last two samples crosses it.
fn oscillating_seed() -> Vec<f64> {
    let mut v: Vec<f64> = (0..18).map(|i| if i % 2 == 0 { 101.0 } else { 100.0 }).collect();
    v.push(99.5);
    v.push(99.0);
    v
}

#[test]
fn seeded_series_crosses_up_on_the_twenty_first_price() {
    let mut store = PriceBufferStore::new(BufferConfig { capacity: 50 });
    let trend = TrendPulse::new(TrendConfig { ma_len: 20 });

    for (i, p) in oscillating_seed().into_iter().enumerate() {
        let buf = store.record("EUR/USD", p, i as u64 * 1_000).unwrap();
        assert!(trend.evaluate(buf).crossing.is_none());
    }

    let buf = store.record("EUR/USD", 101.0, 20_000).unwrap();
    let r = trend.evaluate(buf);

    assert_eq!(r.validity, PulseValidity::Valid);
    assert_eq!(r.prev, 99.0);
    assert!((r.avg - 100.0).abs() < 0.5);
    assert_eq!(r.crossing, Some(Crossing::Up));

    let scorer = ProbabilityScorer::new(ProbabilityConfig {
        jitter: 0.0,
        ..Default::default()
    })
    .unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let p = scorer.score(r.price, r.avg, r.std_dev, &mut rng);
    assert!((50..=92).contains(&p));
}

#[test]
fn fewer_samples_than_window_never_evaluates() {
    let mut store = PriceBufferStore::new(BufferConfig { capacity: 50 });
    let trend = TrendPulse::new(TrendConfig { ma_len: 20 });

    for i in 0..19 {
        let p = if i % 2 == 0 { 90.0 } else { 110.0 };
        let buf = store.record("A", p, i).unwrap();
        let r = trend.evaluate(buf);
        assert_eq!(r.validity, PulseValidity::Invalid);
        assert!(r.crossing.is_none());
    }
}

#[tokio::test]
async fn quote_source_feeds_the_store_in_arrival_order() {
    let source = MockQuoteSource {
        prices: vec![1.0, 2.0, f64::NAN, 3.0],
    };
    let (tx, mut rx) = mpsc::channel(16);

    source
        .stream_quotes(vec!["A".into(), "B".into()], tx)
        .await
        .unwrap();

    let mut store = PriceBufferStore::new(BufferConfig { capacity: 8 });
    let mut ts = 0;
    while let Some(q) = rx.recv().await {
        store.record(&q.asset_id, q.price, ts);
        ts += 1;
    }

    for asset in ["A", "B"] {
        let prices: Vec<f64> = store.get(asset).unwrap().prices().collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
    }
}
