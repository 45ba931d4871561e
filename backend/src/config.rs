use std::str::FromStr;
use std::time::Duration;

use market::buffer_store::BufferConfig;
use market::pulse::{ProbabilityConfig, TrendConfig};
use market::types::AllowedAssets;
use scheduler::service::ServiceConfig;
use scheduler::types::{CooldownConfig, EngineConfig, SchedulerConfig};

use crate::error::AppError;

const DEFAULT_DEMO_ASSETS: &str = "EUR/USD,GBP/USD,USD/JPY,AUD/USD,EUR/JPY";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// JSON logs (`APP_ENV=production`); pretty logs otherwise.
    pub json_logs: bool,

    // =========================
    // Signal engine
    // =========================
    /// Buffer, trend, probability and window/cooldown settings.
    ///
    /// Defaults: M1 timeframe, one candle, 30 s pre-open, 20-sample
    /// average over a 120-sample buffer, confidence 50..92, cooldown 2-4
    /// minutes with a 20% chance of 6-10 minutes.
    pub engine: EngineConfig,

    // =========================
    // Service
    // =========================
    /// Channel capacities of the service actor.
    pub service: ServiceConfig,

    // =========================
    // Quote feed
    // =========================
    /// Instruments the demo feed quotes.
    pub demo_assets: Vec<String>,

    /// Instruments open at the broker. When set, only assets present in
    /// both lists are tradeable.
    pub broker_assets: Option<Vec<String>>,

    /// Cadence of demo quotes.
    pub demo_tick: Duration,

    /// Pause before reconnecting after the feed fails or ends.
    pub reconnect_delay: Duration,

    /// How often the status snapshot is logged.
    pub status_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take defaults.
    pub fn from_lookup<F>(get: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let json_logs = get("APP_ENV").is_some_and(|v| v == "production");

        let defaults = SchedulerConfig::default();
        let cooldown_defaults = CooldownConfig::default();
        let prob_defaults = ProbabilityConfig::default();

        let engine = EngineConfig {
            buffer: BufferConfig {
                capacity: parse(&get, "SIGNAL_BUFFER_CAPACITY", BufferConfig::default().capacity)?,
            },
            trend: TrendConfig {
                ma_len: parse(&get, "SIGNAL_MA_LEN", TrendConfig::default().ma_len)?,
            },
            probability: ProbabilityConfig {
                min_prob: parse(&get, "SIGNAL_MIN_PROB", prob_defaults.min_prob)?,
                max_prob: parse(&get, "SIGNAL_MAX_PROB", prob_defaults.max_prob)?,
                jitter: parse(&get, "SIGNAL_JITTER", prob_defaults.jitter)?,
                ..prob_defaults
            },
            scheduler: SchedulerConfig {
                timeframe_ms: parse(&get, "SIGNAL_TIMEFRAME_MS", defaults.timeframe_ms)?,
                candles: parse(&get, "SIGNAL_CANDLES", defaults.candles)?,
                pre_open_ms: parse(&get, "SIGNAL_PRE_OPEN_MS", defaults.pre_open_ms)?,
                cooldown: CooldownConfig {
                    base_min_minutes: parse(
                        &get,
                        "SIGNAL_COOLDOWN_BASE_MIN",
                        cooldown_defaults.base_min_minutes,
                    )?,
                    base_max_minutes: parse(
                        &get,
                        "SIGNAL_COOLDOWN_BASE_MAX",
                        cooldown_defaults.base_max_minutes,
                    )?,
                    extra_min_minutes: parse(
                        &get,
                        "SIGNAL_COOLDOWN_EXTRA_MIN",
                        cooldown_defaults.extra_min_minutes,
                    )?,
                    extra_max_minutes: parse(
                        &get,
                        "SIGNAL_COOLDOWN_EXTRA_MAX",
                        cooldown_defaults.extra_max_minutes,
                    )?,
                    extra_chance: parse(
                        &get,
                        "SIGNAL_COOLDOWN_EXTRA_CHANCE",
                        cooldown_defaults.extra_chance,
                    )?,
                },
                invert_direction: parse_flag(&get, "SIGNAL_INVERT", defaults.invert_direction)?,
                heartbeat_interval_ms: parse(
                    &get,
                    "SIGNAL_HEARTBEAT_MS",
                    defaults.heartbeat_interval_ms,
                )?,
                display_offset_minutes: parse(
                    &get,
                    "SIGNAL_DISPLAY_OFFSET_MIN",
                    defaults.display_offset_minutes,
                )?,
            },
        };
        engine.validate()?;

        let service = ServiceConfig {
            subscriber_capacity: parse(
                &get,
                "SUBSCRIBER_CAPACITY",
                ServiceConfig::default().subscriber_capacity,
            )?,
            ..ServiceConfig::default()
        };

        let demo_assets = split_list(
            &get("DEMO_ASSETS").unwrap_or_else(|| DEFAULT_DEMO_ASSETS.to_string()),
        );
        let broker_assets = get("BROKER_ASSETS").map(|v| split_list(&v));

        Ok(Self {
            json_logs,
            engine,
            service,
            demo_assets,
            broker_assets,
            demo_tick: Duration::from_millis(parse_positive(&get, "DEMO_TICK_MS", 1_000)?),
            reconnect_delay: Duration::from_millis(parse(&get, "RECONNECT_DELAY_MS", 5_000)?),
            status_interval: Duration::from_secs(parse_positive(&get, "STATUS_INTERVAL_SECS", 60)?),
        })
    }

    /// Tradeable set: demo assets, narrowed to the broker's when provided.
    pub fn allowed_assets(&self) -> AllowedAssets {
        match &self.broker_assets {
            Some(broker) => AllowedAssets::intersection(
                self.demo_assets.iter().cloned(),
                broker.iter().cloned(),
            ),
            None => AllowedAssets::new(self.demo_assets.iter().cloned()),
        }
    }
}

fn parse<F, T>(get: &F, key: &'static str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidEnv { key, value: raw }),
    }
}

/// Like `parse`, rejecting zero. Used for timer periods.
fn parse_positive<F>(get: &F, key: &'static str, default: u64) -> Result<u64, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse(get, key, default)? {
        0 => Err(AppError::InvalidEnv {
            key,
            value: "0".into(),
        }),
        n => Ok(n),
    }
}

fn parse_flag<F>(get: &F, key: &'static str, default: bool) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no" | "") => Ok(false),
        Some(other) => Err(AppError::InvalidEnv {
            key,
            value: other.to_string(),
        }),
    }
}

/// Comma-separated list; blanks are skipped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert!(!cfg.json_logs);
        assert_eq!(cfg.engine.scheduler.timeframe_ms, 60_000);
        assert_eq!(cfg.engine.scheduler.candles, 1);
        assert_eq!(cfg.engine.trend.ma_len, 20);
        assert_eq!(cfg.engine.scheduler.heartbeat_interval_ms, 15_000);
        assert!(!cfg.engine.scheduler.invert_direction);
        assert_eq!(cfg.demo_assets.len(), 5);
        assert_eq!(cfg.allowed_assets().len(), 5);
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("SIGNAL_CANDLES", "2"),
            ("SIGNAL_MA_LEN", "30"),
            ("SIGNAL_INVERT", "1"),
            ("SIGNAL_COOLDOWN_EXTRA_CHANCE", "0.5"),
            ("SUBSCRIBER_CAPACITY", "8"),
        ]))
        .unwrap();

        assert!(cfg.json_logs);
        assert_eq!(cfg.engine.scheduler.candles, 2);
        assert_eq!(cfg.engine.trend.ma_len, 30);
        assert!(cfg.engine.scheduler.invert_direction);
        assert_eq!(cfg.engine.scheduler.cooldown.extra_chance, 0.5);
        assert_eq!(cfg.service.subscriber_capacity, 8);
    }

    #[test]
    fn malformed_value_names_the_key() {
        let err = AppConfig::from_lookup(lookup(&[("SIGNAL_MA_LEN", "twenty")])).unwrap_err();

        match err {
            AppError::InvalidEnv { key, value } => {
                assert_eq!(key, "SIGNAL_MA_LEN");
                assert_eq!(value, "twenty");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn inconsistent_engine_config_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("SIGNAL_CANDLES", "3")])).unwrap_err();
        assert!(matches!(err, AppError::Scheduler(_)));
    }

    #[test]
    fn zero_periods_are_rejected() {
        for key in ["DEMO_TICK_MS", "STATUS_INTERVAL_SECS"] {
            match AppConfig::from_lookup(lookup(&[(key, "0")])).unwrap_err() {
                AppError::InvalidEnv { key: k, value } => {
                    assert_eq!(k, key);
                    assert_eq!(value, "0");
                }
                other => panic!("unexpected error {other}"),
            }
        }

        // reconnecting immediately is allowed
        let cfg = AppConfig::from_lookup(lookup(&[("RECONNECT_DELAY_MS", "0")])).unwrap();
        assert_eq!(cfg.reconnect_delay, Duration::ZERO);
    }

    #[test]
    fn oversized_window_settings_are_rejected() {
        for (key, value) in [
            ("SIGNAL_TIMEFRAME_MS", "18446744073709551615"),
            ("SIGNAL_COOLDOWN_EXTRA_MAX", "18446744073709551615"),
        ] {
            let err = AppConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(matches!(err, AppError::Scheduler(_)), "{key}");
        }
    }

    #[test]
    fn broker_list_narrows_allowed_assets() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DEMO_ASSETS", "EUR/USD, GBP/USD ,,USD/JPY"),
            ("BROKER_ASSETS", "GBP/USD,USD/JPY,BTC/USD"),
        ]))
        .unwrap();

        assert_eq!(cfg.demo_assets, vec!["EUR/USD", "GBP/USD", "USD/JPY"]);

        let allowed = cfg.allowed_assets();
        assert_eq!(allowed.len(), 2);
        assert!(allowed.contains("GBP/USD"));
        assert!(!allowed.contains("EUR/USD"));
        assert!(!allowed.contains("BTC/USD"));
    }
}
