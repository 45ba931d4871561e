//! Shared types used by the scheduler subsystem.

use serde::{Deserialize, Serialize};

use market::buffer_store::BufferConfig;
use market::pulse::{ProbabilityConfig, TrendConfig};
use market::types::Direction;

use crate::error::SchedulerError;

pub const MINUTE_MS: u64 = 60_000;

/// Longest accepted timeframe.
pub const MAX_TIMEFRAME_MS: u64 = 24 * 60 * MINUTE_MS;

/// Longest accepted cooldown bound.
pub const MAX_COOLDOWN_MINUTES: u64 = 24 * 60;

/// Randomized quiet period drawn after every operation.
///
/// With probability `1 - extra_chance` the draw is uniform in
/// `[base_min_minutes, base_max_minutes]`, otherwise uniform in
/// `[extra_min_minutes, extra_max_minutes]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CooldownConfig {
    pub base_min_minutes: u64,
    pub base_max_minutes: u64,
    pub extra_min_minutes: u64,
    pub extra_max_minutes: u64,
    pub extra_chance: f64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            base_min_minutes: 2,
            base_max_minutes: 4,
            extra_min_minutes: 6,
            extra_max_minutes: 10,
            extra_chance: 0.2,
        }
    }
}

impl CooldownConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.base_min_minutes > self.base_max_minutes {
            return Err(SchedulerError::InvalidConfig(format!(
                "cooldown base range {}..{} is inverted",
                self.base_min_minutes, self.base_max_minutes
            )));
        }
        if self.extra_min_minutes > self.extra_max_minutes {
            return Err(SchedulerError::InvalidConfig(format!(
                "cooldown extra range {}..{} is inverted",
                self.extra_min_minutes, self.extra_max_minutes
            )));
        }
        if self.base_max_minutes.max(self.extra_max_minutes) > MAX_COOLDOWN_MINUTES {
            return Err(SchedulerError::InvalidConfig(format!(
                "cooldown may not exceed {MAX_COOLDOWN_MINUTES} minutes"
            )));
        }
        if !(0.0..=1.0).contains(&self.extra_chance) {
            return Err(SchedulerError::InvalidConfig(format!(
                "cooldown extra_chance must be within [0, 1], got {}",
                self.extra_chance
            )));
        }
        Ok(())
    }
}

/// Configuration knobs for operation windows and event emission.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Candle / timeframe unit. Operations start on multiples of it.
    pub timeframe_ms: u64,

    /// Candles per operation (1 or 2).
    pub candles: u32,

    /// How long before entry the pre-open notice lies.
    pub pre_open_ms: u64,

    pub cooldown: CooldownConfig,

    /// Flip BUY <-> SELL after detection.
    pub invert_direction: bool,

    /// Period of heartbeat events.
    pub heartbeat_interval_ms: u64,

    /// Offset from UTC used to render `display_time`.
    pub display_offset_minutes: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timeframe_ms: MINUTE_MS,
            candles: 1,
            pre_open_ms: 30_000,
            cooldown: CooldownConfig::default(),
            invert_direction: false,
            heartbeat_interval_ms: 15_000,
            display_offset_minutes: 0,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.timeframe_ms == 0 {
            return Err(SchedulerError::InvalidConfig(
                "timeframe must be positive".into(),
            ));
        }
        if self.timeframe_ms > MAX_TIMEFRAME_MS {
            return Err(SchedulerError::InvalidConfig(format!(
                "timeframe {} ms exceeds one day",
                self.timeframe_ms
            )));
        }
        if self.pre_open_ms > MAX_TIMEFRAME_MS {
            return Err(SchedulerError::InvalidConfig(format!(
                "pre-open {} ms exceeds one day",
                self.pre_open_ms
            )));
        }
        if !(1..=2).contains(&self.candles) {
            return Err(SchedulerError::InvalidConfig(format!(
                "candle count must be 1 or 2, got {}",
                self.candles
            )));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(SchedulerError::InvalidConfig(
                "heartbeat interval must be positive".into(),
            ));
        }
        if self.display_offset_minutes.abs() >= 24 * 60 {
            return Err(SchedulerError::InvalidConfig(format!(
                "display offset {} minutes is out of range",
                self.display_offset_minutes
            )));
        }
        self.cooldown.validate()
    }

    /// `M<minutes>` for whole minutes, `S<seconds>` otherwise.
    pub fn timeframe_label(&self) -> String {
        if self.timeframe_ms % MINUTE_MS == 0 {
            format!("M{}", self.timeframe_ms / MINUTE_MS)
        } else {
            format!("S{}", self.timeframe_ms / 1_000)
        }
    }
}

/// Everything the engine needs, grouped per consuming component.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub buffer: BufferConfig,
    pub trend: TrendConfig,
    pub probability: ProbabilityConfig,
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.buffer.validate()?;
        self.trend.validate()?;
        self.probability.validate()?;
        if self.trend.ma_len > self.buffer.capacity {
            return Err(market::error::MarketError::MaLongerThanBuffer {
                ma_len: self.trend.ma_len,
                capacity: self.buffer.capacity,
            }
            .into());
        }
        self.scheduler.validate()
    }
}

/// Timing of one operation, all in ms since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub opened_at: u64,
    pub pre_open_at: u64,
    pub entry_at: u64,
    pub valid_until: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowDurations {
    pub pre_open_ms: u64,
    pub candle_ms: u64,
    pub candles: u32,
    pub total_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub asset: String,
    pub timeframe: String,
    pub direction: Direction,
    pub display_time: String,
    pub probability: u8,
    pub pre_open_at: u64,
    pub entry_at: u64,
    pub valid_until: u64,
    pub window_durations: WindowDurations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResult {
    pub asset: String,
    pub timeframe: String,
    pub direction: Direction,
    pub entry_at: u64,
    pub valid_until: u64,
    pub entry_price: Option<f64>,
    pub close_price: Option<f64>,
    /// `None` when a price sample was unavailable.
    pub win: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub t: u64,
    pub next_allowed_at: u64,
    pub connected: bool,
}

/// What subscribers receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Signal(Signal),
    Result(TradeResult),
    Heartbeat(Heartbeat),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Signal(_) => "signal",
            Event::Result(_) => "result",
            Event::Heartbeat(_) => "ping",
        }
    }

    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            Event::Signal(s) => serde_json::to_string(s),
            Event::Result(r) => serde_json::to_string(r),
            Event::Heartbeat(h) => serde_json::to_string(h),
        }
    }

    /// Server-sent-events framing: `event: <name>\ndata: <json>\n\n`.
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        Ok(format!(
            "event: {}\ndata: {}\n\n",
            self.name(),
            self.payload_json()?
        ))
    }
}
