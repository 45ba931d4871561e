//! The signal engine.
//!
//! Synchronous core owned by a single task. Every mutation enters through
//! either a quote (`on_quote`) or a timer expiry (`on_timer`), and each call
//! runs to completion before the next one starts.
//!
//! For each quote it:
//!   1. Runs deferred samples that are already due, so results and their
//!      cooldown land before anything else is decided.
//!   2. Records the price in the asset's rolling buffer.
//!   3. Evaluates the trend pulse and checks eligibility.
//!   4. On an eligible crossing: scores it, plans the window, takes the
//!      global lock, pre-registers the cooldown and schedules evaluation.

use chrono::{DateTime, FixedOffset, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, field, info, instrument};

use common::logger::{TraceId, root_span};
use market::buffer_store::PriceBufferStore;
use market::pulse::{ProbabilityScorer, Pulse, TrendPulse, TrendPulseResult};
use market::types::{AllowedAssets, Direction, Quote};

use crate::eligibility::{Eligibility, check_eligibility};
use crate::error::SchedulerError;
use crate::evaluator::{PendingEvaluation, ResultEvaluator};
use crate::metrics::{Counters, CountersSnapshot};
use crate::policy::{CooldownDistribution, WeightedCooldown};
use crate::state::{CooldownState, OpenOperation, TradeLock};
use crate::timers::TaskQueue;
use crate::types::{EngineConfig, Event, Heartbeat, Signal, WindowPlan};
use crate::window::{plan_window, window_durations};

pub struct SignalEngine {
    cfg: EngineConfig,
    timeframe: String,

    store: PriceBufferStore,
    trend: TrendPulse,
    scorer: ProbabilityScorer,

    lock: TradeLock,
    cooldown: CooldownState,
    cooldown_draw: Box<dyn CooldownDistribution>,

    tasks: TaskQueue,
    evaluator: ResultEvaluator,

    allowed: AllowedAssets,
    rng: StdRng,
    next_op_id: u64,
    counters: Counters,
}

/// Lock details exposed in status snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSnapshot {
    pub asset: String,
    pub direction: Direction,
    pub opened_at: u64,
    pub pre_open_at: u64,
    pub entry_at: u64,
    pub valid_until: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub now: u64,
    pub lock: Option<LockSnapshot>,
    pub next_allowed_at: u64,
    pub pending_evaluations: usize,
    pub tracked_assets: Vec<String>,
    pub allowed_assets: Vec<String>,
    pub counters: CountersSnapshot,
}

impl SignalEngine {
    /// Engine with a weighted random cooldown and an entropy-seeded rng.
    pub fn new(cfg: EngineConfig, allowed: AllowedAssets) -> Result<Self, SchedulerError> {
        let draw = WeightedCooldown::from_entropy(cfg.scheduler.cooldown);
        Self::with_parts(cfg, allowed, Box::new(draw), StdRng::from_entropy())
    }

    /// Engine with an injected cooldown distribution and scoring rng.
    pub fn with_parts(
        cfg: EngineConfig,
        allowed: AllowedAssets,
        cooldown_draw: Box<dyn CooldownDistribution>,
        rng: StdRng,
    ) -> Result<Self, SchedulerError> {
        cfg.validate()?;

        Ok(Self {
            timeframe: cfg.scheduler.timeframe_label(),
            store: PriceBufferStore::new(cfg.buffer),
            trend: TrendPulse::new(cfg.trend),
            scorer: ProbabilityScorer::new(cfg.probability)?,
            lock: TradeLock::default(),
            cooldown: CooldownState::default(),
            cooldown_draw,
            tasks: TaskQueue::new(),
            evaluator: ResultEvaluator::new(),
            allowed,
            rng,
            next_op_id: 0,
            counters: Counters::default(),
            cfg,
        })
    }

    /// Handles one quote. Returns the events to publish, in order.
    #[instrument(
        level = "debug",
        skip(self, quote),
        target = "engine",
        fields(asset = %quote.asset_id, price = quote.price)
    )]
    pub fn on_quote(&mut self, quote: &Quote, now_ms: u64) -> Vec<Event> {
        let mut events = self.on_timer(now_ms);

        if !self.allowed.contains(&quote.asset_id) {
            Counters::incr(&self.counters.quotes_dropped);
            debug!("asset not allowed; quote ignored");
            return events;
        }

        let Some(buffer) = self.store.record(&quote.asset_id, quote.price, now_ms) else {
            Counters::incr(&self.counters.quotes_dropped);
            return events;
        };
        Counters::incr(&self.counters.quotes_accepted);

        let trend = self.trend.evaluate(buffer);

        // Opportunistic; a no-op when unlocked.
        self.lock.release_if_expired(now_ms);

        if trend.crossing.is_some() {
            Counters::incr(&self.counters.crossings);
        }

        match check_eligibility(&trend, &self.lock, &self.cooldown, now_ms) {
            Eligibility::Eligible => {
                if let Some(signal) = self.open_operation(&quote.asset_id, &trend, now_ms) {
                    events.push(Event::Signal(signal));
                }
            }
            Eligibility::Locked => {
                Counters::incr(&self.counters.suppressed_locked);
                debug!(
                    held_by = ?self.lock.current().map(|op| op.asset_id.as_str()),
                    "crossing suppressed: trade lock held"
                );
            }
            Eligibility::CooldownNotElapsed => {
                Counters::incr(&self.counters.suppressed_cooldown);
                debug!(
                    next_allowed_at = self.cooldown.next_allowed_at(),
                    "crossing suppressed: cooldown active"
                );
            }
            Eligibility::Warmup | Eligibility::NoCrossing => {}
        }

        events
    }

    /// Runs every deferred sample due at `now_ms` and returns the results.
    pub fn on_timer(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();

        while let Some(task) = self.tasks.pop_due(now_ms) {
            let Some(done) = self.evaluator.on_task(task, &self.store) else {
                continue;
            };

            self.lock.release(done.op_id);
            let next_allowed_at = self.cooldown.raise(done.cooldown_until);
            Counters::incr(&self.counters.results);

            let span = root_span("operation", &done.trace_id);
            span.record("asset", field::display(&done.result.asset));
            let _enter = span.enter();
            info!(
                op_id = done.op_id,
                direction = %done.result.direction,
                entry_price = ?done.result.entry_price,
                close_price = ?done.result.close_price,
                win = ?done.result.win,
                next_allowed_at,
                "operation evaluated"
            );

            events.push(Event::Result(done.result));
        }

        self.lock.release_if_expired(now_ms);
        events
    }

    fn open_operation(
        &mut self,
        asset_id: &str,
        trend: &TrendPulseResult,
        now_ms: u64,
    ) -> Option<Signal> {
        let crossing = trend.crossing?;
        let direction = if self.cfg.scheduler.invert_direction {
            crossing.direction().inverted()
        } else {
            crossing.direction()
        };

        let plan = plan_window(now_ms, &self.cfg.scheduler);
        let trace_id = TraceId::new();
        self.next_op_id += 1;
        let op_id = self.next_op_id;

        let op = OpenOperation {
            id: op_id,
            asset_id: asset_id.to_string(),
            direction,
            plan,
            trace_id,
        };
        if self.lock.try_acquire(op).is_err() {
            Counters::incr(&self.counters.suppressed_locked);
            return None;
        }

        let probability = self
            .scorer
            .score(trend.price, trend.avg, trend.std_dev, &mut self.rng);

        let cooldown_ms = self.cooldown_draw.draw_ms();
        let cooldown_until = self
            .cooldown
            .raise(plan.valid_until.saturating_add(cooldown_ms));

        self.evaluator.schedule(
            &mut self.tasks,
            PendingEvaluation::new(
                op_id,
                asset_id.to_string(),
                self.timeframe.clone(),
                direction,
                plan.entry_at,
                plan.valid_until,
                cooldown_until,
                trace_id,
            ),
        );
        Counters::incr(&self.counters.signals);

        let span = root_span("operation", &trace_id);
        span.record("asset", field::display(asset_id));
        let _enter = span.enter();
        info!(
            op_id,
            direction = %direction,
            probability,
            price = trend.price,
            avg = trend.avg,
            entry_at = plan.entry_at,
            valid_until = plan.valid_until,
            cooldown_until,
            "signal opened"
        );

        Some(Signal {
            asset: asset_id.to_string(),
            timeframe: self.timeframe.clone(),
            direction,
            display_time: self.display_time(plan.entry_at),
            probability,
            pre_open_at: plan.pre_open_at,
            entry_at: plan.entry_at,
            valid_until: plan.valid_until,
            window_durations: window_durations(&self.cfg.scheduler),
        })
    }

    /// `HH:MM` of `ts_ms` in the configured display offset.
    fn display_time(&self, ts_ms: u64) -> String {
        let offset = FixedOffset::east_opt(self.cfg.scheduler.display_offset_minutes * 60);
        let ts = i64::try_from(ts_ms)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        match (offset, ts) {
            (Some(offset), Some(ts)) => ts.with_timezone(&offset).format("%H:%M").to_string(),
            _ => "--:--".to_string(),
        }
    }

    /// Records historical prices without evaluating crossings.
    ///
    /// Returns how many prices were recorded; disallowed assets record none.
    pub fn warm_up(&mut self, asset_id: &str, prices: &[f64], now_ms: u64) -> usize {
        if !self.allowed.contains(asset_id) {
            debug!(asset = %asset_id, "warm-up skipped for disallowed asset");
            return 0;
        }

        let recorded = prices
            .iter()
            .filter(|p| self.store.record(asset_id, **p, now_ms).is_some())
            .count();

        debug!(asset = %asset_id, recorded, "price history warmed up");
        recorded
    }

    /// Resets the lock and drops every pending evaluation.
    ///
    /// The cooldown horizon is kept; it never moves backwards.
    pub fn disconnect(&mut self) -> usize {
        let released = self.lock.reset();
        let dropped_tasks = self.tasks.clear();
        let dropped = self.evaluator.clear();

        info!(
            released = ?released.map(|op| op.asset_id),
            dropped_evaluations = dropped,
            dropped_tasks,
            next_allowed_at = self.cooldown.next_allowed_at(),
            "engine reset after disconnect"
        );
        dropped
    }

    /// Replaces the allowed set and drops buffers of removed assets.
    pub fn set_allowed_assets(&mut self, allowed: AllowedAssets) {
        let removed = self.store.retain_allowed(&allowed);
        info!(allowed = allowed.len(), removed, "allowed assets updated");
        self.allowed = allowed;
    }

    pub fn heartbeat(&self, now_ms: u64, connected: bool) -> Event {
        Event::Heartbeat(Heartbeat {
            t: now_ms,
            next_allowed_at: self.cooldown.next_allowed_at(),
            connected,
        })
    }

    /// Earliest pending deferred sample.
    pub fn next_deadline(&self) -> Option<u64> {
        self.tasks.next_due()
    }

    pub fn snapshot(&self, now_ms: u64) -> EngineSnapshot {
        EngineSnapshot {
            now: now_ms,
            lock: self
                .lock
                .current()
                .map(|op| lock_snapshot(&op.asset_id, op.direction, op.plan)),
            next_allowed_at: self.cooldown.next_allowed_at(),
            pending_evaluations: self.evaluator.len(),
            tracked_assets: self.store.tracked_assets(),
            allowed_assets: self.allowed.iter().map(str::to_string).collect(),
            counters: self.counters.snapshot(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn lock(&self) -> &TradeLock {
        &self.lock
    }

    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    pub fn store(&self) -> &PriceBufferStore {
        &self.store
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

fn lock_snapshot(asset: &str, direction: Direction, plan: WindowPlan) -> LockSnapshot {
    LockSnapshot {
        asset: asset.to_string(),
        direction,
        opened_at: plan.opened_at,
        pre_open_at: plan.pre_open_at,
        entry_at: plan.entry_at,
        valid_until: plan.valid_until,
    }
}
