//! Result evaluation for opened operations.
//!
//! Each operation gets two deferred samples of the asset's latest buffered
//! price: one at `entry_at` and one at `valid_until`. A result is always
//! produced at `valid_until`; when a sample is missing the reported close
//! falls back to the entry price and `win` is `None`.

use std::collections::HashMap;

use common::logger::TraceId;
use market::buffer_store::PriceBufferStore;
use market::types::Direction;
use tracing::{debug, warn};

use crate::timers::{ScheduledTask, TaskKind, TaskQueue};
use crate::types::TradeResult;

#[derive(Debug, Clone)]
pub struct PendingEvaluation {
    pub op_id: u64,
    pub asset_id: String,
    pub timeframe: String,
    pub direction: Direction,
    pub entry_at: u64,
    pub valid_until: u64,
    /// Cooldown horizon registered when the operation opened.
    pub cooldown_until: u64,
    pub trace_id: TraceId,
    entry_price: Option<f64>,
}

impl PendingEvaluation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        op_id: u64,
        asset_id: String,
        timeframe: String,
        direction: Direction,
        entry_at: u64,
        valid_until: u64,
        cooldown_until: u64,
        trace_id: TraceId,
    ) -> Self {
        Self {
            op_id,
            asset_id,
            timeframe,
            direction,
            entry_at,
            valid_until,
            cooldown_until,
            trace_id,
            entry_price: None,
        }
    }
}

/// A finished evaluation, ready to be published.
#[derive(Debug, Clone)]
pub struct CompletedEvaluation {
    pub op_id: u64,
    pub result: TradeResult,
    pub cooldown_until: u64,
    pub trace_id: TraceId,
}

#[derive(Debug, Default)]
pub struct ResultEvaluator {
    pending: HashMap<u64, PendingEvaluation>,
}

impl ResultEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the operation and queues its entry and close samples.
    pub fn schedule(&mut self, tasks: &mut TaskQueue, eval: PendingEvaluation) {
        tasks.schedule(eval.entry_at, eval.op_id, TaskKind::SampleEntry);
        tasks.schedule(eval.valid_until, eval.op_id, TaskKind::SampleClose);
        self.pending.insert(eval.op_id, eval);
    }

    /// Runs one due sample. Returns the completed evaluation on close.
    pub fn on_task(
        &mut self,
        task: ScheduledTask,
        store: &PriceBufferStore,
    ) -> Option<CompletedEvaluation> {
        match task.kind {
            TaskKind::SampleEntry => {
                let eval = self.pending.get_mut(&task.op_id)?;
                eval.entry_price = store.latest(&eval.asset_id);
                debug!(
                    op_id = eval.op_id,
                    asset = %eval.asset_id,
                    entry_price = ?eval.entry_price,
                    "entry price sampled"
                );
                None
            }
            TaskKind::SampleClose => {
                let eval = self.pending.remove(&task.op_id)?;
                let sampled_close = store.latest(&eval.asset_id);

                let win = match (eval.entry_price, sampled_close) {
                    (Some(entry), Some(close)) => Some(is_win(eval.direction, entry, close)),
                    _ => {
                        warn!(
                            op_id = eval.op_id,
                            asset = %eval.asset_id,
                            "price sample unavailable; result is inconclusive"
                        );
                        None
                    }
                };

                Some(CompletedEvaluation {
                    op_id: eval.op_id,
                    cooldown_until: eval.cooldown_until,
                    trace_id: eval.trace_id,
                    result: TradeResult {
                        asset: eval.asset_id,
                        timeframe: eval.timeframe,
                        direction: eval.direction,
                        entry_at: eval.entry_at,
                        valid_until: eval.valid_until,
                        entry_price: eval.entry_price,
                        close_price: sampled_close.or(eval.entry_price),
                        win,
                    },
                })
            }
        }
    }

    pub fn clear(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// BUY wins on a strictly higher close, SELL on a strictly lower one.
pub fn is_win(direction: Direction, entry: f64, close: f64) -> bool {
    match direction {
        Direction::Buy => close > entry,
        Direction::Sell => close < entry,
    }
}
