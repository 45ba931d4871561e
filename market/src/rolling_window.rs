use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 120;

/// A timestamped value used inside the rolling window
#[derive(Clone, Debug, PartialEq)]
pub struct TimedValue<T> {
    pub ts_ms: u64,
    pub value: T,
}

/// Count-bounded price history for one asset.
///
/// Samples are kept in arrival order; once `capacity` is reached the oldest
/// sample is evicted for every new one (FIFO).
#[derive(Clone, Debug)]
pub struct PriceBuffer {
    values: VecDeque<TimedValue<f64>>,
    capacity: usize,
}

impl Default for PriceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PriceBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a price. Non-finite prices are dropped and `false` is returned.
    pub fn push(&mut self, ts_ms: u64, price: f64) -> bool {
        if !price.is_finite() {
            return false;
        }

        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(TimedValue {
            ts_ms,
            value: price,
        });
        true
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().map(|v| v.value)
    }

    pub fn latest_sample(&self) -> Option<&TimedValue<f64>> {
        self.values.back()
    }

    /// The sample before the latest one.
    pub fn previous(&self) -> Option<f64> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        self.values.get(n - 2).map(|v| v.value)
    }

    /// The trailing `n` prices, oldest first, or `None` if fewer exist.
    pub fn tail(&self, n: usize) -> Option<Vec<f64>> {
        let len = self.values.len();
        if n == 0 || len < n {
            return None;
        }
        Some(self.values.range(len - n..).map(|v| v.value).collect())
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().map(|v| v.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
