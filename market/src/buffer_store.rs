use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::MarketError;
use crate::rolling_window::{DEFAULT_CAPACITY, PriceBuffer};
use crate::types::AllowedAssets;

/// Smallest capacity that still leaves room for a previous price.
pub const MIN_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    /// Samples retained per asset.
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl BufferConfig {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.capacity < MIN_CAPACITY {
            return Err(MarketError::InvalidCapacity {
                min: MIN_CAPACITY,
                got: self.capacity,
            });
        }
        Ok(())
    }
}

/// Per-asset price history. Buffers are created lazily on the first quote.
#[derive(Debug, Default)]
pub struct PriceBufferStore {
    buffers: HashMap<String, PriceBuffer>,
    capacity: usize,
}

impl PriceBufferStore {
    pub fn new(cfg: BufferConfig) -> Self {
        Self {
            buffers: HashMap::new(),
            capacity: cfg.capacity,
        }
    }

    /// Appends `price` to the asset's buffer and returns the updated view.
    ///
    /// Returns `None` when the price is not finite; nothing is recorded and
    /// no buffer is created in that case.
    pub fn record(&mut self, asset_id: &str, price: f64, ts_ms: u64) -> Option<&PriceBuffer> {
        if !price.is_finite() {
            trace!(asset = %asset_id, price, "dropping non-finite price");
            return None;
        }

        let capacity = self.capacity;
        let buffer = self
            .buffers
            .entry(asset_id.to_string())
            .or_insert_with(|| {
                debug!(asset = %asset_id, capacity, "creating price buffer");
                PriceBuffer::new(capacity)
            });

        buffer.push(ts_ms, price);
        Some(buffer)
    }

    pub fn latest(&self, asset_id: &str) -> Option<f64> {
        self.buffers.get(asset_id).and_then(PriceBuffer::latest)
    }

    pub fn get(&self, asset_id: &str) -> Option<&PriceBuffer> {
        self.buffers.get(asset_id)
    }

    /// Drops buffers of assets that are no longer allowed.
    pub fn retain_allowed(&mut self, allowed: &AllowedAssets) -> usize {
        let before = self.buffers.len();
        self.buffers.retain(|asset, _| allowed.contains(asset));
        let removed = before - self.buffers.len();
        if removed > 0 {
            debug!(removed, "dropped buffers for disallowed assets");
        }
        removed
    }

    pub fn tracked_assets(&self) -> Vec<String> {
        let mut assets: Vec<String> = self.buffers.keys().cloned().collect();
        assets.sort();
        assets
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}
