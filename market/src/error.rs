use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("buffer capacity must be at least {min}, got {got}")]
    InvalidCapacity { min: usize, got: usize },

    #[error("moving-average length must be at least 2, got {0}")]
    InvalidMaLength(usize),

    #[error("moving-average length {ma_len} exceeds buffer capacity {capacity}")]
    MaLongerThanBuffer { ma_len: usize, capacity: usize },

    #[error("probability bounds must satisfy 0 <= min <= max <= 100, got {min}..{max}")]
    InvalidProbabilityBounds { min: u8, max: u8 },

    #[error("probability parameter `{name}` must be finite and non-negative, got {value}")]
    InvalidProbabilityParam { name: &'static str, value: f64 },
}
