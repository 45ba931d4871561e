use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single price update pushed by the quote stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub asset_id: String,
    pub price: f64,
}

impl Quote {
    pub fn new(asset_id: impl Into<String>, price: f64) -> Self {
        Self {
            asset_id: asset_id.into(),
            price,
        }
    }
}

/// Trade direction carried by signals and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// BUY <-> SELL.
    pub fn inverted(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
        }
    }
}

/// Tickers that may currently produce signals.
///
/// Supplied by an external collaborator; the core only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedAssets {
    inner: BTreeSet<String>,
}

impl AllowedAssets {
    pub fn new<I, S>(assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: assets.into_iter().map(Into::into).collect(),
        }
    }

    /// Instruments open in both markets.
    pub fn intersection<A, B, S>(left: A, right: B) -> Self
    where
        A: IntoIterator<Item = S>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let right: BTreeSet<String> = right.into_iter().map(Into::into).collect();
        Self {
            inner: left
                .into_iter()
                .map(Into::into)
                .filter(|a| right.contains(a))
                .collect(),
        }
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.inner.contains(asset_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
