//! Candle — the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV candle for a single time bucket.
///
/// Immutable once parsed: the store re-reads candles from the backing file
/// on demand and never hands out anything mutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// OHLCV sanity check: the high bounds every price, the low floors it,
    /// and volume is non-negative. NaN in any field fails the check.
    pub fn is_sane(&self) -> bool {
        self.high >= self.open
            && self.high >= self.low
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }
}
