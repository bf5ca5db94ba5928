//! Trade — a realized round trip, immutable once appended to the history.

use super::ids::TradeId;
use super::order::OrderSide;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The record produced when a position is fully closed. Appended to the
/// broker's trade history in close order and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub open_time: NaiveDateTime,
    pub close_time: NaiveDateTime,
}

impl Trade {
    /// How long the position was held.
    pub fn duration(&self) -> Duration {
        self.close_time - self.open_time
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
