use super::ids::PositionId;
use super::order::OrderSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An open, unrealized exposure. Owned exclusively by the broker; closed
/// positions are converted into [`Trade`](super::trade::Trade) records and
/// removed — there are no partial closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
    pub entry_price: f64,
    pub open_time: NaiveDateTime,
}

impl Position {
    /// Entry notional value of the exposure.
    pub fn notional(&self) -> f64 {
        self.entry_price * self.size
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        (current_price - self.entry_price) * self.size * self.side.sign()
    }
}
