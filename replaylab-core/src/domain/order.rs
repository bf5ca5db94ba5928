//! Order types for the immediate-fill market model.

use serde::{Deserialize, Serialize};

/// Which way an order or position points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// PnL sign: long positions gain when price rises, shorts when it falls.
    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

/// A market order. Transient: it exists only for the duration of the
/// `place_order` call and is never stored by the broker.
#[derive(Debug, Clone)]
pub struct MarketOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub size: f64,
}
