//! Broker — account balance, open-position ledger, and trade history.
//!
//! The broker is the single owner of account state. It never reads the
//! market itself: every operation that needs a price takes a [`Quote`]
//! snapshot from the caller, which keeps the data layer single-writer.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::clock::Quote;
use crate::domain::{IdGen, MarketOrder, OrderSide, Position, PositionId, Trade};

/// Broker construction parameters, supplied by the configuration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub initial_balance: f64,
    /// Full bid/ask spread: buys fill half a spread above the quote,
    /// sells half below, on entry and on exit alike.
    pub spread: f64,
    /// Account leverage, used only for margin bookkeeping.
    pub leverage: f64,
    /// Flat commission deducted from balance per fill.
    pub commission: f64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            spread: 0.0,
            leverage: 1.0,
            commission: 0.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("order size must be positive, got {size}")]
    InvalidSize { size: f64 },

    #[error("no market price available for {symbol:?}")]
    NoQuote { symbol: String },

    #[error("no open position with id {id}")]
    PositionNotFound { id: PositionId },
}

/// Position lifecycle: open on fill, removed on close — nothing in between.
/// Every validation failure leaves the ledger untouched; an operation either
/// applies fully (position + balance together) or not at all.
pub struct Broker {
    config: BrokerConfig,
    balance: f64,
    positions: Vec<Position>,
    trades: Vec<Trade>,
    ids: IdGen,
    margin_called: bool,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        let balance = config.initial_balance;
        Self {
            config,
            balance,
            positions: Vec::new(),
            trades: Vec::new(),
            ids: IdGen::default(),
            margin_called: false,
        }
    }

    /// Fill a market order at the quoted price and open a position.
    ///
    /// The order itself is transient; only the opened position survives the
    /// call, and its id is returned so the caller can close it later.
    pub fn place_order(
        &mut self,
        order: &MarketOrder,
        quote: Quote,
    ) -> Result<PositionId, BrokerError> {
        if !(order.size.is_finite() && order.size > 0.0) {
            return Err(BrokerError::InvalidSize { size: order.size });
        }
        if quote.price <= 0.0 {
            return Err(BrokerError::NoQuote {
                symbol: order.symbol.clone(),
            });
        }

        let id = self.ids.next_position_id();
        self.positions.push(Position {
            id,
            symbol: order.symbol.clone(),
            side: order.side,
            size: order.size,
            entry_price: entry_price(order.side, quote.price, self.config.spread),
            open_time: quote.time,
        });
        self.balance -= self.config.commission;
        Ok(id)
    }

    /// Close the full position at the quoted price, realize its PnL into the
    /// balance, and append the resulting trade to the history.
    pub fn close_position(&mut self, id: PositionId, quote: Quote) -> Result<Trade, BrokerError> {
        let index = self
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(BrokerError::PositionNotFound { id })?;
        if quote.price <= 0.0 {
            return Err(BrokerError::NoQuote {
                symbol: self.positions[index].symbol.clone(),
            });
        }

        let position = self.positions.remove(index);
        let exit = exit_price(position.side, quote.price, self.config.spread);
        let pnl = (exit - position.entry_price) * position.size * position.side.sign();
        self.balance += pnl;

        let trade = Trade {
            id: self.ids.next_trade_id(),
            symbol: position.symbol,
            side: position.side,
            size: position.size,
            entry_price: position.entry_price,
            exit_price: exit,
            pnl,
            open_time: position.open_time,
            close_time: quote.time,
        };
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Mark open positions to market. Called once per replay step. Never
    /// realizes PnL or closes anything — it only tracks whether equity
    /// still covers the margin required at the configured leverage.
    pub fn update_positions(&mut self, quote: Quote) {
        if self.positions.is_empty() {
            return;
        }
        let equity = self.equity(quote);
        let required = self.required_margin();
        if equity < required && !self.margin_called {
            self.margin_called = true;
            warn!(equity, required, "equity no longer covers required margin");
        }
    }

    /// Balance plus unrealized PnL of all open positions at the quote.
    pub fn equity(&self, quote: Quote) -> f64 {
        let unrealized: f64 = self
            .positions
            .iter()
            .map(|p| p.unrealized_pnl(quote.price))
            .sum();
        self.balance + unrealized
    }

    fn required_margin(&self) -> f64 {
        let leverage = self.config.leverage.max(1.0);
        self.positions.iter().map(Position::notional).sum::<f64>() / leverage
    }

    pub fn margin_called(&self) -> bool {
        self.margin_called
    }

    /// Snapshot of the open positions; mutating the returned value cannot
    /// touch the ledger.
    pub fn positions(&self) -> Vec<Position> {
        self.positions.clone()
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    /// Open position ids in ledger (open) order.
    pub fn open_position_ids(&self) -> Vec<PositionId> {
        self.positions.iter().map(|p| p.id).collect()
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn trade_history(&self) -> &[Trade] {
        &self.trades
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }
}

/// Buys lift the ask, sells hit the bid.
fn entry_price(side: OrderSide, price: f64, spread: f64) -> f64 {
    match side {
        OrderSide::Buy => price + spread / 2.0,
        OrderSide::Sell => price - spread / 2.0,
    }
}

/// Closing crosses the book the other way: longs exit at the bid, shorts
/// cover at the ask.
fn exit_price(side: OrderSide, price: f64, spread: f64) -> f64 {
    match side {
        OrderSide::Buy => price - spread / 2.0,
        OrderSide::Sell => price + spread / 2.0,
    }
}
