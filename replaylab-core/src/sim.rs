//! Simulation loop — binds the market clock and the broker behind one
//! imperative replay surface for an external strategy to drive.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::broker::{Broker, BrokerError};
use crate::clock::{MarketClock, Quote};
use crate::data::store::DataError;
use crate::domain::{MarketOrder, OrderSide, Position, PositionId, Trade};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation not initialized; call initialize() first")]
    NotInitialized,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("close-all aborted: position {id} failed to close: {source}")]
    CloseAll {
        id: PositionId,
        source: BrokerError,
    },
}

/// One replay run. Owns its clock and broker exclusively; concurrent runs
/// use independent instances, which is what makes replays reproducible.
pub struct Simulation {
    clock: MarketClock,
    broker: Broker,
    initialized: bool,
}

impl Simulation {
    pub fn new(clock: MarketClock, broker: Broker) -> Self {
        Self {
            clock,
            broker,
            initialized: false,
        }
    }

    /// Build the candle index and position the clock on the first candle.
    /// Must succeed before any other operation; calling it again rewinds
    /// the clock but keeps the ledger.
    pub fn initialize(&mut self) -> Result<(), SimError> {
        self.clock.init()?;
        self.initialized = true;
        Ok(())
    }

    fn guard(&self) -> Result<(), SimError> {
        if self.initialized {
            Ok(())
        } else {
            Err(SimError::NotInitialized)
        }
    }

    /// One replay step: advance the clock, then mark open positions to
    /// market at the fresh quote. Returns false once the data is exhausted.
    pub fn forward(&mut self) -> Result<bool, SimError> {
        self.guard()?;
        let advanced = self.clock.forward();
        if let Some(quote) = self.clock.quote() {
            self.broker.update_positions(quote);
        }
        Ok(advanced)
    }

    pub fn is_finished(&self) -> bool {
        !self.initialized || self.clock.is_finished()
    }

    pub fn buy(&mut self, symbol: &str, size: f64) -> Result<PositionId, SimError> {
        self.order(symbol, OrderSide::Buy, size)
    }

    pub fn sell(&mut self, symbol: &str, size: f64) -> Result<PositionId, SimError> {
        self.order(symbol, OrderSide::Sell, size)
    }

    fn order(&mut self, symbol: &str, side: OrderSide, size: f64) -> Result<PositionId, SimError> {
        self.guard()?;
        let order = MarketOrder {
            symbol: symbol.to_string(),
            side,
            size,
        };
        let quote = self.quote_for(symbol);
        Ok(self.broker.place_order(&order, quote)?)
    }

    /// Close one position at the current market quote of its own symbol.
    pub fn close_position(&mut self, id: PositionId) -> Result<Trade, SimError> {
        self.guard()?;
        let symbol = self
            .broker
            .position(id)
            .map(|p| p.symbol.clone())
            .ok_or(BrokerError::PositionNotFound { id })?;
        let quote = self.quote_for(&symbol);
        Ok(self.broker.close_position(id, quote)?)
    }

    /// Close every open position, in open order, at the current quote.
    /// The first failing close aborts and names the position that failed;
    /// positions closed before the failure stay closed.
    pub fn close_all_positions(&mut self) -> Result<Vec<Trade>, SimError> {
        self.guard()?;
        let ids = self.broker.open_position_ids();
        let mut closed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.close_position(id) {
                Ok(trade) => closed.push(trade),
                Err(SimError::Broker(source)) => return Err(SimError::CloseAll { id, source }),
                Err(other) => return Err(other),
            }
        }
        Ok(closed)
    }

    pub fn current_price(&mut self, symbol: &str) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        self.clock.current_price(symbol)
    }

    pub fn current_time(&mut self) -> Option<NaiveDateTime> {
        if !self.initialized {
            return None;
        }
        self.clock.current_time()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.broker.positions()
    }

    pub fn balance(&self) -> f64 {
        self.broker.balance()
    }

    pub fn trade_history(&self) -> &[Trade] {
        self.broker.trade_history()
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn clock_mut(&mut self) -> &mut MarketClock {
        &mut self.clock
    }

    fn quote_for(&mut self, symbol: &str) -> Quote {
        let price = self.clock.current_price(symbol);
        // a missing time only pairs with a zero price, which every
        // consumer of the quote rejects before reading the time
        let time = self.clock.current_time().unwrap_or_default();
        Quote { price, time }
    }
}
