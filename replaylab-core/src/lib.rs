//! ReplayLab Core — market replay and order-execution simulation engine.
//!
//! This crate contains the heart of the replay engine:
//! - Domain types (candles, orders, positions, trades)
//! - Record-level candle parsing with skip-and-continue recovery
//! - A lazily-built time index over the candle CSV, serving point, range,
//!   and window fetches by seek-and-reparse
//! - The market clock (replay cursor) over that index
//! - The broker ledger: order fill, spread/commission, position lifecycle,
//!   realized trade history
//! - The simulation loop an external strategy drives
//!
//! Everything here is single-threaded and deterministic: two independent
//! simulations fed the same file and the same call sequence produce
//! identical trades and balances.

pub mod broker;
pub mod clock;
pub mod data;
pub mod domain;
pub mod sim;

pub use broker::{Broker, BrokerConfig, BrokerError};
pub use clock::{MarketClock, Quote};
pub use data::{CandleStore, DataError, ParseError};
pub use sim::{SimError, Simulation};
