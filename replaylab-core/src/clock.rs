//! Market clock — replay cursor over the candle store.

use chrono::NaiveDateTime;

use crate::data::store::{CandleStore, DataError};
use crate::domain::Candle;

/// Read-only snapshot of the market at the clock's cursor. This is the only
/// thing the broker ever sees of the data layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub time: NaiveDateTime,
}

/// Wraps the store with "current candle" semantics for a single symbol.
///
/// Before [`init`](MarketClock::init) succeeds, every accessor reports a
/// neutral value (zero price, `None` time) instead of panicking, so a
/// defensive caller can probe the clock safely.
pub struct MarketClock {
    store: CandleStore,
    symbol: String,
    cursor: usize,
    len: usize,
    ready: bool,
}

impl MarketClock {
    pub fn new(store: CandleStore, symbol: impl Into<String>) -> Self {
        Self {
            store,
            symbol: symbol.into(),
            cursor: 0,
            len: 0,
            ready: false,
        }
    }

    /// Force the index build and rewind the cursor to the first candle.
    pub fn init(&mut self) -> Result<(), DataError> {
        self.len = self.store.len()?;
        self.cursor = 0;
        self.ready = true;
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    /// Advance one candle. Returns false once the data is exhausted, in
    /// which case the cursor stays on the last candle.
    pub fn forward(&mut self) -> bool {
        if !self.ready || self.cursor + 1 >= self.len {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Whether the cursor has exhausted the index (also true before `init`).
    pub fn is_finished(&self) -> bool {
        !self.ready || self.cursor + 1 >= self.len
    }

    /// Close price of the candle under the cursor. Zero for an unknown
    /// symbol, before `init`, or on an empty source; callers treat a
    /// non-positive quote as "no market".
    pub fn current_price(&mut self, symbol: &str) -> f64 {
        if !self.ready || symbol != self.symbol {
            return 0.0;
        }
        match self.store.candle_at(self.cursor) {
            Ok(candle) => candle.close,
            Err(_) => 0.0,
        }
    }

    pub fn current_time(&mut self) -> Option<NaiveDateTime> {
        if !self.ready {
            return None;
        }
        self.store.time_at(self.cursor).ok()
    }

    pub fn current_candle(&mut self) -> Option<Candle> {
        if !self.ready {
            return None;
        }
        self.store.candle_at(self.cursor).ok()
    }

    /// The quote at the cursor, if the clock is positioned on a candle.
    pub fn quote(&mut self) -> Option<Quote> {
        let candle = self.current_candle()?;
        Some(Quote {
            price: candle.close,
            time: candle.time,
        })
    }

    /// Windowed and ranged history access for strategy callers.
    pub fn store_mut(&mut self) -> &mut CandleStore {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn clock_over(lines: &[&str]) -> (MarketClock, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        let clock = MarketClock::new(CandleStore::new(file.path()), "EURUSD");
        (clock, file)
    }

    const THREE_CANDLES: &[&str] = &[
        "2024-01-02 09:00:00,100,101,99,100.5,1000",
        "2024-01-02 09:01:00,100.5,102,100,101.5,1100",
        "2024-01-02 09:02:00,101.5,103,101,102.5,1200",
    ];

    #[test]
    fn uninitialized_clock_is_neutral() {
        let (mut clock, _file) = clock_over(THREE_CANDLES);
        assert_eq!(clock.current_price("EURUSD"), 0.0);
        assert_eq!(clock.current_time(), None);
        assert!(clock.is_finished());
        assert!(!clock.forward());
    }

    #[test]
    fn forward_walks_to_the_end() {
        let (mut clock, _file) = clock_over(THREE_CANDLES);
        clock.init().unwrap();
        assert_eq!(clock.current_price("EURUSD"), 100.5);
        assert!(!clock.is_finished());

        assert!(clock.forward());
        assert_eq!(clock.current_price("EURUSD"), 101.5);

        assert!(clock.forward());
        assert_eq!(clock.current_price("EURUSD"), 102.5);
        assert!(clock.is_finished());

        // exhausted: the cursor stays put
        assert!(!clock.forward());
        assert_eq!(clock.current_index(), 2);
    }

    #[test]
    fn unknown_symbol_quotes_zero() {
        let (mut clock, _file) = clock_over(THREE_CANDLES);
        clock.init().unwrap();
        assert_eq!(clock.current_price("GBPUSD"), 0.0);
        assert_eq!(clock.current_price("EURUSD"), 100.5);
    }

    #[test]
    fn empty_source_is_finished_immediately() {
        let (mut clock, _file) = clock_over(&["timestamp,open,high,low,close,volume"]);
        clock.init().unwrap();
        assert!(clock.is_finished());
        assert!(!clock.forward());
        assert_eq!(clock.current_price("EURUSD"), 0.0);
        assert_eq!(clock.quote(), None);
    }
}
