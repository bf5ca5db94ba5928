//! Record-level candle parsing.
//!
//! Parsing is pure and side-effect-free: one delimited record in, one
//! validated [`Candle`] or a typed error out. The index builder decides
//! what to do with a failure (it skips and counts); other callers may
//! treat the same error as fatal.

use crate::domain::Candle;
use chrono::NaiveDateTime;
use csv::StringRecord;
use thiserror::Error;

/// Fields per record: timestamp, open, high, low, close, volume.
pub const FIELD_COUNT: usize = 6;

/// Timestamp layout of the source file: naive UTC, 24h clock.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected {} fields, got {got}", FIELD_COUNT)]
    FieldCount { got: usize },

    #[error("invalid timestamp {value:?}")]
    Timestamp { value: String },

    #[error("invalid {field}: {value:?}")]
    Number { field: &'static str, value: String },

    #[error("inconsistent OHLCV values at {time}")]
    Ohlcv { time: NaiveDateTime },
}

/// Header/label detection: a row whose first field does not begin with a
/// digit cannot start with a timestamp, so it is skipped rather than errored.
pub fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map(|field| !field.trim_start().starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(true)
}

/// Parse one raw record into a validated candle.
pub fn parse_candle(record: &StringRecord) -> Result<Candle, ParseError> {
    if record.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount { got: record.len() });
    }

    let raw_time = record[0].trim();
    let time = NaiveDateTime::parse_from_str(raw_time, TIMESTAMP_FORMAT).map_err(|_| {
        ParseError::Timestamp {
            value: raw_time.to_string(),
        }
    })?;

    let candle = Candle {
        time,
        open: number_field(record, 1, "open")?,
        high: number_field(record, 2, "high")?,
        low: number_field(record, 3, "low")?,
        close: number_field(record, 4, "close")?,
        volume: number_field(record, 5, "volume")?,
    };

    if !candle.is_sane() {
        return Err(ParseError::Ohlcv { time });
    }
    Ok(candle)
}

fn number_field(
    record: &StringRecord,
    index: usize,
    field: &'static str,
) -> Result<f64, ParseError> {
    let raw = record[index].trim();
    raw.parse::<f64>().map_err(|_| ParseError::Number {
        field,
        value: raw.to_string(),
    })
}
