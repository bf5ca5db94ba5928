//! Lazily-indexed, time-addressable access to a candle CSV.
//!
//! The store scans the source once, keeps only `(timestamp, locator)` pairs
//! in memory, and serves every fetch by seeking back to the recorded
//! locator and re-parsing just the requested records. Memory stays
//! proportional to the record count, never to the file size. Each fetch
//! opens its own reader and releases it on every exit path.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use csv::{Position, Reader, ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::parse::{self, ParseError};
use crate::domain::Candle;

/// Maps a candle timestamp to the physical location of its source record.
///
/// The built index is strictly non-decreasing in `time` (stable sort, so
/// records sharing a timestamp keep their arrival order) and is never
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub time: NaiveDateTime,
    pos: Position,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("candle file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("i/o error reading candle file: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error reading candle file: {0}")]
    Csv(#[from] csv::Error),

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("time {time} is after the last indexed candle ({last})")]
    TimeAfterEnd {
        time: NaiveDateTime,
        last: NaiveDateTime,
    },

    #[error("invalid index range: {lo} > {hi}")]
    InvalidRange { lo: usize, hi: usize },

    #[error("invalid time range: {t0} > {t1}")]
    InvalidTimeRange { t0: NaiveDateTime, t1: NaiveDateTime },

    #[error("line {line}: indexed record vanished from the source")]
    MissingRecord { line: u64 },

    #[error("line {line}: record changed since indexing: {source}")]
    Corrupt { line: u64, source: ParseError },
}

/// Candle data provider over an append-only CSV source.
///
/// The index is built on the first query and reused for the lifetime of the
/// store; the backing data is treated as static (no rebuild). Queries take
/// `&mut self` only for that lazy build — after it, they are read-only.
pub struct CandleStore {
    path: PathBuf,
    index: Option<Vec<IndexEntry>>,
    skipped: u64,
}

impl CandleStore {
    /// Record the source path. Nothing is read until the first query.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: None,
            skipped: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source lines skipped as unparseable during the index build.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped
    }

    /// Number of indexed candles.
    pub fn len(&mut self) -> Result<usize, DataError> {
        Ok(self.ensure_index()?.len())
    }

    pub fn is_empty(&mut self) -> Result<bool, DataError> {
        Ok(self.ensure_index()?.is_empty())
    }

    pub fn first_time(&mut self) -> Result<Option<NaiveDateTime>, DataError> {
        Ok(self.ensure_index()?.first().map(|e| e.time))
    }

    pub fn last_time(&mut self) -> Result<Option<NaiveDateTime>, DataError> {
        Ok(self.ensure_index()?.last().map(|e| e.time))
    }

    /// Floor lookup: the index of the last candle at or before `t`.
    ///
    /// A time before the first candle clamps to index 0, so a replay asked
    /// to start early begins at the earliest data. A time after the last
    /// candle is an error — forward replay must never look past the end.
    pub fn index_of_time(&mut self, t: NaiveDateTime) -> Result<usize, DataError> {
        let entries = self.ensure_index()?;
        let Some(last) = entries.last() else {
            return Err(DataError::IndexOutOfRange { index: 0, len: 0 });
        };
        if t > last.time {
            return Err(DataError::TimeAfterEnd {
                time: t,
                last: last.time,
            });
        }
        // first entry with time > t; the floor sits right before it
        let after = entries.partition_point(|e| e.time <= t);
        Ok(after.saturating_sub(1))
    }

    /// Timestamp of the candle at `index`. O(1).
    pub fn time_at(&mut self, index: usize) -> Result<NaiveDateTime, DataError> {
        let entries = self.ensure_index()?;
        let len = entries.len();
        entries
            .get(index)
            .map(|e| e.time)
            .ok_or(DataError::IndexOutOfRange { index, len })
    }

    /// Fetch a single candle by index position (seek + reparse).
    pub fn candle_at(&mut self, index: usize) -> Result<Candle, DataError> {
        let entries = self.ensure_index()?;
        let len = entries.len();
        let entry = entries
            .get(index)
            .cloned()
            .ok_or(DataError::IndexOutOfRange { index, len })?;
        let mut reader = open_reader(&self.path)?;
        fetch_candle(&mut reader, &entry)
    }

    /// Inclusive range fetch by index. Only the requested records are
    /// re-read; one reader serves the whole fetch.
    pub fn candles_by_index(&mut self, lo: usize, hi: usize) -> Result<Vec<Candle>, DataError> {
        if lo > hi {
            return Err(DataError::InvalidRange { lo, hi });
        }
        let entries = self.ensure_index()?;
        let len = entries.len();
        if hi >= len {
            return Err(DataError::IndexOutOfRange { index: hi, len });
        }
        let wanted = entries[lo..=hi].to_vec();
        let mut reader = open_reader(&self.path)?;
        wanted
            .iter()
            .map(|entry| fetch_candle(&mut reader, entry))
            .collect()
    }

    /// Inclusive range fetch by time. Defined as floor lookups plus the
    /// index-based fetch, so both access paths return identical results
    /// for equivalent bounds.
    pub fn candles_by_time(
        &mut self,
        t0: NaiveDateTime,
        t1: NaiveDateTime,
    ) -> Result<Vec<Candle>, DataError> {
        if t0 > t1 {
            return Err(DataError::InvalidTimeRange { t0, t1 });
        }
        let lo = self.index_of_time(t0)?;
        let hi = self.index_of_time(t1)?;
        self.candles_by_index(lo, hi)
    }

    /// Up to `count` candles strictly before `base`, clipped at the start
    /// of the index. `count == 0` yields an empty result, not an error.
    pub fn candles_before_index(
        &mut self,
        base: usize,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        let len = self.len()?;
        if base >= len {
            return Err(DataError::IndexOutOfRange { index: base, len });
        }
        if count == 0 || base == 0 {
            return Ok(Vec::new());
        }
        let lo = base.saturating_sub(count);
        self.candles_by_index(lo, base - 1)
    }

    /// Up to `count` candles strictly after `base`, clipped at the end.
    pub fn candles_after_index(
        &mut self,
        base: usize,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        let len = self.len()?;
        if base >= len {
            return Err(DataError::IndexOutOfRange { index: base, len });
        }
        if count == 0 || base + 1 >= len {
            return Ok(Vec::new());
        }
        let hi = (base + count).min(len - 1);
        self.candles_by_index(base + 1, hi)
    }

    /// Window fetch anchored at the floor of `t`, looking backwards.
    pub fn candles_before_time(
        &mut self,
        t: NaiveDateTime,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        let base = self.index_of_time(t)?;
        self.candles_before_index(base, count)
    }

    /// Window fetch anchored at the floor of `t`, looking forwards.
    pub fn candles_after_time(
        &mut self,
        t: NaiveDateTime,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        let base = self.index_of_time(t)?;
        self.candles_after_index(base, count)
    }

    fn ensure_index(&mut self) -> Result<&[IndexEntry], DataError> {
        if self.index.is_none() {
            let (entries, skipped) = build_index(&self.path)?;
            self.skipped = skipped;
            self.index = Some(entries);
        }
        Ok(self.index.as_deref().unwrap_or_default())
    }
}

fn open_reader(path: &Path) -> Result<Reader<File>, DataError> {
    if !path.exists() {
        return Err(DataError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    Ok(ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file))
}

/// One pass over the source: every record is parsed, valid ones yield an
/// index entry carrying the position the record was read from. Bad records
/// are skipped with a line diagnostic; only stream-level I/O failures abort.
fn build_index(path: &Path) -> Result<(Vec<IndexEntry>, u64), DataError> {
    let mut reader = open_reader(path)?;
    let mut entries = Vec::new();
    let mut skipped = 0u64;
    let mut record = StringRecord::new();

    loop {
        let pos = reader.position().clone();
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                if parse::is_header(&record) {
                    continue;
                }
                match parse::parse_candle(&record) {
                    Ok(candle) => entries.push(IndexEntry {
                        time: candle.time,
                        pos,
                    }),
                    Err(err) => {
                        skipped += 1;
                        warn!(line = pos.line(), %err, "skipping unparseable candle record");
                    }
                }
            }
            Err(err) if err.is_io_error() => return Err(DataError::Csv(err)),
            Err(err) => {
                skipped += 1;
                warn!(line = pos.line(), %err, "skipping malformed csv record");
            }
        }
    }

    // Arrival order is not necessarily time order; the stable sort keeps
    // same-timestamp records in arrival order.
    entries.sort_by_key(|e| e.time);
    debug!(candles = entries.len(), skipped, "candle index built");
    Ok((entries, skipped))
}

fn fetch_candle(reader: &mut Reader<File>, entry: &IndexEntry) -> Result<Candle, DataError> {
    reader.seek(entry.pos.clone())?;
    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Err(DataError::MissingRecord {
            line: entry.pos.line(),
        });
    }
    parse::parse_candle(&record).map_err(|source| DataError::Corrupt {
        line: entry.pos.line(),
        source,
    })
}
