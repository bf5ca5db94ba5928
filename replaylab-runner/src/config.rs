//! Serializable replay configuration.
//!
//! This layer is the only place that reads config files; the engine itself
//! performs no file discovery or environment lookups. A config captures
//! everything needed to reproduce a run, and its content hash doubles as
//! the run id.

use std::path::{Path, PathBuf};

use replaylab_core::broker::{Broker, BrokerConfig};
use replaylab_core::clock::MarketClock;
use replaylab_core::data::CandleStore;
use replaylab_core::sim::Simulation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a replay run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Candle CSV file to replay.
    pub data_file: PathBuf,
    /// Symbol the feed quotes.
    pub symbol: String,
    #[serde(default = "default_balance")]
    pub initial_balance: f64,
    /// Full bid/ask spread applied to every fill.
    #[serde(default)]
    pub spread_cost: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    /// Flat commission per fill.
    #[serde(default)]
    pub commission: f64,
}

fn default_balance() -> f64 {
    10_000.0
}

fn default_leverage() -> f64 {
    1.0
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("initial_balance must be positive, got {0}")]
    InvalidBalance(f64),

    #[error("spread_cost must be non-negative, got {0}")]
    InvalidSpread(f64),

    #[error("leverage must be at least 1, got {0}")]
    InvalidLeverage(f64),

    #[error("commission must be non-negative, got {0}")]
    InvalidCommission(f64),

    #[error("symbol must not be empty")]
    EmptySymbol,
}

impl ReplayConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(ConfigError::InvalidBalance(self.initial_balance));
        }
        if !(self.spread_cost.is_finite() && self.spread_cost >= 0.0) {
            return Err(ConfigError::InvalidSpread(self.spread_cost));
        }
        if !(self.leverage.is_finite() && self.leverage >= 1.0) {
            return Err(ConfigError::InvalidLeverage(self.leverage));
        }
        if !(self.commission.is_finite() && self.commission >= 0.0) {
            return Err(ConfigError::InvalidCommission(self.commission));
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share the same RunId.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("ReplayConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Wire store → clock → broker → simulation from this config.
    pub fn build_simulation(&self) -> Simulation {
        let store = CandleStore::new(&self.data_file);
        let clock = MarketClock::new(store, &self.symbol);
        let broker = Broker::new(BrokerConfig {
            initial_balance: self.initial_balance,
            spread: self.spread_cost,
            leverage: self.leverage,
            commission: self.commission,
        });
        Simulation::new(clock, broker)
    }
}
