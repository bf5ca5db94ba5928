//! Run fingerprinting for determinism checks.
//!
//! The trade tape fully determines a run's outcome, so a stable hash of it
//! is a cheap way to compare two runs: identical inputs and identical call
//! sequences must produce identical fingerprints.

use replaylab_core::domain::Trade;

/// BLAKE3 over the canonical serialization of the trade history.
pub fn trade_tape_fingerprint(trades: &[Trade]) -> String {
    let json = serde_json::to_string(trades).expect("Trade serialization failed");
    blake3::hash(json.as_bytes()).to_hex().to_string()
}
