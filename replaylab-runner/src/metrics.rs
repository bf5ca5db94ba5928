//! Performance metrics — pure functions over the realized trade sequence.
//!
//! Every metric is a pure function: trade list in, scalar out. No hidden
//! state, nothing on the simulation's critical path. Every ratio documents
//! its zero-division fallback (0.0 unless noted) so degenerate input never
//! panics.

use chrono::Duration;
use replaylab_core::domain::Trade;
use serde::{Deserialize, Serialize};

/// Aggregate statistics for a single replay run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub trade_count: usize,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub value_at_risk_95: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub average_duration_secs: i64,
}

impl PerformanceSummary {
    /// Compute all metrics from the trade history.
    pub fn compute(trades: &[Trade]) -> Self {
        Self {
            trade_count: trades.len(),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            win_rate: win_rate(trades),
            average_win: average_win(trades),
            average_loss: average_loss(trades),
            profit_factor: profit_factor(trades),
            max_drawdown: max_drawdown(trades),
            sharpe: sharpe_ratio(trades),
            sortino: sortino_ratio(trades),
            value_at_risk_95: value_at_risk(trades, 0.05),
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            average_duration_secs: average_duration(trades).num_seconds(),
        }
    }
}

/// A point on the derived equity curve: running balance after each close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub close_time: chrono::NaiveDateTime,
    pub balance: f64,
}

/// Running balance after each trade. Recomputed from the history on
/// demand; the engine never stores it.
pub fn equity_curve(trades: &[Trade], initial_balance: f64) -> Vec<EquityPoint> {
    let mut balance = initial_balance;
    trades
        .iter()
        .map(|t| {
            balance += t.pnl;
            EquityPoint {
                close_time: t.close_time,
                balance,
            }
        })
        .collect()
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with positive PnL. 0.0 with no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Mean PnL of the winning trades. 0.0 with no winners.
pub fn average_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
    mean_f64(&wins)
}

/// Mean losing trade as a positive magnitude. 0.0 with no losers.
pub fn average_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .collect();
    mean_f64(&losses)
}

/// Gross profits / gross losses, capped at 100.0 when losses are zero.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Maximum peak-to-trough decline of cumulative PnL, as a positive number.
///
/// The running peak starts at zero (a flat account), so a sequence that
/// only ever loses still reports its full decline. 0.0 when cumulative
/// PnL never dips below its peak.
pub fn max_drawdown(trades: &[Trade]) -> f64 {
    let mut peak = 0.0_f64;
    let mut cumulative = 0.0_f64;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        cumulative += trade.pnl;
        if cumulative > peak {
            peak = cumulative;
        }
        let dd = peak - cumulative;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Mean trade PnL over its sample standard deviation.
/// 0.0 with fewer than 2 trades or zero variance.
pub fn sharpe_ratio(trades: &[Trade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
    let std = std_dev(&pnls);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&pnls) / std
}

/// Mean trade PnL over the downside deviation, where only losing trades
/// contribute deviation (their squares averaged over the full count).
///
/// A profitable sequence with no losing trade is unbounded (+inf); an
/// empty sequence, or one with no losses and a non-positive mean, is 0.0.
pub fn sortino_ratio(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
    let mean = mean_f64(&pnls);

    let downside_sq: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p * p).sum();
    if downside_sq == 0.0 {
        return if mean > 0.0 { f64::INFINITY } else { 0.0 };
    }

    let downside_std = (downside_sq / pnls.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean / downside_std
}

/// Longest run of winning trades.
pub fn max_consecutive_wins(trades: &[Trade]) -> usize {
    max_streak(trades, |t| t.pnl > 0.0)
}

/// Longest run of losing trades. A zero-PnL trade breaks both kinds of
/// streak without starting one.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    max_streak(trades, |t| t.pnl < 0.0)
}

/// Historical-simulation Value at Risk at level `alpha`.
///
/// Trade PnLs sorted ascending; VaR is the magnitude of the element at
/// `floor(n * alpha)`, clamped to the last index. 0.0 with no trades.
pub fn value_at_risk(trades: &[Trade], alpha: f64) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let mut pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
    pnls.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let index = ((pnls.len() as f64 * alpha).floor() as usize).min(pnls.len() - 1);
    pnls[index].abs()
}

/// Mean holding time across trades. Zero with no trades.
pub fn average_duration(trades: &[Trade]) -> Duration {
    if trades.is_empty() {
        return Duration::zero();
    }
    let total: i64 = trades.iter().map(|t| t.duration().num_seconds()).sum();
    Duration::seconds(total / trades.len() as i64)
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_streak(trades: &[Trade], pred: impl Fn(&Trade) -> bool) -> usize {
    let mut max = 0;
    let mut current = 0;

    for trade in trades {
        if pred(trade) {
            current += 1;
            if current > max {
                max = current;
            }
        } else {
            current = 0;
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use replaylab_core::domain::{OrderSide, TradeId};

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, minute, 0)
            .unwrap()
    }

    fn make_trades(pnls: &[f64]) -> Vec<Trade> {
        pnls.iter()
            .enumerate()
            .map(|(i, &pnl)| Trade {
                id: TradeId(i as u64 + 1),
                symbol: "EURUSD".into(),
                side: OrderSide::Buy,
                size: 1.0,
                entry_price: 100.0,
                exit_price: 100.0 + pnl,
                pnl,
                open_time: at(i as u32),
                close_time: at(i as u32 + 1),
            })
            .collect()
    }

    // ── Win rate / averages ──

    #[test]
    fn win_rate_scenario() {
        let trades = make_trades(&[100.0, -50.0, 200.0, -30.0, 80.0]);
        assert!((win_rate(&trades) - 0.6).abs() < 1e-10);
        assert!((average_win(&trades) - 380.0 / 3.0).abs() < 1e-9);
        assert!((average_loss(&trades) - 40.0).abs() < 1e-10);
    }

    #[test]
    fn zero_pnl_trade_is_not_a_win() {
        let trades = make_trades(&[0.0, 100.0]);
        assert!((win_rate(&trades) - 0.5).abs() < 1e-10);
    }

    // ── Drawdown ──

    #[test]
    fn drawdown_scenario() {
        // cumulative: 100, -100, -200, 100, 150 — peak 100, trough -200
        let trades = make_trades(&[100.0, -200.0, -100.0, 300.0, 50.0]);
        assert!((max_drawdown(&trades) - 300.0).abs() < 1e-10);
    }

    #[test]
    fn monotonic_gains_have_zero_drawdown() {
        let trades = make_trades(&[10.0, 20.0, 30.0]);
        assert_eq!(max_drawdown(&trades), 0.0);
    }

    #[test]
    fn immediate_loss_draws_down_from_flat() {
        let trades = make_trades(&[-50.0, -25.0]);
        assert!((max_drawdown(&trades) - 75.0).abs() < 1e-10);
    }

    // ── Sharpe / Sortino ──

    #[test]
    fn sharpe_is_mean_over_sample_std() {
        let trades = make_trades(&[10.0, 20.0, 30.0]);
        // mean 20, sample std 10
        assert!((sharpe_ratio(&trades) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn sharpe_zero_variance_falls_back() {
        let trades = make_trades(&[10.0, 10.0, 10.0]);
        assert_eq!(sharpe_ratio(&trades), 0.0);
    }

    #[test]
    fn sortino_counts_only_losses_as_deviation() {
        let trades = make_trades(&[30.0, -40.0, 50.0, -30.0]);
        // mean 2.5; downside = sqrt((1600 + 900) / 4) = 25
        assert!((sortino_ratio(&trades) - 0.1).abs() < 1e-10);
    }

    #[test]
    fn sortino_unbounded_without_losses() {
        let trades = make_trades(&[10.0, 20.0]);
        assert_eq!(sortino_ratio(&trades), f64::INFINITY);
    }

    #[test]
    fn sortino_all_zero_is_zero() {
        let trades = make_trades(&[0.0, 0.0]);
        assert_eq!(sortino_ratio(&trades), 0.0);
    }

    // ── Streaks ──

    #[test]
    fn streaks_reset_on_sign_change() {
        let trades = make_trades(&[10.0, 20.0, -5.0, 30.0, 40.0, 50.0, -1.0, -2.0]);
        assert_eq!(max_consecutive_wins(&trades), 3);
        assert_eq!(max_consecutive_losses(&trades), 2);
    }

    #[test]
    fn zero_pnl_breaks_both_streaks() {
        let trades = make_trades(&[10.0, 0.0, 20.0, -5.0, 0.0, -6.0]);
        assert_eq!(max_consecutive_wins(&trades), 1);
        assert_eq!(max_consecutive_losses(&trades), 1);
    }

    // ── VaR ──

    #[test]
    fn var_picks_the_alpha_quantile() {
        // sorted: -200, -50, 10, 100, 300; floor(5 * 0.05) = 0
        let trades = make_trades(&[100.0, -50.0, 300.0, -200.0, 10.0]);
        assert!((value_at_risk(&trades, 0.05) - 200.0).abs() < 1e-10);
        // floor(5 * 0.4) = 2
        assert!((value_at_risk(&trades, 0.4) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn var_index_clamps_to_last() {
        let trades = make_trades(&[-10.0, 20.0]);
        assert!((value_at_risk(&trades, 1.0) - 20.0).abs() < 1e-10);
    }

    // ── Equity curve ──

    #[test]
    fn equity_curve_is_running_balance() {
        let trades = make_trades(&[100.0, -50.0]);
        let curve = equity_curve(&trades, 10_000.0);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].balance, 10_100.0);
        assert_eq!(curve[1].balance, 10_050.0);
        assert_eq!(curve[1].close_time, trades[1].close_time);
    }

    // ── Degenerate input ──

    #[test]
    fn empty_trade_list_is_safe_everywhere() {
        let trades: Vec<Trade> = Vec::new();
        let summary = PerformanceSummary::compute(&trades);
        assert_eq!(summary.trade_count, 0);
        assert_eq!(summary.total_pnl, 0.0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.average_win, 0.0);
        assert_eq!(summary.average_loss, 0.0);
        assert_eq!(summary.profit_factor, 0.0);
        assert_eq!(summary.max_drawdown, 0.0);
        assert_eq!(summary.sharpe, 0.0);
        assert_eq!(summary.sortino, 0.0);
        assert_eq!(summary.value_at_risk_95, 0.0);
        assert_eq!(summary.max_consecutive_wins, 0);
        assert_eq!(summary.max_consecutive_losses, 0);
        assert_eq!(summary.average_duration_secs, 0);
        assert!(equity_curve(&trades, 10_000.0).is_empty());
    }

    #[test]
    fn single_trade_summary_is_safe() {
        let trades = make_trades(&[42.0]);
        let summary = PerformanceSummary::compute(&trades);
        assert_eq!(summary.trade_count, 1);
        assert_eq!(summary.win_rate, 1.0);
        assert_eq!(summary.sharpe, 0.0); // fewer than 2 trades
        assert_eq!(summary.sortino, f64::INFINITY);
        assert_eq!(summary.value_at_risk_95, 42.0);
    }

    // ── Invariant sweeps ──

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_pnls() -> impl Strategy<Value = Vec<f64>> {
            proptest::collection::vec(-1_000.0..1_000.0_f64, 0..50)
        }

        proptest! {
            #[test]
            fn win_rate_is_a_fraction(pnls in arb_pnls()) {
                let trades = make_trades(&pnls);
                let rate = win_rate(&trades);
                prop_assert!((0.0..=1.0).contains(&rate));
            }

            #[test]
            fn drawdown_is_never_negative(pnls in arb_pnls()) {
                let trades = make_trades(&pnls);
                prop_assert!(max_drawdown(&trades) >= 0.0);
            }

            #[test]
            fn var_is_a_pnl_magnitude(pnls in arb_pnls()) {
                prop_assume!(!pnls.is_empty());
                let trades = make_trades(&pnls);
                let var = value_at_risk(&trades, 0.05);
                prop_assert!(var >= 0.0);
                prop_assert!(pnls.iter().any(|p| (p.abs() - var).abs() < 1e-9));
            }
        }
    }
}
