//! Typed metric report for the reporting collaborator.
//!
//! Metric values are a closed tagged union rather than name-keyed dynamic
//! values, and the kinds form a closed enumeration. Grouping "by category"
//! is a pure filter over that enumeration — no stringly-typed lookups.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metrics::PerformanceSummary;

/// A metric's value. The variant encodes the unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Num(f64),
    Count(u64),
    Secs(i64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Num(v) => write!(f, "{v:.4}"),
            MetricValue::Count(v) => write!(f, "{v}"),
            MetricValue::Secs(v) => write!(f, "{v}s"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Basic,
    Trading,
    Risk,
}

impl MetricCategory {
    pub fn label(self) -> &'static str {
        match self {
            MetricCategory::Basic => "Basic",
            MetricCategory::Trading => "Trading",
            MetricCategory::Risk => "Risk",
        }
    }
}

/// Every metric the report can carry. Closed: adding a metric means adding
/// a variant here, a category arm, and a value arm — the compiler walks
/// you through the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    FinalBalance,
    TotalPnl,
    TradeCount,
    WinRate,
    AverageWin,
    AverageLoss,
    ProfitFactor,
    AverageDuration,
    MaxConsecutiveWins,
    MaxConsecutiveLosses,
    MaxDrawdown,
    Sharpe,
    Sortino,
    ValueAtRisk95,
}

impl MetricKind {
    pub const ALL: [MetricKind; 14] = [
        MetricKind::FinalBalance,
        MetricKind::TotalPnl,
        MetricKind::TradeCount,
        MetricKind::WinRate,
        MetricKind::AverageWin,
        MetricKind::AverageLoss,
        MetricKind::ProfitFactor,
        MetricKind::AverageDuration,
        MetricKind::MaxConsecutiveWins,
        MetricKind::MaxConsecutiveLosses,
        MetricKind::MaxDrawdown,
        MetricKind::Sharpe,
        MetricKind::Sortino,
        MetricKind::ValueAtRisk95,
    ];

    pub fn category(self) -> MetricCategory {
        use MetricKind::*;
        match self {
            FinalBalance | TotalPnl | TradeCount | WinRate => MetricCategory::Basic,
            AverageWin | AverageLoss | ProfitFactor | AverageDuration | MaxConsecutiveWins
            | MaxConsecutiveLosses => MetricCategory::Trading,
            MaxDrawdown | Sharpe | Sortino | ValueAtRisk95 => MetricCategory::Risk,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::FinalBalance => "Final balance",
            MetricKind::TotalPnl => "Total PnL",
            MetricKind::TradeCount => "Trades",
            MetricKind::WinRate => "Win rate",
            MetricKind::AverageWin => "Average win",
            MetricKind::AverageLoss => "Average loss",
            MetricKind::ProfitFactor => "Profit factor",
            MetricKind::AverageDuration => "Average duration",
            MetricKind::MaxConsecutiveWins => "Max consecutive wins",
            MetricKind::MaxConsecutiveLosses => "Max consecutive losses",
            MetricKind::MaxDrawdown => "Max drawdown",
            MetricKind::Sharpe => "Sharpe ratio",
            MetricKind::Sortino => "Sortino ratio",
            MetricKind::ValueAtRisk95 => "Value at risk (95%)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub kind: MetricKind,
    pub value: MetricValue,
}

/// The full, ordered metric list for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReport {
    pub metrics: Vec<Metric>,
}

impl MetricReport {
    pub fn new(summary: &PerformanceSummary, final_balance: f64) -> Self {
        let value = |kind: MetricKind| -> MetricValue {
            match kind {
                MetricKind::FinalBalance => MetricValue::Num(final_balance),
                MetricKind::TotalPnl => MetricValue::Num(summary.total_pnl),
                MetricKind::TradeCount => MetricValue::Count(summary.trade_count as u64),
                MetricKind::WinRate => MetricValue::Num(summary.win_rate),
                MetricKind::AverageWin => MetricValue::Num(summary.average_win),
                MetricKind::AverageLoss => MetricValue::Num(summary.average_loss),
                MetricKind::ProfitFactor => MetricValue::Num(summary.profit_factor),
                MetricKind::AverageDuration => MetricValue::Secs(summary.average_duration_secs),
                MetricKind::MaxConsecutiveWins => {
                    MetricValue::Count(summary.max_consecutive_wins as u64)
                }
                MetricKind::MaxConsecutiveLosses => {
                    MetricValue::Count(summary.max_consecutive_losses as u64)
                }
                MetricKind::MaxDrawdown => MetricValue::Num(summary.max_drawdown),
                MetricKind::Sharpe => MetricValue::Num(summary.sharpe),
                MetricKind::Sortino => MetricValue::Num(summary.sortino),
                MetricKind::ValueAtRisk95 => MetricValue::Num(summary.value_at_risk_95),
            }
        };

        Self {
            metrics: MetricKind::ALL
                .iter()
                .map(|&kind| Metric {
                    kind,
                    value: value(kind),
                })
                .collect(),
        }
    }

    /// Pure filter over the kind enumeration.
    pub fn in_category(&self, category: MetricCategory) -> Vec<&Metric> {
        self.metrics
            .iter()
            .filter(|m| m.kind.category() == category)
            .collect()
    }

    pub fn get(&self, kind: MetricKind) -> Option<MetricValue> {
        self.metrics
            .iter()
            .find(|m| m.kind == kind)
            .map(|m| m.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> PerformanceSummary {
        PerformanceSummary {
            trade_count: 5,
            total_pnl: 300.0,
            win_rate: 0.6,
            average_win: 126.67,
            average_loss: 40.0,
            profit_factor: 4.75,
            max_drawdown: 300.0,
            sharpe: 0.5,
            sortino: 0.8,
            value_at_risk_95: 200.0,
            max_consecutive_wins: 2,
            max_consecutive_losses: 2,
            average_duration_secs: 60,
        }
    }

    #[test]
    fn report_covers_every_kind() {
        let report = MetricReport::new(&sample_summary(), 10_300.0);
        assert_eq!(report.metrics.len(), MetricKind::ALL.len());
        for kind in MetricKind::ALL {
            assert!(report.get(kind).is_some(), "missing {kind:?}");
        }
    }

    #[test]
    fn categories_partition_the_kinds() {
        let report = MetricReport::new(&sample_summary(), 10_300.0);
        let total = report.in_category(MetricCategory::Basic).len()
            + report.in_category(MetricCategory::Trading).len()
            + report.in_category(MetricCategory::Risk).len();
        assert_eq!(total, MetricKind::ALL.len());
    }

    #[test]
    fn values_carry_their_unit() {
        let report = MetricReport::new(&sample_summary(), 10_300.0);
        assert_eq!(
            report.get(MetricKind::TradeCount),
            Some(MetricValue::Count(5))
        );
        assert_eq!(
            report.get(MetricKind::AverageDuration),
            Some(MetricValue::Secs(60))
        );
        assert_eq!(report.get(MetricKind::WinRate), Some(MetricValue::Num(0.6)));
    }

    #[test]
    fn report_serialization_roundtrip() {
        let report = MetricReport::new(&sample_summary(), 10_300.0);
        let json = serde_json::to_string(&report).unwrap();
        let deser: MetricReport = serde_json::from_str(&json).unwrap();
        assert_eq!(deser.metrics, report.metrics);
    }

    #[test]
    fn display_formats_by_unit() {
        assert_eq!(MetricValue::Num(0.6).to_string(), "0.6000");
        assert_eq!(MetricValue::Count(5).to_string(), "5");
        assert_eq!(MetricValue::Secs(60).to_string(), "60s");
    }
}
