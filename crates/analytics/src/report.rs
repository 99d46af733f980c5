use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A standardized report of strategy or backtest performance.
///
/// This struct is the final output of the `MetricsEngine` and the data
/// transfer object for performance results throughout the system. Fields that
/// can be mathematically undefined are `Option<>` so that "not available"
/// stays distinct from a genuine zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    // I. Capital and profitability
    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    pub total_net_profit: Decimal,
    pub total_return_pct: Decimal,
    /// Compounded to a yearly figure; None with fewer than two equity points.
    pub annualized_return_pct: Option<Decimal>,

    // II. Risk
    /// Peak-to-trough decline as a positive percentage of the peak.
    pub max_drawdown_pct: Decimal,
    /// None with fewer than two periods or zero return variance.
    pub sharpe_ratio: Option<Decimal>,

    // III. Trade-level statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// None when no closed trades exist.
    pub win_rate_pct: Option<Decimal>,
}

impl PerformanceReport {
    /// Creates a zeroed-out report for a session with the given capital.
    pub fn empty(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            final_equity: initial_capital,
            total_net_profit: Decimal::ZERO,
            total_return_pct: Decimal::ZERO,
            annualized_return_pct: None,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: None,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: None,
        }
    }
}
