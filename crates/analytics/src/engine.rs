use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use core_types::{ClosedTrade, EquityPoint, Position};
use rust_decimal::{Decimal, MathematicalOps};

/// A stateless calculator for deriving performance metrics from trading
/// activity. Every method is a pure function of its arguments.
#[derive(Debug, Default)]
pub struct MetricsEngine {}

impl MetricsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark-to-market P&L of an open position: netQty x (price - avg).
    /// Zero when flat.
    pub fn unrealized_pnl(&self, position: &Position, current_price: Decimal) -> Decimal {
        match position.avg_entry_price {
            Some(avg) if !position.is_flat() => {
                Decimal::from(position.net_quantity) * (current_price - avg)
            }
            _ => Decimal::ZERO,
        }
    }

    /// Realized plus unrealized P&L at the given mark price.
    pub fn total_pnl(&self, position: &Position, current_price: Decimal) -> Decimal {
        position.realized_pnl + self.unrealized_pnl(position, current_price)
    }

    /// Winning fraction of closed trades, as a percentage.
    /// `None` when no closed trades exist -- never a division by zero.
    pub fn win_rate(&self, trades: &[ClosedTrade]) -> Option<Decimal> {
        if trades.is_empty() {
            return None;
        }
        let winners = trades.iter().filter(|t| t.realized_pnl > Decimal::ZERO).count();
        Some(Decimal::from(winners) / Decimal::from(trades.len()) * Decimal::from(100))
    }

    /// Maximum peak-to-trough decline of the curve, as a positive percentage
    /// of the peak. Zero for a monotonically non-decreasing curve.
    pub fn max_drawdown(&self, curve: &[EquityPoint]) -> Result<Decimal, AnalyticsError> {
        validate_curve(curve)?;

        let mut max_drawdown = Decimal::ZERO;
        let mut peak = match curve.first() {
            Some(point) => point.equity,
            None => return Ok(Decimal::ZERO),
        };

        for point in curve {
            if point.equity > peak {
                peak = point.equity;
            }
            if peak > Decimal::ZERO {
                let drawdown = (peak - point.equity) / peak * Decimal::from(100);
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }
        Ok(max_drawdown)
    }

    /// Annualized Sharpe ratio over the curve's period returns, risk-free
    /// rate zero. `None` with fewer than two periods, constant returns, or
    /// a period whose base equity is zero (returns undefined).
    pub fn sharpe_ratio(
        &self,
        curve: &[EquityPoint],
        periods_per_year: u32,
    ) -> Result<Option<Decimal>, AnalyticsError> {
        let Some(returns) = period_returns(curve)? else {
            return Ok(None);
        };
        if returns.len() < 2 {
            return Ok(None);
        }

        let mean: Decimal = returns.iter().sum::<Decimal>() / Decimal::from(returns.len());
        let variance: Decimal = returns
            .iter()
            .map(|r| (*r - mean) * (*r - mean))
            .sum::<Decimal>()
            / Decimal::from(returns.len());

        if variance <= Decimal::ZERO {
            return Ok(None);
        }
        let std_dev = variance.sqrt().ok_or_else(|| {
            AnalyticsError::InternalError("square root of variance failed".to_string())
        })?;
        if std_dev.is_zero() {
            return Ok(None);
        }

        let annualization = Decimal::from(periods_per_year).sqrt().ok_or_else(|| {
            AnalyticsError::InternalError("square root of periods_per_year failed".to_string())
        })?;
        Ok(Some(mean / std_dev * annualization))
    }

    /// Compound annual growth rate implied by the curve, as a percentage:
    /// (final/initial)^(periodsPerYear/numPeriods) - 1.
    /// `None` with fewer than two points or a zero starting equity.
    pub fn annualized_return(
        &self,
        curve: &[EquityPoint],
        periods_per_year: u32,
    ) -> Result<Option<Decimal>, AnalyticsError> {
        validate_curve(curve)?;
        if curve.len() < 2 {
            return Ok(None);
        }

        let initial = curve[0].equity;
        let final_equity = curve[curve.len() - 1].equity;
        // Negative equity never passes validation; zero makes growth
        // undefined rather than invalid.
        if initial.is_zero() {
            return Ok(None);
        }

        let periods = Decimal::from(curve.len() - 1);
        let exponent = Decimal::from(periods_per_year) / periods;
        let growth = (final_equity / initial).powd(exponent) - Decimal::ONE;
        Ok(Some(growth * Decimal::from(100)))
    }

    /// The main entry point: synthesizes the full report from a session's
    /// closed trades and equity curve.
    pub fn calculate(
        &self,
        trades: &[ClosedTrade],
        curve: &[EquityPoint],
        initial_capital: Decimal,
        periods_per_year: u32,
    ) -> Result<PerformanceReport, AnalyticsError> {
        validate_curve(curve)?;

        let mut report = PerformanceReport::empty(initial_capital);

        if let Some(last) = curve.last() {
            report.final_equity = last.equity;
        }
        report.total_net_profit = report.final_equity - initial_capital;
        if initial_capital > Decimal::ZERO {
            report.total_return_pct =
                report.total_net_profit / initial_capital * Decimal::from(100);
        }

        report.max_drawdown_pct = self.max_drawdown(curve)?;
        report.sharpe_ratio = self.sharpe_ratio(curve, periods_per_year)?;
        report.annualized_return_pct = self.annualized_return(curve, periods_per_year)?;

        report.total_trades = trades.len();
        report.winning_trades = trades
            .iter()
            .filter(|t| t.realized_pnl > Decimal::ZERO)
            .count();
        report.losing_trades = trades
            .iter()
            .filter(|t| t.realized_pnl < Decimal::ZERO)
            .count();
        report.win_rate_pct = self.win_rate(trades);

        Ok(report)
    }
}

/// Rejects malformed curves: negative equity or non-monotonic timestamps.
/// An empty curve is well-formed.
fn validate_curve(curve: &[EquityPoint]) -> Result<(), AnalyticsError> {
    for point in curve {
        if point.equity < Decimal::ZERO {
            return Err(AnalyticsError::InvalidSeries(format!(
                "negative equity {} at {}",
                point.equity, point.timestamp
            )));
        }
    }
    for pair in curve.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(AnalyticsError::InvalidSeries(format!(
                "non-monotonic timestamps: {} then {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
    }
    Ok(())
}

/// Percentage returns between consecutive equity points, or `None` when some
/// period starts from zero equity and its return is undefined.
fn period_returns(curve: &[EquityPoint]) -> Result<Option<Vec<Decimal>>, AnalyticsError> {
    validate_curve(curve)?;
    let mut returns = Vec::with_capacity(curve.len().saturating_sub(1));
    for w in curve.windows(2) {
        if w[0].equity.is_zero() {
            return Ok(None);
        }
        returns.push((w[1].equity - w[0].equity) / w[0].equity);
    }
    Ok(Some(returns))
}
