//! # Meridian Backtester
//!
//! Replays a strategy's decision rule against historical price series and
//! produces an equity curve plus a full performance report.
//!
//! The simulator owns fully private position and order ledgers scoped to the
//! run; it never touches live state, so any number of runs may execute
//! concurrently. Cancellation is cooperative: the replay loop checks a shared
//! flag every step and stops without a Complete/Failed transition.

use analytics::{MetricsEngine, PerformanceReport};
use chrono::{DateTime, Utc};
use configuration::Config;
use core_types::{
    BacktestStatus, ClosedTrade, EquityPoint, Fill, InstrumentCatalog, Order, OrderSide,
    OrderStatus, OrderType, StrategyKind,
};
use ledger::{OrderLedger, PositionLedger};
use market_data::HistoricalPrices;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strategies::{DecisionRule, MarketState, create_rule};
use uuid::Uuid;

pub mod error;

pub use error::BacktestError;

/// Everything needed to start a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestParameters {
    pub strategy: StrategyKind,
    pub instruments: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_capital: Decimal,
}

impl BacktestParameters {
    /// Checked synchronously before a run enters Running.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.instruments.is_empty() {
            return Err(BacktestError::InvalidParameters(
                "instrument set must not be empty".to_string(),
            ));
        }
        if self.start >= self.end {
            return Err(BacktestError::InvalidParameters(format!(
                "start {} must precede end {}",
                self.start, self.end
            )));
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::InvalidParameters(
                "initial capital must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The externally visible record of one run.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub id: Uuid,
    pub parameters: BacktestParameters,
    pub status: BacktestStatus,
    pub equity_curve: Vec<EquityPoint>,
    /// Present once the run is Complete. Failed runs keep their partial
    /// equity curve for diagnostics, but their metrics stay absent.
    pub report: Option<PerformanceReport>,
    pub failure: Option<String>,
}

impl BacktestRun {
    pub fn new(id: Uuid, parameters: BacktestParameters) -> Self {
        Self {
            id,
            parameters,
            status: BacktestStatus::Configured,
            equity_curve: Vec::new(),
            report: None,
            failure: None,
        }
    }
}

/// How a replay ended when it did not error.
pub enum RunOutcome {
    Completed(PerformanceReport),
    Cancelled,
}

/// The replay engine for a single run.
pub struct Backtester {
    run_id: Uuid,
    parameters: BacktestParameters,
    periods_per_year: u32,
    rule: Box<dyn DecisionRule>,
    // Run-private ledgers; discarded with the run.
    positions: PositionLedger,
    orders: OrderLedger,
    trades: Vec<ClosedTrade>,
    equity_curve: Vec<EquityPoint>,
    metrics: MetricsEngine,
}

impl Backtester {
    /// Validates parameters and constructs the rule. Fails synchronously with
    /// `InvalidParameters` before any run state exists.
    pub fn new(
        run_id: Uuid,
        parameters: BacktestParameters,
        config: &Config,
        catalog: Arc<InstrumentCatalog>,
    ) -> Result<Self, BacktestError> {
        parameters.validate()?;
        let rule = create_rule(parameters.strategy, config, &parameters.instruments)
            .map_err(|e| BacktestError::InvalidParameters(e.to_string()))?;

        Ok(Self {
            run_id,
            parameters,
            periods_per_year: config.simulation.periods_per_year,
            rule,
            positions: PositionLedger::new(catalog),
            orders: OrderLedger::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            metrics: MetricsEngine::new(),
        })
    }

    /// Runs the simulation to completion, cancellation, or error.
    ///
    /// The partial equity curve survives an error through
    /// [`Backtester::equity_curve`], so the caller can preserve it on a
    /// Failed run.
    pub fn run(
        &mut self,
        history: &dyn HistoricalPrices,
        cancel: &AtomicBool,
    ) -> Result<RunOutcome, BacktestError> {
        // Merge per-instrument series into one ascending timestamp grid.
        let mut grid: BTreeMap<DateTime<Utc>, Vec<(String, Decimal)>> = BTreeMap::new();
        for symbol in &self.parameters.instruments {
            let series = history.prices(symbol, self.parameters.start, self.parameters.end)?;
            if series.is_empty() {
                return Err(BacktestError::DataUnavailable(symbol.clone()));
            }
            for point in series {
                grid.entry(point.timestamp)
                    .or_default()
                    .push((symbol.clone(), point.price));
            }
        }

        tracing::info!(run_id = %self.run_id, steps = grid.len(), "backtest replay starting");

        let mut snapshot: HashMap<String, Decimal> = HashMap::new();
        for (timestamp, updates) in grid {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(run_id = %self.run_id, "backtest cancelled");
                return Ok(RunOutcome::Cancelled);
            }

            for (symbol, price) in updates {
                snapshot.insert(symbol, price);
            }

            let net_positions: HashMap<String, i64> = self
                .positions
                .list_positions(Some(&[self.run_id]))
                .into_iter()
                .map(|p| (p.symbol, p.net_quantity))
                .collect();

            let intents = self.rule.evaluate(&MarketState {
                timestamp,
                prices: &snapshot,
                net_positions: &net_positions,
            })?;
            for intent in intents {
                self.execute(&intent.symbol, intent.quantity, intent.price, timestamp)?;
            }

            let equity = self.mark_equity(&snapshot);
            self.equity_curve.push(EquityPoint { timestamp, equity });
        }

        let report = self.metrics.calculate(
            &self.trades,
            &self.equity_curve,
            self.parameters.initial_capital,
            self.periods_per_year,
        )?;
        Ok(RunOutcome::Completed(report))
    }

    /// Books one intended fill as a synthetic, immediately-complete order
    /// against the run-private ledgers.
    fn execute(
        &mut self,
        symbol: &str,
        quantity: i64,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<(), BacktestError> {
        let order_id = Uuid::new_v4();
        let side = if quantity >= 0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        self.orders.submit(Order::new(
            order_id,
            symbol,
            side,
            OrderType::Limit,
            quantity.unsigned_abs(),
            Some(price),
            self.run_id,
            timestamp,
        ))?;

        let fill = Fill::new(order_id, symbol, quantity, price, timestamp);
        self.orders
            .transition(order_id, OrderStatus::Complete, Some(fill.clone()))?;
        if let Some(trade) = self.positions.apply_fill(self.run_id, &fill)? {
            self.trades.push(trade);
        }
        Ok(())
    }

    /// Equity at this step: initial capital plus realized and unrealized P&L
    /// across all run positions, marked at the step's prices.
    fn mark_equity(&self, snapshot: &HashMap<String, Decimal>) -> Decimal {
        let mut equity = self.parameters.initial_capital;
        for position in self.positions.list_positions(Some(&[self.run_id])) {
            equity += position.realized_pnl;
            if let Some(price) = snapshot.get(&position.symbol) {
                equity += self.metrics.unrealized_pnl(&position, *price);
            }
        }
        equity
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn parameters(&self) -> &BacktestParameters {
        &self.parameters
    }
}
