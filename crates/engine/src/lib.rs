//! # Meridian Engine
//!
//! The single entry point of the analytics core. `TradingCore` owns the live
//! ledgers, the strategy registry, the price snapshot, and the backtest
//! registry, and exposes the command and query surface everything outside the
//! workspace talks to.
//!
//! ## Architectural Principles
//!
//! - **Commands vs. Queries:** commands route through exactly one writer path
//!   per ledger and validate fully before mutating; queries hand out cloned
//!   snapshots and never block a writer for long.
//! - **Backtests are isolated:** each run executes on the blocking pool with
//!   its own private ledgers. Live state is never read or written by a run,
//!   so cancelling one can never disturb the live books.
//! - **Errors quarantine the strategy:** any ledger failure while recording a
//!   fill parks the owning strategy in `Error` until an operator resets it.

use analytics::MetricsEngine;
use backtester::{BacktestParameters, BacktestRun, Backtester, RunOutcome};
use chrono::Utc;
use configuration::Config;
use core_types::{
    BacktestStatus, ClosedTrade, Fill, InstrumentCatalog, Order, OrderStatus, Position, Strategy,
    StrategyKind, StrategyStatus,
};
use ledger::{OrderFilter, OrderLedger, PositionLedger};
use market_data::{HistoricalPrices, PriceFeed, SnapshotFeed};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod error;

pub use error::EngineError;

/// One tracked backtest run: the shared record the worker task updates, plus
/// the cooperative cancellation flag the replay loop polls.
struct BacktestHandle {
    run: Arc<RwLock<BacktestRun>>,
    cancel: Arc<AtomicBool>,
}

/// Live P&L and trade statistics for a strategy or the whole portfolio.
///
/// Curve-derived metrics (drawdown, Sharpe, annualized return) are backtest
/// territory; the live report covers what the live ledgers can answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveMetrics {
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_pnl: Decimal,
    pub open_positions: usize,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Option<Decimal>,
}

/// The orchestrator of the analytics core.
///
/// Intended to be wrapped in an `Arc` and shared; all methods take `&self`
/// and synchronize internally.
pub struct TradingCore {
    config: Config,
    catalog: Arc<InstrumentCatalog>,
    positions: RwLock<PositionLedger>,
    orders: RwLock<OrderLedger>,
    trades: RwLock<Vec<ClosedTrade>>,
    strategies: RwLock<HashMap<Uuid, Strategy>>,
    prices: RwLock<SnapshotFeed>,
    backtests: RwLock<HashMap<Uuid, BacktestHandle>>,
    history: Arc<dyn HistoricalPrices>,
    metrics: MetricsEngine,
}

impl TradingCore {
    pub fn new(config: Config, history: Arc<dyn HistoricalPrices>) -> Self {
        let catalog = Arc::new(InstrumentCatalog::new(config.instruments.clone()));
        Self {
            config,
            catalog: Arc::clone(&catalog),
            positions: RwLock::new(PositionLedger::new(catalog)),
            orders: RwLock::new(OrderLedger::new()),
            trades: RwLock::new(Vec::new()),
            strategies: RwLock::new(HashMap::new()),
            prices: RwLock::new(SnapshotFeed::new()),
            backtests: RwLock::new(HashMap::new()),
            history,
            metrics: MetricsEngine::new(),
        }
    }

    pub fn catalog(&self) -> &InstrumentCatalog {
        &self.catalog
    }

    // ------------------------------------------------------------------
    // Strategy registry
    // ------------------------------------------------------------------

    /// Registers a new strategy over the given instruments. It starts Active.
    pub async fn register_strategy(
        &self,
        name: impl Into<String>,
        kind: StrategyKind,
        instruments: Vec<String>,
    ) -> Result<Uuid, EngineError> {
        for symbol in &instruments {
            if !self.catalog.contains(symbol) {
                return Err(ledger::LedgerError::UnknownInstrument(symbol.clone()).into());
            }
        }

        let id = Uuid::new_v4();
        let strategy = Strategy::new(id, name, kind, instruments, Utc::now());
        tracing::info!(strategy_id = %id, name = %strategy.name, kind = %strategy.kind, "strategy registered");
        self.strategies.write().await.insert(id, strategy);
        Ok(id)
    }

    /// Flips a strategy between Active and Paused.
    pub async fn toggle_strategy(&self, id: Uuid) -> Result<StrategyStatus, EngineError> {
        let mut strategies = self.strategies.write().await;
        let strategy = strategies
            .get_mut(&id)
            .ok_or(EngineError::UnknownStrategy(id))?;
        let status = strategy.toggle()?;
        tracing::info!(strategy_id = %id, %status, "strategy toggled");
        Ok(status)
    }

    /// Recovers an Errored strategy to Paused.
    pub async fn reset_strategy(&self, id: Uuid) -> Result<StrategyStatus, EngineError> {
        let mut strategies = self.strategies.write().await;
        let strategy = strategies
            .get_mut(&id)
            .ok_or(EngineError::UnknownStrategy(id))?;
        let status = strategy.reset()?;
        tracing::info!(strategy_id = %id, "strategy reset");
        Ok(status)
    }

    pub async fn strategy(&self, id: Uuid) -> Option<Strategy> {
        self.strategies.read().await.get(&id).cloned()
    }

    // ------------------------------------------------------------------
    // Live order and fill flow
    // ------------------------------------------------------------------

    /// Accepts a new order into the live order ledger.
    ///
    /// The owning strategy must exist and be Active, and the symbol must be
    /// in the catalog.
    pub async fn submit_order(&self, order: Order) -> Result<(), EngineError> {
        if !self.catalog.contains(&order.symbol) {
            return Err(ledger::LedgerError::UnknownInstrument(order.symbol.clone()).into());
        }
        {
            let strategies = self.strategies.read().await;
            let strategy = strategies
                .get(&order.strategy_id)
                .ok_or(EngineError::UnknownStrategy(order.strategy_id))?;
            if strategy.status != StrategyStatus::Active {
                return Err(EngineError::StrategyNotActive {
                    id: strategy.id,
                    status: strategy.status,
                });
            }
        }

        let (id, symbol, side, quantity) = (order.id, order.symbol.clone(), order.side, order.quantity);
        self.orders.write().await.submit(order)?;
        tracing::info!(order_id = %id, %symbol, %side, quantity, "order submitted");
        Ok(())
    }

    /// Records an execution: transitions the order and applies the fill to
    /// the owning strategy's position.
    ///
    /// Partial fills ride a transition to `Pending`; the final fill moves the
    /// order to `Complete`. Any ledger rejection quarantines the strategy in
    /// `Error`. Returns the closed trade if the fill reduced a position.
    pub async fn record_fill(
        &self,
        fill: Fill,
        new_status: OrderStatus,
    ) -> Result<Option<ClosedTrade>, EngineError> {
        let strategy_id = self
            .orders
            .read()
            .await
            .get(fill.order_id)
            .map(|o| o.strategy_id)
            .ok_or(ledger::LedgerError::UnknownOrder(fill.order_id))?;

        let applied = self.apply_fill_to_ledgers(strategy_id, &fill, new_status).await;
        match applied {
            Ok(closed) => {
                if let Some(trade) = &closed {
                    tracing::info!(
                        strategy_id = %strategy_id,
                        symbol = %trade.symbol,
                        realized_pnl = %trade.realized_pnl,
                        "position reduced"
                    );
                    self.trades.write().await.push(trade.clone());
                }
                Ok(closed)
            }
            Err(e) => {
                tracing::error!(strategy_id = %strategy_id, error = %e, "fill rejected; strategy quarantined");
                if let Some(strategy) = self.strategies.write().await.get_mut(&strategy_id) {
                    strategy.mark_error();
                }
                Err(e)
            }
        }
    }

    async fn apply_fill_to_ledgers(
        &self,
        strategy_id: Uuid,
        fill: &Fill,
        new_status: OrderStatus,
    ) -> Result<Option<ClosedTrade>, EngineError> {
        self.orders
            .write()
            .await
            .transition(fill.order_id, new_status, Some(fill.clone()))?;
        let closed = self.positions.write().await.apply_fill(strategy_id, fill)?;
        Ok(closed)
    }

    /// Updates the live price snapshot for one instrument.
    pub async fn update_price(&self, symbol: &str, price: Decimal) -> Result<(), EngineError> {
        if !self.catalog.contains(symbol) {
            return Err(ledger::LedgerError::UnknownInstrument(symbol.to_string()).into());
        }
        self.prices.write().await.set_price(symbol, price);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current positions, optionally restricted to the given strategies.
    pub async fn list_positions(&self, strategies: Option<&[Uuid]>) -> Vec<Position> {
        self.positions.read().await.list_positions(strategies)
    }

    /// Orders matching the filter, in submission order.
    pub async fn query_orders(&self, filter: &OrderFilter) -> Vec<Order> {
        self.orders.read().await.query(filter)
    }

    /// Live P&L report for one strategy, or the whole portfolio when `scope`
    /// is `None`.
    ///
    /// Open positions are marked at the snapshot price; a missing price for
    /// an open position is a `PriceUnavailable` error, not a silent zero.
    pub async fn metrics_report(&self, scope: Option<Uuid>) -> Result<LiveMetrics, EngineError> {
        let scope_set = scope.map(|id| vec![id]);
        let positions = self
            .positions
            .read()
            .await
            .list_positions(scope_set.as_deref());
        let prices = self.prices.read().await;

        let mut realized = Decimal::ZERO;
        let mut unrealized = Decimal::ZERO;
        let mut open_positions = 0;
        for position in &positions {
            realized += position.realized_pnl;
            if !position.is_flat() {
                open_positions += 1;
                let price = prices.current_price(&position.symbol)?;
                unrealized += self.metrics.unrealized_pnl(position, price);
            }
        }

        let trades = self.trades.read().await;
        let scoped: Vec<ClosedTrade> = trades
            .iter()
            .filter(|t| scope.is_none_or(|id| t.strategy_id == id))
            .cloned()
            .collect();
        let winning = scoped
            .iter()
            .filter(|t| t.realized_pnl > Decimal::ZERO)
            .count();
        let losing = scoped
            .iter()
            .filter(|t| t.realized_pnl < Decimal::ZERO)
            .count();

        Ok(LiveMetrics {
            realized_pnl: realized,
            unrealized_pnl: unrealized,
            total_pnl: realized + unrealized,
            open_positions,
            total_trades: scoped.len(),
            winning_trades: winning,
            losing_trades: losing,
            win_rate_pct: self.metrics.win_rate(&scoped),
        })
    }

    // ------------------------------------------------------------------
    // Backtests
    // ------------------------------------------------------------------

    /// Validates parameters, registers the run as Running, and hands the
    /// replay to the blocking pool. Returns the run id immediately.
    pub async fn start_backtest(
        &self,
        parameters: BacktestParameters,
    ) -> Result<Uuid, EngineError> {
        let run_id = Uuid::new_v4();
        // Construction validates synchronously, so a bad request never
        // produces a registered run.
        let mut backtester =
            Backtester::new(run_id, parameters.clone(), &self.config, Arc::clone(&self.catalog))?;

        let mut run = BacktestRun::new(run_id, parameters);
        run.status = BacktestStatus::Running;
        let run = Arc::new(RwLock::new(run));
        let cancel = Arc::new(AtomicBool::new(false));
        self.backtests.write().await.insert(
            run_id,
            BacktestHandle {
                run: Arc::clone(&run),
                cancel: Arc::clone(&cancel),
            },
        );

        let history = Arc::clone(&self.history);
        tokio::spawn(async move {
            let replayed = tokio::task::spawn_blocking(move || {
                let outcome = backtester.run(history.as_ref(), cancel.as_ref());
                (backtester, outcome)
            })
            .await;

            let mut run = run.write().await;
            match replayed {
                Ok((backtester, Ok(RunOutcome::Completed(report)))) => {
                    run.equity_curve = backtester.equity_curve().to_vec();
                    run.report = Some(report);
                    run.status = BacktestStatus::Complete;
                    tracing::info!(run_id = %run_id, "backtest complete");
                }
                Ok((_, Ok(RunOutcome::Cancelled))) => {
                    // The registry entry was removed by cancel_backtest; the
                    // partial run state is discarded with it.
                    tracing::info!(run_id = %run_id, "backtest cancelled");
                }
                Ok((backtester, Err(e))) => {
                    // Failed runs keep their partial curve for diagnostics.
                    run.equity_curve = backtester.equity_curve().to_vec();
                    run.failure = Some(e.to_string());
                    run.status = BacktestStatus::Failed;
                    tracing::error!(run_id = %run_id, error = %e, "backtest failed");
                }
                Err(join_error) => {
                    run.failure = Some(join_error.to_string());
                    run.status = BacktestStatus::Failed;
                    tracing::error!(run_id = %run_id, error = %join_error, "backtest worker panicked");
                }
            }
        });

        Ok(run_id)
    }

    /// Requests cancellation of a Running run and discards it from the
    /// registry. The replay loop observes the flag at its next step.
    pub async fn cancel_backtest(&self, run_id: Uuid) -> Result<(), EngineError> {
        let mut backtests = self.backtests.write().await;
        let handle = backtests
            .get(&run_id)
            .ok_or(EngineError::UnknownRun(run_id))?;

        let status = handle.run.read().await.status;
        if status != BacktestStatus::Running {
            return Err(EngineError::NotCancellable { id: run_id, status });
        }

        handle.cancel.store(true, Ordering::Relaxed);
        backtests.remove(&run_id);
        tracing::info!(run_id = %run_id, "backtest cancellation requested");
        Ok(())
    }

    /// A snapshot of the run: status, equity curve so far, and the report
    /// once Complete.
    pub async fn backtest_result(&self, run_id: Uuid) -> Result<BacktestRun, EngineError> {
        let backtests = self.backtests.read().await;
        let handle = backtests
            .get(&run_id)
            .ok_or(EngineError::UnknownRun(run_id))?;
        Ok(handle.run.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use configuration::{
        BacktestDefaults, MarketMakingParams, MomentumParams, Simulation, Strategies,
    };
    use core_types::{Instrument, OrderSide, OrderType};
    use market_data::{InMemoryHistory, PricePoint};
    use rust_decimal_macros::dec;

    fn config() -> Config {
        Config {
            backtest: BacktestDefaults {
                initial_capital: dec!(100000),
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            },
            simulation: Simulation {
                periods_per_year: 252,
                synthetic_volatility_pct: dec!(0.01),
            },
            strategies: Strategies {
                market_making: MarketMakingParams {
                    spread_pct: dec!(0.01),
                    order_quantity: 10,
                    position_limit: 20,
                },
                momentum: MomentumParams {
                    ma_short_period: 2,
                    ma_long_period: 4,
                    position_size: 5,
                },
            },
            instruments: vec![Instrument {
                symbol: "NIFTY".to_string(),
                tick_size: dec!(0.05),
                currency: "INR".to_string(),
            }],
        }
    }

    fn flat_history(periods: usize) -> InMemoryHistory {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = (0..periods)
            .map(|i| PricePoint {
                timestamp: start + Duration::days(i as i64),
                price: dec!(100),
            })
            .collect();
        let mut history = InMemoryHistory::new();
        history.insert_series("NIFTY", points);
        history
    }

    fn core() -> TradingCore {
        TradingCore::new(config(), Arc::new(flat_history(10)))
    }

    // Minute resolution, so a replay takes long enough to cancel reliably.
    fn dense_history() -> InMemoryHistory {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = (0..80_000)
            .map(|i| PricePoint {
                timestamp: start + Duration::minutes(i),
                price: dec!(100),
            })
            .collect();
        let mut history = InMemoryHistory::new();
        history.insert_series("NIFTY", points);
        history
    }

    fn parameters(strategy: StrategyKind) -> BacktestParameters {
        BacktestParameters {
            strategy,
            instruments: vec!["NIFTY".to_string()],
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            initial_capital: dec!(100000),
        }
    }

    fn ts(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    async fn round_trip(core: &TradingCore, strategy_id: Uuid) {
        let buy_id = Uuid::new_v4();
        core.submit_order(Order::new(
            buy_id,
            "NIFTY",
            OrderSide::Buy,
            OrderType::Limit,
            10,
            Some(dec!(100)),
            strategy_id,
            ts(1),
        ))
        .await
        .unwrap();
        core.record_fill(
            Fill::new(buy_id, "NIFTY", 10, dec!(100), ts(1)),
            OrderStatus::Complete,
        )
        .await
        .unwrap();

        let sell_id = Uuid::new_v4();
        core.submit_order(Order::new(
            sell_id,
            "NIFTY",
            OrderSide::Sell,
            OrderType::Limit,
            10,
            Some(dec!(110)),
            strategy_id,
            ts(2),
        ))
        .await
        .unwrap();
        core.record_fill(
            Fill::new(sell_id, "NIFTY", -10, dec!(110), ts(2)),
            OrderStatus::Complete,
        )
        .await
        .unwrap();
    }

    async fn await_completion(core: &TradingCore, run_id: Uuid) -> BacktestRun {
        for _ in 0..200 {
            let run = core.backtest_result(run_id).await.unwrap();
            if run.status != BacktestStatus::Running {
                return run;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("backtest did not finish in time");
    }

    #[tokio::test]
    async fn fill_round_trip_updates_positions_and_metrics() {
        let core = core();
        let strategy_id = core
            .register_strategy("mm-live", StrategyKind::MarketMaking, vec!["NIFTY".into()])
            .await
            .unwrap();

        round_trip(&core, strategy_id).await;

        let positions = core.list_positions(Some(&[strategy_id])).await;
        assert_eq!(positions.len(), 1);
        assert!(positions[0].is_flat());
        assert_eq!(positions[0].realized_pnl, dec!(100));

        let report = core.metrics_report(Some(strategy_id)).await.unwrap();
        assert_eq!(report.realized_pnl, dec!(100));
        assert_eq!(report.unrealized_pnl, dec!(0));
        assert_eq!(report.total_trades, 1);
        assert_eq!(report.win_rate_pct, Some(dec!(100)));
    }

    #[tokio::test]
    async fn orders_require_a_known_active_strategy() {
        let core = core();
        let order = Order::new(
            Uuid::new_v4(),
            "NIFTY",
            OrderSide::Buy,
            OrderType::Limit,
            10,
            Some(dec!(100)),
            Uuid::new_v4(),
            ts(1),
        );
        assert!(matches!(
            core.submit_order(order.clone()).await,
            Err(EngineError::UnknownStrategy(_))
        ));

        let strategy_id = core
            .register_strategy("mm-live", StrategyKind::MarketMaking, vec!["NIFTY".into()])
            .await
            .unwrap();
        core.toggle_strategy(strategy_id).await.unwrap();
        let mut order = order;
        order.strategy_id = strategy_id;
        assert!(matches!(
            core.submit_order(order).await,
            Err(EngineError::StrategyNotActive { .. })
        ));
    }

    #[tokio::test]
    async fn ledger_rejection_quarantines_the_strategy() {
        let core = core();
        let strategy_id = core
            .register_strategy("mm-live", StrategyKind::MarketMaking, vec!["NIFTY".into()])
            .await
            .unwrap();

        let order_id = Uuid::new_v4();
        core.submit_order(Order::new(
            order_id,
            "NIFTY",
            OrderSide::Buy,
            OrderType::Limit,
            10,
            Some(dec!(100)),
            strategy_id,
            ts(1),
        ))
        .await
        .unwrap();

        // Overfill: 15 against an order for 10.
        let result = core
            .record_fill(
                Fill::new(order_id, "NIFTY", 15, dec!(100), ts(1)),
                OrderStatus::Complete,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(
            core.strategy(strategy_id).await.unwrap().status,
            StrategyStatus::Error
        );

        // Recovery is explicit: reset lands in Paused, never Active.
        assert_eq!(
            core.reset_strategy(strategy_id).await.unwrap(),
            StrategyStatus::Paused
        );
    }

    #[tokio::test]
    async fn backtest_completes_with_a_report() {
        let core = core();
        let run_id = core
            .start_backtest(parameters(StrategyKind::Momentum))
            .await
            .unwrap();

        let run = await_completion(&core, run_id).await;
        assert_eq!(run.status, BacktestStatus::Complete);
        let report = run.report.unwrap();
        assert_eq!(report.final_equity, dec!(100000));
        assert_eq!(run.equity_curve.len(), 10);
    }

    #[tokio::test]
    async fn invalid_backtest_parameters_never_register_a_run() {
        let core = core();
        let mut params = parameters(StrategyKind::Momentum);
        params.initial_capital = dec!(-1);
        let result = core.start_backtest(params).await;
        assert!(matches!(result, Err(EngineError::Backtest(_))));
    }

    #[tokio::test]
    async fn cancelling_a_run_leaves_live_ledgers_untouched() {
        let core = TradingCore::new(config(), Arc::new(dense_history()));
        let strategy_id = core
            .register_strategy("mm-live", StrategyKind::MarketMaking, vec!["NIFTY".into()])
            .await
            .unwrap();
        round_trip(&core, strategy_id).await;

        let positions_before = core.list_positions(None).await;
        let orders_before = core.query_orders(&OrderFilter::new()).await;

        let run_id = core
            .start_backtest(parameters(StrategyKind::MarketMaking))
            .await
            .unwrap();
        core.cancel_backtest(run_id).await.unwrap();

        // A cancelled run is discarded from the registry entirely.
        assert!(matches!(
            core.backtest_result(run_id).await,
            Err(EngineError::UnknownRun(_))
        ));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(core.list_positions(None).await, positions_before);
        assert_eq!(core.query_orders(&OrderFilter::new()).await, orders_before);
    }

    #[tokio::test]
    async fn completed_runs_cannot_be_cancelled() {
        let core = core();
        let run_id = core
            .start_backtest(parameters(StrategyKind::Momentum))
            .await
            .unwrap();
        await_completion(&core, run_id).await;

        assert!(matches!(
            core.cancel_backtest(run_id).await,
            Err(EngineError::NotCancellable { .. })
        ));
    }
}
