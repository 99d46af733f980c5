use chrono::NaiveDate;
use core_types::Instrument;
use rust_decimal::Decimal;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backtest: BacktestDefaults,
    pub simulation: Simulation,
    pub strategies: Strategies,
    /// The static instrument reference data (symbol, tick size, currency).
    pub instruments: Vec<Instrument>,
}

/// Default parameters for a backtest run when the CLI does not override them.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestDefaults {
    /// The initial starting capital for the simulation.
    pub initial_capital: Decimal,
    /// The default start date for the backtest period.
    pub start_date: NaiveDate,
    /// The default end date for the backtest period.
    pub end_date: NaiveDate,
}

/// Parameters for the simulation environment shared by all backtests.
#[derive(Debug, Clone, Deserialize)]
pub struct Simulation {
    /// How many equity-curve periods make up a year, used to annualize
    /// Sharpe and return figures (e.g. 252 for daily bars).
    pub periods_per_year: u32,
    /// Relative per-step volatility of the synthetic price walk (e.g. 0.01
    /// for 1%). Zero produces a perfectly flat series.
    pub synthetic_volatility_pct: Decimal,
}

/// Contains the parameter sets for all available strategies.
#[derive(Debug, Clone, Deserialize)]
pub struct Strategies {
    pub market_making: MarketMakingParams,
    pub momentum: MomentumParams,
}

/// Parameters for the fixed-spread market-making rule.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketMakingParams {
    /// The full spread around the mid price, as a fraction (0.001 = 0.1%).
    pub spread_pct: Decimal,
    /// Quantity quoted on each side per step.
    pub order_quantity: u64,
    /// Maximum absolute net position per instrument.
    pub position_limit: i64,
}

/// Parameters for the SMA-crossover momentum rule.
#[derive(Debug, Clone, Deserialize)]
pub struct MomentumParams {
    pub ma_short_period: usize,
    pub ma_long_period: usize,
    /// Fixed position size taken on a crossover signal.
    pub position_size: i64,
}
