//! # Meridian Strategy Library
//!
//! Deterministic decision rules used by the backtest simulator. It defines a
//! universal `DecisionRule` trait and provides the concrete implementations.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** a pure logic crate. It has no knowledge of ledgers,
//!   feeds, or execution. It depends only on `core-types` and `configuration`.
//! - **Determinism:** given the same sequence of `MarketState`s a rule always
//!   produces the same intents, which is what makes backtests reproducible.
//! - **Extensibility:** adding a rule means a new module implementing
//!   `DecisionRule`, a `StrategyKind` variant, and a `factory` arm.

pub mod error;
pub mod factory;
pub mod market_making;
pub mod momentum;

// Re-export the key components to create a clean, public-facing API.
pub use error::StrategyError;
pub use factory::create_rule;
pub use market_making::MarketMaker;
pub use momentum::Momentum;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A read-only view of the market at one replay step.
#[derive(Debug, Clone)]
pub struct MarketState<'a> {
    pub timestamp: DateTime<Utc>,
    /// Latest known price per instrument.
    pub prices: &'a HashMap<String, Decimal>,
    /// Current net position per instrument, for rules that cap exposure.
    pub net_positions: &'a HashMap<String, i64>,
}

/// A fill the rule intends to have executed at this step.
///
/// Quantity is signed: positive buys, negative sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillIntent {
    pub symbol: String,
    pub quantity: i64,
    pub price: Decimal,
}

/// The core trait all decision rules implement.
///
/// Rules take `&mut self` because most maintain internal state (e.g. previous
/// indicator values). The `Send + Sync` bounds allow rules to be moved onto
/// the blocking pool where backtests run.
pub trait DecisionRule: Send + Sync {
    /// Evaluates the rule against the current market state, returning the
    /// set of intended fills (possibly empty).
    fn evaluate(&mut self, market: &MarketState<'_>) -> Result<Vec<FillIntent>, StrategyError>;
}
