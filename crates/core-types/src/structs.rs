use crate::enums::{OrderSide, OrderStatus, OrderType, StrategyKind, StrategyStatus};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Static reference data for a tradable instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// The unique symbol, e.g. "NIFTY" or "BTCUSDT".
    pub symbol: String,
    /// The minimum price increment for the instrument.
    pub tick_size: Decimal,
    /// The currency the instrument is quoted in.
    pub currency: String,
}

/// A submitted order and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// The total quantity requested. Always positive.
    pub quantity: u64,
    /// The limit price, absent for market orders.
    pub limit_price: Option<Decimal>,
    pub status: OrderStatus,
    pub strategy_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Cumulative absolute quantity filled so far.
    pub filled_quantity: u64,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        symbol: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        quantity: u64,
        limit_price: Option<Decimal>,
        strategy_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            limit_price,
            status: OrderStatus::Open,
            strategy_id,
            created_at,
            updated_at: created_at,
            filled_quantity: 0,
        }
    }

    pub fn remaining_quantity(&self) -> u64 {
        self.quantity.saturating_sub(self.filled_quantity)
    }
}

/// An executed (partial or full) quantity against an order at a specific price.
///
/// Quantity is signed: positive means a buy, negative a sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: Uuid,
    pub symbol: String,
    pub quantity: i64,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    pub fn new(
        order_id: Uuid,
        symbol: impl Into<String>,
        quantity: i64,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            symbol: symbol.into(),
            quantity,
            price,
            timestamp,
        }
    }

    pub fn side(&self) -> OrderSide {
        if self.quantity >= 0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    pub fn abs_quantity(&self) -> u64 {
        self.quantity.unsigned_abs()
    }
}

/// The current holding for one (strategy, instrument) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub strategy_id: Uuid,
    pub symbol: String,
    /// Net signed quantity: positive long, negative short, zero flat.
    pub net_quantity: i64,
    /// Average entry price. Defined only while the position is open.
    pub avg_entry_price: Option<Decimal>,
    /// P&L accumulated on every reducing fill.
    pub realized_pnl: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.net_quantity == 0
    }
}

/// The closed portion of a position, realized by a reducing fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub strategy_id: Uuid,
    pub symbol: String,
    /// The closed quantity, signed as the closing fill.
    pub quantity: i64,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub realized_pnl: Decimal,
    pub closed_at: DateTime<Utc>,
}

/// A registered strategy and its operational state machine.
///
/// All status mutations route through the transition methods below; no caller
/// assigns `status` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: Uuid,
    pub name: String,
    pub kind: StrategyKind,
    pub status: StrategyStatus,
    pub instruments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Strategy {
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        kind: StrategyKind,
        instruments: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            status: StrategyStatus::Active,
            instruments,
            created_at,
        }
    }

    /// Flips between Active and Paused. Errored strategies cannot be toggled;
    /// they must be reset first.
    pub fn toggle(&mut self) -> Result<StrategyStatus, CoreError> {
        let next = match self.status {
            StrategyStatus::Active => StrategyStatus::Paused,
            StrategyStatus::Paused => StrategyStatus::Active,
            StrategyStatus::Error => {
                return Err(CoreError::InvalidTransition {
                    from: StrategyStatus::Error,
                    to: StrategyStatus::Active,
                });
            }
        };
        self.status = next;
        Ok(next)
    }

    /// Any ledger error lands the strategy here, from any state.
    pub fn mark_error(&mut self) {
        self.status = StrategyStatus::Error;
    }

    /// Manual recovery: Error resets to Paused, never straight to Active.
    pub fn reset(&mut self) -> Result<StrategyStatus, CoreError> {
        if self.status != StrategyStatus::Error {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: StrategyStatus::Paused,
            });
        }
        self.status = StrategyStatus::Paused;
        Ok(self.status)
    }
}

/// One point on a time-ordered equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_strategy() -> Strategy {
        Strategy::new(
            Uuid::new_v4(),
            "mm-alpha",
            StrategyKind::MarketMaking,
            vec!["NIFTY".to_string()],
            Utc::now(),
        )
    }

    #[test]
    fn toggle_flips_between_active_and_paused() {
        let mut strategy = sample_strategy();
        assert_eq!(strategy.status, StrategyStatus::Active);
        assert_eq!(strategy.toggle().unwrap(), StrategyStatus::Paused);
        assert_eq!(strategy.toggle().unwrap(), StrategyStatus::Active);
    }

    #[test]
    fn errored_strategy_requires_reset_before_toggle() {
        let mut strategy = sample_strategy();
        strategy.mark_error();
        assert!(strategy.toggle().is_err());
        assert_eq!(strategy.reset().unwrap(), StrategyStatus::Paused);
        assert_eq!(strategy.toggle().unwrap(), StrategyStatus::Active);
    }

    #[test]
    fn reset_is_only_legal_from_error() {
        let mut strategy = sample_strategy();
        assert!(strategy.reset().is_err());
    }

    #[test]
    fn fill_side_follows_quantity_sign() {
        let fill = Fill::new(Uuid::new_v4(), "NIFTY", -5, dec!(100), Utc::now());
        assert_eq!(fill.side(), OrderSide::Sell);
        assert_eq!(fill.abs_quantity(), 5);
    }
}
