use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side of the order.
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "Buy"),
            OrderSide::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// The lifecycle state of an order.
///
/// An order is created `Open` or `Pending` and moves monotonically towards
/// exactly one of the terminal states. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Pending,
    Complete,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Complete | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Whether `next` is a legal successor of this status.
    ///
    /// Non-terminal statuses may hop between each other (including self-loops,
    /// which carry partial fills) or settle into any terminal status.
    pub fn can_transition_to(&self, _next: OrderStatus) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Open => "Open",
            OrderStatus::Pending => "Pending",
            OrderStatus::Complete => "Complete",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

/// The operational state of a live strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyStatus {
    Active,
    Paused,
    Error,
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyStatus::Active => "Active",
            StrategyStatus::Paused => "Paused",
            StrategyStatus::Error => "Error",
        };
        write!(f, "{s}")
    }
}

/// Identifies which decision rule a strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    MarketMaking,
    Momentum,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::MarketMaking => "MarketMaking",
            StrategyKind::Momentum => "Momentum",
        };
        write!(f, "{s}")
    }
}

/// The lifecycle state of a backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BacktestStatus {
    Configured,
    Running,
    Complete,
    Failed,
}

impl fmt::Display for BacktestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BacktestStatus::Configured => "Configured",
            BacktestStatus::Running => "Running",
            BacktestStatus::Complete => "Complete",
            BacktestStatus::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_admit_no_successor() {
        for terminal in [
            OrderStatus::Complete,
            OrderStatus::Rejected,
            OrderStatus::Cancelled,
        ] {
            for next in [
                OrderStatus::Open,
                OrderStatus::Pending,
                OrderStatus::Complete,
                OrderStatus::Rejected,
                OrderStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn open_orders_may_settle_or_stay_working() {
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Complete));
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::Cancelled));
    }
}
