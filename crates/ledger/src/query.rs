use core_types::{Order, OrderSide, OrderStatus};
use uuid::Uuid;

/// A composable predicate over orders.
///
/// Criteria combine conjunctively: every provided field must match, omitted
/// fields match everything. The free-text criterion matches case-insensitively
/// against the order id, symbol, and strategy id.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    symbol: Option<String>,
    side: Option<OrderSide>,
    status: Option<OrderStatus>,
    strategy_id: Option<Uuid>,
    text: Option<String>,
}

impl OrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn side(mut self, side: OrderSide) -> Self {
        self.side = Some(side);
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn strategy(mut self, strategy_id: Uuid) -> Self {
        self.strategy_id = Some(strategy_id);
        self
    }

    pub fn text(mut self, needle: impl Into<String>) -> Self {
        self.text = Some(needle.into());
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        if let Some(symbol) = &self.symbol {
            if order.symbol != *symbol {
                return false;
            }
        }
        if let Some(side) = self.side {
            if order.side != side {
                return false;
            }
        }
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        if let Some(strategy_id) = self.strategy_id {
            if order.strategy_id != strategy_id {
                return false;
            }
        }
        if let Some(needle) = &self.text {
            let needle = needle.to_lowercase();
            let haystacks = [
                order.id.to_string().to_lowercase(),
                order.symbol.to_lowercase(),
                order.strategy_id.to_string().to_lowercase(),
            ];
            if !haystacks.iter().any(|h| h.contains(&needle)) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_types::OrderType;
    use rust_decimal_macros::dec;

    fn sample() -> Order {
        Order::new(
            Uuid::new_v4(),
            "NIFTY",
            OrderSide::Buy,
            OrderType::Limit,
            10,
            Some(dec!(100)),
            Uuid::new_v4(),
            Utc::now(),
        )
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(OrderFilter::new().matches(&sample()));
    }

    #[test]
    fn criteria_are_conjunctive() {
        let order = sample();
        assert!(
            OrderFilter::new()
                .symbol("NIFTY")
                .side(OrderSide::Buy)
                .matches(&order)
        );
        assert!(
            !OrderFilter::new()
                .symbol("NIFTY")
                .side(OrderSide::Sell)
                .matches(&order)
        );
    }

    #[test]
    fn free_text_matches_id_symbol_and_strategy() {
        let order = sample();
        assert!(OrderFilter::new().text("nif").matches(&order));
        let id_prefix: String = order.id.to_string().chars().take(8).collect();
        assert!(OrderFilter::new().text(id_prefix).matches(&order));
        assert!(!OrderFilter::new().text("no-such-thing").matches(&order));
    }
}
