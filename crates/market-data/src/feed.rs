use crate::error::FeedError;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Read access to the latest known price per instrument.
///
/// Implementations hold an already-fetched snapshot; `current_price` never
/// performs network I/O.
pub trait PriceFeed: Send + Sync {
    fn current_price(&self, symbol: &str) -> Result<Decimal, FeedError>;
}

/// A plain in-memory price snapshot, updated by whoever receives ticks.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFeed {
    prices: HashMap<String, Decimal>,
}

impl SnapshotFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&mut self, symbol: impl Into<String>, price: Decimal) {
        self.prices.insert(symbol.into(), price);
    }

    pub fn prices(&self) -> &HashMap<String, Decimal> {
        &self.prices
    }
}

impl PriceFeed for SnapshotFeed {
    fn current_price(&self, symbol: &str) -> Result<Decimal, FeedError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| FeedError::PriceUnavailable(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_symbol_is_price_unavailable() {
        let mut feed = SnapshotFeed::new();
        feed.set_price("NIFTY", dec!(22000));
        assert_eq!(feed.current_price("NIFTY").unwrap(), dec!(22000));
        assert!(matches!(
            feed.current_price("BANKNIFTY"),
            Err(FeedError::PriceUnavailable(_))
        ));
    }
}
