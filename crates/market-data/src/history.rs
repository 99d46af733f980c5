use crate::error::FeedError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One observation in a historical price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// Historical series access for the backtester.
///
/// Returned points are ordered by ascending timestamp and restricted to the
/// `[start, end)` window.
pub trait HistoricalPrices: Send + Sync {
    fn prices(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, FeedError>;
}

/// Historical series held entirely in memory, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    series: HashMap<String, Vec<PricePoint>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a series for a symbol, sorting it by timestamp so downstream
    /// consumers always see monotonic time.
    pub fn insert_series(&mut self, symbol: impl Into<String>, mut points: Vec<PricePoint>) {
        points.sort_by_key(|p| p.timestamp);
        self.series.insert(symbol.into(), points);
    }
}

impl HistoricalPrices for InMemoryHistory {
    fn prices(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, FeedError> {
        let series = self
            .series
            .get(symbol)
            .ok_or_else(|| FeedError::SeriesUnavailable(symbol.to_string()))?;

        Ok(series
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn window_is_half_open_and_sorted() {
        let t = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let mut history = InMemoryHistory::new();
        history.insert_series(
            "NIFTY",
            vec![
                PricePoint { timestamp: t(3), price: dec!(103) },
                PricePoint { timestamp: t(1), price: dec!(101) },
                PricePoint { timestamp: t(2), price: dec!(102) },
            ],
        );

        let window = history.prices("NIFTY", t(1), t(3)).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].price, dec!(101));
        assert_eq!(window[1].price, dec!(102));

        assert!(history.prices("BANKNIFTY", t(1), t(3)).is_err());
    }
}
