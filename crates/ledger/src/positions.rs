use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use core_types::{ClosedTrade, Fill, InstrumentCatalog, Position};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Maintains the current position per (strategy, instrument).
///
/// This is a log-replay structure: it consumes fills one at a time and keeps
/// net quantity, average entry price, and accumulated realized P&L per key.
/// A position record is retained after it goes flat so its realized P&L
/// history survives full closure.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    catalog: Arc<InstrumentCatalog>,
    positions: BTreeMap<(Uuid, String), Position>,
    last_fill_at: Option<DateTime<Utc>>,
    out_of_order_fills: u64,
}

impl PositionLedger {
    pub fn new(catalog: Arc<InstrumentCatalog>) -> Self {
        Self {
            catalog,
            positions: BTreeMap::new(),
            last_fill_at: None,
            out_of_order_fills: 0,
        }
    }

    /// Applies one fill to exactly one position.
    ///
    /// Same-direction fills blend into the weighted-average entry price.
    /// Reducing fills realize P&L on the closed portion at the old average
    /// and return it as a `ClosedTrade`; a fill large enough to flip the
    /// position sign is split explicitly, with the excess opening the
    /// opposite position at the fill price. The average is never blended
    /// across a sign flip.
    pub fn apply_fill(
        &mut self,
        strategy_id: Uuid,
        fill: &Fill,
    ) -> Result<Option<ClosedTrade>, LedgerError> {
        if !self.catalog.contains(&fill.symbol) {
            return Err(LedgerError::UnknownInstrument(fill.symbol.clone()));
        }
        if fill.quantity == 0 {
            return Err(LedgerError::InvalidFill(
                "fill quantity must be non-zero".to_string(),
            ));
        }

        // Out-of-order timestamps are flagged, not rejected. The high-water
        // mark only advances, so a late fill keeps later arrivals honest.
        match self.last_fill_at {
            Some(last) if fill.timestamp < last => {
                self.out_of_order_fills += 1;
                tracing::warn!(
                    symbol = %fill.symbol,
                    fill_ts = %fill.timestamp,
                    ledger_ts = %last,
                    "fill applied out of timestamp order"
                );
            }
            _ => self.last_fill_at = Some(fill.timestamp),
        }

        let position = self
            .positions
            .entry((strategy_id, fill.symbol.clone()))
            .or_insert_with(|| Position {
                strategy_id,
                symbol: fill.symbol.clone(),
                net_quantity: 0,
                avg_entry_price: None,
                realized_pnl: Decimal::ZERO,
                last_updated: fill.timestamp,
            });

        let q0 = position.net_quantity;
        let fq = fill.quantity;
        let mut closed = None;

        if q0 == 0 || q0.signum() == fq.signum() {
            // Opening or increasing: weighted-average blend, no realized P&L.
            let avg0 = position.avg_entry_price.unwrap_or(Decimal::ZERO);
            let blended = (Decimal::from(q0) * avg0 + Decimal::from(fq) * fill.price)
                / Decimal::from(q0 + fq);
            position.net_quantity = q0 + fq;
            position.avg_entry_price = Some(blended);
        } else {
            // Reducing or flipping: realize P&L on the closed portion at the
            // old average, then handle the remainder.
            // Invariant: avg_entry_price is Some while net_quantity != 0.
            let avg0 = position.avg_entry_price.unwrap_or(fill.price);
            let closed_magnitude = fq.abs().min(q0.abs());
            let realized = Decimal::from(closed_magnitude)
                * Decimal::from(q0.signum())
                * (fill.price - avg0);
            position.realized_pnl += realized;

            closed = Some(ClosedTrade {
                strategy_id,
                symbol: fill.symbol.clone(),
                quantity: closed_magnitude * fq.signum(),
                entry_price: avg0,
                exit_price: fill.price,
                realized_pnl: realized,
                closed_at: fill.timestamp,
            });

            let q1 = q0 + fq;
            position.net_quantity = q1;
            if q1 == 0 {
                position.avg_entry_price = None;
            } else if q1.signum() != q0.signum() {
                // The excess opened a fresh position in the opposite
                // direction at the fill price.
                position.avg_entry_price = Some(fill.price);
            }
        }

        position.last_updated = fill.timestamp;
        Ok(closed)
    }

    /// Read-only snapshot of a single position, or `None` if never traded.
    pub fn get_position(&self, strategy_id: Uuid, symbol: &str) -> Option<Position> {
        self.positions
            .get(&(strategy_id, symbol.to_string()))
            .cloned()
    }

    /// All positions, optionally restricted to the given strategies, in
    /// stable (strategy, symbol) key order.
    pub fn list_positions(&self, strategies: Option<&[Uuid]>) -> Vec<Position> {
        self.positions
            .values()
            .filter(|p| strategies.is_none_or(|set| set.contains(&p.strategy_id)))
            .cloned()
            .collect()
    }

    /// How many fills arrived with a timestamp earlier than the ledger's
    /// high-water mark.
    pub fn out_of_order_fills(&self) -> u64 {
        self.out_of_order_fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::Instrument;
    use rust_decimal_macros::dec;

    fn catalog() -> Arc<InstrumentCatalog> {
        Arc::new(InstrumentCatalog::new([
            Instrument {
                symbol: "NIFTY".to_string(),
                tick_size: dec!(0.05),
                currency: "INR".to_string(),
            },
            Instrument {
                symbol: "BANKNIFTY".to_string(),
                tick_size: dec!(0.05),
                currency: "INR".to_string(),
            },
        ]))
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn fill(qty: i64, price: Decimal, day: u32) -> Fill {
        Fill::new(Uuid::new_v4(), "NIFTY", qty, price, ts(day))
    }

    #[test]
    fn same_direction_fills_blend_average() {
        let mut ledger = PositionLedger::new(catalog());
        let sid = Uuid::new_v4();

        ledger.apply_fill(sid, &fill(10, dec!(100), 1)).unwrap();
        ledger.apply_fill(sid, &fill(10, dec!(110), 2)).unwrap();

        let pos = ledger.get_position(sid, "NIFTY").unwrap();
        assert_eq!(pos.net_quantity, 20);
        assert_eq!(pos.avg_entry_price, Some(dec!(105)));
        assert_eq!(pos.realized_pnl, dec!(0));
    }

    #[test]
    fn reducing_fill_realizes_pnl_at_old_average() {
        let mut ledger = PositionLedger::new(catalog());
        let sid = Uuid::new_v4();

        ledger.apply_fill(sid, &fill(10, dec!(100), 1)).unwrap();
        let trade = ledger
            .apply_fill(sid, &fill(-4, dec!(108), 2))
            .unwrap()
            .unwrap();

        assert_eq!(trade.quantity, -4);
        assert_eq!(trade.entry_price, dec!(100));
        assert_eq!(trade.realized_pnl, dec!(32));

        let pos = ledger.get_position(sid, "NIFTY").unwrap();
        assert_eq!(pos.net_quantity, 6);
        // The average of the remaining quantity is untouched by a reduction.
        assert_eq!(pos.avg_entry_price, Some(dec!(100)));
        assert_eq!(pos.realized_pnl, dec!(32));
    }

    #[test]
    fn sign_flip_splits_into_close_and_open() {
        let mut ledger = PositionLedger::new(catalog());
        let sid = Uuid::new_v4();

        ledger.apply_fill(sid, &fill(5, dec!(100), 1)).unwrap();
        let trade = ledger
            .apply_fill(sid, &fill(-8, dec!(110), 2))
            .unwrap()
            .unwrap();

        // Only the 5 held units realize P&L.
        assert_eq!(trade.quantity, -5);
        assert_eq!(trade.realized_pnl, dec!(50));

        // The excess 3 open a short at the fill price, no averaging across the flip.
        let pos = ledger.get_position(sid, "NIFTY").unwrap();
        assert_eq!(pos.net_quantity, -3);
        assert_eq!(pos.avg_entry_price, Some(dec!(110)));
    }

    #[test]
    fn full_closure_zeroes_quantity_and_clears_average() {
        let mut ledger = PositionLedger::new(catalog());
        let sid = Uuid::new_v4();

        ledger.apply_fill(sid, &fill(10, dec!(100), 1)).unwrap();
        ledger.apply_fill(sid, &fill(-10, dec!(95), 2)).unwrap();

        let pos = ledger.get_position(sid, "NIFTY").unwrap();
        assert!(pos.is_flat());
        assert_eq!(pos.avg_entry_price, None);
        assert_eq!(pos.realized_pnl, dec!(-50));
    }

    #[test]
    fn realized_pnl_is_independent_of_same_direction_ordering() {
        let sid = Uuid::new_v4();
        let entries = [fill(4, dec!(100), 1), fill(6, dec!(110), 2)];

        let mut forward = PositionLedger::new(catalog());
        for f in &entries {
            forward.apply_fill(sid, f).unwrap();
        }
        forward.apply_fill(sid, &fill(-10, dec!(120), 3)).unwrap();

        let mut reversed = PositionLedger::new(catalog());
        for f in entries.iter().rev() {
            reversed.apply_fill(sid, f).unwrap();
        }
        reversed.apply_fill(sid, &fill(-10, dec!(120), 3)).unwrap();

        let a = forward.get_position(sid, "NIFTY").unwrap().realized_pnl;
        let b = reversed.get_position(sid, "NIFTY").unwrap().realized_pnl;
        assert_eq!(a, b);
        assert_eq!(a, dec!(140));
    }

    #[test]
    fn unknown_instrument_and_zero_quantity_are_rejected() {
        let mut ledger = PositionLedger::new(catalog());
        let sid = Uuid::new_v4();

        let unknown = Fill::new(Uuid::new_v4(), "GOLD", 1, dec!(100), ts(1));
        assert!(matches!(
            ledger.apply_fill(sid, &unknown),
            Err(LedgerError::UnknownInstrument(_))
        ));

        assert!(matches!(
            ledger.apply_fill(sid, &fill(0, dec!(100), 1)),
            Err(LedgerError::InvalidFill(_))
        ));

        // Failed commands leave no trace.
        assert!(ledger.get_position(sid, "NIFTY").is_none());
    }

    #[test]
    fn out_of_order_fills_are_flagged_not_rejected() {
        let mut ledger = PositionLedger::new(catalog());
        let sid = Uuid::new_v4();

        ledger.apply_fill(sid, &fill(1, dec!(100), 5)).unwrap();
        ledger.apply_fill(sid, &fill(1, dec!(101), 2)).unwrap();

        assert_eq!(ledger.out_of_order_fills(), 1);
        assert_eq!(ledger.get_position(sid, "NIFTY").unwrap().net_quantity, 2);

        // The high-water mark stays at day 5, so day 3 is still late.
        ledger.apply_fill(sid, &fill(1, dec!(102), 3)).unwrap();
        assert_eq!(ledger.out_of_order_fills(), 2);
    }

    #[test]
    fn list_positions_is_key_ordered_and_filterable() {
        let mut ledger = PositionLedger::new(catalog());
        let sid_a = Uuid::new_v4();
        let sid_b = Uuid::new_v4();

        ledger
            .apply_fill(sid_a, &Fill::new(Uuid::new_v4(), "NIFTY", 1, dec!(100), ts(1)))
            .unwrap();
        ledger
            .apply_fill(sid_a, &Fill::new(Uuid::new_v4(), "BANKNIFTY", 1, dec!(200), ts(1)))
            .unwrap();
        ledger
            .apply_fill(sid_b, &Fill::new(Uuid::new_v4(), "NIFTY", 1, dec!(100), ts(1)))
            .unwrap();

        let all = ledger.list_positions(None);
        assert_eq!(all.len(), 3);
        // Within one strategy, symbols come back sorted.
        let of_a = ledger.list_positions(Some(&[sid_a]));
        assert_eq!(of_a.len(), 2);
        assert_eq!(of_a[0].symbol, "BANKNIFTY");
        assert_eq!(of_a[1].symbol, "NIFTY");
    }
}
