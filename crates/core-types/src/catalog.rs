use crate::structs::Instrument;
use std::collections::BTreeMap;

/// The static instrument reference table: symbol, tick size, currency.
///
/// Built once at startup and shared read-only; a sorted map keeps iteration
/// order stable for reproducible listings.
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    by_symbol: BTreeMap<String, Instrument>,
}

impl InstrumentCatalog {
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            by_symbol: instruments
                .into_iter()
                .map(|i| (i.symbol.clone(), i))
                .collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.by_symbol.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.by_symbol.values()
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lookup_by_symbol() {
        let catalog = InstrumentCatalog::new([Instrument {
            symbol: "NIFTY".to_string(),
            tick_size: dec!(0.05),
            currency: "INR".to_string(),
        }]);
        assert!(catalog.contains("NIFTY"));
        assert!(!catalog.contains("BANKNIFTY"));
        assert_eq!(catalog.get("NIFTY").unwrap().currency, "INR");
    }
}
