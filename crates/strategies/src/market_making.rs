use crate::error::StrategyError;
use crate::{DecisionRule, FillIntent, MarketState};
use configuration::MarketMakingParams;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The fixed-spread market-making rule.
///
/// Each step it quotes both sides of the mid price: a buy at
/// mid x (1 - spread/2) and a sell at mid x (1 + spread/2), each for
/// `order_quantity`, skipping whichever side would push the net position past
/// `position_limit`. In replay the quotes are treated as filled, so the rule
/// earns the spread while inventory stays inside the limit.
pub struct MarketMaker {
    params: MarketMakingParams,
    instruments: Vec<String>,
}

impl MarketMaker {
    pub fn new(
        params: MarketMakingParams,
        instruments: Vec<String>,
    ) -> Result<Self, StrategyError> {
        if params.spread_pct <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters(
                "spread_pct must be positive".to_string(),
            ));
        }
        if params.order_quantity == 0 {
            return Err(StrategyError::InvalidParameters(
                "order_quantity must be positive".to_string(),
            ));
        }
        if params.position_limit <= 0 {
            return Err(StrategyError::InvalidParameters(
                "position_limit must be positive".to_string(),
            ));
        }
        Ok(Self { params, instruments })
    }
}

impl DecisionRule for MarketMaker {
    fn evaluate(&mut self, market: &MarketState<'_>) -> Result<Vec<FillIntent>, StrategyError> {
        let half_spread = self.params.spread_pct / dec!(2);
        let quantity = self.params.order_quantity as i64;
        let mut intents = Vec::new();

        for symbol in &self.instruments {
            let Some(mid) = market.prices.get(symbol) else {
                continue;
            };
            let position = market.net_positions.get(symbol).copied().unwrap_or(0);

            if position + quantity <= self.params.position_limit {
                intents.push(FillIntent {
                    symbol: symbol.clone(),
                    quantity,
                    price: *mid * (Decimal::ONE - half_spread),
                });
            }
            if position - quantity >= -self.params.position_limit {
                intents.push(FillIntent {
                    symbol: symbol.clone(),
                    quantity: -quantity,
                    price: *mid * (Decimal::ONE + half_spread),
                });
            }
        }

        tracing::debug!(step = %market.timestamp, intents = intents.len(), "market maker evaluated");
        Ok(intents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn params() -> MarketMakingParams {
        MarketMakingParams {
            spread_pct: dec!(0.01),
            order_quantity: 10,
            position_limit: 25,
        }
    }

    #[test]
    fn quotes_both_sides_around_mid() {
        let mut rule = MarketMaker::new(params(), vec!["NIFTY".to_string()]).unwrap();
        let prices = HashMap::from([("NIFTY".to_string(), dec!(200))]);
        let positions = HashMap::new();

        let intents = rule
            .evaluate(&MarketState {
                timestamp: Utc::now(),
                prices: &prices,
                net_positions: &positions,
            })
            .unwrap();

        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].quantity, 10);
        assert_eq!(intents[0].price, dec!(199));
        assert_eq!(intents[1].quantity, -10);
        assert_eq!(intents[1].price, dec!(201));
    }

    #[test]
    fn respects_position_limit() {
        let mut rule = MarketMaker::new(params(), vec!["NIFTY".to_string()]).unwrap();
        let prices = HashMap::from([("NIFTY".to_string(), dec!(200))]);
        // Already long 20; another 10 would breach the 25 limit.
        let positions = HashMap::from([("NIFTY".to_string(), 20_i64)]);

        let intents = rule
            .evaluate(&MarketState {
                timestamp: Utc::now(),
                prices: &prices,
                net_positions: &positions,
            })
            .unwrap();

        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].quantity, -10);
    }

    #[test]
    fn zero_spread_is_invalid() {
        let mut p = params();
        p.spread_pct = dec!(0);
        assert!(MarketMaker::new(p, vec!["NIFTY".to_string()]).is_err());
    }
}
