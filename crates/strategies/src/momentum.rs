use crate::error::StrategyError;
use crate::{DecisionRule, FillIntent, MarketState};
use configuration::MomentumParams;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::collections::HashMap;
use ta::Next;
use ta::indicators::SimpleMovingAverage as Sma;

/// Per-instrument indicator state.
struct Indicators {
    ma_short: Sma,
    ma_long: Sma,
    prev_short: Option<Decimal>,
    prev_long: Option<Decimal>,
}

/// The moving-average crossover momentum rule.
///
/// Goes long `position_size` when the short MA crosses above the long MA,
/// short when it crosses below. The emitted intent is the delta between the
/// target position and the current one, so a long signal on an existing
/// short both closes and reverses in a single fill.
pub struct Momentum {
    params: MomentumParams,
    instruments: Vec<String>,
    indicators: HashMap<String, Indicators>,
}

impl Momentum {
    pub fn new(params: MomentumParams, instruments: Vec<String>) -> Result<Self, StrategyError> {
        if params.ma_short_period == 0 {
            return Err(StrategyError::InvalidParameters(
                "ma_short_period must be positive".to_string(),
            ));
        }
        if params.ma_short_period >= params.ma_long_period {
            return Err(StrategyError::InvalidParameters(
                "short MA period must be less than long MA period".to_string(),
            ));
        }
        if params.position_size <= 0 {
            return Err(StrategyError::InvalidParameters(
                "position_size must be positive".to_string(),
            ));
        }

        let indicators = instruments
            .iter()
            .map(|symbol| {
                (
                    symbol.clone(),
                    Indicators {
                        // Periods were validated non-zero above.
                        ma_short: Sma::new(params.ma_short_period).unwrap(),
                        ma_long: Sma::new(params.ma_long_period).unwrap(),
                        prev_short: None,
                        prev_long: None,
                    },
                )
            })
            .collect();

        Ok(Self {
            params,
            instruments,
            indicators,
        })
    }
}

impl DecisionRule for Momentum {
    fn evaluate(&mut self, market: &MarketState<'_>) -> Result<Vec<FillIntent>, StrategyError> {
        let mut intents = Vec::new();

        for symbol in &self.instruments {
            let Some(price) = market.prices.get(symbol) else {
                continue;
            };
            let Some(state) = self.indicators.get_mut(symbol) else {
                continue;
            };

            // The `ta` crate works on f64; a controlled precision trade-off
            // for using the library.
            let close = price.to_f64().unwrap_or_default();
            let short = Decimal::from_f64(state.ma_short.next(close)).unwrap_or_default();
            let long = Decimal::from_f64(state.ma_long.next(close)).unwrap_or_default();

            if let (Some(prev_short), Some(prev_long)) = (state.prev_short, state.prev_long) {
                let bullish_cross = prev_short <= prev_long && short > long;
                let bearish_cross = prev_short >= prev_long && short < long;

                let target = if bullish_cross {
                    Some(self.params.position_size)
                } else if bearish_cross {
                    Some(-self.params.position_size)
                } else {
                    None
                };

                if let Some(target) = target {
                    let current = market.net_positions.get(symbol).copied().unwrap_or(0);
                    let delta = target - current;
                    if delta != 0 {
                        tracing::debug!(
                            %symbol,
                            target,
                            current,
                            "momentum crossover signal"
                        );
                        intents.push(FillIntent {
                            symbol: symbol.clone(),
                            quantity: delta,
                            price: *price,
                        });
                    }
                }
            }

            state.prev_short = Some(short);
            state.prev_long = Some(long);
        }

        Ok(intents)
    }
}
