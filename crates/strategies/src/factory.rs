use crate::error::StrategyError;
use crate::market_making::MarketMaker;
use crate::momentum::Momentum;
use crate::DecisionRule;
use configuration::Config;
use core_types::StrategyKind;

/// Creates a new decision rule based on the provided kind and configuration.
///
/// The compiler errors if a new `StrategyKind` is added but not handled here.
pub fn create_rule(
    kind: StrategyKind,
    config: &Config,
    instruments: &[String],
) -> Result<Box<dyn DecisionRule>, StrategyError> {
    match kind {
        StrategyKind::MarketMaking => {
            let params = config.strategies.market_making.clone();
            Ok(Box::new(MarketMaker::new(params, instruments.to_vec())?))
        }
        StrategyKind::Momentum => {
            let params = config.strategies.momentum.clone();
            Ok(Box::new(Momentum::new(params, instruments.to_vec())?))
        }
    }
}
