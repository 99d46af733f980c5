use crate::enums::StrategyStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid strategy status transition from {from} to {to}")]
    InvalidTransition {
        from: StrategyStatus,
        to: StrategyStatus,
    },
}
