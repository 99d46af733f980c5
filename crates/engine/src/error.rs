use core_types::StrategyStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Core type error: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Backtest error: {0}")]
    Backtest(#[from] backtester::BacktestError),

    #[error("Price feed error: {0}")]
    Feed(#[from] market_data::FeedError),

    #[error("No strategy registered with id {0}")]
    UnknownStrategy(Uuid),

    #[error("Strategy {id} is {status}; only Active strategies accept orders")]
    StrategyNotActive { id: Uuid, status: StrategyStatus },

    #[error("No backtest run with id {0}")]
    UnknownRun(Uuid),

    #[error("Backtest run {id} is {status} and cannot be cancelled")]
    NotCancellable {
        id: Uuid,
        status: core_types::BacktestStatus,
    },
}
