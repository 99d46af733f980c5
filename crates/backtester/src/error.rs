use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid backtest parameters: {0}")]
    InvalidParameters(String),

    #[error("Strategy execution error: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("Ledger error during replay: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Price feed error: {0}")]
    Feed(#[from] market_data::FeedError),

    #[error("Historical data for {0} is empty over the requested range")]
    DataUnavailable(String),
}
