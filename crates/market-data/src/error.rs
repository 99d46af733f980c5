use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("No current price available for symbol {0}")]
    PriceUnavailable(String),

    #[error("No historical series available for symbol {0}")]
    SeriesUnavailable(String),
}
