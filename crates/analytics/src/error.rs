use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("An unexpected error occurred during analytics calculation: {0}")]
    InternalError(String),
}
