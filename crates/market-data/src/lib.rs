//! # Meridian Market Data
//!
//! The price-feed seam between the analytics core and the outside world. The
//! core never polls a live connection: current prices come from an
//! already-fetched snapshot and historical series from a `HistoricalPrices`
//! provider, so every computation stays free of external I/O.

pub mod error;
pub mod feed;
pub mod history;
pub mod synthetic;

// Re-export the key components to create a clean, public-facing API.
pub use error::FeedError;
pub use feed::{PriceFeed, SnapshotFeed};
pub use history::{HistoricalPrices, InMemoryHistory, PricePoint};
pub use synthetic::random_walk;
