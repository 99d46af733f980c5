//! # Meridian Analytics
//!
//! The metrics engine of the analytics core: the "unbiased judge" that turns
//! ledger snapshots and equity curves into performance figures.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** a pure logic crate with no knowledge of ledgers or
//!   feeds. It depends only on `core-types`.
//! - **Stateless Calculation:** `MetricsEngine` holds no state; every function
//!   is a pure mapping from inputs to outputs, which keeps it trivially
//!   testable and safe to call from any thread.
//! - **N/A is not zero:** metrics that are mathematically undefined (no closed
//!   trades, zero variance) come back as `None`, never as `0` and never as an
//!   error.

pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::MetricsEngine;
pub use error::AnalyticsError;
pub use report::PerformanceReport;
