//! # Meridian Ledgers
//!
//! The two bookkeeping structures of the analytics core, plus the query layer
//! over orders.
//!
//! ## Architectural Principles
//!
//! - **Single writer:** exactly one command path mutates a given ledger;
//!   readers always receive cloned snapshots.
//! - **No partial application:** every mutation validates completely before
//!   touching state, so a failed command leaves the ledger unchanged.
//! - **Log replay, not time validation:** fills applied out of timestamp
//!   order are accepted and counted, never rejected.

pub mod error;
pub mod orders;
pub mod positions;
pub mod query;

// Re-export the key components to create a clean, public-facing API.
pub use error::LedgerError;
pub use orders::OrderLedger;
pub use positions::PositionLedger;
pub use query::OrderFilter;
