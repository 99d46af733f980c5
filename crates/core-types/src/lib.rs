//! # Meridian Core Types
//!
//! The foundational data structures shared by every other crate in the
//! workspace: instruments, orders, fills, positions, strategies, and the
//! equity-curve point. This is a pure Layer 0 crate with no knowledge of
//! ledgers, analytics, or execution.

pub mod catalog;
pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use catalog::InstrumentCatalog;
pub use enums::{BacktestStatus, OrderSide, OrderStatus, OrderType, StrategyKind, StrategyStatus};
pub use error::CoreError;
pub use structs::{ClosedTrade, EquityPoint, Fill, Instrument, Order, Position, Strategy};
