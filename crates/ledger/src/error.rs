use core_types::OrderStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Invalid fill: {0}")]
    InvalidFill(String),

    #[error("Duplicate order id: {0}")]
    DuplicateOrderId(Uuid),

    #[error("Unknown order id: {0}")]
    UnknownOrder(Uuid),

    #[error("Invalid transition for order {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}
