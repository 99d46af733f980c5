use crate::error::LedgerError;
use crate::query::OrderFilter;
use chrono::Utc;
use core_types::{Fill, Order, OrderSide, OrderStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// Append-only record of submitted orders and their status transitions.
///
/// Orders are keyed by id; submission order is kept separately so queries can
/// return results sorted by submission time without re-sorting.
#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    orders: HashMap<Uuid, Order>,
    submission_order: Vec<Uuid>,
    fills: HashMap<Uuid, Vec<Fill>>,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new order. Orders enter the ledger Open or Pending only.
    pub fn submit(&mut self, order: Order) -> Result<(), LedgerError> {
        if self.orders.contains_key(&order.id) {
            return Err(LedgerError::DuplicateOrderId(order.id));
        }
        if order.status.is_terminal() {
            return Err(LedgerError::InvalidOrder(format!(
                "order {} submitted in terminal status {}",
                order.id, order.status
            )));
        }
        if order.quantity == 0 {
            return Err(LedgerError::InvalidOrder(format!(
                "order {} has zero quantity",
                order.id
            )));
        }

        self.submission_order.push(order.id);
        self.orders.insert(order.id, order);
        Ok(())
    }

    /// Applies a status change, attaching a fill when moving toward Complete.
    ///
    /// Partial fills ride a self-transition to `Pending`; the final fill
    /// accompanies the move to `Complete`, at which point the cumulative
    /// filled quantity must equal the order quantity. All validation happens
    /// before any mutation.
    pub fn transition(
        &mut self,
        order_id: Uuid,
        new_status: OrderStatus,
        fill: Option<Fill>,
    ) -> Result<(), LedgerError> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(LedgerError::UnknownOrder(order_id))?;

        if !order.status.can_transition_to(new_status) {
            return Err(LedgerError::InvalidTransition {
                id: order_id,
                from: order.status,
                to: new_status,
            });
        }

        let mut filled_after = order.filled_quantity;
        if let Some(fill) = &fill {
            if new_status != OrderStatus::Pending && new_status != OrderStatus::Complete {
                return Err(LedgerError::InvalidFill(format!(
                    "fill attached to a transition to {new_status}"
                )));
            }
            if fill.order_id != order_id || fill.symbol != order.symbol {
                return Err(LedgerError::InvalidFill(format!(
                    "fill does not reference order {order_id}"
                )));
            }
            if fill.quantity == 0 {
                return Err(LedgerError::InvalidFill(
                    "fill quantity must be non-zero".to_string(),
                ));
            }
            let expected_side = order.side;
            if fill.side() != expected_side {
                return Err(LedgerError::InvalidFill(format!(
                    "fill direction {} contradicts order side {}",
                    fill.side(),
                    expected_side
                )));
            }
            filled_after += fill.abs_quantity();
            if filled_after > order.quantity {
                return Err(LedgerError::InvalidFill(format!(
                    "cumulative fills {filled_after} exceed order quantity {}",
                    order.quantity
                )));
            }
        }

        if new_status == OrderStatus::Complete && filled_after != order.quantity {
            return Err(LedgerError::InvalidFill(format!(
                "order completed with {filled_after} of {} filled",
                order.quantity
            )));
        }

        // Validation done; mutate.
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(LedgerError::UnknownOrder(order_id))?;
        order.status = new_status;
        order.filled_quantity = filled_after;
        order.updated_at = fill.as_ref().map_or_else(Utc::now, |f| f.timestamp);
        if let Some(fill) = fill {
            self.fills.entry(order_id).or_default().push(fill);
        }
        Ok(())
    }

    pub fn get(&self, order_id: Uuid) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// The fills attached to an order so far, in arrival order.
    pub fn fills(&self, order_id: Uuid) -> &[Fill] {
        self.fills.get(&order_id).map_or(&[], Vec::as_slice)
    }

    /// All orders satisfying the filter, sorted by submission time.
    /// Pure: never mutates the ledger.
    pub fn query(&self, filter: &OrderFilter) -> Vec<Order> {
        self.submission_order
            .iter()
            .filter_map(|id| self.orders.get(id))
            .filter(|order| filter.matches(order))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Convenience used by fill recording: which side the order trades.
    pub fn side_of(&self, order_id: Uuid) -> Option<OrderSide> {
        self.orders.get(&order_id).map(|o| o.side)
    }
}
