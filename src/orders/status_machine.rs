use crate::orders::{OrderError, OrderStatus};

/// Service for managing order status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a forward (admin) transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Cancelled
    /// - Confirmed → Shipped, Cancelled
    /// - Shipped → Delivered
    /// - Delivered, Cancelled → (terminal)
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        // Same status is always valid (idempotent)
        if from == to {
            return true;
        }

        matches!(
            (from, to),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::Shipped)
                | (OrderStatus::Confirmed, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    /// Attempt to advance from one status to another
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(OrderError::InvalidTransition { from, to })
        }
    }

    /// Cancellation requested by the order's owner
    ///
    /// Allowed from any non-terminal status, shipped included.
    pub fn cancel(from: OrderStatus) -> Result<OrderStatus, OrderError> {
        match from {
            OrderStatus::Cancelled => Err(OrderError::AlreadyCancelled),
            OrderStatus::Delivered => Err(OrderError::NotCancellable(from)),
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Shipped => {
                Ok(OrderStatus::Cancelled)
            }
        }
    }
}
