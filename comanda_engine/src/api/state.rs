//! The order state machine, as pure functions over statuses.
//!
//! Nothing here touches storage or knows who the caller is; the orchestrator sequences these checks with the
//! authorization predicates in [`crate::api::authz`] and only then writes anything.
//!
//! The happy path is linear:
//!
//! | From       | To         |
//! |------------|------------|
//! | PENDIENTE  | ACEPTADO   |
//! | ACEPTADO   | PREPARANDO |
//! | PREPARANDO | LISTO      |
//! | LISTO      | ENTREGADO  |
//!
//! `CANCELADO` is reachable from any non-terminal state, but only through the dedicated cancellation operation;
//! the generic update refuses it outright so its laxer authorization rules cannot be reached by status name.

use crate::{
    api::errors::{ErrorCode, OrderFlowError},
    db_types::{Milestone, OrderStatusType},
};

const TRANSITIONS: [(OrderStatusType, OrderStatusType); 4] = [
    (OrderStatusType::Pendiente, OrderStatusType::Aceptado),
    (OrderStatusType::Aceptado, OrderStatusType::Preparando),
    (OrderStatusType::Preparando, OrderStatusType::Listo),
    (OrderStatusType::Listo, OrderStatusType::Entregado),
];

pub fn is_adjacent(current: OrderStatusType, requested: OrderStatusType) -> bool {
    TRANSITIONS.contains(&(current, requested))
}

/// Pre-authorization guards for the generic status update: cancellation must use its own endpoint, and terminal
/// orders cannot move at all. These run before the actor is even looked at.
pub fn guard_status_update(
    current: OrderStatusType,
    requested: OrderStatusType,
) -> Result<(), OrderFlowError> {
    if requested == OrderStatusType::Cancelado {
        return Err(OrderFlowError::rule(
            ErrorCode::OrderStatusUseCancelEndpoint,
            "Cancellation has its own authorization rules; use the cancel operation",
        ));
    }
    match current {
        OrderStatusType::Cancelado => Err(OrderFlowError::rule(
            ErrorCode::OrderStatusAlreadyCancelled,
            "The order has been cancelled and cannot change status",
        )),
        OrderStatusType::Entregado => Err(OrderFlowError::rule(
            ErrorCode::OrderStatusAlreadyDelivered,
            "The order has been delivered and cannot change status",
        )),
        _ => Ok(()),
    }
}

/// Validates the requested transition against the adjacency table.
pub fn validate_transition(
    current: OrderStatusType,
    requested: OrderStatusType,
) -> Result<(), OrderFlowError> {
    if is_adjacent(current, requested) {
        Ok(())
    } else {
        Err(OrderFlowError::rule(
            ErrorCode::OrderStatusTransitionInvalid,
            format!("An order cannot go from {current} to {requested}"),
        ))
    }
}

/// Accepting an order commits the restaurant to a preparation time.
pub fn require_estimate(
    requested: OrderStatusType,
    estimate_minutes: Option<i64>,
) -> Result<(), OrderFlowError> {
    if requested == OrderStatusType::Aceptado && estimate_minutes.is_none() {
        return Err(OrderFlowError::rule(
            ErrorCode::OrderEstimateRequired,
            "Accepting an order requires an estimated preparation time in minutes",
        ));
    }
    Ok(())
}

/// The milestone timestamp a successful transition stamps. `PREPARANDO` stamps nothing.
pub fn milestone_for(status: OrderStatusType) -> Option<Milestone> {
    match status {
        OrderStatusType::Aceptado => Some(Milestone::AcceptedAt),
        OrderStatusType::Listo => Some(Milestone::ReadyAt),
        OrderStatusType::Entregado => Some(Milestone::DeliveredAt),
        _ => None,
    }
}

/// Terminal-state guards for the cancellation operation. Re-cancelling reports a clear terminal error rather
/// than succeeding silently, so clients can detect duplicate requests.
pub fn guard_cancel(current: OrderStatusType) -> Result<(), OrderFlowError> {
    match current {
        OrderStatusType::Cancelado => Err(OrderFlowError::rule(
            ErrorCode::OrderAlreadyCancelled,
            "The order has already been cancelled",
        )),
        OrderStatusType::Entregado => Err(OrderFlowError::rule(
            ErrorCode::OrderCancelDelivered,
            "A delivered order cannot be cancelled",
        )),
        _ => Ok(()),
    }
}
