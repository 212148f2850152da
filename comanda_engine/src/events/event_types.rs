use serde::Serialize;

use crate::db_types::{Order, OrderStatusType, Payment, Role};

/// A paid order was created and persisted. Subscribers notify the restaurant owner and the real-time channel.
#[derive(Debug, Clone, Serialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order moved through the fulfillment workflow. Subscribers notify the customer.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusChangedEvent {
    pub previous: OrderStatusType,
    pub order: Order,
}

impl OrderStatusChangedEvent {
    pub fn new(previous: OrderStatusType, order: Order) -> Self {
        Self { previous, order }
    }
}

/// An order was cancelled. `cancelled_by` drives who gets told: the customer always, the restaurant owner unless
/// the customer cancelled it themselves.
#[derive(Debug, Clone, Serialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
    pub cancelled_by: Role,
}

impl OrderCancelledEvent {
    pub fn new(order: Order, cancelled_by: Role) -> Self {
        Self { order, cancelled_by }
    }
}

/// A payment transitioned to DECLINED via webhook reconciliation. The order itself is left alone; the customer
/// is notified.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentDeclinedEvent {
    pub payment: Payment,
}

impl PaymentDeclinedEvent {
    pub fn new(payment: Payment) -> Self {
        Self { payment }
    }
}
