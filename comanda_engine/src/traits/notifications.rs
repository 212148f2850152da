use crate::db_types::{Order, Payment, Role};

/// Push-notification delivery, at the boundary this engine needs. Every method is best-effort: implementations
/// log failures and never surface them, and the engine only ever invokes them from detached event handlers.
#[allow(async_fn_in_trait)]
pub trait NotificationDispatcher {
    /// Tells the restaurant owner a new paid order arrived.
    async fn notify_new_order(&self, order: &Order);

    /// Tells the customer their order moved through the fulfillment workflow.
    async fn notify_status_change(&self, order: &Order, previous: crate::db_types::OrderStatusType);

    /// Tells the customer (always) and the restaurant owner (unless the customer cancelled it themselves) that
    /// the order was cancelled.
    async fn notify_cancelled(&self, order: &Order, cancelled_by: Role);

    /// Tells the customer a payment was declined after the fact (webhook reconciliation).
    async fn notify_payment_declined(&self, payment: &Payment);
}
