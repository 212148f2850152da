//! Wiring between engine events and the notification dispatcher.
//!
//! Push delivery is an external collaborator; this server ships with a log-backed dispatcher so every
//! best-effort notification is at least visible in the logs with enough context to follow up. Each hook runs on
//! a detached task via the engine's event channel, so nothing here can fail a request.

use std::sync::Arc;

use comanda_engine::{
    db_types::{Order, OrderStatusType, Payment, Role},
    events::EventHooks,
    traits::NotificationDispatcher,
};
use log::*;

pub struct LogNotifier;

impl NotificationDispatcher for LogNotifier {
    async fn notify_new_order(&self, order: &Order) {
        info!(
            "🔔️ [restaurant {}] New order {} for {} from customer {}",
            order.restaurant_id, order.order_number, order.total, order.customer_id
        );
    }

    async fn notify_status_change(&self, order: &Order, previous: OrderStatusType) {
        info!(
            "🔔️ [customer {}] Order {} moved {previous} -> {}",
            order.customer_id, order.order_number, order.status
        );
    }

    async fn notify_cancelled(&self, order: &Order, cancelled_by: Role) {
        info!("🔔️ [customer {}] Order {} was cancelled", order.customer_id, order.order_number);
        // The owner hears about it too, except when the cancellation came from the customer side
        if cancelled_by != Role::Student {
            info!(
                "🔔️ [restaurant {}] Order {} was cancelled by {cancelled_by}",
                order.restaurant_id, order.order_number
            );
        }
    }

    async fn notify_payment_declined(&self, payment: &Payment) {
        info!(
            "🔔️ [customer {}] Payment {} (tx {}) was declined by the gateway",
            payment.customer_id, payment.reference, payment.transaction_id
        );
    }
}

/// Builds the engine event hooks that forward to the dispatcher.
pub fn notification_hooks(notifier: Arc<LogNotifier>) -> EventHooks {
    let mut hooks = EventHooks::default();
    let n = notifier.clone();
    hooks.on_order_created(move |ev| {
        let n = n.clone();
        Box::pin(async move {
            n.notify_new_order(&ev.order).await;
        })
    });
    let n = notifier.clone();
    hooks.on_status_changed(move |ev| {
        let n = n.clone();
        Box::pin(async move {
            n.notify_status_change(&ev.order, ev.previous).await;
        })
    });
    let n = notifier.clone();
    hooks.on_order_cancelled(move |ev| {
        let n = n.clone();
        Box::pin(async move {
            n.notify_cancelled(&ev.order, ev.cancelled_by).await;
        })
    });
    let n = notifier;
    hooks.on_payment_declined(move |ev| {
        let n = n.clone();
        Box::pin(async move {
            n.notify_payment_declined(&ev.payment).await;
        })
    });
    hooks
}
