use std::fmt::Debug;

use comanda_common::Pesos;
use log::*;

use crate::{
    api::{
        authz,
        errors::{ErrorCode, OrderFlowError},
        order_objects::{CancelRequest, NewOrderRequest, OrderQueryFilter, OrderWithItems, StatusUpdateRequest},
        payment_api::PaymentApi,
        state,
    },
    db_types::{Actor, NewOrder, NewOrderItem, Order, OrderNumber, OrderStatusType},
    events::{EventProducers, OrderCancelledEvent, OrderCreatedEvent, OrderStatusChangedEvent},
    helpers,
    traits::{OrderBackend, PaymentBackend, PaymentProvider, StatusChange, StorageError},
};

/// `OrderFlowApi` is the top-level workflow for the order lifecycle: creation (validate, charge, persist,
/// notify) and the fulfillment state machine (status updates and cancellation).
///
/// Payment always happens before order persistence. There is no distributed transaction spanning the gateway
/// and the database; ordering the charge first means a crash between the two steps can never fabricate an
/// unpaid order. The worst case is an approved payment without a linked order, which the webhook reconciliation
/// path surfaces for manual follow-up.
pub struct OrderFlowApi<B, BPay, P> {
    db: B,
    payments: PaymentApi<BPay, P>,
    producers: EventProducers,
}

impl<B, BPay, P> Debug for OrderFlowApi<B, BPay, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, BPay, P> OrderFlowApi<B, BPay, P> {
    pub fn new(db: B, payments: PaymentApi<BPay, P>, producers: EventProducers) -> Self {
        Self { db, payments, producers }
    }
}

impl<B, BPay, P> OrderFlowApi<B, BPay, P>
where
    B: OrderBackend,
    BPay: PaymentBackend,
    P: PaymentProvider,
{
    /// Creates a paid order.
    ///
    /// Gates run in a fixed order and each one fails the whole request: the restaurant must exist and be
    /// active, the customer must not already have a pending order there, and every dish must exist, belong to
    /// the restaurant, be active and be available right now. Only then is the customer charged, and only an
    /// approved charge persists an order.
    pub async fn place_order(&self, req: NewOrderRequest) -> Result<OrderWithItems, OrderFlowError> {
        validate_line_items(&req.items)?;
        let restaurant = self
            .db
            .fetch_restaurant(req.restaurant_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Restaurant {}", req.restaurant_id)))?;
        if !restaurant.active {
            return Err(OrderFlowError::rule(
                ErrorCode::RestaurantInactive,
                format!("{} is not accepting orders right now", restaurant.name),
            ));
        }
        if self.db.customer_has_pending_order(&req.customer_id, req.restaurant_id).await? {
            return Err(OrderFlowError::rule(
                ErrorCode::OrderAlreadyPending,
                "Finish or cancel the pending order at this restaurant before placing another",
            ));
        }
        for item in &req.items {
            self.check_item(item, req.restaurant_id).await?;
        }
        let subtotal: Pesos = req.items.iter().map(|i| i.line_total).sum();
        let service_fee = helpers::service_fee(subtotal);
        let total = subtotal + service_fee;
        let order_number = self.unique_order_number().await?;
        let receipt = self
            .payments
            .process_order_payment(
                &req.customer_id,
                total,
                req.payment_instrument_ref.as_deref(),
                Some(order_number.as_str()),
            )
            .await
            .map_err(payment_failed)?;
        info!("📦️💳️ Payment {} approved for order {order_number}. Persisting.", receipt.transaction_id);
        let order = self
            .persist_order(NewOrder {
                order_number,
                customer_id: req.customer_id.clone(),
                restaurant_id: req.restaurant_id,
                subtotal,
                service_fee,
                total,
                customer_comments: req.comments.clone(),
                items: req.items.clone(),
            })
            .await?;
        // Best-effort: the order must not roll back because the linkage failed
        if let Err(e) = self.payments.link_to_order(receipt.payment_id, order.id).await {
            warn!(
                "📦️💳️ Could not link payment {} (tx {}) to order {} [{}]. Reconcile manually. {e}",
                receipt.payment_id, receipt.transaction_id, order.id, order.order_number
            );
        }
        let result = self.with_items(order).await?;
        self.publish_order_created(&result).await;
        Ok(result)
    }

    async fn check_item(&self, item: &NewOrderItem, restaurant_id: i64) -> Result<(), OrderFlowError> {
        let dish = self
            .db
            .fetch_dish(item.dish_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Dish {}", item.dish_id)))?;
        if dish.restaurant_id != restaurant_id {
            return Err(OrderFlowError::rule(
                ErrorCode::DishRestaurantMismatch,
                format!("{} belongs to another restaurant", dish.name),
            ));
        }
        if !dish.active {
            return Err(OrderFlowError::rule(
                ErrorCode::DishInactive,
                format!("{} is no longer on the menu", dish.name),
            ));
        }
        if !self.db.is_available(item.dish_id, restaurant_id).await? {
            return Err(OrderFlowError::rule(
                ErrorCode::DishNotAvailable,
                format!("{} is not available right now", dish.name),
            ));
        }
        Ok(())
    }

    /// Draws order-number candidates until one is free. The space is ~36^6, so in practice this loops once;
    /// the insert still guards against the check-then-insert race with its unique constraint.
    async fn unique_order_number(&self) -> Result<OrderNumber, OrderFlowError> {
        loop {
            let candidate = helpers::new_order_number();
            if !self.db.order_number_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!("📦️ Order number {candidate} is already taken. Drawing another.");
        }
    }

    async fn persist_order(&self, mut order: NewOrder) -> Result<Order, OrderFlowError> {
        loop {
            match self.db.insert_order(order.clone()).await {
                Ok(persisted) => return Ok(persisted),
                Err(StorageError::DuplicateOrderNumber(taken)) => {
                    warn!("📦️ Order number {taken} collided at insert time. Regenerating.");
                    order.order_number = self.unique_order_number().await?;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Applies a state-machine-validated status change on behalf of the restaurant owner or an admin.
    pub async fn update_status(
        &self,
        order_id: i64,
        req: StatusUpdateRequest,
        actor: &Actor,
    ) -> Result<OrderWithItems, OrderFlowError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Order {order_id}")))?;
        state::guard_status_update(order.status, req.status)?;
        let restaurant = self
            .db
            .fetch_restaurant(order.restaurant_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Restaurant {}", order.restaurant_id)))?;
        authz::authorize_status_update(actor, &restaurant)?;
        state::validate_transition(order.status, req.status)?;
        state::require_estimate(req.status, req.estimate_minutes)?;
        let change = StatusChange {
            new_status: req.status,
            milestone: state::milestone_for(req.status),
            estimate_minutes: if req.status == OrderStatusType::Aceptado { req.estimate_minutes } else { None },
            restaurant_comment: req.comment,
        };
        let previous = order.status;
        let updated = self.db.apply_status_change(order.id, change).await?;
        info!("📦️ Order {} moved {previous} -> {}", updated.order_number, updated.status);
        self.publish_status_changed(previous, updated.clone()).await;
        self.with_items(updated).await
    }

    /// Cancels an order under the role-dependent permission matrix. Requires a non-blank reason; stores it and
    /// the optional restaurant comment on the order.
    pub async fn cancel_order(
        &self,
        order_id: i64,
        req: CancelRequest,
        actor: &Actor,
    ) -> Result<OrderWithItems, OrderFlowError> {
        let reason = req.reason.trim();
        if reason.is_empty() {
            return Err(OrderFlowError::rule(
                ErrorCode::OrderCancelReasonRequired,
                "A cancellation reason is required",
            ));
        }
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Order {order_id}")))?;
        state::guard_cancel(order.status)?;
        let restaurant = self
            .db
            .fetch_restaurant(order.restaurant_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Restaurant {}", order.restaurant_id)))?;
        authz::authorize_cancel(actor, &order, &restaurant)?;
        let updated = self.db.cancel_order(order.id, reason, req.comment.as_deref()).await?;
        info!("📦️ Order {} cancelled by {} ({})", updated.order_number, actor.user_id, actor.role);
        self.publish_order_cancelled(updated.clone(), actor).await;
        self.with_items(updated).await
    }

    /// Fetches one order, enforcing read access for the actor.
    pub async fn order_for_actor(&self, order_id: i64, actor: &Actor) -> Result<OrderWithItems, OrderFlowError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Order {order_id}")))?;
        let restaurant = self
            .db
            .fetch_restaurant(order.restaurant_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Restaurant {}", order.restaurant_id)))?;
        authz::authorize_view(actor, &order, &restaurant)?;
        self.with_items(order).await
    }

    /// The calling customer's own orders, oldest first.
    pub async fn orders_for_customer(
        &self,
        customer_id: &str,
        filter: OrderQueryFilter,
    ) -> Result<Vec<Order>, OrderFlowError> {
        let filter = filter.with_customer_id(customer_id);
        Ok(self.db.search_orders(filter).await?)
    }

    async fn with_items(&self, order: Order) -> Result<OrderWithItems, OrderFlowError> {
        let items = self.db.fetch_order_items(order.id).await?;
        Ok(OrderWithItems { order, items })
    }

    async fn publish_order_created(&self, order: &OrderWithItems) {
        for producer in &self.producers.order_created_producer {
            producer.publish_event(OrderCreatedEvent::new(order.order.clone())).await;
        }
    }

    async fn publish_status_changed(&self, previous: OrderStatusType, order: Order) {
        for producer in &self.producers.status_changed_producer {
            producer.publish_event(OrderStatusChangedEvent::new(previous, order.clone())).await;
        }
    }

    async fn publish_order_cancelled(&self, order: Order, actor: &Actor) {
        for producer in &self.producers.order_cancelled_producer {
            producer.publish_event(OrderCancelledEvent::new(order.clone(), actor.role)).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn validate_line_items(items: &[NewOrderItem]) -> Result<(), OrderFlowError> {
    if items.is_empty() {
        return Err(OrderFlowError::Validation("An order needs at least one item".to_string()));
    }
    for item in items {
        if item.quantity < 1 {
            return Err(OrderFlowError::Validation(format!(
                "Quantity for dish {} must be at least 1",
                item.dish_id
            )));
        }
        if item.line_total != item.unit_price * item.quantity {
            return Err(OrderFlowError::Validation(format!(
                "Line total for dish {} does not match quantity x unit price",
                item.dish_id
            )));
        }
    }
    Ok(())
}

/// A decline or gateway error during creation surfaces as `PAYMENT_FAILED`, with the underlying code kept in
/// the details. Precondition failures (no stored card, unknown instrument) pass through untouched.
fn payment_failed(err: OrderFlowError) -> OrderFlowError {
    match err {
        OrderFlowError::BusinessRule { code, message, details }
            if matches!(code, ErrorCode::PaymentDeclined | ErrorCode::PaymentWompiError) =>
        {
            OrderFlowError::rule_with_details(
                ErrorCode::PaymentFailed,
                "The order was not created because the payment did not go through",
                serde_json::json!({ "cause": code, "causeMessage": message, "causeDetails": details }),
            )
        },
        other => other,
    }
}
