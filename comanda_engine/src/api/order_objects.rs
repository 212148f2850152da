use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{NewOrderItem, Order, OrderItem, OrderStatusType};

/// An order together with its line items, as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Everything the orchestrator needs to create an order. Pricing on the items is caller-supplied and trusted as
/// pre-validated upstream; the orchestrator checks availability and ownership, not arithmetic against the
/// live catalog.
#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub customer_id: String,
    pub restaurant_id: i64,
    pub items: Vec<NewOrderItem>,
    pub comments: Option<String>,
    pub payment_instrument_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
    pub estimate_minutes: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub reason: String,
    pub comment: Option<String>,
}

/// Search criteria for order listings. All fields are conjunctive; results come back oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_id: Option<String>,
    pub restaurant_id: Option<i64>,
    pub status: Option<Vec<OrderStatusType>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_customer_id<S: Into<String>>(mut self, customer_id: S) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_restaurant_id(mut self, restaurant_id: i64) -> Self {
        self.restaurant_id = Some(restaurant_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none()
            && self.restaurant_id.is_none()
            && self.status.is_none()
            && self.since.is_none()
            && self.until.is_none()
    }
}
