use crate::{
    db_types::{Milestone, NewOrder, Order, OrderItem, OrderNumber, OrderStatusType},
    order_objects::OrderQueryFilter,
    traits::StorageError,
};

/// The data a validated status transition writes to the order row, decided by the state machine before any
/// storage is touched.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub new_status: OrderStatusType,
    pub milestone: Option<Milestone>,
    pub estimate_minutes: Option<i64>,
    pub restaurant_comment: Option<String>,
}

/// Order persistence operations.
///
/// `insert_order` must be backed by a unique constraint on the order number and report a violation as
/// [`StorageError::DuplicateOrderNumber`] so the caller can regenerate; the pre-insert existence probe alone has
/// a race window under concurrent creation.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorageError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StorageError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StorageError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorageError>;

    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool, StorageError>;

    /// Whether the customer already has an order in `PENDIENTE` at this restaurant ("one open cart per
    /// restaurant per customer").
    async fn customer_has_pending_order(&self, customer_id: &str, restaurant_id: i64)
        -> Result<bool, StorageError>;

    /// Applies a state-machine-validated transition and returns the updated order.
    async fn apply_status_change(&self, order_id: i64, change: StatusChange) -> Result<Order, StorageError>;

    /// Moves the order to `CANCELADO`, storing the reason and the optional restaurant comment.
    async fn cancel_order(
        &self,
        order_id: i64,
        reason: &str,
        restaurant_comment: Option<&str>,
    ) -> Result<Order, StorageError>;

    /// Fetches orders matching the filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorageError>;
}
