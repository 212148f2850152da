//! `SqliteDatabase` is the concrete storage backend for the comanda engine.
//!
//! It wraps a connection pool and implements every backend trait in [`crate::traits`] by delegating to the
//! low-level functions in the [`super::db`] module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{catalog, new_pool, orders, payments};
use crate::{
    db_types::{
        Dish,
        NewOrder,
        NewPayment,
        Order,
        OrderItem,
        OrderNumber,
        Payment,
        PaymentInstrument,
        PaymentStatus,
        Restaurant,
    },
    order_objects::OrderQueryFilter,
    traits::{
        AvailabilityChecker,
        CatalogAccess,
        OrderLookup,
        OrderManagement,
        PaymentManagement,
        StatusChange,
        StorageError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorageError> {
        let mut tx = self.pool.begin().await?;
        let persisted = orders::insert_order(&order, &mut tx).await?;
        orders::insert_items(persisted.id, &order.items, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} saved with id {}", persisted.order_number, persisted.id);
        Ok(persisted)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(number, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::order_number_exists(number, &mut conn).await?)
    }

    async fn customer_has_pending_order(
        &self,
        customer_id: &str,
        restaurant_id: i64,
    ) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::has_pending_order(customer_id, restaurant_id, &mut conn).await?)
    }

    async fn apply_status_change(&self, order_id: i64, change: StatusChange) -> Result<Order, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::apply_status_change(order_id, change, &mut conn).await
    }

    async fn cancel_order(
        &self,
        order_id: i64,
        reason: &str,
        restaurant_comment: Option<&str>,
    ) -> Result<Order, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::cancel_order(order_id, reason, restaurant_comment, &mut conn).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(&payment, &mut conn).await
    }

    async fn link_payment_to_order(&self, payment_id: i64, order_id: i64) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::link_to_order(payment_id, order_id, &mut conn).await
    }

    async fn fetch_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_by_transaction_id(transaction_id, &mut conn).await?)
    }

    async fn finalize_payment(
        &self,
        transaction_id: &str,
        status: PaymentStatus,
        raw_event: &serde_json::Value,
        finalized_at: DateTime<Utc>,
    ) -> Result<Payment, StorageError> {
        let mut conn = self.pool.acquire().await?;
        payments::finalize(transaction_id, status, raw_event, finalized_at, &mut conn).await
    }

    async fn fetch_instrument(
        &self,
        customer_id: &str,
        reference: &str,
    ) -> Result<Option<PaymentInstrument>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_instrument(customer_id, reference, &mut conn).await?)
    }

    async fn fetch_default_instrument(
        &self,
        customer_id: &str,
    ) -> Result<Option<PaymentInstrument>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_default_instrument(customer_id, &mut conn).await?)
    }

    async fn fetch_customer_email(&self, customer_id: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_customer_email(customer_id, &mut conn).await?)
    }
}

impl OrderLookup for SqliteDatabase {
    async fn order_exists(&self, order_id: i64) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?.is_some())
    }
}

impl CatalogAccess for SqliteDatabase {
    async fn fetch_restaurant(&self, id: i64) -> Result<Option<Restaurant>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_restaurant(id, &mut conn).await?)
    }

    async fn fetch_dish(&self, id: i64) -> Result<Option<Dish>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_dish(id, &mut conn).await?)
    }
}

impl AvailabilityChecker for SqliteDatabase {
    async fn is_available(&self, dish_id: i64, restaurant_id: i64) -> Result<bool, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::dish_is_available(dish_id, restaurant_id, &mut conn).await?)
    }
}
