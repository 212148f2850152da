//! Behaviour contracts for the engine's collaborators.
//!
//! Storage backends implement the `*Management` traits; external services (payment gateway, notification
//! transport) get their own narrow traits so the orchestration logic can be tested against mocks without any
//! transport framework in sight.

mod catalog;
mod notifications;
mod order_management;
mod payment_management;
mod payment_provider;

use thiserror::Error;

pub use catalog::{AvailabilityChecker, CatalogAccess};
pub use notifications::NotificationDispatcher;
pub use order_management::{OrderManagement, StatusChange};
pub use payment_management::{OrderLookup, PaymentManagement};
pub use payment_provider::{ChargeOutcome, ChargeRequest, PaymentProvider, PaymentProviderError};

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Cannot insert order: order number {0} already exists")]
    DuplicateOrderNumber(String),
    #[error("Cannot insert order: the customer already has a pending order at this restaurant")]
    DuplicatePendingOrder,
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("The requested payment does not exist for transaction {0}")]
    PaymentNotFound(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

/// Everything the order orchestration flow needs from a storage backend.
pub trait OrderBackend: OrderManagement + CatalogAccess + AvailabilityChecker {}
impl<T> OrderBackend for T where T: OrderManagement + CatalogAccess + AvailabilityChecker {}

/// Everything the payment coordination flow needs from a storage backend.
pub trait PaymentBackend: PaymentManagement + OrderLookup {}
impl<T> PaymentBackend for T where T: PaymentManagement + OrderLookup {}
