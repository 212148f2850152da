use chrono::{DateTime, Utc};

use crate::{
    db_types::{NewPayment, Payment, PaymentInstrument, PaymentStatus},
    traits::StorageError,
};

/// Payment persistence operations.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    /// Stores the local record of a gateway charge, whatever its outcome.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StorageError>;

    /// Points the payment at the order it paid for. Called after the order row exists; the caller treats a
    /// failure here as best-effort.
    async fn link_payment_to_order(&self, payment_id: i64, order_id: i64) -> Result<(), StorageError>;

    async fn fetch_payment_by_transaction_id(&self, transaction_id: &str)
        -> Result<Option<Payment>, StorageError>;

    /// Applies a webhook outcome to the payment record. Must converge when replayed: the status write is
    /// absolute and the finalization timestamp keeps its first value.
    async fn finalize_payment(
        &self,
        transaction_id: &str,
        status: PaymentStatus,
        raw_event: &serde_json::Value,
        finalized_at: DateTime<Utc>,
    ) -> Result<Payment, StorageError>;

    /// Fetches a specific stored instrument, scoped to the customer so one user cannot charge another's card.
    async fn fetch_instrument(
        &self,
        customer_id: &str,
        reference: &str,
    ) -> Result<Option<PaymentInstrument>, StorageError>;

    async fn fetch_default_instrument(&self, customer_id: &str)
        -> Result<Option<PaymentInstrument>, StorageError>;

    async fn fetch_customer_email(&self, customer_id: &str) -> Result<Option<String>, StorageError>;
}

/// The narrow slice of order storage the payment coordinator is allowed to see. Keeping this separate from
/// [`crate::traits::OrderManagement`] breaks the orders-to-payments dependency cycle.
#[allow(async_fn_in_trait)]
pub trait OrderLookup {
    async fn order_exists(&self, order_id: i64) -> Result<bool, StorageError>;
}
