use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentInstrument, PaymentStatus},
    traits::StorageError,
};

pub async fn insert_payment(
    payment: &NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, StorageError> {
    let persisted = sqlx::query_as::<_, Payment>(
        r#"
            INSERT INTO payments (
                customer_id,
                transaction_id,
                reference,
                amount_cents,
                currency,
                status,
                instrument_token
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(&payment.customer_id)
    .bind(&payment.transaction_id)
    .bind(&payment.reference)
    .bind(payment.amount_cents)
    .bind(&payment.currency)
    .bind(payment.status.to_string())
    .bind(&payment.instrument_token)
    .fetch_one(&mut *conn)
    .await?;
    trace!("📝️ Payment {} recorded for transaction {}", persisted.id, persisted.transaction_id);
    Ok(persisted)
}

pub async fn link_to_order(
    payment_id: i64,
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE payments SET order_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(order_id)
        .bind(payment_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await
}

/// Webhook write. Replays converge: the status write is absolute and `finalized_at` keeps its first value via
/// `COALESCE`.
pub async fn finalize(
    transaction_id: &str,
    status: PaymentStatus,
    raw_event: &serde_json::Value,
    finalized_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Payment, StorageError> {
    let result: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments SET
                status = $1,
                raw_event = $2,
                finalized_at = COALESCE(finalized_at, $3),
                updated_at = CURRENT_TIMESTAMP
            WHERE transaction_id = $4
            RETURNING *;
        "#,
    )
    .bind(status.to_string())
    .bind(raw_event.to_string())
    .bind(finalized_at)
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| StorageError::PaymentNotFound(transaction_id.to_string()))
}

pub async fn fetch_instrument(
    customer_id: &str,
    token: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentInstrument>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_instruments WHERE customer_id = $1 AND token = $2")
        .bind(customer_id)
        .bind(token)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_default_instrument(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentInstrument>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM payment_instruments WHERE customer_id = $1 AND is_default = 1 ORDER BY id DESC LIMIT 1",
    )
    .bind(customer_id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_customer_email(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT email FROM customers WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(|r| r.0))
}
