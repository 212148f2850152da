use comanda_common::Pesos;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A charge against a stored payment instrument.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub instrument_token: String,
    pub amount: Pesos,
    pub reference: String,
    pub payer_email: String,
}

/// What the gateway said about a charge. `status` carries the gateway's own vocabulary; it is mapped into
/// [`crate::db_types::PaymentStatus`] before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub transaction_id: String,
    pub status: String,
    pub status_message: Option<String>,
    pub amount_in_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    /// The gateway could not be reached, or returned garbage.
    #[error("Payment provider request failed: {0}")]
    Transport(String),
    /// The gateway answered with an error envelope instead of a transaction.
    #[error("Payment provider rejected the request ({code}): {message}")]
    Api { code: String, message: String },
}

/// The payment gateway, at the boundary this engine needs: create a charge, report the outcome.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, PaymentProviderError>;
}
