//! Wompi payment-gateway client.
//!
//! Implements the engine's [`PaymentProvider`] boundary over Wompi's REST API: one call, create a transaction
//! against a tokenized card. The outcome vocabulary (`APPROVED`, `DECLINED`, `PENDING`, `VOIDED`) passes
//! through untranslated; the engine owns the mapping into its own status enum.

use std::sync::Arc;

use comanda_common::COP_CURRENCY_CODE;
use comanda_engine::traits::{ChargeOutcome, ChargeRequest, PaymentProvider, PaymentProviderError};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::Deserialize;
use serde_json::json;

use crate::config::WompiConfig;

#[derive(Clone)]
pub struct WompiProvider {
    config: WompiConfig,
    client: Arc<Client>,
}

#[derive(Debug, Deserialize)]
struct TransactionEnvelope {
    data: WompiTransaction,
}

#[derive(Debug, Deserialize)]
struct WompiTransaction {
    id: String,
    status: String,
    #[serde(default)]
    status_message: Option<String>,
    amount_in_cents: i64,
    currency: String,
}

impl WompiProvider {
    pub fn new(config: WompiConfig) -> Result<Self, PaymentProviderError> {
        let mut headers = HeaderMap::with_capacity(2);
        let auth = format!("Bearer {}", config.private_key.reveal());
        let val = HeaderValue::from_str(&auth)
            .map_err(|e| PaymentProviderError::Transport(format!("Invalid gateway key: {e}")))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PaymentProviderError::Transport(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }
}

impl PaymentProvider for WompiProvider {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, PaymentProviderError> {
        let url = format!("{}/transactions", self.config.api_url);
        let body = json!({
            "amount_in_cents": request.amount.to_cents(),
            "currency": COP_CURRENCY_CODE,
            "customer_email": request.payer_email,
            "reference": request.reference,
            "payment_method": {
                "type": "CARD",
                "token": request.instrument_token,
                "installments": 1,
            },
        });
        trace!("🏦️ POST {url} for reference {}", request.reference);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentProviderError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("🏦️ Gateway rejected charge {}: {status} {text}", request.reference);
            return Err(PaymentProviderError::Api { code: status.to_string(), message: text });
        }
        let envelope: TransactionEnvelope =
            response.json().await.map_err(|e| PaymentProviderError::Transport(e.to_string()))?;
        let tx = envelope.data;
        debug!("🏦️ Gateway transaction {} answered {} for {}", tx.id, tx.status, request.reference);
        Ok(ChargeOutcome {
            transaction_id: tx.id,
            status: tx.status,
            status_message: tx.status_message,
            amount_in_cents: tx.amount_in_cents,
            currency: tx.currency,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn envelope_parses_the_gateway_shape() {
        let raw = r#"{
            "data": {
                "id": "1234-1717-4242",
                "created_at": "2024-06-12T16:01:44.000Z",
                "status": "APPROVED",
                "status_message": null,
                "amount_in_cents": 3150000,
                "reference": "CMD-203",
                "currency": "COP"
            }
        }"#;
        let envelope: TransactionEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.data.id, "1234-1717-4242");
        assert_eq!(envelope.data.status, "APPROVED");
        assert_eq!(envelope.data.amount_in_cents, 3_150_000);
    }
}
