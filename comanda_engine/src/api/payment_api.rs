use std::fmt::Debug;

use chrono::Utc;
use comanda_common::Pesos;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    api::errors::{ErrorCode, OrderFlowError},
    db_types::{NewPayment, Payment, PaymentStatus},
    events::{EventProducers, PaymentDeclinedEvent},
    helpers,
    traits::{ChargeRequest, PaymentBackend, PaymentProvider},
};

/// `PaymentApi` wraps the payment gateway: it resolves the instrument to charge, persists a local payment
/// record for every gateway outcome, and reconciles asynchronous webhook callbacks against those records.
pub struct PaymentApi<B, P> {
    db: B,
    provider: P,
    producers: EventProducers,
}

impl<B, P> Debug for PaymentApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B, P> PaymentApi<B, P> {
    pub fn new(db: B, provider: P, producers: EventProducers) -> Self {
        Self { db, provider, producers }
    }
}

/// What the orchestrator gets back for an approved charge.
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub payment_id: i64,
    pub transaction_id: String,
    pub reference: String,
    pub amount_in_cents: i64,
}

//--------------------------------------  Webhook envelope  ----------------------------------------------------------

/// The gateway's event envelope, as delivered to the webhook receiver. The transport layer has already verified
/// the signature over the raw body by the time this is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhookEvent {
    pub event: String,
    pub data: PaymentWebhookData,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhookData {
    pub transaction: PaymentWebhookTransaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhookTransaction {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount_in_cents: Option<i64>,
    #[serde(default)]
    pub status_message: Option<String>,
}

impl<B, P> PaymentApi<B, P>
where
    B: PaymentBackend,
    P: PaymentProvider,
{
    /// Charges the customer for an order total.
    ///
    /// The instrument is the explicitly referenced one (which must belong to the customer) or the customer's
    /// default. A payment row is persisted for every gateway response, whatever its status; only an APPROVED
    /// outcome returns a receipt, anything else raises `PAYMENT_DECLINED`. Failures of the gateway call itself
    /// are raised as `PAYMENT_WOMPI_ERROR` with the provider's own error attached for diagnostics.
    pub async fn process_order_payment(
        &self,
        customer_id: &str,
        amount: Pesos,
        instrument_ref: Option<&str>,
        order_reference: Option<&str>,
    ) -> Result<ChargeReceipt, OrderFlowError> {
        let instrument = match instrument_ref {
            Some(r) => self
                .db
                .fetch_instrument(customer_id, r)
                .await?
                .ok_or_else(|| OrderFlowError::not_found(format!("Payment instrument {r}")))?,
            None => self.db.fetch_default_instrument(customer_id).await?.ok_or_else(|| {
                OrderFlowError::rule(
                    ErrorCode::PaymentNoCard,
                    "The customer has no stored payment instrument to charge",
                )
            })?,
        };
        let payer_email = self
            .db
            .fetch_customer_email(customer_id)
            .await?
            .ok_or_else(|| OrderFlowError::not_found(format!("Customer {customer_id}")))?;
        let reference = helpers::payment_reference(order_reference);
        debug!("💳️ Charging {amount} to customer {customer_id} under reference {reference}");
        let outcome = self
            .provider
            .charge(ChargeRequest {
                instrument_token: instrument.token.clone(),
                amount,
                reference: reference.clone(),
                payer_email,
            })
            .await
            .map_err(|e| {
                warn!("💳️ Gateway error while charging {reference}: {e}");
                OrderFlowError::rule_with_details(
                    ErrorCode::PaymentWompiError,
                    "The payment gateway could not process the charge",
                    json!({ "providerError": e.to_string() }),
                )
            })?;
        let status = PaymentStatus::from_provider(&outcome.status);
        let payment = self
            .db
            .insert_payment(NewPayment {
                customer_id: customer_id.to_string(),
                transaction_id: outcome.transaction_id.clone(),
                reference: reference.clone(),
                amount_cents: outcome.amount_in_cents,
                currency: outcome.currency.clone(),
                status,
                instrument_token: instrument.token,
            })
            .await?;
        debug!(
            "💳️ Payment {} recorded with status {status} for gateway transaction {}",
            payment.id, payment.transaction_id
        );
        if status != PaymentStatus::Approved {
            return Err(OrderFlowError::rule_with_details(
                ErrorCode::PaymentDeclined,
                format!("The payment was not approved (gateway status: {})", outcome.status),
                json!({
                    "transactionId": outcome.transaction_id,
                    "status": outcome.status,
                    "statusMessage": outcome.status_message,
                }),
            ));
        }
        Ok(ChargeReceipt {
            payment_id: payment.id,
            transaction_id: payment.transaction_id,
            reference,
            amount_in_cents: payment.amount_cents,
        })
    }

    /// Points the payment at the order it paid for. The orchestrator treats a failure here as best-effort; this
    /// method just reports it.
    pub async fn link_to_order(&self, payment_id: i64, order_id: i64) -> Result<(), OrderFlowError> {
        self.db.link_payment_to_order(payment_id, order_id).await?;
        trace!("💳️ Payment {payment_id} linked to order {order_id}");
        Ok(())
    }

    /// Applies a gateway webhook to the local payment record.
    ///
    /// Unknown transaction ids are logged and swallowed: the webhook may be racing order creation, or belong to
    /// test traffic on the same gateway account. Replays converge: the status write is absolute, the
    /// finalization timestamp keeps its first value, and side effects fire only on an actual status transition.
    /// The order itself is never touched here; fulfillment owns order status.
    pub async fn handle_webhook(&self, event: PaymentWebhookEvent) -> Result<(), OrderFlowError> {
        let tx = &event.data.transaction;
        let Some(payment) = self.db.fetch_payment_by_transaction_id(&tx.id).await? else {
            info!(
                "💳️🪝️ Webhook {} for unknown transaction {}. Ignoring: it may be racing order creation or \
                 belong to unrelated traffic.",
                event.event, tx.id
            );
            return Ok(());
        };
        let new_status = PaymentStatus::from_provider(&tx.status);
        let raw = serde_json::to_value(&event)
            .map_err(|e| OrderFlowError::Validation(format!("Unserializable webhook event: {e}")))?;
        let updated = self.db.finalize_payment(&tx.id, new_status, &raw, Utc::now()).await?;
        if payment.status == new_status {
            trace!("💳️🪝️ Webhook replay for transaction {}; already {new_status}", tx.id);
            return Ok(());
        }
        info!("💳️🪝️ Payment {} moved {} -> {new_status} via webhook", updated.id, payment.status);
        match new_status {
            PaymentStatus::Approved => self.cross_check_order_link(&updated).await?,
            PaymentStatus::Declined => self.publish_payment_declined(updated).await,
            _ => {},
        }
        Ok(())
    }

    /// An approved payment should have an order by now; if not, say so loudly enough for manual reconciliation.
    /// The order is never created or mutated from here.
    async fn cross_check_order_link(&self, payment: &Payment) -> Result<(), OrderFlowError> {
        match payment.order_id {
            Some(order_id) => {
                if !self.db.order_exists(order_id).await? {
                    warn!(
                        "💳️🪝️ Payment {} (tx {}) points at order {order_id}, which does not exist. \
                         Reconcile manually.",
                        payment.id, payment.transaction_id
                    );
                }
            },
            None => {
                warn!(
                    "💳️🪝️ Payment {} (tx {}) was approved but has no linked order. Either creation is still \
                     in flight or it failed after the charge. Reconcile manually.",
                    payment.id, payment.transaction_id
                );
            },
        }
        Ok(())
    }

    async fn publish_payment_declined(&self, payment: Payment) {
        for producer in &self.producers.payment_declined_producer {
            producer.publish_event(PaymentDeclinedEvent::new(payment.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

#[cfg(test)]
mod test {
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        api::mocks::{approved_outcome, instrument_fixture, payment_fixture, MockPaymentDb, MockProvider},
        events::EventProducer,
        traits::PaymentProviderError,
    };

    fn api(db: MockPaymentDb, provider: MockProvider) -> PaymentApi<MockPaymentDb, MockProvider> {
        PaymentApi::new(db, provider, EventProducers::default())
    }

    #[tokio::test]
    async fn no_stored_card_fails_before_the_gateway_is_called() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_default_instrument().returning(|_| Ok(None));
        let mut provider = MockProvider::new();
        provider.expect_charge().times(0);
        let err = api(db, provider)
            .process_order_payment("cust-1", Pesos::from(31_500), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PaymentNoCard));
    }

    #[tokio::test]
    async fn referenced_instrument_must_belong_to_the_customer() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_instrument().returning(|_, _| Ok(None));
        let err = api(db, MockProvider::new())
            .process_order_payment("cust-1", Pesos::from(31_500), Some("tok_visa_1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderFlowError::NotFound(_)));
    }

    #[tokio::test]
    async fn approved_charge_returns_a_receipt() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_default_instrument().returning(|_| Ok(Some(instrument_fixture("cust-1"))));
        db.expect_fetch_customer_email().returning(|_| Ok(Some("ana@uni.edu.co".to_string())));
        db.expect_insert_payment().returning(|p| {
            assert_eq!(p.status, PaymentStatus::Approved);
            Ok(payment_fixture(41, p))
        });
        let mut provider = MockProvider::new();
        provider.expect_charge().returning(|req| {
            assert_eq!(req.amount, Pesos::from(31_500));
            assert!(req.reference.starts_with("CMD-"));
            Ok(approved_outcome("tx-100"))
        });
        let receipt = api(db, provider)
            .process_order_payment("cust-1", Pesos::from(31_500), None, Some("#AB1-203"))
            .await
            .unwrap();
        assert_eq!(receipt.payment_id, 41);
        assert_eq!(receipt.transaction_id, "tx-100");
        assert_eq!(receipt.reference, "CMD-203");
    }

    #[tokio::test]
    async fn declined_charge_is_persisted_and_raised() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_default_instrument().returning(|_| Ok(Some(instrument_fixture("cust-1"))));
        db.expect_fetch_customer_email().returning(|_| Ok(Some("ana@uni.edu.co".to_string())));
        db.expect_insert_payment().times(1).returning(|p| {
            assert_eq!(p.status, PaymentStatus::Declined);
            Ok(payment_fixture(42, p))
        });
        let mut provider = MockProvider::new();
        provider.expect_charge().returning(|_| {
            let mut outcome = approved_outcome("tx-101");
            outcome.status = "DECLINED".to_string();
            outcome.status_message = Some("Insufficient funds".to_string());
            Ok(outcome)
        });
        let err = api(db, provider)
            .process_order_payment("cust-1", Pesos::from(31_500), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PaymentDeclined));
        let OrderFlowError::BusinessRule { details: Some(details), .. } = err else {
            panic!("expected details on a declined payment");
        };
        assert_eq!(details["transactionId"], "tx-101");
        assert_eq!(details["statusMessage"], "Insufficient funds");
    }

    #[tokio::test]
    async fn unrecognized_gateway_status_is_recorded_as_error() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_default_instrument().returning(|_| Ok(Some(instrument_fixture("cust-1"))));
        db.expect_fetch_customer_email().returning(|_| Ok(Some("ana@uni.edu.co".to_string())));
        db.expect_insert_payment().times(1).returning(|p| {
            assert_eq!(p.status, PaymentStatus::Error);
            Ok(payment_fixture(43, p))
        });
        let mut provider = MockProvider::new();
        provider.expect_charge().returning(|_| {
            let mut outcome = approved_outcome("tx-102");
            outcome.status = "FROZEN".to_string();
            Ok(outcome)
        });
        let err = api(db, provider)
            .process_order_payment("cust-1", Pesos::from(10_000), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PaymentDeclined));
    }

    #[tokio::test]
    async fn gateway_failure_is_wrapped_with_diagnostics_and_nothing_is_persisted() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_default_instrument().returning(|_| Ok(Some(instrument_fixture("cust-1"))));
        db.expect_fetch_customer_email().returning(|_| Ok(Some("ana@uni.edu.co".to_string())));
        db.expect_insert_payment().times(0);
        let mut provider = MockProvider::new();
        provider.expect_charge().returning(|_| {
            Err(PaymentProviderError::Transport("connection reset by peer".to_string()))
        });
        let err = api(db, provider)
            .process_order_payment("cust-1", Pesos::from(10_000), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PaymentWompiError));
        let OrderFlowError::BusinessRule { details: Some(details), .. } = err else {
            panic!("expected provider diagnostics");
        };
        assert!(details["providerError"].as_str().unwrap().contains("connection reset"));
    }

    fn webhook(txid: &str, status: &str) -> PaymentWebhookEvent {
        PaymentWebhookEvent {
            event: "transaction.updated".to_string(),
            data: PaymentWebhookData {
                transaction: PaymentWebhookTransaction {
                    id: txid.to_string(),
                    status: status.to_string(),
                    reference: Some("CMD-203".to_string()),
                    amount_in_cents: Some(3_150_000),
                    status_message: None,
                },
            },
            timestamp: Some(1_717_171_717),
        }
    }

    #[tokio::test]
    async fn webhook_for_unknown_transaction_is_swallowed() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_payment_by_transaction_id().returning(|_| Ok(None));
        db.expect_finalize_payment().times(0);
        api(db, MockProvider::new()).handle_webhook(webhook("tx-nope", "APPROVED")).await.unwrap();
    }

    #[tokio::test]
    async fn webhook_decline_transition_notifies_the_customer() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_payment_by_transaction_id().returning(|txid| {
            let mut p = payment_fixture(
                50,
                NewPayment {
                    customer_id: "cust-1".to_string(),
                    transaction_id: txid.to_string(),
                    reference: "CMD-203".to_string(),
                    amount_cents: 3_150_000,
                    currency: "COP".to_string(),
                    status: PaymentStatus::Approved,
                    instrument_token: "tok_visa_1".to_string(),
                },
            );
            p.order_id = Some(9);
            Ok(Some(p))
        });
        db.expect_finalize_payment().times(1).returning(|txid, status, _, finalized_at| {
            let mut p = payment_fixture(
                50,
                NewPayment {
                    customer_id: "cust-1".to_string(),
                    transaction_id: txid.to_string(),
                    reference: "CMD-203".to_string(),
                    amount_cents: 3_150_000,
                    currency: "COP".to_string(),
                    status,
                    instrument_token: "tok_visa_1".to_string(),
                },
            );
            p.order_id = Some(9);
            p.finalized_at = Some(finalized_at);
            Ok(p)
        });
        let (sender, mut receiver) = mpsc::channel(1);
        let mut producers = EventProducers::default();
        producers.payment_declined_producer.push(EventProducer::new(sender));
        let api = PaymentApi::new(db, MockProvider::new(), producers);
        api.handle_webhook(webhook("tx-100", "DECLINED")).await.unwrap();
        let event = receiver.recv().await.expect("a declined event");
        assert_eq!(event.payment.transaction_id, "tx-100");
        assert_eq!(event.payment.status, PaymentStatus::Declined);
    }

    #[tokio::test]
    async fn webhook_replay_converges_without_side_effects() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_payment_by_transaction_id().returning(|txid| {
            let mut p = payment_fixture(
                51,
                NewPayment {
                    customer_id: "cust-1".to_string(),
                    transaction_id: txid.to_string(),
                    reference: "CMD-203".to_string(),
                    amount_cents: 3_150_000,
                    currency: "COP".to_string(),
                    status: PaymentStatus::Declined,
                    instrument_token: "tok_visa_1".to_string(),
                },
            );
            p.order_id = Some(9);
            Ok(Some(p))
        });
        // The write still happens (it converges to the same values), but no event fires
        db.expect_finalize_payment().times(1).returning(|txid, status, _, finalized_at| {
            let mut p = payment_fixture(
                51,
                NewPayment {
                    customer_id: "cust-1".to_string(),
                    transaction_id: txid.to_string(),
                    reference: "CMD-203".to_string(),
                    amount_cents: 3_150_000,
                    currency: "COP".to_string(),
                    status,
                    instrument_token: "tok_visa_1".to_string(),
                },
            );
            p.finalized_at = Some(finalized_at);
            Ok(p)
        });
        let (sender, mut receiver) = mpsc::channel(1);
        let mut producers = EventProducers::default();
        producers.payment_declined_producer.push(EventProducer::new(sender));
        let api = PaymentApi::new(db, MockProvider::new(), producers);
        api.handle_webhook(webhook("tx-100", "DECLINED")).await.unwrap();
        drop(api);
        assert!(receiver.recv().await.is_none(), "no event expected on replay");
    }

    #[tokio::test]
    async fn webhook_approval_without_linked_order_only_logs() {
        let _ = env_logger::try_init();
        let mut db = MockPaymentDb::new();
        db.expect_fetch_payment_by_transaction_id().returning(|txid| {
            Ok(Some(payment_fixture(
                52,
                NewPayment {
                    customer_id: "cust-1".to_string(),
                    transaction_id: txid.to_string(),
                    reference: "CMD-203".to_string(),
                    amount_cents: 3_150_000,
                    currency: "COP".to_string(),
                    status: PaymentStatus::Pending,
                    instrument_token: "tok_visa_1".to_string(),
                },
            )))
        });
        db.expect_finalize_payment().times(1).returning(|txid, status, _, finalized_at| {
            let mut p = payment_fixture(
                52,
                NewPayment {
                    customer_id: "cust-1".to_string(),
                    transaction_id: txid.to_string(),
                    reference: "CMD-203".to_string(),
                    amount_cents: 3_150_000,
                    currency: "COP".to_string(),
                    status,
                    instrument_token: "tok_visa_1".to_string(),
                },
            );
            p.finalized_at = Some(finalized_at);
            Ok(p)
        });
        // order_id is None, so the cross-check never queries orders
        db.expect_order_exists().times(0);
        api(db, MockProvider::new()).handle_webhook(webhook("tx-100", "APPROVED")).await.unwrap();
    }
}
