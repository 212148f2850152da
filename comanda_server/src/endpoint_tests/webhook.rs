use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use comanda_common::Secret;
use comanda_engine::{events::EventProducers, PaymentApi};

use super::{
    helpers::send,
    mocks::{MockPaymentDb, MockProvider},
};
use crate::{
    config::WEBHOOK_SIGNATURE_HEADER,
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    routes::WompiWebhookRoute,
};

const EVENTS_SECRET: &str = "test_events_secret";

fn webhook_body() -> String {
    r#"{"event":"transaction.updated","data":{"transaction":{"id":"tx-555","status":"APPROVED","amount_in_cents":3150000}},"timestamp":1717171717}"#
        .to_string()
}

fn register(cfg: &mut ServiceConfig, signature_checks: bool) {
    let mut pay = MockPaymentDb::new();
    // Unknown transactions are swallowed, so the route still answers 200
    pay.expect_fetch_payment_by_transaction_id().returning(|_| Ok(None));
    let api = PaymentApi::new(pay, MockProvider::new(), EventProducers::default());
    let scope = web::scope("/wompi")
        .wrap(HmacMiddlewareFactory::new(
            WEBHOOK_SIGNATURE_HEADER,
            Secret::new(EVENTS_SECRET.to_string()),
            signature_checks,
        ))
        .service(WompiWebhookRoute::<MockPaymentDb, MockProvider>::new())
        .app_data(web::Data::new(api));
    cfg.service(scope);
}

fn configure_checked(cfg: &mut ServiceConfig) {
    register(cfg, true);
}

fn configure_unchecked(cfg: &mut ServiceConfig) {
    register(cfg, false);
}

fn signed_request(body: String, signature: &str) -> TestRequest {
    TestRequest::post()
        .uri("/wompi/webhook")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, signature))
        .set_payload(body)
}

#[actix_web::test]
async fn a_correctly_signed_webhook_is_accepted() {
    let _ = env_logger::try_init();
    let body = webhook_body();
    let signature = calculate_hmac(EVENTS_SECRET, body.as_bytes());
    let (status, json) = send(signed_request(body, &signature), configure_checked).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[actix_web::test]
async fn a_missing_signature_is_rejected_with_400() {
    let _ = env_logger::try_init();
    let req = TestRequest::post()
        .uri("/wompi/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(webhook_body());
    let (status, _) = send(req, configure_checked).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn a_tampered_body_is_rejected_with_400() {
    let _ = env_logger::try_init();
    let signature = calculate_hmac(EVENTS_SECRET, webhook_body().as_bytes());
    let tampered = webhook_body().replace("3150000", "1");
    let (status, _) = send(signed_request(tampered, &signature), configure_checked).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn disabled_signature_checks_let_unsigned_webhooks_through() {
    let _ = env_logger::try_init();
    let req = TestRequest::post()
        .uri("/wompi/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(webhook_body());
    let (status, json) = send(req, configure_unchecked).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}
