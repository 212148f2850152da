use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use comanda_engine::{db_types::OrderStatusType, events::EventProducers, OrderFlowApi, PaymentApi};
use serde_json::json;

use super::{
    helpers::{as_user, send},
    mocks::{
        approved_outcome,
        dish,
        instrument,
        order,
        order_from_new,
        payment,
        restaurant,
        MockBackend,
        MockPaymentDb,
        MockProvider,
    },
};
use crate::routes::{
    CancelOrderRoute,
    CreateOrderRoute,
    MyOrdersRoute,
    OrderByIdRoute,
    UpdateOrderStatusRoute,
};

type Api = OrderFlowApi<MockBackend, MockPaymentDb, MockProvider>;

fn register(cfg: &mut ServiceConfig, db: MockBackend, pay: MockPaymentDb, provider: MockProvider) {
    let api: Api = OrderFlowApi::new(db, PaymentApi::new(pay, provider, EventProducers::default()), EventProducers::default());
    cfg.service(CreateOrderRoute::<MockBackend, MockPaymentDb, MockProvider>::new())
        .service(MyOrdersRoute::<MockBackend, MockPaymentDb, MockProvider>::new())
        .service(OrderByIdRoute::<MockBackend, MockPaymentDb, MockProvider>::new())
        .service(UpdateOrderStatusRoute::<MockBackend, MockPaymentDb, MockProvider>::new())
        .service(CancelOrderRoute::<MockBackend, MockPaymentDb, MockProvider>::new())
        .app_data(web::Data::new(api));
}

fn create_body() -> serde_json::Value {
    json!({
        "restaurantId": 7,
        "items": [{
            "dishId": 3,
            "dishName": "Bandeja paisa",
            "quantity": 2,
            "unitPrice": 15000,
            "lineTotal": 30000
        }],
        "comments": "sin cebolla"
    })
}

fn configure_create_success(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_fetch_restaurant().returning(|id| Ok(Some(restaurant(id, "owner-1"))));
    db.expect_customer_has_pending_order().returning(|_, _| Ok(false));
    db.expect_fetch_dish().returning(|id| Ok(Some(dish(id, 7, 15_000))));
    db.expect_is_available().returning(|_, _| Ok(true));
    db.expect_order_number_exists().returning(|_| Ok(false));
    db.expect_insert_order().returning(|new| Ok(order_from_new(9, &new)));
    db.expect_fetch_order_items().returning(|_| Ok(vec![]));
    let mut pay = MockPaymentDb::new();
    pay.expect_fetch_default_instrument().returning(|c| Ok(Some(instrument(c))));
    pay.expect_fetch_customer_email().returning(|_| Ok(Some("ana@uni.edu.co".to_string())));
    pay.expect_insert_payment().returning(|p| Ok(payment(41, p)));
    pay.expect_link_payment_to_order().returning(|_, _| Ok(()));
    let mut provider = MockProvider::new();
    provider.expect_charge().returning(|_| Ok(approved_outcome("tx-100")));
    register(cfg, db, pay, provider);
}

#[actix_web::test]
async fn create_order_answers_201_with_the_paid_order() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::post().uri("/orders"), "cust-1", "student").set_json(create_body());
    let (status, body) = send(req, configure_create_success).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDIENTE");
    assert_eq!(body["subtotal"], 30_000);
    assert_eq!(body["serviceFee"], 1_500);
    assert_eq!(body["total"], 31_500);
    let number = body["orderNumber"].as_str().expect("order number in response");
    let re = regex::Regex::new(r"^#[A-Z0-9]{3}-[A-Z0-9]{3}$").unwrap();
    assert!(re.is_match(number), "{number}");
}

#[actix_web::test]
async fn create_order_without_identity_headers_is_401() {
    let _ = env_logger::try_init();
    let req = TestRequest::post().uri("/orders").set_json(create_body());
    let (status, body) = send(req, configure_create_success).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "UNAUTHENTICATED");
}

fn configure_pending_guard(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_fetch_restaurant().returning(|id| Ok(Some(restaurant(id, "owner-1"))));
    db.expect_customer_has_pending_order().returning(|_, _| Ok(true));
    let mut provider = MockProvider::new();
    provider.expect_charge().times(0);
    register(cfg, db, MockPaymentDb::new(), provider);
}

#[actix_web::test]
async fn a_second_pending_order_is_422_with_its_code() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::post().uri("/orders"), "cust-1", "student").set_json(create_body());
    let (status, body) = send(req, configure_pending_guard).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errorCode"], "ORDER_ALREADY_PENDING");
}

#[actix_web::test]
async fn malformed_items_are_400() {
    let _ = env_logger::try_init();
    let body = json!({
        "restaurantId": 7,
        "items": [{
            "dishId": 3,
            "dishName": "Bandeja paisa",
            "quantity": 0,
            "unitPrice": 15000,
            "lineTotal": 0
        }]
    });
    let req = as_user(TestRequest::post().uri("/orders"), "cust-1", "student").set_json(body);
    let (status, body) = send(req, configure_create_success).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
}

fn configure_status_flow(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, "cust-1", 7, OrderStatusType::Pendiente))));
    db.expect_fetch_restaurant().returning(|id| Ok(Some(restaurant(id, "owner-1"))));
    db.expect_fetch_order_items().returning(|_| Ok(vec![]));
    db.expect_apply_status_change().returning(|id, change| {
        let mut updated = order(id, "cust-1", 7, change.new_status);
        updated.estimate_minutes = change.estimate_minutes;
        updated.accepted_at = Some(chrono::Utc::now());
        Ok(updated)
    });
    db.expect_cancel_order().returning(|id, reason, _| {
        let mut updated = order(id, "cust-1", 7, OrderStatusType::Cancelado);
        updated.cancel_reason = Some(reason.to_string());
        Ok(updated)
    });
    register(cfg, db, MockPaymentDb::new(), MockProvider::new());
}

#[actix_web::test]
async fn owner_accepts_with_an_estimate() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::patch().uri("/orders/9/status"), "owner-1", "owner")
        .set_json(json!({ "status": "ACEPTADO", "estimateMinutes": 20 }));
    let (status, body) = send(req, configure_status_flow).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACEPTADO");
    assert_eq!(body["estimateMinutes"], 20);
}

#[actix_web::test]
async fn accepting_without_an_estimate_is_422() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::patch().uri("/orders/9/status"), "owner-1", "owner")
        .set_json(json!({ "status": "ACEPTADO" }));
    let (status, body) = send(req, configure_status_flow).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errorCode"], "ORDER_ESTIMATE_REQUIRED");
}

#[actix_web::test]
async fn students_get_403_on_status_updates() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::patch().uri("/orders/9/status"), "cust-1", "student")
        .set_json(json!({ "status": "ACEPTADO", "estimateMinutes": 20 }));
    let (status, body) = send(req, configure_status_flow).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "FORBIDDEN");
}

#[actix_web::test]
async fn cancel_returns_the_cancelled_order() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::post().uri("/orders/9/cancel"), "cust-1", "student")
        .set_json(json!({ "reason": "changed my mind" }));
    let (status, body) = send(req, configure_status_flow).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELADO");
    assert_eq!(body["cancelReason"], "changed my mind");
}

fn configure_my_orders(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_search_orders().returning(|filter| {
        assert_eq!(filter.customer_id.as_deref(), Some("cust-1"));
        Ok(vec![order(1, "cust-1", 7, OrderStatusType::Entregado)])
    });
    register(cfg, db, MockPaymentDb::new(), MockProvider::new());
}

#[actix_web::test]
async fn my_orders_lists_only_the_callers_orders() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::get().uri("/orders?status=ENTREGADO"), "cust-1", "student");
    let (status, body) = send(req, configure_my_orders).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().expect("an array of orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "ENTREGADO");
    assert_eq!(orders[0]["customerId"], "cust-1");
}

fn configure_missing_order(cfg: &mut ServiceConfig) {
    let mut db = MockBackend::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    register(cfg, db, MockPaymentDb::new(), MockProvider::new());
}

#[actix_web::test]
async fn missing_order_is_404() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::get().uri("/orders/404"), "cust-1", "student");
    let (status, body) = send(req, configure_missing_order).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], "NOT_FOUND");
}

#[actix_web::test]
async fn another_customers_order_is_403_on_fetch() {
    let _ = env_logger::try_init();
    let req = as_user(TestRequest::get().uri("/orders/9"), "cust-2", "student");
    let (status, body) = send(req, configure_status_flow).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "FORBIDDEN");
}
