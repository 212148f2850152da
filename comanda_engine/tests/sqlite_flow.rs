//! Full order lifecycle against a real (in-memory) SQLite backend.

use comanda_engine::{
    db_types::{Actor, NewOrderItem, OrderStatusType, PaymentStatus, Role, ToppingSelection},
    events::EventProducers,
    order_objects::{CancelRequest, NewOrderRequest, StatusUpdateRequest},
    traits::{ChargeOutcome, ChargeRequest, PaymentManagement, PaymentProvider, PaymentProviderError},
    ErrorCode,
    OrderFlowApi,
    OrderFlowError,
    PaymentApi,
    PaymentWebhookData,
    PaymentWebhookEvent,
    PaymentWebhookTransaction,
    SqliteDatabase,
};
use comanda_common::Pesos;

/// A gateway stand-in that always answers with the scripted status.
#[derive(Clone)]
struct ScriptedProvider {
    status: &'static str,
}

impl PaymentProvider for ScriptedProvider {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, PaymentProviderError> {
        Ok(ChargeOutcome {
            transaction_id: format!("tx-{}", request.reference),
            status: self.status.to_string(),
            status_message: None,
            amount_in_cents: request.amount.to_cents(),
            currency: "COP".to_string(),
        })
    }
}

type TestApi = OrderFlowApi<SqliteDatabase, SqliteDatabase, ScriptedProvider>;

async fn setup() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("in-memory db");
    let pool = db.pool();
    sqlx::query("INSERT INTO customers (id, email, name) VALUES ('cust-1', 'ana@uni.edu.co', 'Ana')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO restaurants (id, owner_id, name, active) VALUES (7, 'owner-1', 'La Arepa Dorada', 1)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO dishes (id, restaurant_id, name, price, active, available) VALUES (3, 7, 'Bandeja paisa', 15000, 1, 1)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO payment_instruments (customer_id, token, brand, last_four, is_default) VALUES ('cust-1', 'tok_visa_1', 'VISA', '4242', 1)",
    )
    .execute(pool)
    .await
    .unwrap();
    db
}

fn apis(db: &SqliteDatabase, status: &'static str) -> TestApi {
    let payments = PaymentApi::new(db.clone(), ScriptedProvider { status }, EventProducers::default());
    OrderFlowApi::new(db.clone(), payments, EventProducers::default())
}

fn order_request() -> NewOrderRequest {
    NewOrderRequest {
        customer_id: "cust-1".to_string(),
        restaurant_id: 7,
        items: vec![NewOrderItem {
            dish_id: 3,
            dish_name: "Bandeja paisa".to_string(),
            quantity: 2,
            unit_price: Pesos::from(15_000),
            line_total: Pesos::from(30_000),
            toppings: Some(ToppingSelection {
                added: vec!["queso".to_string()],
                removed: vec!["cebolla".to_string()],
            }),
            comment: Some("bien caliente".to_string()),
        }],
        comments: None,
        payment_instrument_ref: None,
    }
}

fn owner() -> Actor {
    Actor::new("owner-1", Role::Owner)
}

#[tokio::test]
async fn full_lifecycle_from_cart_to_delivery() {
    let db = setup().await;
    let api = apis(&db, "APPROVED");

    let created = api.place_order(order_request()).await.unwrap();
    let order = &created.order;
    assert_eq!(order.status, OrderStatusType::Pendiente);
    assert_eq!(order.subtotal, Pesos::from(30_000));
    assert_eq!(order.service_fee, Pesos::from(1_500));
    assert_eq!(order.total, Pesos::from(31_500));
    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].quantity, 2);
    let toppings = created.items[0].toppings.as_ref().expect("toppings survived the round trip");
    assert_eq!(toppings.added, vec!["queso".to_string()]);

    // The originating payment is approved and linked back to the order
    let payment = payment_for_order(&db, order.id).await;
    assert_eq!(payment.status, PaymentStatus::Approved);
    assert_eq!(payment.order_id, Some(order.id));
    assert_eq!(payment.amount_cents, 3_150_000);

    let accepted = api
        .update_status(
            order.id,
            StatusUpdateRequest {
                status: OrderStatusType::Aceptado,
                estimate_minutes: Some(20),
                comment: None,
            },
            &owner(),
        )
        .await
        .unwrap();
    assert_eq!(accepted.order.estimate_minutes, Some(20));
    assert!(accepted.order.accepted_at.is_some());

    let preparing = api
        .update_status(
            order.id,
            StatusUpdateRequest { status: OrderStatusType::Preparando, estimate_minutes: None, comment: None },
            &owner(),
        )
        .await
        .unwrap();
    assert!(preparing.order.ready_at.is_none());

    let ready = api
        .update_status(
            order.id,
            StatusUpdateRequest { status: OrderStatusType::Listo, estimate_minutes: None, comment: None },
            &owner(),
        )
        .await
        .unwrap();
    let delivered = api
        .update_status(
            order.id,
            StatusUpdateRequest { status: OrderStatusType::Entregado, estimate_minutes: None, comment: None },
            &owner(),
        )
        .await
        .unwrap();

    let o = delivered.order;
    assert_eq!(o.status, OrderStatusType::Entregado);
    let placed = o.placed_at;
    let accepted_at = o.accepted_at.unwrap();
    let ready_at = o.ready_at.unwrap();
    let delivered_at = o.delivered_at.unwrap();
    assert!(placed < accepted_at, "placed {placed} < accepted {accepted_at}");
    assert!(accepted_at < ready_at, "accepted {accepted_at} < ready {ready_at}");
    assert!(ready_at < delivered_at, "ready {ready_at} < delivered {delivered_at}");
    assert!(ready.order.ready_at.is_some());
}

async fn payment_for_order(db: &SqliteDatabase, order_id: i64) -> comanda_engine::db_types::Payment {
    sqlx::query_as("SELECT * FROM payments WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(db.pool())
        .await
        .expect("a payment linked to the order")
}

#[tokio::test]
async fn declined_payment_leaves_no_order_behind() {
    let db = setup().await;
    let api = apis(&db, "DECLINED");

    let err = api.place_order(order_request()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::PaymentFailed));

    let orders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.unwrap();
    assert_eq!(orders.0, 0, "no order row may exist after a declined charge");

    // The declined attempt is still on record for reconciliation
    let payments: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payments WHERE status = 'DECLINED'").fetch_one(db.pool()).await.unwrap();
    assert_eq!(payments.0, 1);
}

#[tokio::test]
async fn second_pending_order_at_the_same_restaurant_is_refused() {
    let db = setup().await;
    let api = apis(&db, "APPROVED");

    api.place_order(order_request()).await.unwrap();
    let err = api.place_order(order_request()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::OrderAlreadyPending));
}

#[tokio::test]
async fn cancelling_twice_reports_the_terminal_state() {
    let db = setup().await;
    let api = apis(&db, "APPROVED");

    let created = api.place_order(order_request()).await.unwrap();
    let student = Actor::new("cust-1", Role::Student);
    let cancelled = api
        .cancel_order(
            created.order.id,
            CancelRequest { reason: "changed my mind".to_string(), comment: None },
            &student,
        )
        .await
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatusType::Cancelado);
    assert_eq!(cancelled.order.cancel_reason.as_deref(), Some("changed my mind"));

    let err = api
        .cancel_order(
            created.order.id,
            CancelRequest { reason: "again".to_string(), comment: None },
            &student,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::OrderAlreadyCancelled));
}

#[tokio::test]
async fn webhook_replays_converge_and_never_touch_the_order() {
    let db = setup().await;
    let api = apis(&db, "APPROVED");

    let created = api.place_order(order_request()).await.unwrap();
    let txid = payment_for_order(&db, created.order.id).await.transaction_id;

    let payments = PaymentApi::new(db.clone(), ScriptedProvider { status: "APPROVED" }, EventProducers::default());
    let event = PaymentWebhookEvent {
        event: "transaction.updated".to_string(),
        data: PaymentWebhookData {
            transaction: PaymentWebhookTransaction {
                id: txid.clone(),
                status: "DECLINED".to_string(),
                reference: None,
                amount_in_cents: Some(3_150_000),
                status_message: Some("chargeback".to_string()),
            },
        },
        timestamp: Some(1_717_171_717),
    };
    payments.handle_webhook(event.clone()).await.unwrap();
    let first = db.fetch_payment_by_transaction_id(&txid).await.unwrap().unwrap();
    assert_eq!(first.status, PaymentStatus::Declined);
    let first_finalized = first.finalized_at.expect("finalized on the first webhook");

    payments.handle_webhook(event).await.unwrap();
    let second = db.fetch_payment_by_transaction_id(&txid).await.unwrap().unwrap();
    assert_eq!(second.status, PaymentStatus::Declined);
    assert_eq!(second.finalized_at, Some(first_finalized), "replays keep the first finalization time");
    assert!(second.raw_event.is_some());

    // Payment reconciliation never overwrites fulfillment's view of the order
    let order = db_order_status(&db, created.order.id).await;
    assert_eq!(order, OrderStatusType::Pendiente);
}

async fn db_order_status(db: &SqliteDatabase, order_id: i64) -> OrderStatusType {
    let status: (String,) = sqlx::query_as("SELECT status FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    status.0.parse().unwrap()
}

#[tokio::test]
async fn webhook_for_unmatched_transaction_is_ignored() {
    let db = setup().await;
    let payments = PaymentApi::new(db.clone(), ScriptedProvider { status: "APPROVED" }, EventProducers::default());
    let event = PaymentWebhookEvent {
        event: "transaction.updated".to_string(),
        data: PaymentWebhookData {
            transaction: PaymentWebhookTransaction {
                id: "tx-not-ours".to_string(),
                status: "APPROVED".to_string(),
                reference: None,
                amount_in_cents: None,
                status_message: None,
            },
        },
        timestamp: None,
    };
    payments.handle_webhook(event).await.unwrap();
}

#[tokio::test]
async fn unknown_dish_is_not_found() {
    let db = setup().await;
    let api = apis(&db, "APPROVED");
    let mut req = order_request();
    req.items[0].dish_id = 99;
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::NotFound(_)));
}
