//! Mock backends and fixtures shared by the api tests.

use chrono::{DateTime, Utc};
use comanda_common::Pesos;
use mockall::mock;

use crate::{
    db_types::{
        Dish,
        NewOrder,
        NewPayment,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatusType,
        Payment,
        PaymentInstrument,
        Restaurant,
    },
    order_objects::OrderQueryFilter,
    traits::{
        AvailabilityChecker,
        CatalogAccess,
        ChargeOutcome,
        ChargeRequest,
        OrderLookup,
        OrderManagement,
        PaymentManagement,
        PaymentProvider,
        PaymentProviderError,
        StatusChange,
        StorageError,
    },
};

mock! {
    pub Backend {}
    impl OrderManagement for Backend {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, StorageError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StorageError>;
        async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StorageError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorageError>;
        async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool, StorageError>;
        async fn customer_has_pending_order(&self, customer_id: &str, restaurant_id: i64) -> Result<bool, StorageError>;
        async fn apply_status_change(&self, order_id: i64, change: StatusChange) -> Result<Order, StorageError>;
        async fn cancel_order<'a>(&self, order_id: i64, reason: &str, restaurant_comment: Option<&'a str>) -> Result<Order, StorageError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorageError>;
    }
    impl CatalogAccess for Backend {
        async fn fetch_restaurant(&self, id: i64) -> Result<Option<Restaurant>, StorageError>;
        async fn fetch_dish(&self, id: i64) -> Result<Option<Dish>, StorageError>;
    }
    impl AvailabilityChecker for Backend {
        async fn is_available(&self, dish_id: i64, restaurant_id: i64) -> Result<bool, StorageError>;
    }
}

mock! {
    pub PaymentDb {}
    impl PaymentManagement for PaymentDb {
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StorageError>;
        async fn link_payment_to_order(&self, payment_id: i64, order_id: i64) -> Result<(), StorageError>;
        async fn fetch_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>, StorageError>;
        async fn finalize_payment(&self, transaction_id: &str, status: crate::db_types::PaymentStatus, raw_event: &serde_json::Value, finalized_at: DateTime<Utc>) -> Result<Payment, StorageError>;
        async fn fetch_instrument(&self, customer_id: &str, reference: &str) -> Result<Option<PaymentInstrument>, StorageError>;
        async fn fetch_default_instrument(&self, customer_id: &str) -> Result<Option<PaymentInstrument>, StorageError>;
        async fn fetch_customer_email(&self, customer_id: &str) -> Result<Option<String>, StorageError>;
    }
    impl OrderLookup for PaymentDb {
        async fn order_exists(&self, order_id: i64) -> Result<bool, StorageError>;
    }
}

mock! {
    pub Provider {}
    impl PaymentProvider for Provider {
        async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, PaymentProviderError>;
    }
}

//--------------------------------------      Fixtures       ---------------------------------------------------------

pub fn restaurant_fixture(id: i64, owner: &str, active: bool) -> Restaurant {
    Restaurant { id, owner_id: owner.to_string(), name: "La Arepa Dorada".to_string(), active }
}

pub fn dish_fixture(id: i64, restaurant_id: i64, price: i64) -> Dish {
    Dish {
        id,
        restaurant_id,
        name: format!("Dish {id}"),
        price: Pesos::from(price),
        active: true,
        available: true,
    }
}

pub fn instrument_fixture(customer_id: &str) -> PaymentInstrument {
    PaymentInstrument {
        id: 1,
        customer_id: customer_id.to_string(),
        token: "tok_visa_1".to_string(),
        brand: Some("VISA".to_string()),
        last_four: Some("4242".to_string()),
        is_default: true,
    }
}

pub fn approved_outcome(transaction_id: &str) -> ChargeOutcome {
    ChargeOutcome {
        transaction_id: transaction_id.to_string(),
        status: "APPROVED".to_string(),
        status_message: None,
        amount_in_cents: 3_150_000,
        currency: "COP".to_string(),
    }
}

pub fn payment_fixture(id: i64, new: NewPayment) -> Payment {
    let now = Utc::now();
    Payment {
        id,
        customer_id: new.customer_id,
        order_id: None,
        transaction_id: new.transaction_id,
        reference: new.reference,
        amount_cents: new.amount_cents,
        currency: new.currency,
        status: new.status,
        instrument_token: new.instrument_token,
        finalized_at: None,
        raw_event: None,
        created_at: now,
        updated_at: now,
    }
}

/// Materializes the order a backend would return after persisting `new`, in `PENDIENTE` with the placed
/// timestamp set and all milestones null.
pub fn order_from_new(id: i64, new: &NewOrder) -> Order {
    let now = Utc::now();
    Order {
        id,
        order_number: new.order_number.clone(),
        customer_id: new.customer_id.clone(),
        restaurant_id: new.restaurant_id,
        subtotal: new.subtotal,
        service_fee: new.service_fee,
        total: new.total,
        status: OrderStatusType::Pendiente,
        estimate_minutes: None,
        placed_at: now,
        accepted_at: None,
        ready_at: None,
        delivered_at: None,
        customer_comments: new.customer_comments.clone(),
        restaurant_comments: None,
        cancel_reason: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn order_fixture(id: i64, customer: &str, restaurant_id: i64, status: OrderStatusType) -> Order {
    let now = Utc::now();
    Order {
        id,
        order_number: OrderNumber::new_unchecked("#AB1-2C3"),
        customer_id: customer.to_string(),
        restaurant_id,
        subtotal: Pesos::from(30_000),
        service_fee: Pesos::from(1_500),
        total: Pesos::from(31_500),
        status,
        estimate_minutes: None,
        placed_at: now,
        accepted_at: None,
        ready_at: None,
        delivered_at: None,
        customer_comments: None,
        restaurant_comments: None,
        cancel_reason: None,
        created_at: now,
        updated_at: now,
    }
}
