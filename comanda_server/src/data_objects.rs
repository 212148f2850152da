use std::fmt::Display;

use comanda_common::Pesos;
use comanda_engine::{
    db_types::{NewOrderItem, OrderStatusType, ToppingSelection},
    order_objects::{CancelRequest, NewOrderRequest, StatusUpdateRequest},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    pub restaurant_id: i64,
    pub items: Vec<OrderItemBody>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub payment_instrument_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody {
    pub dish_id: i64,
    pub dish_name: String,
    pub quantity: i64,
    /// Whole pesos.
    pub unit_price: i64,
    /// Whole pesos; must equal `quantity * unit_price`.
    pub line_total: i64,
    #[serde(default)]
    pub toppings: Option<ToppingSelection>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl CreateOrderBody {
    pub fn into_request(self, customer_id: String) -> NewOrderRequest {
        NewOrderRequest {
            customer_id,
            restaurant_id: self.restaurant_id,
            items: self.items.into_iter().map(OrderItemBody::into_item).collect(),
            comments: self.comments,
            payment_instrument_ref: self.payment_instrument_ref,
        }
    }
}

impl OrderItemBody {
    fn into_item(self) -> NewOrderItem {
        NewOrderItem {
            dish_id: self.dish_id,
            dish_name: self.dish_name,
            quantity: self.quantity,
            unit_price: Pesos::from(self.unit_price),
            line_total: Pesos::from(self.line_total),
            toppings: self.toppings,
            comment: self.comment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateBody {
    pub status: OrderStatusType,
    #[serde(default)]
    pub estimate_minutes: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl From<StatusUpdateBody> for StatusUpdateRequest {
    fn from(body: StatusUpdateBody) -> Self {
        Self { status: body.status, estimate_minutes: body.estimate_minutes, comment: body.comment }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBody {
    pub reason: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl From<CancelBody> for CancelRequest {
    fn from(body: CancelBody) -> Self {
        Self { reason: body.reason, comment: body.comment }
    }
}

/// Query parameters for the "my orders" listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyOrdersParams {
    #[serde(default)]
    pub status: Option<OrderStatusType>,
}
