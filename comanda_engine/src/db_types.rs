use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use comanda_common::Pesos;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

//--------------------------------------     OrderNumber       -------------------------------------------------------
/// The human-facing order identifier, e.g. `#7KQ-2F9`. Distinct from the opaque database id; other systems parse
/// this format, so it is validated on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(String);

pub const ORDER_NUMBER_PATTERN: &str = r"^#[A-Z0-9]{3}-[A-Z0-9]{3}$";

impl OrderNumber {
    /// Wraps a pre-validated order number. Use [`FromStr`] for untrusted input.
    pub fn new_unchecked<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the dash. Used to derive short payment references.
    pub fn suffix(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or_default()
    }
}

impl FromStr for OrderNumber {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = regex::Regex::new(ORDER_NUMBER_PATTERN).expect("order number pattern is valid");
        if re.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ConversionError(format!("Invalid order number: {s}")))
        }
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// Fulfillment status of an order. The happy path is linear; `Cancelado` is reachable from any non-terminal state
/// through the dedicated cancellation operation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// Paid for and waiting for the restaurant to accept it.
    Pendiente,
    /// Accepted by the restaurant, with an estimated preparation time.
    Aceptado,
    /// Being prepared.
    Preparando,
    /// Ready for pickup.
    Listo,
    /// Delivered to the customer. Terminal.
    Entregado,
    /// Cancelled. Terminal.
    Cancelado,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Entregado | OrderStatusType::Cancelado)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pendiente => write!(f, "PENDIENTE"),
            OrderStatusType::Aceptado => write!(f, "ACEPTADO"),
            OrderStatusType::Preparando => write!(f, "PREPARANDO"),
            OrderStatusType::Listo => write!(f, "LISTO"),
            OrderStatusType::Entregado => write!(f, "ENTREGADO"),
            OrderStatusType::Cancelado => write!(f, "CANCELADO"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDIENTE" => Ok(Self::Pendiente),
            "ACEPTADO" => Ok(Self::Aceptado),
            "PREPARANDO" => Ok(Self::Preparando),
            "LISTO" => Ok(Self::Listo),
            "ENTREGADO" => Ok(Self::Entregado),
            "CANCELADO" => Ok(Self::Cancelado),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pendiente");
            OrderStatusType::Pendiente
        })
    }
}

//--------------------------------------      Milestone        -------------------------------------------------------
/// The timestamp column a successful transition stamps on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    AcceptedAt,
    ReadyAt,
    DeliveredAt,
}

//--------------------------------------        Role           -------------------------------------------------------
/// The caller's role, as asserted by the upstream identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// An ordinary customer.
    Student,
    /// A restaurant owner.
    Owner,
    /// Platform staff.
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Owner => write!(f, "owner"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------        Actor          -------------------------------------------------------
/// An authenticated caller. Authorization predicates receive this, never raw transport headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new<S: Into<String>>(user_id: S, role: Role) -> Self {
        Self { user_id: user_id.into(), role }
    }
}

//--------------------------------------     Restaurant        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
    pub active: bool,
}

//--------------------------------------        Dish           -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub price: Pesos,
    pub active: bool,
    pub available: bool,
}

//-------------------------------------- PaymentInstrument -----------------------------------------------------------
/// A stored, tokenized card. The engine never sees raw card data, only the gateway token.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentInstrument {
    pub id: i64,
    pub customer_id: String,
    pub token: String,
    pub brand: Option<String>,
    pub last_four: Option<String>,
    pub is_default: bool,
}

//-------------------------------------- ToppingSelection ------------------------------------------------------------
/// Snapshot of the customer's topping choices for one line item, frozen at order time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToppingSelection {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

//--------------------------------------      OrderItem        -------------------------------------------------------
/// A line item, immutable once the order exists. The dish name and price are snapshots so historical orders stay
/// stable when the catalog changes.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub dish_id: i64,
    pub dish_name: String,
    pub quantity: i64,
    pub unit_price: Pesos,
    pub line_total: Pesos,
    pub toppings: Option<Json<ToppingSelection>>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub dish_id: i64,
    pub dish_name: String,
    pub quantity: i64,
    pub unit_price: Pesos,
    pub line_total: Pesos,
    pub toppings: Option<ToppingSelection>,
    pub comment: Option<String>,
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub restaurant_id: i64,
    pub subtotal: Pesos,
    pub service_fee: Pesos,
    pub total: Pesos,
    pub status: OrderStatusType,
    pub estimate_minutes: Option<i64>,
    pub placed_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub customer_comments: Option<String>,
    pub restaurant_comments: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder         -------------------------------------------------------
/// An order ready to be persisted. Built by the orchestrator only after payment approval.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub restaurant_id: i64,
    pub subtotal: Pesos,
    pub service_fee: Pesos,
    pub total: Pesos,
    pub customer_comments: Option<String>,
    pub items: Vec<NewOrderItem>,
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Declined,
    Voided,
    Error,
}

impl PaymentStatus {
    /// Maps the gateway's outcome vocabulary into the internal enum. Unrecognized statuses become `Error` rather
    /// than being dropped.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "APPROVED" => Self::Approved,
            "DECLINED" => Self::Declined,
            "PENDING" => Self::Pending,
            "VOIDED" => Self::Voided,
            other => {
                error!("💳️ Unrecognized gateway payment status: {other}. Recording it as ERROR.");
                Self::Error
            },
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Approved => write!(f, "APPROVED"),
            PaymentStatus::Declined => write!(f, "DECLINED"),
            PaymentStatus::Voided => write!(f, "VOIDED"),
            PaymentStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "DECLINED" => Ok(Self::Declined),
            "VOIDED" => Ok(Self::Voided),
            "ERROR" => Ok(Self::Error),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------       Payment         -------------------------------------------------------
/// A local record of a gateway charge. Created before its order; the order link is patched in afterwards and may
/// legitimately be absent (see the webhook reconciliation flow).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub customer_id: String,
    pub order_id: Option<i64>,
    pub transaction_id: String,
    pub reference: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub instrument_token: String,
    pub finalized_at: Option<DateTime<Utc>>,
    pub raw_event: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub customer_id: String,
    pub transaction_id: String,
    pub reference: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub instrument_token: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_number_validation() {
        assert!("#7KQ-2F9".parse::<OrderNumber>().is_ok());
        assert!("#ABC-123".parse::<OrderNumber>().is_ok());
        assert!("7KQ-2F9".parse::<OrderNumber>().is_err());
        assert!("#7kq-2f9".parse::<OrderNumber>().is_err());
        assert!("#7KQQ-2F9".parse::<OrderNumber>().is_err());
        assert!("#7KQ2F9".parse::<OrderNumber>().is_err());
    }

    #[test]
    fn order_number_suffix() {
        let n = OrderNumber::new_unchecked("#7KQ-2F9");
        assert_eq!(n.suffix(), "2F9");
    }

    #[test]
    fn status_round_trip() {
        for s in ["PENDIENTE", "ACEPTADO", "PREPARANDO", "LISTO", "ENTREGADO", "CANCELADO"] {
            let parsed: OrderStatusType = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("DELIVERED".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatusType::Entregado.is_terminal());
        assert!(OrderStatusType::Cancelado.is_terminal());
        assert!(!OrderStatusType::Pendiente.is_terminal());
        assert!(!OrderStatusType::Listo.is_terminal());
    }

    #[test]
    fn provider_status_mapping() {
        assert_eq!(PaymentStatus::from_provider("APPROVED"), PaymentStatus::Approved);
        assert_eq!(PaymentStatus::from_provider("DECLINED"), PaymentStatus::Declined);
        assert_eq!(PaymentStatus::from_provider("PENDING"), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_provider("VOIDED"), PaymentStatus::Voided);
        assert_eq!(PaymentStatus::from_provider("WEIRD_NEW_STATUS"), PaymentStatus::Error);
    }
}
