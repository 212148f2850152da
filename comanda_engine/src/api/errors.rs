use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::traits::StorageError;

/// Stable machine-readable codes for business-rule failures. Clients branch on these strings, so renaming one is
/// a breaking API change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RestaurantInactive,
    OrderAlreadyPending,
    DishNotAvailable,
    DishRestaurantMismatch,
    DishInactive,
    PaymentFailed,
    PaymentNoCard,
    PaymentWompiError,
    PaymentDeclined,
    OrderStatusUseCancelEndpoint,
    OrderStatusAlreadyCancelled,
    OrderStatusAlreadyDelivered,
    OrderStatusTransitionInvalid,
    OrderEstimateRequired,
    OrderCancelReasonRequired,
    OrderAlreadyCancelled,
    OrderCancelDelivered,
    OrderCancelInvalidStatus,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RestaurantInactive => "RESTAURANT_INACTIVE",
            ErrorCode::OrderAlreadyPending => "ORDER_ALREADY_PENDING",
            ErrorCode::DishNotAvailable => "DISH_NOT_AVAILABLE",
            ErrorCode::DishRestaurantMismatch => "DISH_RESTAURANT_MISMATCH",
            ErrorCode::DishInactive => "DISH_INACTIVE",
            ErrorCode::PaymentFailed => "PAYMENT_FAILED",
            ErrorCode::PaymentNoCard => "PAYMENT_NO_CARD",
            ErrorCode::PaymentWompiError => "PAYMENT_WOMPI_ERROR",
            ErrorCode::PaymentDeclined => "PAYMENT_DECLINED",
            ErrorCode::OrderStatusUseCancelEndpoint => "ORDER_STATUS_USE_CANCEL_ENDPOINT",
            ErrorCode::OrderStatusAlreadyCancelled => "ORDER_STATUS_ALREADY_CANCELLED",
            ErrorCode::OrderStatusAlreadyDelivered => "ORDER_STATUS_ALREADY_DELIVERED",
            ErrorCode::OrderStatusTransitionInvalid => "ORDER_STATUS_TRANSITION_INVALID",
            ErrorCode::OrderEstimateRequired => "ORDER_ESTIMATE_REQUIRED",
            ErrorCode::OrderCancelReasonRequired => "ORDER_CANCEL_REASON_REQUIRED",
            ErrorCode::OrderAlreadyCancelled => "ORDER_ALREADY_CANCELLED",
            ErrorCode::OrderCancelDelivered => "ORDER_CANCEL_DELIVERED",
            ErrorCode::OrderCancelInvalidStatus => "ORDER_CANCEL_INVALID_STATUS",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's failure taxonomy. Everything the orchestration flows can refuse to do maps onto one of these;
/// the server layer translates them to HTTP statuses without looking inside message strings.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0} was not found")]
    NotFound(String),
    #[error("Insufficient permissions. {0}")]
    Forbidden(String),
    #[error("{code}: {message}")]
    BusinessRule {
        code: ErrorCode,
        message: String,
        details: Option<Value>,
    },
    #[error("Invalid request. {0}")]
    Validation(String),
}

impl OrderFlowError {
    pub fn rule<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self::BusinessRule { code, message: message.into(), details: None }
    }

    pub fn rule_with_details<S: Into<String>>(code: ErrorCode, message: S, details: Value) -> Self {
        Self::BusinessRule { code, message: message.into(), details: Some(details) }
    }

    pub fn not_found<S: Display>(what: S) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden(message.into())
    }

    /// The machine code, for business-rule failures.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::BusinessRule { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<StorageError> for OrderFlowError {
    fn from(e: StorageError) -> Self {
        match e {
            // The partial unique index tripping means another request won the pending-order race
            StorageError::DuplicatePendingOrder => OrderFlowError::rule(
                ErrorCode::OrderAlreadyPending,
                "There is already a pending order for this customer at this restaurant",
            ),
            StorageError::OrderIdNotFound(id) => OrderFlowError::NotFound(format!("Order {id}")),
            other => OrderFlowError::DatabaseError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_serialize_to_their_wire_strings() {
        for (code, expected) in [
            (ErrorCode::OrderAlreadyPending, "\"ORDER_ALREADY_PENDING\""),
            (ErrorCode::PaymentWompiError, "\"PAYMENT_WOMPI_ERROR\""),
            (ErrorCode::OrderStatusUseCancelEndpoint, "\"ORDER_STATUS_USE_CANCEL_ENDPOINT\""),
        ] {
            assert_eq!(serde_json::to_string(&code).unwrap(), expected);
            assert_eq!(format!("\"{code}\""), expected);
        }
    }

    #[test]
    fn pending_index_violation_becomes_the_business_rule() {
        let err: OrderFlowError = StorageError::DuplicatePendingOrder.into();
        assert_eq!(err.code(), Some(ErrorCode::OrderAlreadyPending));
    }
}
