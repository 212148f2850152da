use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use comanda_engine::OrderFlowError;
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Authentication headers missing or malformed. {0}")]
    Unauthenticated(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    OrderFlow(#[from] OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::OrderFlow(e) => match e {
                OrderFlowError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::Forbidden(_) => StatusCode::FORBIDDEN,
                OrderFlowError::BusinessRule { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                OrderFlowError::Validation(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Every failure renders `{message, errorCode, details?}`. Business rules carry their stable machine code;
    /// everything else gets a generic one, so clients can always branch without string-matching messages.
    fn error_response(&self) -> HttpResponse {
        let (message, error_code, details) = match self {
            Self::OrderFlow(e) => match e {
                OrderFlowError::BusinessRule { code, message, details } => {
                    (message.clone(), code.as_str(), details.clone())
                },
                OrderFlowError::NotFound(_) => (e.to_string(), "NOT_FOUND", None),
                OrderFlowError::Forbidden(_) => (e.to_string(), "FORBIDDEN", None),
                OrderFlowError::Validation(_) => (e.to_string(), "VALIDATION_ERROR", None),
                OrderFlowError::DatabaseError(inner) => {
                    error!("💻️ Database error surfaced to a request: {inner}");
                    ("An internal error occurred.".to_string(), "INTERNAL_ERROR", None)
                },
            },
            Self::Unauthenticated(_) => (self.to_string(), "UNAUTHENTICATED", None),
            Self::InvalidRequestBody(_) => (self.to_string(), "VALIDATION_ERROR", None),
            _ => {
                error!("💻️ Internal server error: {self}");
                ("An internal error occurred.".to_string(), "INTERNAL_ERROR", None)
            },
        };
        let mut body = json!({ "message": message, "errorCode": error_code });
        if let Some(details) = details {
            body["details"] = details;
        }
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[cfg(test)]
mod test {
    use comanda_engine::ErrorCode;

    use super::*;

    #[test]
    fn business_rules_map_to_422_with_their_code() {
        let err = ServerError::from(OrderFlowError::rule(ErrorCode::OrderAlreadyPending, "nope"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(
            ServerError::from(OrderFlowError::not_found("Order 1")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::from(OrderFlowError::forbidden("no")).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServerError::from(OrderFlowError::Validation("bad".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(OrderFlowError::DatabaseError("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ServerError::Unauthenticated("no headers".into()).status_code(), StatusCode::UNAUTHORIZED);
    }
}
