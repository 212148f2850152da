use actix_web::{
    body::to_bytes,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
    ResponseError,
};
use serde_json::Value;

use crate::auth::{USER_ID_HEADER, USER_ROLE_HEADER};

/// Runs one request against a freshly configured test app and returns status + parsed JSON body (Null when the
/// body is not JSON). Middleware rejections surface as service errors; those are rendered to their error
/// response so callers can assert on the status like any other outcome.
pub async fn send(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, Value) {
    let app = test::init_service(App::new().configure(configure)).await;
    match test::try_call_service(&app, req.to_request()).await {
        Ok(response) => {
            let status = response.status();
            let body = test::read_body(response).await;
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        },
        Err(e) => {
            let response = e.as_response_error().error_response();
            let status = response.status();
            let body = to_bytes(response.into_body()).await.unwrap_or_default();
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        },
    }
}

pub fn as_user(req: TestRequest, user_id: &str, role: &str) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id)).insert_header((USER_ROLE_HEADER, role))
}
