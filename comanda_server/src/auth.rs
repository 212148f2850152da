//! Caller identity extraction.
//!
//! Authentication itself lives upstream: the API gateway terminates the session and injects the verified
//! identity into `X-User-Id` / `X-User-Role` headers on every proxied request. This module only parses those
//! headers into an [`Actor`]; all authorization decisions are made inside the engine against that actor.

use std::{
    future::{ready, Ready},
    ops::Deref,
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use comanda_engine::db_types::{Actor, Role};

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone)]
pub struct AuthenticatedActor(pub Actor);

impl Deref for AuthenticatedActor {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AuthenticatedActor {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_actor(req))
    }
}

fn extract_actor(req: &HttpRequest) -> Result<AuthenticatedActor, ServerError> {
    let user_id = header_string(req, USER_ID_HEADER)?;
    let role = header_string(req, USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|e| ServerError::Unauthenticated(e.to_string()))?;
    Ok(AuthenticatedActor(Actor::new(user_id, role)))
}

fn header_string(req: &HttpRequest, name: &str) -> Result<String, ServerError> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| ServerError::Unauthenticated(format!("Missing {name} header")))
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn parses_identity_headers() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "cust-1"))
            .insert_header((USER_ROLE_HEADER, "student"))
            .to_http_request();
        let actor = extract_actor(&req).unwrap();
        assert_eq!(actor.user_id, "cust-1");
        assert_eq!(actor.role, Role::Student);
    }

    #[actix_web::test]
    async fn missing_or_bogus_headers_are_unauthenticated() {
        let req = TestRequest::default().to_http_request();
        assert!(extract_actor(&req).is_err());

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "cust-1"))
            .insert_header((USER_ROLE_HEADER, "superuser"))
            .to_http_request();
        assert!(extract_actor(&req).is_err());
    }
}
