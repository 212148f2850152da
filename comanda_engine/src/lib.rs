//! Comanda Engine
//!
//! The order-fulfillment and payment core of the comanda food-ordering platform. This library turns a
//! customer's cart into a paid, trackable order and drives that order through the restaurant workflow. It is
//! transport-agnostic: the HTTP server is a separate crate.
//!
//! The library is divided into three main sections:
//! 1. Storage management ([`mod@sqlite`]). SQLite is the supported backend. You should never need to touch the
//!    database directly; everything goes through the public APIs, which are generic over the backend traits in
//!    [`mod@traits`]. The data types shared with storage live in [`mod@db_types`] and are public.
//! 2. The engine public API ([`OrderFlowApi`] and [`PaymentApi`]). Order creation, the status state machine,
//!    cancellation, and payment-gateway coordination including webhook reconciliation.
//! 3. A set of events ([`mod@events`]) emitted when orders are created, move status, or are cancelled, and when
//!    payments are declined asynchronously. Subscribers run on detached tasks; a failing subscriber can never
//!    fail the flow that produced the event, which is how all notifications stay best-effort.

mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

pub use api::{
    authz,
    errors::{ErrorCode, OrderFlowError},
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_api::{
        ChargeReceipt,
        PaymentApi,
        PaymentWebhookData,
        PaymentWebhookEvent,
        PaymentWebhookTransaction,
    },
    state,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
