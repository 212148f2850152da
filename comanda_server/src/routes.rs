//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will
//! cause the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database
//! calls, gateway calls) must be awaited, never blocked on.

use actix_web::{get, web, HttpResponse, Responder};
use comanda_engine::{
    order_objects::OrderQueryFilter,
    traits::{OrderBackend, PaymentBackend, PaymentProvider},
    OrderFlowApi,
    PaymentApi,
    PaymentWebhookEvent,
};
use log::*;

use crate::{
    auth::AuthenticatedActor,
    data_objects::{CancelBody, CreateOrderBody, JsonResponse, MyOrdersParams, StatusUpdateBody},
    errors::ServerError,
};

// Actix cannot handle generics in handlers, so routes are wired manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderBackend, PaymentBackend, PaymentProvider);
/// Creates a paid order for the calling customer.
///
/// The body carries the cart (restaurant, line items with snapshot pricing, optional comments) and an optional
/// stored-instrument reference; without one, the customer's default card is charged. The order is returned only
/// after the charge was approved and the order persisted.
pub async fn create_order<B, BPay, P>(
    actor: AuthenticatedActor,
    body: web::Json<CreateOrderBody>,
    api: web::Data<OrderFlowApi<B, BPay, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderBackend + 'static,
    BPay: PaymentBackend + 'static,
    P: PaymentProvider + 'static,
{
    debug!("💻️ POST /orders for customer {}", actor.user_id);
    let request = body.into_inner().into_request(actor.user_id.clone());
    let order = api.place_order(request).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderBackend, PaymentBackend, PaymentProvider);
/// The calling customer's own orders, oldest first, optionally filtered by status.
pub async fn my_orders<B, BPay, P>(
    actor: AuthenticatedActor,
    params: web::Query<MyOrdersParams>,
    api: web::Data<OrderFlowApi<B, BPay, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderBackend + 'static,
    BPay: PaymentBackend + 'static,
    P: PaymentProvider + 'static,
{
    debug!("💻️ GET /orders for customer {}", actor.user_id);
    let mut filter = OrderQueryFilter::default();
    if let Some(status) = params.into_inner().status {
        filter = filter.with_status(status);
    }
    let orders = api.orders_for_customer(&actor.user_id, filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl OrderBackend, PaymentBackend, PaymentProvider);
pub async fn order_by_id<B, BPay, P>(
    actor: AuthenticatedActor,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, BPay, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderBackend + 'static,
    BPay: PaymentBackend + 'static,
    P: PaymentProvider + 'static,
{
    let id = path.into_inner();
    debug!("💻️ GET /orders/{id}");
    let order = api.order_for_actor(id, &actor).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Patch "/orders/{id}/status" impl OrderBackend, PaymentBackend, PaymentProvider);
/// Moves an order along the fulfillment workflow. Owner/admin only; accepting requires an estimate.
/// Cancellation is explicitly not reachable from here.
pub async fn update_order_status<B, BPay, P>(
    actor: AuthenticatedActor,
    path: web::Path<i64>,
    body: web::Json<StatusUpdateBody>,
    api: web::Data<OrderFlowApi<B, BPay, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderBackend + 'static,
    BPay: PaymentBackend + 'static,
    P: PaymentProvider + 'static,
{
    let id = path.into_inner();
    let body = body.into_inner();
    debug!("💻️ PATCH /orders/{id}/status to {} by {}", body.status, actor.user_id);
    let order = api.update_status(id, body.into(), &actor).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl OrderBackend, PaymentBackend, PaymentProvider);
pub async fn cancel_order<B, BPay, P>(
    actor: AuthenticatedActor,
    path: web::Path<i64>,
    body: web::Json<CancelBody>,
    api: web::Data<OrderFlowApi<B, BPay, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderBackend + 'static,
    BPay: PaymentBackend + 'static,
    P: PaymentProvider + 'static,
{
    let id = path.into_inner();
    debug!("💻️ POST /orders/{id}/cancel by {}", actor.user_id);
    let order = api.cancel_order(id, body.into_inner().into(), &actor).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(wompi_webhook => Post "/webhook" impl PaymentBackend, PaymentProvider);
/// Gateway webhook receiver. The HMAC middleware has already rejected unsigned or mis-signed deliveries; from
/// here on every outcome answers 200 so the gateway does not retry; processing failures are logged, not
/// surfaced.
pub async fn wompi_webhook<BPay, P>(
    body: web::Json<PaymentWebhookEvent>,
    api: web::Data<PaymentApi<BPay, P>>,
) -> HttpResponse
where
    BPay: PaymentBackend + 'static,
    P: PaymentProvider + 'static,
{
    let event = body.into_inner();
    trace!("💻️🪝️ Received gateway webhook {} for tx {}", event.event, event.data.transaction.id);
    let result = match api.handle_webhook(event).await {
        Ok(()) => JsonResponse::success("Webhook processed."),
        Err(e) => {
            warn!("💻️🪝️ Webhook processing failed: {e}");
            JsonResponse::failure("Webhook could not be processed.")
        },
    };
    HttpResponse::Ok().json(result)
}
