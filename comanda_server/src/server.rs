use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use comanda_engine::{events::EventHandlers, OrderFlowApi, PaymentApi, SqliteDatabase};
use log::info;

use crate::{
    config::{ServerConfig, WEBHOOK_SIGNATURE_HEADER},
    errors::ServerError,
    integrations::wompi::WompiProvider,
    middleware::HmacMiddlewareFactory,
    notifiers::{notification_hooks, LogNotifier},
    routes::{
        health,
        CancelOrderRoute,
        CreateOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        UpdateOrderStatusRoute,
        WompiWebhookRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 32;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let provider = WompiProvider::new(config.wompi.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks(Arc::new(LogNotifier)));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    info!("🚀️ Notification hooks are live");
    let srv = create_server_instance(config, db, provider, producers)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    provider: WompiProvider,
    producers: comanda_engine::events::EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let payments_api = PaymentApi::new(db.clone(), provider.clone(), producers.clone());
        let orders_api = OrderFlowApi::new(
            db.clone(),
            PaymentApi::new(db.clone(), provider.clone(), producers.clone()),
            producers.clone(),
        );
        let webhook_scope = web::scope("/wompi")
            .wrap(HmacMiddlewareFactory::new(
                WEBHOOK_SIGNATURE_HEADER,
                config.wompi.events_secret.clone(),
                config.wompi.signature_checks,
            ))
            .service(WompiWebhookRoute::<SqliteDatabase, WompiProvider>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("comanda::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase, SqliteDatabase, WompiProvider>::new())
            .service(MyOrdersRoute::<SqliteDatabase, SqliteDatabase, WompiProvider>::new())
            .service(OrderByIdRoute::<SqliteDatabase, SqliteDatabase, WompiProvider>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase, SqliteDatabase, WompiProvider>::new())
            .service(CancelOrderRoute::<SqliteDatabase, SqliteDatabase, WompiProvider>::new())
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
