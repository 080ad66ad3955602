use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod attendance;
mod auth;
mod client;
mod config;
mod docs;
mod error;
mod model;
mod routes;

use config::Config;

use crate::attendance::reconciler::Reconciler;
use crate::attendance::scanner::ScanDialog;
use crate::client::api_client::ApiClient;
use crate::client::attendance_store::{AttendanceStore, RestAttendanceStore};
use crate::routes::Limiters;
use tracing::info;
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Gym attendance desk"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        store = %config.api_base_url,
        strategy = %config.reconcile_strategy,
        "Server starting..."
    );

    let client = ApiClient::new(
        &config.api_base_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let store: Arc<dyn AttendanceStore> = Arc::new(RestAttendanceStore::new(client));
    let reconciler = Data::new(Reconciler::new(
        store.clone(),
        config.reconcile_strategy,
        config.default_session_type.clone(),
    ));
    let store = Data::from(store);
    // one front desk per process
    let dialog = Data::new(ScanDialog::default());
    let limiters = Limiters::from_config(&config)?;

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());
    let openapi = docs::openapi_for(&config.api_prefix);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(store.clone())
            .app_data(reconciler.clone())
            .app_data(dialog.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
