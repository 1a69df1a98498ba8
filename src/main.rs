use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use hrm_leave::config::Config;
use hrm_leave::db::{init_db, run_migrations};
use hrm_leave::docs::ApiDoc;
use hrm_leave::leave::{AutoApprovalScheduler, LeaveService};
use hrm_leave::routes;
use hrm_leave::store::SystemClock;
use hrm_leave::store::mysql::{MySqlEmployeeDirectory, MySqlLeaveStore, MySqlNotificationSink};
use hrm_leave::telemetry;

#[get("/")]
async fn index() -> impl Responder {
    "HRM leave service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _guard = telemetry::init(&config.log_dir);

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url).await?;
    run_migrations(&pool).await?;

    let service = Arc::new(LeaveService::new(
        Arc::new(MySqlLeaveStore::new(pool.clone())),
        Arc::new(MySqlEmployeeDirectory::new(pool.clone())),
        Arc::new(MySqlNotificationSink::new(pool.clone())),
        Arc::new(SystemClock),
        config.leave.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = AutoApprovalScheduler::new(Arc::clone(&service));
    let scheduler_task = actix_web::rt::spawn(scheduler.run(shutdown_rx));

    let server_addr = config.server_addr.clone();
    let service_data = Data::from(Arc::clone(&service));
    let config_data = config.clone();

    let served = HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets match
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config_data.clone()))
            .app_data(service_data.clone())
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await;

    info!("HTTP server stopped, stopping leave scheduler");
    // An in-flight item finishes its own transaction before the loop exits.
    if shutdown_tx.send(true).is_err() {
        debug!("Leave scheduler already stopped");
    }
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Leave scheduler task failed");
    }

    served.context("HTTP server failed")
}
