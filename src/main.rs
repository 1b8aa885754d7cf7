use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpServer, Responder, get};
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod store;
mod utils;


use config::{Config, StoreKind};
use db::init_db;

use crate::docs::ApiDoc;
use crate::service::Services;
use crate::store::{Ledger, memory::MemoryLedger, mysql::MySqlLedger};
use crate::utils::email_registry::EmailRegistry;
use anyhow::Context;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Travel leave service"
}

async fn build_ledger(config: &Config) -> anyhow::Result<Arc<dyn Ledger>> {
    match config.store {
        StoreKind::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the mysql store")?;
            let pool = init_db(url).await?;
            Ok(Arc::new(MySqlLedger::new(pool)))
        }
        StoreKind::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryLedger::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(store = ?config.store, "Server starting...");

    let ledger = build_ledger(&config).await?;
    let emails = Arc::new(EmailRegistry::new());

    let ledger_for_warmup = ledger.clone();
    let emails_for_warmup = emails.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = emails_for_warmup.warmup(&*ledger_for_warmup, 500).await {
            error!(error = %e, "Failed to warm up email registry");
        }
    });

    let services = Services::new(ledger, emails);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone(), services.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
