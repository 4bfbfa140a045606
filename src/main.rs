use actix_request_identifier::{IdReuse, RequestIdentifier};
use actix_web::web::Data;
use anyhow::Context;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::access::SessionStore;
use crate::book::SchemeBook;
use crate::config::Config;

mod access;
mod allocator;
mod book;
mod config;
mod database;
mod domain;
mod error;
mod i18n;
mod idgen;
mod ledger;
mod password;
mod proto;
mod responses;
mod routes;
mod schema;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // setup tracing and use bunyan formatter
    let level = config.log_level;
    let formatting_layer = BunyanFormattingLayer::new("scheme-ledger".into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(filter_fn(move |metadata| *metadata.level() <= level))
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    let repo = database::open(&config.storage).context("opening storage")?;
    let book = SchemeBook::new(repo, config.book);
    book.seed_admin(&config.admin_username, &config.admin_password)
        .context("seeding administrator")?;

    let book = Data::new(book);
    let sessions = Data::new(SessionStore::new());

    let backend = match &config.storage {
        database::StorageConfig::Local { path: Some(_) } => "local-file",
        database::StorageConfig::Local { path: None } => "memory",
        database::StorageConfig::Postgres { .. } => "postgres",
    };
    info!(address = %config.bind_address, backend, "starting server");
    let server = actix_web::HttpServer::new(move || {
        actix_web::App::new()
            .wrap(RequestIdentifier::with_uuid().use_incoming_id(IdReuse::UseIncoming))
            .wrap(TracingLogger::default())
            .app_data(book.clone())
            .app_data(sessions.clone())
            .configure(routes::configure)
    });

    server
        .bind(&config.bind_address)
        .with_context(|| format!("binding {}", config.bind_address))?
        .run()
        .await?;
    Ok(())
}
