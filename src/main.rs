#[cfg(test)]
#[macro_use]
mod test_support;

mod config;
mod db;
mod error;
mod handlers;
mod i18n;
mod models;
mod routes;
mod session;
mod state;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();
    let port = config.port;

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| io_error("failed to initialize SQLite pool", e))?;

    session::purge_expired_sessions(&pool)
        .await
        .map_err(|e| io_error("failed to purge expired sessions", e))?;

    if config.seed_on_startup {
        db::seed(&pool, &config)
            .await
            .map_err(|e| io_error("failed to seed database", e))?;
    }

    tracing::info!(
        port,
        upload_mode = ?config.upload_mode,
        upload_dir = %config.upload_dir.display(),
        "starting car directory backend"
    );
    let app_state = web::Data::new(AppState::new(pool, config));

    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
