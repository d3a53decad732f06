use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::sqlite::SqlitePoolOptions;

mod config;
mod handlers;
mod middleware;
mod models;
mod services;

use config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    log::info!("Starting server at {}:{}", config.host, config.port);

    if config.admin_ids.is_empty() {
        log::warn!("ADMIN_IDS is empty; admin endpoints will reject every caller");
    }

    // Create database pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    log::info!("Database migrations completed");

    // Create app state
    let app_state = web::Data::new(models::AppState {
        db: pool,
        config: config.clone(),
    });

    let cors_origins = config.cors_origins.clone();

    // Start HTTP server
    HttpServer::new(move || {
        let allowed_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins.iter().any(|allowed| {
                    origin_str.starts_with(allowed)
                })
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
