use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;

mod clients;
mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use crate::clients::chat_client::ChatClient;
use crate::config::AppSettings;
use crate::middleware::admin_auth::AdminAuth;
use crate::middleware::rate_limiting::{
    RateLimitMiddleware, RateLimitStorage, start_window_sweep_task,
};
use crate::services::estimation::EstimationService;
use crate::services::usage_store::UsageStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load application settings
    let app_settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };
    log::info!("Using {} API", app_settings.provider.name);

    // Usage store backs both the AI endpoints and the admin views
    let usage_store = Arc::new(UsageStore::new(&app_settings.usage_log.path));
    if let Err(e) = usage_store.init().await {
        log::error!("Failed to initialize usage log: {}", e);
        std::process::exit(1);
    }
    log::info!("Usage log at {}", usage_store.path().display());

    // Rate limit state is shared across workers, with a background sweep
    let rate_limit_storage = RateLimitStorage::new();
    tokio::spawn(start_window_sweep_task(
        rate_limit_storage.clone(),
        app_settings.rate_limit.clone(),
    ));

    let estimation_service = web::Data::new(EstimationService::new(
        ChatClient::new(&app_settings.provider),
        Arc::clone(&usage_store),
        app_settings.app.is_development(),
    ));
    let usage_store_data = web::Data::from(usage_store);

    let host = &app_settings.server.host;
    let port = app_settings.server.port;
    log::info!("Starting server at http://{}:{}", host, port);

    let listener = TcpListener::bind(format!("{}:{}", host, port))?;

    HttpServer::new(move || {
        let app_settings = app_settings.clone();

        // Configure CORS using actix-cors
        let mut cors = Cors::default().supports_credentials();
        if app_settings.server.cors_origins.contains(&"*".to_string()) {
            cors = cors.allow_any_origin();
        } else {
            for origin in &app_settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(estimation_service.clone())
            .app_data(usage_store_data.clone())
            // Health checks stay outside the rate limiter
            .service(web::resource("/health").route(web::get().to(handlers::health::health_check)))
            .service(
                web::resource("/api/health").route(web::get().to(handlers::health::health_check)),
            )
            .service(
                web::scope("/api")
                    .wrap(RateLimitMiddleware::new(
                        app_settings.rate_limit.clone(),
                        rate_limit_storage.clone(),
                    ))
                    .configure(routes::configure_api_routes),
            )
            .service(
                web::scope("/admin")
                    .wrap(AdminAuth::new(&app_settings.admin.password))
                    .configure(routes::configure_admin_routes),
            )
    })
    .listen(listener)?
    .run()
    .await
}
