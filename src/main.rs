mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};

use config::Settings;
use core::MatchEngine;
use routes::matches::AppState;
use services::{run_event_logger, BackendClient, CacheManager, EventBus, MatchCache, PostgresClient};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap_or_default())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting CraftLink matching service...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize the platform backend client (Request Store)
    let backend = Arc::new(
        BackendClient::new(settings.backend.endpoint.clone(), settings.backend.api_key.clone())
            .unwrap_or_else(|e| {
                error!("Failed to build backend client: {}", e);
                panic!("Backend client error: {}", e);
            }),
    );

    info!("Backend client initialized");

    // Initialize the cache (optional: matching recomputes without it)
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);
    let cache = match CacheManager::new(&settings.cache.redis_url, l1_cache_size).await {
        Ok(manager) => {
            info!("Cache manager initialized (L1: {} entries)", l1_cache_size);
            MatchCache::new(Some(Arc::new(manager)))
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), running without cache", e);
            MatchCache::disabled()
        }
    };

    // Initialize the Listing/Collaboration store client
    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
        )
        .await
        .unwrap_or_else(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            panic!("PostgreSQL connection error: {}", e);
        }),
    );

    info!("PostgreSQL client initialized");

    // Assemble the matching engine
    let engine_config = settings.engine_config();
    info!(
        "Engine configured: fan-out {}, caps {}/{} per provider, thresholds {}/{}",
        engine_config.fan_out_limit,
        engine_config.caps.total,
        engine_config.caps.per_provider,
        engine_config.advanced_min_score,
        engine_config.legacy_min_score
    );

    let engine = Arc::new(MatchEngine::new(
        Arc::clone(&postgres),
        Arc::clone(&postgres),
        Arc::new(cache.clone()),
        engine_config,
    ));

    // Matches-computed events feed the (external) notification pipeline
    let (events, receiver) = EventBus::new();
    tokio::spawn(run_event_logger(receiver));

    let app_state = AppState {
        backend,
        postgres,
        cache,
        engine,
        events,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
