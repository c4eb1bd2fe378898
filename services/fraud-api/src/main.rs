use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use fraud_api::{config::Config, database, handlers, handlers::ServiceInfo};
use fraud_engine::ScoringEngine;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    info!("Starting Fraud API...");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Configuration failed: {}", e),
            ));
        }
    };
    info!("Configuration loaded successfully");

    let engine = match ScoringEngine::from_config(&config.engine) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Failed to build scoring engine: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Scoring engine setup failed: {}", e),
            ));
        }
    };
    info!(rules = ?engine.rule_names(), "Scoring engine initialized");

    let transaction_log = database::build_transaction_log(&config.database).await;
    let service_info = ServiceInfo::new(config.service.model_version.clone());

    let server_config = config.server.clone();

    info!(
        "Starting HTTP server on {}:{}",
        server_config.host, server_config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(engine.clone()))
            .app_data(web::Data::new(transaction_log.clone()))
            .app_data(web::Data::new(service_info.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .workers(server_config.workers)
    .bind((server_config.host, server_config.port))?
    .run()
    .await
}
