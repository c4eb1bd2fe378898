use crate::errors::{ApiError, ApiResult};
use crate::metrics;
use crate::models::*;
use actix_web::{web, HttpRequest, HttpResponse};
use fraud_engine::audit::{TransactionLog, TransactionLogRecord};
use fraud_engine::{ScoringEngine, Transaction};
use std::sync::Arc;
use std::time::Instant;
use validator::Validate;

/// Identity and start time reported by the status endpoints
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub model_version: String,
    pub started_at: Instant,
}

impl ServiceInfo {
    pub fn new(model_version: impl Into<String>) -> Self {
        Self {
            model_version: model_version.into(),
            started_at: Instant::now(),
        }
    }
}

// ===== Service Status =====
pub async fn root_status(info: web::Data<ServiceInfo>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: "active".to_string(),
        model_version: info.model_version.clone(),
    })
}

// ===== Health Check =====
pub async fn health_check(info: web::Data<ServiceInfo>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: info.started_at.elapsed().as_secs(),
    })
}

// ===== Score Transaction =====
pub async fn predict(
    req: web::Json<TransactionRequest>,
    engine: web::Data<Arc<ScoringEngine>>,
    log: web::Data<Arc<dyn TransactionLog>>,
) -> ApiResult<HttpResponse> {
    let request = req.into_inner();
    request.validate()?;

    let txn = Transaction::from(request);

    let timer = metrics::SCORING_DURATION.start_timer();
    let result = engine.score(&txn).await;
    timer.observe_duration();
    metrics::record_score(&result);

    // Logging happens off the response path
    let record = TransactionLogRecord::new(&txn, &result);
    let log = log.get_ref().clone();
    tokio::spawn(async move {
        log.record(&record).await;
    });

    Ok(HttpResponse::Ok().json(result))
}

// ===== Prometheus Metrics =====
pub async fn prometheus_metrics() -> ApiResult<HttpResponse> {
    let body = metrics::metrics_handler().map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

// ===== Signal Circuit Breaker Status =====
pub async fn signal_circuit_status(engine: web::Data<Arc<ScoringEngine>>) -> ApiResult<HttpResponse> {
    let breaker = engine
        .signal_breaker()
        .ok_or_else(|| ApiError::NotFound("no model endpoint configured".to_string()))?;
    Ok(HttpResponse::Ok().json(breaker.get_state().await))
}

// ===== Reset Signal Circuit Breaker =====
pub async fn reset_signal_circuit(engine: web::Data<Arc<ScoringEngine>>) -> ApiResult<HttpResponse> {
    let breaker = engine
        .signal_breaker()
        .ok_or_else(|| ApiError::NotFound("no model endpoint configured".to_string()))?;
    breaker.reset().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({"status": "reset"})))
}

/// Malformed or incomplete JSON bodies become validation errors
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req: &HttpRequest| ApiError::ValidationError(err.to_string()).into())
}

// ===== Configure Routes =====
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(
            web::scope("/api/v1/fraud")
                .route("/score", web::post().to(predict))
                .route(
                    "/signal/circuit-breaker",
                    web::get().to(signal_circuit_status),
                )
                .route(
                    "/signal/circuit-breaker/reset",
                    web::post().to(reset_signal_circuit),
                ),
        )
        .route("/predict", web::post().to(predict))
        .route("/", web::get().to(root_status))
        .route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(prometheus_metrics));
}
