//! Admin HTTP API
//!
//! Exposes the host's health checks for load balancers and operators.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};

use host::{HealthCheckRegistry, HealthCheckResult};

type AppState = Arc<HealthCheckRegistry>;

/// Create the admin router
pub fn router(registry: Arc<HealthCheckRegistry>) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/ping", get(ping))
        .with_state(registry)
}

/// Run every check and pick the response status
///
/// 200 when all checks pass, 500 when any fails, 501 when none are registered.
pub fn health_report(
    registry: &HealthCheckRegistry,
) -> (StatusCode, BTreeMap<String, HealthCheckResult>) {
    let results = registry.run_health_checks();

    let status = if results.is_empty() {
        StatusCode::NOT_IMPLEMENTED
    } else if results.values().all(|r| r.healthy) {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, results)
}

async fn healthcheck(State(registry): State<AppState>) -> impl IntoResponse {
    let (status, results) = health_report(&registry);
    (status, Json(results))
}

async fn ping() -> &'static str {
    "pong"
}
