use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

use super::data_source::*;

const READINESS_TIMEOUT: Duration = Duration::from_secs(10);

/// 200 once the host can take traffic, 503 with the reason otherwise
#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let reason = match timeout(READINESS_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => return (StatusCode::OK, Json(json!({"status": "ok"}))).into_response(),
        Ok(Err(DataSourceError::DependencyFailure)) => "blob store is not available",
        Ok(Err(DataSourceError::ShuttingDown)) => "host is shutting down",
        Err(_) => {
            tracing::warn!(
                timeout_secs = READINESS_TIMEOUT.as_secs(),
                "readiness check timed out"
            );
            "readiness check timed out"
        }
    };

    let body = json!({"status": "failure", "message": reason});
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}
