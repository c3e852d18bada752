//! HTTP transport

use crate::error::ChurnError;
use crate::feature_extractor::FEATURE_COUNT;
use crate::processor::RequestProcessor;
use crate::types::client::ClientRecord;
use crate::types::prediction::PredictionResult;
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use tower_http::trace::TraceLayer;
use tracing::info;

impl IntoResponse for ChurnError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(self.to_response())).into_response()
    }
}

/// Build the HTTP router
pub fn router(processor: RequestProcessor) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(processor)
        .layer(TraceLayer::new_for_http())
}

/// Serve the router until `shutdown` resolves
pub async fn serve<F>(bind_addr: &str, processor: RequestProcessor, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, router(processor))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}

/// `POST /predict`
async fn predict(
    State(processor): State<RequestProcessor>,
    payload: Result<Json<ClientRecord>, JsonRejection>,
) -> Result<Json<PredictionResult>, ChurnError> {
    let Json(client) = payload.map_err(|rejection| {
        processor.reject(ChurnError::SchemaViolation {
            reason: rejection.body_text(),
        })
    })?;

    processor.process_blocking(client).await.map(Json)
}

/// `GET /health`
async fn health(State(processor): State<RequestProcessor>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": processor.predictor().model_name(),
        "features": FEATURE_COUNT,
    }))
}
