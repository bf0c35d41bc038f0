//! Webhook endpoint handler.
//!
//! Accepts GitHub webhook deliveries and runs them through the ingestion
//! pipeline synchronously: the event is classified, checked against the
//! policy rules, and persisted before the response goes out.
//!
//! # Request
//!
//! - Method: POST
//! - Required header: `X-GitHub-Event` (event type, e.g. "team", "push")
//! - Body: JSON webhook payload
//!
//! # Response
//!
//! - 200 OK: delivery processed; the body carries the violation report
//!   content when one was recorded, and is empty otherwise (including for
//!   event types we do not track)
//! - 500 Internal Server Error: malformed payload or persistence failure;
//!   the body is a generic message, detail goes to the log

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error};

use super::AppState;
use crate::ingest::{process_webhook, IngestError};
use crate::persistence::Store;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";

/// Errors that can occur when processing a delivery.
///
/// All of them are terminal processing failures; the response is a generic
/// 500 either way, per the endpoint contract.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The pipeline failed (malformed payload or persistence error).
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        error!(error = %self, "Failed to process webhook");
        (StatusCode::INTERNAL_SERVER_ERROR, "error processing webhook").into_response()
    }
}

/// Webhook handler.
///
/// Reads the event type from `X-GitHub-Event`, stamps the receipt time,
/// opens a store for this request, and runs the pipeline. One connection
/// and one transaction per delivery; no shared session.
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, String), WebhookError> {
    let event_type = headers
        .get(HEADER_EVENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(HEADER_EVENT))?;

    debug!(event_type = %event_type, "Received webhook");

    let received_at = Utc::now();
    let payload: serde_json::Value = serde_json::from_slice(&body)?;

    let mut store = Store::open(&app_state.settings().db_path).map_err(IngestError::from)?;
    let report = process_webhook(
        &mut store,
        &app_state.settings().rules,
        &event_type,
        &payload,
        received_at,
    )?;

    // 200 either way; the body carries the report content when there is one.
    Ok((
        StatusCode::OK,
        report.map(|r| r.content).unwrap_or_default(),
    ))
}
