//! HTTP handlers for the operator surface.
//!
//! Every endpoint is gated by a shared secret passed as a query parameter.
//! Comparisons run in constant time.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::application::handlers::order::{
    DiagnoseOrderQuery, ReconcileRecentCommand, DEFAULT_SWEEP_HOURS,
};
use crate::config::parse_flag;
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::SIGNATURE_HEADER;

use super::super::error::ApiError;
use super::super::state::AppState;
use super::super::webhooks::run_probe;

#[derive(Debug, Deserialize)]
pub struct SecretParams {
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileParams {
    pub secret: Option<String>,
    pub hours: Option<i64>,
    pub force: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProbeParams {
    pub token: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Diagnostics
// ════════════════════════════════════════════════════════════════════════════════

/// GET /ops/order-status/:id?secret= - Stored state next to the live answer
pub async fn diagnose_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SecretParams>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(state.ops.diag_secret.as_deref(), params.secret.as_deref())?;

    let diagnostics = state
        .diagnose_order_handler()
        .handle(DiagnoseOrderQuery { identifier: id })
        .await?;

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(diagnostics)))
}

/// GET /ops/metrics?secret= - Counter snapshot
pub async fn metrics(
    State(state): State<AppState>,
    Query(params): Query<SecretParams>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(state.ops.diag_secret.as_deref(), params.secret.as_deref())?;
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(state.metrics.snapshot())))
}

/// POST /ops/reconcile?secret=&hours=&force= - Sweep recent orders
pub async fn reconcile_recent(
    State(state): State<AppState>,
    Query(params): Query<ReconcileParams>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(state.ops.diag_secret.as_deref(), params.secret.as_deref())?;

    let force = params
        .force
        .as_deref()
        .and_then(parse_flag)
        .unwrap_or(false);
    let result = state
        .reconcile_recent_handler()
        .handle(ReconcileRecentCommand {
            hours: params.hours.unwrap_or(DEFAULT_SWEEP_HOURS),
            force,
        })
        .await?;

    Ok(Json(result))
}

// ════════════════════════════════════════════════════════════════════════════════
// Self-probe
// ════════════════════════════════════════════════════════════════════════════════

/// GET /ops/health/mp-webhook?token= - Signed self-test through the webhook pipeline
pub async fn webhook_health(
    State(state): State<AppState>,
    Query(params): Query<ProbeParams>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(state.ops.admin_probe_token.as_deref(), params.token.as_deref())?;

    let body = json!({
        "type": "self-test",
        "id": Timestamp::now().as_datetime().timestamp_millis().to_string(),
    })
    .to_string()
    .into_bytes();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Some(signature) = state.verifier.sign(&body) {
        if let Ok(value) = HeaderValue::from_str(&signature) {
            headers.insert(SIGNATURE_HEADER, value);
        }
    }

    let result = run_probe(&state, &HashMap::new(), &headers, &body).await;
    tracing::info!(
        signature_valid = result.signature_valid,
        idempotent = result.idempotent,
        "Webhook self-probe finished"
    );

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(result)))
}

fn authorize(expected: Option<&str>, provided: Option<&str>) -> Result<(), ApiError> {
    match (expected, provided) {
        (Some(expected), Some(provided))
            if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) =>
        {
            Ok(())
        }
        _ => Err(ApiError::forbidden()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_requires_matching_secret() {
        assert!(authorize(Some("s3cret"), Some("s3cret")).is_ok());
        assert!(authorize(Some("s3cret"), Some("nope")).is_err());
        assert!(authorize(Some("s3cret"), None).is_err());
        assert!(authorize(None, Some("anything")).is_err());
    }
}
