//! HTTP handlers for provider webhooks.
//!
//! Deliveries are acknowledged with 200 once the signature has been checked
//! and an id extracted. Reconciliation then runs on a detached task, so
//! failures are only visible in logs and metrics. Probe requests
//! (`probe=1` with `x-self-test: 1`) run the same pipeline inline and
//! report what happened.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::Serialize;
use tracing::Instrument;

use crate::application::handlers::order::{ReconcileNotificationCommand, ReconcileOutcome};
use crate::domain::order::PaymentStatus;
use crate::domain::webhook::{normalize, parse_body, Notification, WebhookError, SIGNATURE_HEADER};
use crate::ports::{ReconciliationCounter, ReconciliationMetrics};

use super::super::state::AppState;

/// Header that must accompany `probe=1`.
pub const SELF_TEST_HEADER: &str = "x-self-test";

/// Structured answer for probe deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub handler_200: bool,
    pub signature_valid: bool,
    pub mp_lookup_ok: bool,
    pub final_status: Option<PaymentStatus>,
    /// A second pass over the same notification changed nothing.
    pub idempotent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Acknowledgement {
    received: bool,
}

/// POST /api/webhooks/mp and POST /api/mercado-pago/webhook
pub async fn receive_notification(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if is_probe(&query, &headers) {
        let result = run_probe(&state, &query, &headers, &body).await;
        return (StatusCode::OK, Json(result)).into_response();
    }

    match accept(&state, &query, &headers, &body) {
        Ok(notification) => dispatch(&state, notification),
        Err(err) => {
            tracing::warn!(error_code = err.code(), error = %err, "Dropping webhook delivery");
        }
    }

    (StatusCode::OK, Json(Acknowledgement { received: true })).into_response()
}

/// Runs a delivery inline and reports on every stage.
///
/// Reconciliation is executed twice; the second pass must leave the order
/// untouched for the delivery to count as idempotent.
pub async fn run_probe(
    state: &AppState,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: &[u8],
) -> ProbeResult {
    let notification = match accept(state, query, headers, body) {
        Ok(notification) => notification,
        Err(err) => {
            return ProbeResult {
                handler_200: true,
                signature_valid: !matches!(err, WebhookError::InvalidSignature),
                mp_lookup_ok: false,
                final_status: None,
                idempotent: false,
                error: Some(err.code().to_string()),
            }
        }
    };

    let reconciler = state.reconciler();
    let first = reconciler
        .handle(ReconcileNotificationCommand::new(notification.clone()))
        .await;
    let report = match first {
        Ok(report) => report,
        Err(err) => {
            return ProbeResult {
                handler_200: true,
                signature_valid: true,
                mp_lookup_ok: !matches!(err, WebhookError::LookupFailure { .. }),
                final_status: None,
                idempotent: false,
                error: Some(err.to_string()),
            }
        }
    };

    let second = reconciler
        .handle(ReconcileNotificationCommand::new(notification))
        .await;
    let idempotent = match second.map(|r| r.outcome) {
        Ok(ReconcileOutcome::Ignored) | Ok(ReconcileOutcome::Unresolvable) => true,
        Ok(ReconcileOutcome::Updated { changed, .. }) => !changed,
        Ok(ReconcileOutcome::StubCreated { .. }) | Err(_) => false,
    };

    ProbeResult {
        handler_200: true,
        signature_valid: true,
        mp_lookup_ok: !matches!(report.outcome, ReconcileOutcome::Ignored),
        final_status: report.final_status,
        idempotent,
        error: None,
    }
}

fn is_probe(query: &HashMap<String, String>, headers: &HeaderMap) -> bool {
    let flagged = query.get("probe").map(|v| v.trim() == "1").unwrap_or(false);
    let self_test = headers
        .get(SELF_TEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "1")
        .unwrap_or(false);
    flagged && self_test
}

/// Synchronous part of a delivery: signature, body parsing, id extraction.
fn accept(
    state: &AppState,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Notification, WebhookError> {
    state.metrics.increment(ReconciliationCounter::WebhooksReceived);

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let raw_body = (!body.is_empty()).then_some(body);
    if let Err(err) = state.verifier.verify(raw_body, signature) {
        state
            .metrics
            .increment(ReconciliationCounter::WebhooksSkippedSignature);
        return Err(err);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let parsed = parse_body(content_type, body)?;

    normalize(&parsed, query).into_notification().inspect_err(|_| {
        state
            .metrics
            .increment(ReconciliationCounter::NotificationsMissingId);
    })
}

fn dispatch(state: &AppState, notification: Notification) {
    let reconciler = state.reconciler();
    let span = tracing::info_span!(
        "webhook",
        topic = %notification.topic,
        notification_id = %notification.id,
    );
    tokio::spawn(
        async move {
            match reconciler
                .handle(ReconcileNotificationCommand::new(notification))
                .await
            {
                Ok(report) => {
                    tracing::info!(
                        outcome = ?report.outcome,
                        final_status = ?report.final_status,
                        "Webhook reconciled"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        error_code = err.code(),
                        retryable = err.is_retryable(),
                        error = %err,
                        "Webhook reconciliation failed"
                    );
                }
            }
        }
        .instrument(span),
    );
}
