//! HTTP submission intake.
//!
//! Accepts experiment submissions, validates them, and forwards one
//! [`SubmissionEvent`](crate::models::SubmissionEvent) per accepted
//! submission to the report loop.

use crate::aggregation::AggregatorHandle;
use crate::error::SubmissionError;
use crate::models::Submission;
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

/// Build the intake router.
pub fn router(handle: AggregatorHandle) -> Router {
    Router::new()
        .route("/results", get(results_probe))
        .route("/results/{exp_name}", post(submit_results))
        .layer(CorsLayer::permissive())
        .with_state(handle)
}

/// Bind `port` on all interfaces and serve until `shutdown` completes.
pub async fn serve(
    handle: AggregatorHandle,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Listening on {}", addr);

    axum::serve(listener, router(handle))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn results_probe() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn submit_results(
    State(handle): State<AggregatorHandle>,
    Path(exp_name): Path<String>,
    body: Bytes,
) -> Response {
    match accept(&handle, &body) {
        Ok(submission) => {
            debug!(
                "Accepted submission for '{}' from {} (session {}, {} sensor points)",
                exp_name,
                submission.beacon_address,
                submission.session_number,
                submission.sensor_log.as_ref().map_or(0, Vec::len)
            );
            (StatusCode::CREATED, Json(json!({ "Success": true }))).into_response()
        }
        Err(e) => {
            warn!("Rejected submission for '{}': {}", exp_name, e);
            e.into_response()
        }
    }
}

fn accept(handle: &AggregatorHandle, body: &[u8]) -> Result<Submission, SubmissionError> {
    let submission: Submission = serde_json::from_slice(body)?;
    submission.check()?;
    handle.record_submission(submission.event());
    Ok(submission)
}
