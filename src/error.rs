//! Typed errors for report delivery and submission intake.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure to deliver a report or notice through a [`ReportTransport`].
///
/// [`ReportTransport`]: crate::notify::ReportTransport
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Server rejected message: {0}")]
    Rejected(String),
}

/// Reasons a submission is refused at the HTTP boundary.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("{0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Empty values")]
    EmptyValues,
}

impl SubmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmissionError::Malformed(_) => StatusCode::BAD_REQUEST,
            SubmissionError::EmptyValues => StatusCode::PRECONDITION_FAILED,
        }
    }
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "Success": false,
            "Error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}
