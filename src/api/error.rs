use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use thiserror::Error;

use crate::{cpu::CpuInfoError, telemetry::panic_message};

pub const ERROR_MESSAGE: &str = "An error occurred while processing the CPU request";
pub const ERROR_SUGGESTION: &str = "Please try again later or reduce the requested workload";

/// Errors a handler can return. Every variant becomes the same opaque 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("CPU information unavailable: {0}")]
    CpuInfo(#[from] CpuInfoError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Body of every error response. Never carries details of the cause.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub suggestion: String,
}

impl ErrorBody {
    pub fn fixed() -> Self {
        Self {
            message: ERROR_MESSAGE.to_string(),
            suggestion: ERROR_SUGGESTION.to_string(),
        }
    }
}

fn internal_error_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::fixed())).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "API error occurred");
        internal_error_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::InternalError(format!("{error:#}"))
    }
}

/// Response for a handler that panicked, used with `CatchPanicLayer`.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(panic = %panic_message(payload.as_ref()), "handler panicked");
    internal_error_response()
}
