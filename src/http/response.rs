//! Client-facing JSON response bodies.
//!
//! Every failure leaves the service as a small JSON object rather than a
//! file, so browser callers can tell a failed download from a real one by
//! status code or `Content-Type`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `{ "error": ..., "details": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Build a JSON error response.
pub fn json_error(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Response {
    let body = ErrorBody {
        error: error.into(),
        details,
    };
    (status, Json(body)).into_response()
}

/// Liveness reply for `/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
