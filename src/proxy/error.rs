//! Error taxonomy for the pass-through handlers.
//!
//! Each variant maps to exactly one client-visible response. Internal detail
//! (target URL, upstream status, transport cause) stays in the `Display`
//! output for logs; the JSON body only carries a generic message.

use std::time::Duration;

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::response::json_error;

pub const MISSING_URL: &str = "URL parameter is required";
const TRANSPORT_MESSAGE: &str = "Internal error while processing the request";
const TIMEOUT_MESSAGE: &str = "Upstream request took too long (timeout)";
const DECODE_MESSAGE: &str = "Upstream returned an unreadable response";
const MULTIPART_MESSAGE: &str = "Malformed multipart request";

/// Network-level causes of a failed upstream exchange.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("no response headers within {0:?}")]
    HeadersTimeout(Duration),
}

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Required input missing; no upstream call was made.
    #[error("{0}")]
    Validation(&'static str),

    /// Upstream answered with a non-success status.
    #[error("upstream {url} responded with {status}")]
    Upstream {
        url: String,
        status: StatusCode,
        message: String,
        details: Option<String>,
    },

    /// Upstream unreachable or failed mid-exchange.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportFailure,
    },

    /// Upstream exceeded its total time budget.
    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    /// Upstream answered 2xx with a body we could not read.
    #[error("upstream {url} sent an unreadable reply: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

impl ProxyError {
    pub fn transport(url: impl Into<String>, source: impl Into<TransportFailure>) -> Self {
        ProxyError::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Classify a send error for a call bounded by a total timeout.
    pub fn from_bounded_send(url: impl Into<String>, err: reqwest::Error, timeout: Duration) -> Self {
        let url = url.into();
        if err.is_timeout() {
            ProxyError::Timeout { url, after: timeout }
        } else {
            ProxyError::transport(url, err)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::Transport { .. } | ProxyError::Decode { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Multipart(e) => e.status(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ProxyError::Validation(message) => json_error(status, message, None),
            ProxyError::Upstream {
                message, details, ..
            } => json_error(status, message, details),
            ProxyError::Transport { .. } => json_error(status, TRANSPORT_MESSAGE, None),
            ProxyError::Timeout { .. } => json_error(status, TIMEOUT_MESSAGE, None),
            ProxyError::Decode { .. } => json_error(status, DECODE_MESSAGE, None),
            ProxyError::Multipart(_) => json_error(status, MULTIPART_MESSAGE, None),
        }
    }
}
