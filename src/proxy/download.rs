//! Streaming download proxy.
//!
//! `GET /api/download-proxy?url=…&title=…&ext=…` fetches `url` and hands it
//! back to the browser as an attachment named `{title}.{ext}`. The body is
//! never buffered; see [`crate::proxy::relay`].
//!
//! No scheme or host filtering is applied to `url` beyond what the HTTP
//! client itself rejects: this is an open proxy.

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{
        header::{ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue,
    },
    response::{IntoResponse, Response},
};

use crate::config::{DownloadConfig, ProxyConfig};
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::client_builder;
use crate::proxy::disposition;
use crate::proxy::error::{ProxyError, TransportFailure, MISSING_URL};
use crate::proxy::forward::forwarded_headers;
use crate::proxy::params::first_value;
use crate::proxy::relay::{relay, RelayTracker};

const DOWNLOAD_FAILED: &str = "Failed to download file from external URL";

/// Upstream headers copied onto a successful reply.
const RELAYED_HEADERS: [HeaderName; 3] = [CONTENT_LENGTH, CONTENT_RANGE, ACCEPT_RANGES];

/// Raw query parameters.
#[derive(Debug, Default)]
pub struct DownloadParams {
    pub url: Option<String>,
    pub title: Option<String>,
    pub ext: Option<String>,
}

impl DownloadParams {
    /// Read the parameters, first occurrence of each key winning.
    pub fn from_query(query: Option<&str>) -> Self {
        Self {
            url: first_value(query, "url"),
            title: first_value(query, "title"),
            ext: first_value(query, "ext"),
        }
    }
}

/// A validated download request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub target_url: String,
    pub title: String,
    pub ext: String,
    pub forwarded_headers: HeaderMap,
}

impl ProxyRequest {
    /// Validate parameters and pick the forwardable headers.
    ///
    /// Empty `title`/`ext` fall back to the defaults just like absent ones.
    pub fn from_params(
        params: DownloadParams,
        inbound: &HeaderMap,
        defaults: &DownloadConfig,
    ) -> Result<Self, ProxyError> {
        let target_url = non_empty(params.url).ok_or(ProxyError::Validation(MISSING_URL))?;

        Ok(Self {
            target_url,
            title: non_empty(params.title).unwrap_or_else(|| defaults.default_title.clone()),
            ext: non_empty(params.ext).unwrap_or_else(|| defaults.default_ext.clone()),
            forwarded_headers: forwarded_headers(inbound),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Issues upstream downloads and builds the streamed replies.
pub struct DownloadProxy {
    client: reqwest::Client,
    defaults: DownloadConfig,
    headers_timeout: Duration,
    idle_timeout: Duration,
}

impl DownloadProxy {
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        // No total timeout: a download may legitimately run for hours.
        let client = client_builder(config).build()?;

        Ok(Self {
            client,
            defaults: config.download.clone(),
            headers_timeout: config.timeouts.upstream_headers(),
            idle_timeout: config.timeouts.idle(),
        })
    }

    pub fn defaults(&self) -> &DownloadConfig {
        &self.defaults
    }

    /// Fetch the target and turn it into a streamed attachment response.
    ///
    /// A single upstream attempt is made; retrying is the caller's job.
    pub async fn handle(&self, request: ProxyRequest, request_id: &str) -> Result<Response, ProxyError> {
        let ProxyRequest {
            target_url,
            title,
            ext,
            forwarded_headers,
        } = request;

        tracing::debug!(
            request_id = %request_id,
            url = %target_url,
            forwarded = forwarded_headers.len(),
            "Fetching upstream file"
        );

        let send = self.client.get(&target_url).headers(forwarded_headers).send();
        let upstream = match tokio::time::timeout(self.headers_timeout, send).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, url = %target_url, error = %e, "Download proxy error");
                return Err(ProxyError::transport(target_url, e));
            }
            Err(_) => {
                tracing::error!(
                    request_id = %request_id,
                    url = %target_url,
                    timeout = ?self.headers_timeout,
                    "Upstream sent no response headers in time"
                );
                return Err(ProxyError::transport(
                    target_url,
                    TransportFailure::HeadersTimeout(self.headers_timeout),
                ));
            }
        };

        let status = upstream.status();
        if !status.is_success() {
            tracing::error!(
                request_id = %request_id,
                url = %target_url,
                status = status.as_u16(),
                "External fetch failed"
            );
            return Err(ProxyError::Upstream {
                url: target_url,
                status,
                message: DOWNLOAD_FAILED.to_string(),
                details: None,
            });
        }

        let mut headers = HeaderMap::new();
        let content_type = upstream
            .headers()
            .get(CONTENT_TYPE)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(CONTENT_DISPOSITION, disposition::attachment(&title, &ext));
        for name in RELAYED_HEADERS {
            if let Some(value) = upstream.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }

        let tracker = RelayTracker::new(target_url, request_id);
        let body = Body::from_stream(relay(upstream.bytes_stream(), self.idle_timeout, tracker));

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// `GET /api/download-proxy`
pub async fn download_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers).to_owned();

    let params = DownloadParams::from_query(query.as_deref());
    let result = ProxyRequest::from_params(params, &headers, state.download.defaults());

    let response = match result {
        Ok(request) => match state.download.handle(request, &request_id).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        },
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Invalid download request");
            e.into_response()
        }
    };

    metrics::record_request("download", response.status().as_u16(), start);
    response
}
