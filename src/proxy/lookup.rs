//! Media lookup proxy.
//!
//! `GET /api/aio-proxy?url=…` asks the all-in-one extraction API what media
//! lives at a page URL and relays its JSON reply unchanged. The upstream's
//! own `error` message is passed through on failure.

use std::time::{Duration, Instant};

use axum::{
    extract::{RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::ProxyConfig;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::client_builder;
use crate::proxy::error::{ProxyError, MISSING_URL};
use crate::proxy::params::first_value;

const LOOKUP_FAILED: &str = "Failed to fetch data from the external API";

#[derive(Debug, Default)]
pub struct LookupParams {
    pub url: Option<String>,
}

impl LookupParams {
    pub fn from_query(query: Option<&str>) -> Self {
        Self {
            url: first_value(query, "url"),
        }
    }
}

/// Failure replies from the extraction API.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UpstreamFailure {
    Message { error: String },
    Other(#[allow(dead_code)] Value),
}

impl UpstreamFailure {
    fn into_message(self) -> String {
        match self {
            UpstreamFailure::Message { error } if !error.is_empty() => error,
            _ => LOOKUP_FAILED.to_string(),
        }
    }
}

pub struct LookupProxy {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl LookupProxy {
    pub fn new(config: &ProxyConfig) -> Result<Self, LookupSetupError> {
        let timeout = Duration::from_secs(config.lookup.timeout_secs);
        let client = client_builder(config).timeout(timeout).build()?;
        let endpoint = Url::parse(&config.lookup.endpoint)?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// `{endpoint}?url={page_url}`, preserving any query the endpoint has.
    pub fn lookup_url(&self, page_url: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", page_url);
        url
    }

    pub async fn lookup(&self, page_url: &str, request_id: &str) -> Result<Value, ProxyError> {
        let url = self.lookup_url(page_url);
        let target = url.to_string();

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::error!(request_id = %request_id, url = %target, error = %e, "Lookup request failed");
            ProxyError::from_bounded_send(target.clone(), e, self.timeout)
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<UpstreamFailure>().await {
                Ok(failure) => failure.into_message(),
                Err(_) => LOOKUP_FAILED.to_string(),
            };
            tracing::warn!(
                request_id = %request_id,
                url = %target,
                status = status.as_u16(),
                message = %message,
                "Lookup API returned an error"
            );
            return Err(ProxyError::Upstream {
                url: target,
                status,
                message,
                details: None,
            });
        }

        response.json::<Value>().await.map_err(|e| {
            tracing::error!(request_id = %request_id, url = %target, error = %e, "Lookup reply was not JSON");
            if e.is_timeout() {
                ProxyError::Timeout {
                    url: target.clone(),
                    after: self.timeout,
                }
            } else {
                ProxyError::Decode {
                    url: target.clone(),
                    source: e,
                }
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupSetupError {
    #[error("failed to build lookup client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid lookup endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// `GET /api/aio-proxy`
pub async fn lookup_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers);

    let page_url = LookupParams::from_query(query.as_deref())
        .url
        .filter(|url| !url.is_empty());

    let response = match page_url {
        Some(page_url) => match state.lookup.lookup(&page_url, request_id).await {
            Ok(data) => Json(data).into_response(),
            Err(e) => e.into_response(),
        },
        None => ProxyError::Validation(MISSING_URL).into_response(),
    };

    metrics::record_request("lookup", response.status().as_u16(), start);
    response
}
