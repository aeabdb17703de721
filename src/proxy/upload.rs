//! Upload proxy.
//!
//! `POST /api/upload-proxy` takes a multipart form with a `fileToUpload`
//! field and re-posts it to the file host, answering `{ "url": … }` with the
//! hosted location. The inbound body size is capped at the router.

use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::config::ProxyConfig;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::client_builder;
use crate::proxy::error::ProxyError;

pub const FILE_FIELD: &str = "fileToUpload";
const FILE_MISSING: &str = "File not found.";
const NOT_MULTIPART: &str = "Expected a multipart/form-data body";
const UPLOAD_FAILED: &str = "Failed to upload to the file host.";
const FALLBACK_FILE_NAME: &str = "upload";

/// `{ "url": "https://files.example/abc.png" }`
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadReply {
    pub url: String,
}

/// The file pulled out of the inbound form.
#[derive(Debug)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadFile {
    fn into_part(self) -> Part {
        let UploadFile {
            file_name,
            content_type,
            data,
        } = self;

        let build = |data: Bytes| {
            let len = data.len() as u64;
            Part::stream_with_length(reqwest::Body::from(data), len).file_name(file_name.clone())
        };

        match content_type {
            // An unparseable type is dropped rather than failing the upload.
            Some(ct) => build(data.clone()).mime_str(&ct).unwrap_or_else(|_| build(data)),
            None => build(data),
        }
    }
}

/// Pull the first `fileToUpload` field out of a multipart body.
pub async fn read_upload(mut multipart: Multipart) -> Result<Option<UploadFile>, ProxyError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await?;

        return Ok(Some(UploadFile {
            file_name,
            content_type,
            data,
        }));
    }
    Ok(None)
}

pub struct UploadProxy {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl UploadProxy {
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.upload.timeout_secs);
        let client = client_builder(config).timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.upload.endpoint.clone(),
            timeout,
        })
    }

    /// Forward `file` to the host and return the URL it answers with.
    pub async fn upload(&self, file: UploadFile, request_id: &str) -> Result<String, ProxyError> {
        let size = file.data.len();
        let form = Form::new()
            .text("reqtype", "fileupload")
            .part(FILE_FIELD, file.into_part());

        tracing::debug!(request_id = %request_id, url = %self.endpoint, bytes = size, "Uploading file");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(request_id = %request_id, url = %self.endpoint, error = %e, "Upload request failed");
                ProxyError::from_bounded_send(self.endpoint.clone(), e, self.timeout)
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| {
                tracing::error!(
                    request_id = %request_id,
                    url = %self.endpoint,
                    status = status.as_u16(),
                    error = %e,
                    "Failed to read file host reply"
                );
                ProxyError::from_bounded_send(self.endpoint.clone(), e, self.timeout)
            })?;

        if !status.is_success() {
            tracing::warn!(
                request_id = %request_id,
                url = %self.endpoint,
                status = status.as_u16(),
                "File host rejected upload"
            );
            return Err(ProxyError::Upstream {
                url: self.endpoint.clone(),
                status,
                message: UPLOAD_FAILED.to_string(),
                details: Some(text),
            });
        }

        Ok(text.trim().to_string())
    }
}

/// `POST /api/upload-proxy`
pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers);

    let result = match multipart {
        Ok(multipart) => match read_upload(multipart).await {
            Ok(Some(file)) => state.upload.upload(file, request_id).await,
            Ok(None) => Err(ProxyError::Validation(FILE_MISSING)),
            Err(e) => Err(e),
        },
        Err(rejection) => {
            tracing::warn!(request_id = %request_id, error = %rejection, "Rejected upload body");
            Err(ProxyError::Validation(NOT_MULTIPART))
        }
    };

    let response = match result {
        Ok(url) => Json(UploadReply { url }).into_response(),
        Err(e) => {
            if !matches!(e, ProxyError::Upstream { .. } | ProxyError::Transport { .. }) {
                tracing::warn!(request_id = %request_id, error = %e, "Upload failed");
            }
            e.into_response()
        }
    };

    metrics::record_request("upload", response.status().as_u16(), start);
    response
}
