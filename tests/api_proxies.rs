//! Lookup, upload and health endpoints.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, Query},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use relay_proxy::http::response::{ErrorBody, HealthStatus};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

mod common;

async fn lookup_upstream(router: Router) -> String {
    let addr = common::start_upstream(router).await;
    format!("http://{addr}/api/download/aio")
}

#[tokio::test]
async fn test_lookup_relays_upstream_json() {
    let endpoint = lookup_upstream(Router::new().route(
        "/api/download/aio",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            Json(json!({
                "status": true,
                "source": query.get("url"),
                "medias": [{ "url": "https://cdn.example/v.mp4", "quality": "hd" }],
            }))
        }),
    ))
    .await;
    let proxy = common::start_proxy(|config| config.lookup.endpoint = endpoint).await;

    let resp = common::client()
        .get(proxy.url("/api/aio-proxy"))
        .query(&[("url", "https://www.tiktok.com/@u/video/1?lang=en&x=1")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["source"], "https://www.tiktok.com/@u/video/1?lang=en&x=1");
    assert_eq!(body["medias"][0]["quality"], "hd");
}

#[tokio::test]
async fn test_lookup_repeated_url_uses_first_value() {
    let endpoint = lookup_upstream(Router::new().route(
        "/api/download/aio",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            Json(json!({ "source": query.get("url") }))
        }),
    ))
    .await;
    let proxy = common::start_proxy(|config| config.lookup.endpoint = endpoint).await;

    let resp = common::client()
        .get(proxy.url("/api/aio-proxy"))
        .query(&[("url", "https://v.example/1"), ("url", "https://v.example/2")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["source"], "https://v.example/1");
}

#[tokio::test]
async fn test_lookup_requires_url() {
    let proxy = common::start_proxy(|_| {}).await;

    let resp = common::client()
        .get(proxy.url("/api/aio-proxy?url="))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "URL parameter is required");
}

#[tokio::test]
async fn test_lookup_passes_upstream_error_message() {
    let endpoint = lookup_upstream(Router::new().route(
        "/api/download/aio",
        get(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "Unsupported platform" })),
            )
        }),
    ))
    .await;
    let proxy = common::start_proxy(|config| config.lookup.endpoint = endpoint).await;

    let resp = common::client()
        .get(proxy.url("/api/aio-proxy"))
        .query(&[("url", "https://unknown.example/x")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "Unsupported platform");
}

#[tokio::test]
async fn test_lookup_non_json_failure_gets_generic_message() {
    let endpoint = lookup_upstream(Router::new().route(
        "/api/download/aio",
        get(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
    ))
    .await;
    let proxy = common::start_proxy(|config| config.lookup.endpoint = endpoint).await;

    let resp = common::client()
        .get(proxy.url("/api/aio-proxy"))
        .query(&[("url", "https://v.example/1")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "Failed to fetch data from the external API");
}

#[tokio::test]
async fn test_lookup_timeout_is_gateway_timeout() {
    let endpoint = lookup_upstream(Router::new().route(
        "/api/download/aio",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Json(json!({}))
        }),
    ))
    .await;
    let proxy = common::start_proxy(|config| {
        config.lookup.endpoint = endpoint;
        config.lookup.timeout_secs = 1;
    })
    .await;

    let resp = common::client()
        .get(proxy.url("/api/aio-proxy"))
        .query(&[("url", "https://v.example/1")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "Upstream request took too long (timeout)");
}

/// One multipart field as the file host saw it.
#[derive(Debug, Clone)]
struct SeenField {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

type Seen = Arc<Mutex<Vec<SeenField>>>;

async fn file_host(status: StatusCode, reply: &'static str) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let addr = common::start_upstream(Router::new().route(
        "/user/api.php",
        post(move |mut multipart: Multipart| {
            let recorder = recorder.clone();
            async move {
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    let file_name = field.file_name().map(str::to_owned);
                    let content_type = field.content_type().map(str::to_owned);
                    let data = field.bytes().await.unwrap().to_vec();
                    recorder.lock().unwrap().push(SeenField {
                        name,
                        file_name,
                        content_type,
                        data,
                    });
                }
                (status, reply)
            }
        }),
    ))
    .await;
    (format!("http://{addr}/user/api.php"), seen)
}

fn image_form(data: Vec<u8>) -> Form {
    Form::new().part(
        "fileToUpload",
        Part::bytes(data)
            .file_name("pic.png")
            .mime_str("image/png")
            .unwrap(),
    )
}

#[tokio::test]
async fn test_upload_forwards_file_and_returns_url() {
    let (endpoint, seen) = file_host(StatusCode::OK, "https://files.catbox.moe/abc123.png\n").await;
    let proxy = common::start_proxy(|config| config.upload.endpoint = endpoint).await;
    let data = common::payload(50_000);

    let resp = common::client()
        .post(proxy.url("/api/upload-proxy"))
        .multipart(image_form(data.clone()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "url": "https://files.catbox.moe/abc123.png" }));

    let fields = seen.lock().unwrap().clone();
    let reqtype = fields.iter().find(|f| f.name == "reqtype").expect("reqtype sent");
    assert_eq!(reqtype.data, b"fileupload");

    let file = fields.iter().find(|f| f.name == "fileToUpload").expect("file sent");
    assert_eq!(file.file_name.as_deref(), Some("pic.png"));
    assert_eq!(file.content_type.as_deref(), Some("image/png"));
    assert_eq!(file.data, data);
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let (endpoint, seen) = file_host(StatusCode::OK, "unused").await;
    let proxy = common::start_proxy(|config| config.upload.endpoint = endpoint).await;

    let resp = common::client()
        .post(proxy.url("/api/upload-proxy"))
        .multipart(Form::new().text("comment", "no file here"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "File not found.");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_non_multipart_body() {
    let proxy = common::start_proxy(|_| {}).await;

    let resp = common::client()
        .post(proxy.url("/api/upload-proxy"))
        .json(&json!({ "fileToUpload": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_host_failure_includes_details() {
    let (endpoint, _) = file_host(StatusCode::PRECONDITION_FAILED, "No files given").await;
    let proxy = common::start_proxy(|config| config.upload.endpoint = endpoint).await;

    let resp = common::client()
        .post(proxy.url("/api/upload-proxy"))
        .multipart(image_form(b"png".to_vec()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "Failed to upload to the file host.");
    assert_eq!(body.details.as_deref(), Some("No files given"));
}

#[tokio::test]
async fn test_upload_truncated_host_reply_is_internal_error() {
    let host = common::start_raw_upstream(|mut socket| async move {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        // Drain the form so the request side completes before the reply.
        let mut buf = [0u8; 4096];
        while let Ok(Ok(n)) =
            tokio::time::timeout(Duration::from_millis(200), socket.read(&mut buf)).await
        {
            if n == 0 {
                break;
            }
        }
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 500\r\n\r\n";
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(b"https://files.ex").await;
    })
    .await;
    let proxy = common::start_proxy(|config| {
        config.upload.endpoint = format!("http://{host}/user/api.php");
    })
    .await;

    let resp = common::client()
        .post(proxy.url("/api/upload-proxy"))
        .multipart(image_form(b"png".to_vec()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error, "Internal error while processing the request");
}

#[tokio::test]
async fn test_upload_over_body_limit_is_rejected() {
    let (endpoint, seen) = file_host(StatusCode::OK, "unused").await;
    let proxy = common::start_proxy(|config| {
        config.upload.endpoint = endpoint;
        config.upload.max_body_bytes = 1024;
    })
    .await;

    let resp = common::client()
        .post(proxy.url("/api/upload-proxy"))
        .multipart(image_form(common::payload(4096)))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_and_request_id() {
    let proxy = common::start_proxy(|_| {}).await;
    let client = common::client();

    let resp = client.get(proxy.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    let generated = resp.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&generated).is_ok());
    let health: HealthStatus = resp.json().await.unwrap();
    assert_eq!(health.status, "ok");

    let resp = client
        .get(proxy.url("/health"))
        .header("x-request-id", "trace-me-42")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "trace-me-42");
}

#[tokio::test]
async fn test_security_headers_can_be_disabled() {
    let proxy = common::start_proxy(|config| config.security.enable_headers = false).await;

    let resp = common::client().get(proxy.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).is_none());
}
