//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, security headers)
//! - Build one outbound client per upstream kind
//! - Serve until shutdown, then drain for a bounded grace period

use std::future::IntoFuture;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::http::response::health;
use crate::proxy::download::download_handler;
use crate::proxy::lookup::{lookup_handler, LookupSetupError};
use crate::proxy::upload::upload_handler;
use crate::proxy::{DownloadProxy, LookupProxy, UploadProxy};

/// Application state injected into handlers.
///
/// Everything here is immutable after startup; requests share no mutable
/// state.
#[derive(Clone)]
pub struct AppState {
    pub download: Arc<DownloadProxy>,
    pub lookup: Arc<LookupProxy>,
    pub upload: Arc<UploadProxy>,
}

impl AppState {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ServerError> {
        Ok(Self {
            download: Arc::new(DownloadProxy::new(config).map_err(ServerError::DownloadClient)?),
            lookup: Arc::new(LookupProxy::new(config)?),
            upload: Arc::new(UploadProxy::new(config).map_err(ServerError::UploadClient)?),
        })
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build download client: {0}")]
    DownloadClient(#[source] reqwest::Error),

    #[error(transparent)]
    Lookup(#[from] LookupSetupError),

    #[error("failed to build upload client: {0}")]
    UploadClient(#[source] reqwest::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config)?;
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/api/download-proxy", get(download_handler))
            .route("/proxy", get(download_handler))
            .route("/api/aio-proxy", get(lookup_handler))
            .route(
                "/api/upload-proxy",
                post(upload_handler).layer(DefaultBodyLimit::max(config.upload.max_body_bytes)),
            )
            .route("/health", get(health))
            .with_state(state);

        if config.security.enable_headers {
            router = router.layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ));
        }

        // Outermost first: the ID must exist before the trace span is made.
        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id(request.headers()),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// On shutdown the listener closes at once; in-flight requests (long
    /// downloads included) get `timeouts.shutdown_grace_secs` to finish.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let grace = self.config.timeouts.shutdown_grace();
        tracing::info!(address = %addr, "HTTP server starting");

        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = drain_rx.await;
            })
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => {
                result?;
                tracing::info!("HTTP server stopped");
                return Ok(());
            }
            _ = shutdown.recv() => {
                tracing::info!("Shutdown signal received, draining connections");
            }
        }

        let _ = drain_tx.send(());
        match tokio::time::timeout(grace, server).await {
            Ok(result) => result?,
            Err(_) => tracing::warn!(
                grace = ?grace,
                "Requests still in flight after grace period, closing anyway"
            ),
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
