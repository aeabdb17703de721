//! Pass-through handlers.
//!
//! # Data Flow
//! ```text
//! GET /api/download-proxy
//!     → download.rs (validate, build ProxyRequest)
//!     → forward.rs (allow-listed headers only)
//!     → upstream GET (single attempt)
//!     → disposition.rs (attachment filename)
//!     → relay.rs (chunk-by-chunk body, idle timeout)
//!
//! GET /api/aio-proxy    → lookup.rs → extraction API → JSON relayed
//! POST /api/upload-proxy → upload.rs → file host → { url }
//!
//! Any failure → error.rs → JSON { error } with a mapped status
//! ```
//!
//! # Design Decisions
//! - Handlers share nothing mutable; each call owns its upstream exchange
//! - One outbound client per upstream kind, built once from config
//! - No retries here; callers retry

pub mod disposition;
pub mod download;
pub mod error;
pub mod forward;
pub mod lookup;
pub mod params;
pub mod relay;
pub mod upload;

pub use download::{DownloadProxy, ProxyRequest};
pub use error::ProxyError;
pub use lookup::LookupProxy;
pub use upload::UploadProxy;

use crate::config::ProxyConfig;

/// Client builder with the settings every upstream shares.
pub(crate) fn client_builder(config: &ProxyConfig) -> reqwest::ClientBuilder {
    let builder = reqwest::Client::builder().connect_timeout(config.timeouts.connect());
    if config.outbound.system_proxy {
        builder
    } else {
        builder.no_proxy()
    }
}
