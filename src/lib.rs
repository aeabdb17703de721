//! Relay proxy library.
//!
//! Server-side pass-through handlers for a browser tool catalog: a streaming
//! download proxy, a media lookup proxy and an upload proxy.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
