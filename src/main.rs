//! Relay Proxy (v1)
//!
//! Pass-through HTTP handlers built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 RELAY PROXY                  │
//!                         │                                              │
//!     Browser Request     │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ────────────────────┼─▶│ request │──▶│ handler  │──▶│  forward  │──┼──▶ Third-party
//!                         │  │   id    │   │ validate │   │ allow-list│  │    host
//!                         │  └─────────┘   └──────────┘   └───────────┘  │
//!                         │                                              │
//!     Browser Response    │  ┌─────────┐   ┌──────────┐                  │
//!     ◀───────────────────┼──│  relay  │◀──│ upstream │◀─────────────────┼─── body chunks
//!                         │  │ stream  │   │ response │                  │
//!                         │  └─────────┘   └──────────┘                  │
//!                         │                                              │
//!                         │  config · observability · lifecycle          │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use relay_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use relay_proxy::lifecycle;
use relay_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "relay-proxy")]
#[command(about = "Streaming download and pass-through API proxy", long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(args: &Args) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load(&args)?;

    logging::init_logging(&config.observability);
    tracing::info!("relay-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    lifecycle::start(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
