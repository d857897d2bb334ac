//! appshell-sw entry point.
//!
//! Boots the cache controller behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use appshell_client::{FetchClient, FetchConfig};
use appshell_core::worker::SystemClock;
use appshell_core::{AppConfig, CacheController, CacheDb, CachePolicy};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod platform;
mod tools;

use platform::HostPlatform;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting appshell-sw on stdio transport");

    let cache = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(&FetchConfig::from(&config))?;
    let policy = CachePolicy::from_config(&config)?;
    let platform = Arc::new(HostPlatform::new());

    let controller = CacheController::new(policy, Arc::new(cache), Arc::new(network), platform.clone(), &SystemClock);
    tracing::info!(namespace = controller.namespace(), "controller ready");

    let handler = handler::AppShellServer::new(Arc::new(controller), platform);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
