//! rmcp-github: MCP server for GitHub repository operations
//!
//! Run with: `GITHUB_ACCOUNTS=alice=ghp_...,bob=ghp_... rmcp-github` (serves on stdio)

use rmcp::ServiceExt;
use rmcp_github::{Config, GitHubServer};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (to stderr so it doesn't interfere with stdio transport)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let registry = config.build_registry()?;
    tracing::info!(accounts = ?registry.list_accounts(), "Starting rmcp-github server");

    let server = GitHubServer::new(Arc::new(registry));
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    tracing::info!("rmcp-github server stopped");
    Ok(())
}
