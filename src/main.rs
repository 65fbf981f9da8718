//! github-tools - Multi-account GitHub repository tools for AI assistants
//!
//! Serves the rmcp-github tool set on stdio, with accounts taken from a config file,
//! command-line flags and the environment.

use clap::Parser;
use rmcp::ServiceExt;
use rmcp_github::config::AccountConfig;
use rmcp_github::{Config, GitHubServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "github-tools", version, about)]
struct Cli {
    /// TOML file with `[[accounts]]` tables and an optional `default_owner`
    #[arg(short, long, value_name = "FILE", env = "GITHUB_TOOLS_CONFIG")]
    config: Option<PathBuf>,

    /// Account credentials; repeat the flag or separate pairs with commas
    #[arg(
        short,
        long = "account",
        value_name = "OWNER=TOKEN",
        env = "GITHUB_ACCOUNTS",
        value_delimiter = ',',
        hide_env_values = true
    )]
    accounts: Vec<AccountConfig>,

    /// Account selected when a session starts
    #[arg(long, env = "GITHUB_DEFAULT_OWNER")]
    default_owner: Option<String>,

    /// REST API root (GitHub Enterprise: https://HOST/api/v3)
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the MCP transport
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    config.accounts.extend(cli.accounts);
    if cli.default_owner.is_some() {
        config.default_owner = cli.default_owner;
    }
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    config.add_token_fallback(
        std::env::var("GITHUB_OWNER").ok(),
        std::env::var("GITHUB_TOKEN").ok(),
    );

    let registry = config.build_registry()?;
    tracing::info!(
        accounts = ?registry.list_accounts(),
        "Starting github-tools server"
    );

    let server = GitHubServer::new(Arc::new(registry));
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    tracing::info!("github-tools server stopped");
    Ok(())
}
