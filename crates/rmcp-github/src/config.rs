//! Account configuration.
//!
//! Sources, later ones winning for scalar keys:
//!
//! ```text
//! TOML file (optional) ─► RMCP_GITHUB_* env ─► owner=token pairs ─► GITHUB_TOKEN/GITHUB_OWNER
//! ```
//!
//! Account lists from every source are concatenated.

use crate::accounts::{Account, AccountRegistry};
use crate::api::GitHubApi;
use crate::error::{Error, Result};
use crate::rest::{RestClient, DEFAULT_API_URL};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

const ENV_PREFIX: &str = "RMCP_GITHUB";

#[derive(Clone, Deserialize)]
pub struct AccountConfig {
    pub owner: String,
    pub token: String,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("owner", &self.owner)
            .field("token", &"***")
            .finish()
    }
}

/// Parses `owner=token`.
impl FromStr for AccountConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (owner, token) = s
            .split_once('=')
            .map(|(o, t)| (o.trim(), t.trim()))
            .filter(|(o, t)| !o.is_empty() && !t.is_empty())
            .ok_or_else(|| {
                Error::Config(format!("account must look like owner=token, got '{}'", s))
            })?;
        Ok(Self {
            owner: owner.to_string(),
            token: token.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub default_owner: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            default_owner: None,
            api_url: default_api_url(),
        }
    }
}

impl Config {
    /// Reads the optional TOML file and `RMCP_GITHUB_*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                ::config::File::from(file)
                    .format(::config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(::config::Environment::with_prefix(ENV_PREFIX));
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Same as [`Config::load`] without a file, plus the environment fallbacks.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::load(None)?;
        if let Ok(pairs) = std::env::var("GITHUB_ACCOUNTS") {
            config.add_pairs(pairs.split(',').filter(|p| !p.trim().is_empty()))?;
        }
        config.add_token_fallback(
            std::env::var("GITHUB_OWNER").ok(),
            std::env::var("GITHUB_TOKEN").ok(),
        );
        Ok(config)
    }

    pub fn add_pairs<'a>(&mut self, pairs: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for pair in pairs {
            self.accounts.push(pair.parse()?);
        }
        Ok(())
    }

    /// Adds a single `owner`/`token` account when no other account is configured.
    pub fn add_token_fallback(&mut self, owner: Option<String>, token: Option<String>) {
        if !self.accounts.is_empty() {
            return;
        }
        if let (Some(owner), Some(token)) = (owner, token) {
            tracing::debug!(owner = %owner, "Using single-account fallback");
            self.accounts.push(AccountConfig { owner, token });
        }
    }

    /// One REST client per account.
    pub fn build_registry(&self) -> Result<AccountRegistry> {
        let accounts = self
            .accounts
            .iter()
            .map(|a| {
                let client: Arc<dyn GitHubApi> =
                    Arc::new(RestClient::with_base_url(a.token.clone(), self.api_url.clone()));
                Account::new(a.owner.clone(), client)
            })
            .collect();
        AccountRegistry::new(accounts, self.default_owner.as_deref())
    }
}
