//! rmcp-github: MCP server for GitHub repository operations across several accounts.
//!
//! Each tool call resolves an account (explicit `owner` or the session's selection),
//! then runs against the REST API through that account's client.

pub mod accounts;
pub mod api;
pub mod commit;
pub mod config;
pub mod error;
pub mod files;
pub mod params;
pub mod repos;
pub mod rest;
pub mod server;

#[cfg(test)]
mod testing;

pub use accounts::{Account, AccountRegistry, OwnerKey, Session};
pub use api::GitHubApi;
pub use commit::{Change, ChangeOperation, CommitAssembler, CommitObserver, CommitOutcome};
pub use config::Config;
pub use error::{Error, Result};
pub use rest::RestClient;
pub use server::GitHubServer;
