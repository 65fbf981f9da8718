//! Error type shared by every operation in the crate.

use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData as McpError;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed tool arguments, detected before any remote call.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid owner '{owner}'. Valid owners: {}", .valid.join(", "))]
    InvalidOwner { owner: String, valid: Vec<String> },

    #[error(
        "No account selected. Pass 'owner' or call select_account with one of: {}",
        .valid.join(", ")
    )]
    NoOwnerSelected { valid: Vec<String> },

    #[error("No client registered for owner '{owner}'. Valid owners: {}", .valid.join(", "))]
    UnknownOwner { owner: String, valid: Vec<String> },

    #[error("At least one account must be configured")]
    NoAccounts,

    #[error("Account '{0}' is configured more than once")]
    DuplicateOwner(String),

    #[error("sourcePath required for {operation} on {path}")]
    InvalidChange { operation: String, path: String },

    #[error("Branch '{branch}' not found: {message}")]
    RefNotFound { branch: String, message: String },

    #[error("Cannot read local file {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No inline content at '{0}' (is it a directory?)")]
    InvalidContent(String),

    /// The contents API only inlines files up to 1 MB.
    #[error("'{path}' is {size} bytes, too large for the contents API to return inline")]
    ContentTooLarge { path: String, size: u64 },

    #[error("Branch '{branch}' moved from {expected} to {actual} while the commit was being built")]
    Conflict {
        branch: String,
        expected: String,
        actual: String,
    },

    /// Non-success answer from the remote service; `message` is the upstream text.
    #[error("GitHub API error ({}): {message}", .status.map(|s| s.to_string()).unwrap_or_else(|| "no status".into()))]
    Remote { status: Option<u16>, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Remote { status: Some(404), .. })
    }

    /// Errors the caller can fix by changing the arguments.
    pub fn is_invalid_params(&self) -> bool {
        matches!(self, Error::InvalidParams(_) | Error::InvalidChange { .. })
    }

    /// Renders the error at the tool boundary: argument problems become protocol
    /// errors, everything else an error-flagged tool result carrying the message.
    pub fn into_tool_result(self) -> std::result::Result<CallToolResult, McpError> {
        if self.is_invalid_params() {
            return Err(McpError::invalid_params(self.to_string(), None));
        }
        Ok(CallToolResult::error(vec![Content::text(self.to_string())]))
    }
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
