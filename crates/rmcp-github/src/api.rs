//! The remote primitives every operator is written against.
//!
//! [`RestClient`](crate::rest::RestClient) talks to the real service; tests use an
//! in-memory double.

use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mode of a regular (non-executable) file in a git tree.
pub const REGULAR_FILE_MODE: &str = "100644";

// ============================================================================
// Git data objects
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub sha: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub message: String,
    pub tree: ObjectRef,
    #[serde(default)]
    pub parents: Vec<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Signature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<Signature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// One override in a tree built on top of a base tree. A `None` sha removes the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: Option<String>,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE.to_string(),
            kind: "blob".to_string(),
            sha: Some(sha.into()),
        }
    }

    pub fn removal(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE.to_string(),
            kind: "blob".to_string(),
            sha: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCommit {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Signature>,
    /// Passed through untouched; the service decides what signing means.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<bool>,
}

// ============================================================================
// Contents API
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    /// `file`, `dir`, `symlink` or `submodule`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ContentItem {
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }

    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }

    /// Raw bytes of the inline content. Directories and oversized files carry none.
    pub fn decoded(&self) -> Result<Vec<u8>> {
        if !self.is_file() {
            return Err(Error::InvalidContent(self.path.clone()));
        }
        let content = match (self.content.as_deref(), self.encoding.as_deref()) {
            (Some(content), encoding) if encoding != Some("none") => content,
            _ if self.size > 0 => {
                return Err(Error::ContentTooLarge {
                    path: self.path.clone(),
                    size: self.size,
                })
            }
            _ => return Ok(Vec::new()),
        };
        decode_content(content).map_err(|e| Error::Remote {
            status: None,
            message: format!("Undecodable content for {}: {}", self.path, e),
        })
    }
}

pub fn encode_content(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// The service wraps base64 payloads at 60 columns.
pub fn decode_content(content: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// A contents lookup answers with a listing for directories and a single item otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Directory(Vec<ContentItem>),
    Item(Box<ContentItem>),
}

#[derive(Debug, Clone, Serialize)]
pub struct PutContents {
    pub message: String,
    /// Base64 encoded file body.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteContents {
    pub message: String,
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

// ============================================================================
// Repositories and history
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: Option<String>,
    pub clone_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitFilter {
    #[serde(rename = "sha", skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A file touched by a commit, as listed by the commits endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFile {
    pub filename: String,
    /// `added`, `removed`, `modified`, `renamed`, `copied`, `changed` or `unchanged`.
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
}

// ============================================================================
// The seam
// ============================================================================

#[async_trait]
pub trait GitHubApi: std::fmt::Debug + Send + Sync {
    async fn get_ref(&self, owner: &str, repo: &str, branch: &str) -> Result<Reference>;

    /// Moves `branch` to `sha`. With `force == false` the service rejects anything that
    /// is not a fast-forward.
    async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<Reference>;

    async fn get_git_commit(&self, owner: &str, repo: &str, sha: &str) -> Result<GitCommit>;

    async fn create_git_commit(&self, owner: &str, repo: &str, commit: &NewCommit)
        -> Result<GitCommit>;

    /// Stores `content` and returns its content-hash.
    async fn create_blob(&self, owner: &str, repo: &str, content: &[u8]) -> Result<String>;

    /// Builds a tree from `base_tree` with `entries` overriding matching paths.
    async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String>;

    /// Looks up `path` at `git_ref` (branch, tag or commit sha).
    async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Contents>;

    async fn put_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        body: &PutContents,
    ) -> Result<Value>;

    async fn delete_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        body: &DeleteContents,
    ) -> Result<Value>;

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository>;

    /// Creates a repository under the authenticated account.
    async fn create_repository(&self, repo: &NewRepository) -> Result<Repository>;

    async fn rename_repository(&self, owner: &str, repo: &str, new_name: &str)
        -> Result<Repository>;

    async fn list_commits(&self, owner: &str, repo: &str, filter: &CommitFilter)
        -> Result<Value>;

    async fn get_commit_files(&self, owner: &str, repo: &str, sha: &str)
        -> Result<Vec<CommitFile>>;

    /// Token used to authenticate git transports (clone), if the client has one.
    fn access_token(&self) -> Option<&str> {
        None
    }
}
