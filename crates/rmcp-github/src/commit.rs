//! Multi-file commits built directly from blob, tree, commit and ref primitives.
//!
//! ```text
//! validate changes ── read local sources
//!        │
//! get ref ─► get commit ─► blobs ─► tree(base + overrides) ─► commit(parent = head)
//!                                                                  │
//!                      observer ◄─ verify ◄─ update ref (head unchanged, fast-forward)
//! ```

use crate::api::{GitCommit, GitHubApi, NewCommit, Signature, TreeEntry};
use crate::error::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Add,
    Modify,
    Delete,
}

impl std::fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ChangeOperation::Add => "add",
            ChangeOperation::Modify => "modify",
            ChangeOperation::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Change {
    #[schemars(description = "Path of the file in the repository")]
    pub path: String,
    #[schemars(description = "Local file whose content is committed (required for add and modify)")]
    #[serde(rename = "sourcePath", default)]
    pub source_path: Option<String>,
    #[schemars(description = "One of: add, modify, delete")]
    pub operation: ChangeOperation,
}

#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub repo: String,
    pub branch: String,
    pub message: String,
    pub changes: Vec<Change>,
    pub author: Option<Signature>,
    pub sign: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    #[serde(flatten)]
    pub commit: GitCommit,
    /// Delete changes are accepted but leave the tree unchanged.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_deletions: Vec<String>,
    /// Set when the commit landed but the observer failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Told about every commit that reached its branch.
#[async_trait]
pub trait CommitObserver: std::fmt::Debug + Send + Sync {
    async fn commit_created(&self, repo: &str, sha: &str) -> anyhow::Result<()>;
}

pub struct CommitAssembler<'a> {
    api: &'a dyn GitHubApi,
    owner: &'a str,
    observer: Option<&'a dyn CommitObserver>,
}

impl<'a> CommitAssembler<'a> {
    pub fn new(api: &'a dyn GitHubApi, owner: &'a str) -> Self {
        Self {
            api,
            owner,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<&'a dyn CommitObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn create_commit(&self, request: CommitRequest) -> Result<CommitOutcome> {
        let sources = read_sources(&request.changes).await?;

        let (head, base_tree) = self.head_and_tree(&request.repo, &request.branch).await?;

        let mut entries = Vec::with_capacity(sources.len());
        for (path, content) in sources {
            let sha = self.api.create_blob(self.owner, &request.repo, &content).await?;
            debug!(path = %path, blob = %sha, "Created blob");
            entries.push(TreeEntry::blob(path, sha));
        }

        let ignored_deletions: Vec<String> = request
            .changes
            .iter()
            .filter(|c| c.operation == ChangeOperation::Delete)
            .map(|c| c.path.clone())
            .collect();
        if !ignored_deletions.is_empty() {
            warn!(
                paths = ?ignored_deletions,
                "Delete changes do not remove paths from the committed tree"
            );
        }

        let commit = self
            .commit_tree(
                &request.repo,
                &request.branch,
                &head,
                &base_tree,
                &entries,
                NewCommitMeta {
                    message: request.message,
                    author: request.author,
                    sign: request.sign,
                },
            )
            .await?;

        let warning = self.notify(&request.repo, &commit.sha).await;
        Ok(CommitOutcome {
            commit,
            ignored_deletions,
            warning,
        })
    }

    /// Adds a commit on `branch` whose tree undoes the changes `sha` made to each file.
    pub async fn revert_commit(
        &self,
        repo: &str,
        branch: &str,
        sha: &str,
        message: String,
    ) -> Result<CommitOutcome> {
        let target = self.api.get_git_commit(self.owner, repo, sha).await?;
        let parent = target
            .parents
            .first()
            .map(|p| p.sha.clone())
            .ok_or_else(|| Error::InvalidParams(format!("Commit {} has no parent to revert to", sha)))?;
        let files = self.api.get_commit_files(self.owner, repo, sha).await?;

        let mut entries = Vec::with_capacity(files.len());
        for file in &files {
            match file.status.as_str() {
                "added" | "copied" => entries.push(TreeEntry::removal(&file.filename)),
                "renamed" => {
                    entries.push(TreeEntry::removal(&file.filename));
                    let previous = file.previous_filename.as_deref().unwrap_or(&file.filename);
                    entries.push(self.entry_at(repo, previous, &parent).await?);
                }
                _ => entries.push(self.entry_at(repo, &file.filename, &parent).await?),
            }
        }

        let (head, base_tree) = self.head_and_tree(repo, branch).await?;
        let commit = self
            .commit_tree(
                repo,
                branch,
                &head,
                &base_tree,
                &entries,
                NewCommitMeta {
                    message,
                    author: None,
                    sign: None,
                },
            )
            .await?;

        let warning = self.notify(repo, &commit.sha).await;
        Ok(CommitOutcome {
            commit,
            ignored_deletions: Vec::new(),
            warning,
        })
    }

    async fn head_and_tree(&self, repo: &str, branch: &str) -> Result<(String, String)> {
        let head = self
            .api
            .get_ref(self.owner, repo, branch)
            .await
            .map_err(|e| match e {
                Error::Remote { status: Some(404), message } => Error::RefNotFound {
                    branch: branch.to_string(),
                    message,
                },
                other => other,
            })?
            .object
            .sha;
        let tree = self.api.get_git_commit(self.owner, repo, &head).await?.tree.sha;
        debug!(branch, head = %head, tree = %tree, "Read branch head");
        Ok((head, tree))
    }

    /// Blob entry for `path` as it was at commit `at`.
    async fn entry_at(&self, repo: &str, path: &str, at: &str) -> Result<TreeEntry> {
        match self.api.get_contents(self.owner, repo, path, Some(at)).await? {
            crate::api::Contents::Item(item) if item.is_file() => Ok(TreeEntry::blob(path, item.sha)),
            _ => Err(Error::InvalidContent(path.to_string())),
        }
    }

    async fn commit_tree(
        &self,
        repo: &str,
        branch: &str,
        head: &str,
        base_tree: &str,
        entries: &[TreeEntry],
        meta: NewCommitMeta,
    ) -> Result<GitCommit> {
        let tree = self.api.create_tree(self.owner, repo, base_tree, entries).await?;
        let new_commit = NewCommit {
            message: meta.message,
            tree,
            parents: vec![head.to_string()],
            author: meta.author,
            sign: meta.sign,
        };
        let created = self.api.create_git_commit(self.owner, repo, &new_commit).await?;

        self.advance_ref(repo, branch, head, &created.sha).await?;
        info!(
            owner = self.owner,
            repo,
            branch,
            sha = %created.sha,
            files = entries.len(),
            "Created commit"
        );

        self.api.get_git_commit(self.owner, repo, &created.sha).await
    }

    /// Moves `branch` from `expected` to `sha`, refusing if someone else moved it first.
    async fn advance_ref(&self, repo: &str, branch: &str, expected: &str, sha: &str) -> Result<()> {
        let current = self.api.get_ref(self.owner, repo, branch).await?.object.sha;
        if current != expected {
            return Err(Error::Conflict {
                branch: branch.to_string(),
                expected: expected.to_string(),
                actual: current,
            });
        }

        match self.api.update_ref(self.owner, repo, branch, sha, false).await {
            Ok(_) => Ok(()),
            Err(Error::Remote { status: Some(422), message })
                if message.to_lowercase().contains("fast forward") =>
            {
                let actual = self
                    .api
                    .get_ref(self.owner, repo, branch)
                    .await
                    .map(|r| r.object.sha)
                    .unwrap_or(message);
                Err(Error::Conflict {
                    branch: branch.to_string(),
                    expected: expected.to_string(),
                    actual,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn notify(&self, repo: &str, sha: &str) -> Option<String> {
        let observer = self.observer?;
        match observer.commit_created(repo, sha).await {
            Ok(()) => None,
            Err(e) => {
                warn!(repo, sha, error = %e, "Commit observer failed");
                Some(format!("Commit created but post-commit notification failed: {}", e))
            }
        }
    }
}

struct NewCommitMeta {
    message: String,
    author: Option<Signature>,
    sign: Option<bool>,
}

/// Validates every change, then reads the content for each add and modify.
async fn read_sources(changes: &[Change]) -> Result<Vec<(String, Vec<u8>)>> {
    for change in changes {
        if change.operation != ChangeOperation::Delete && change.source_path.is_none() {
            return Err(Error::InvalidChange {
                operation: change.operation.to_string(),
                path: change.path.clone(),
            });
        }
    }

    let mut sources = Vec::new();
    for change in changes.iter().filter(|c| c.operation != ChangeOperation::Delete) {
        let Some(source) = change.source_path.as_deref() else {
            continue;
        };
        let path = PathBuf::from(source);
        let content = tokio::fs::read(&path)
            .await
            .map_err(|source| Error::SourceUnavailable {
                path: path.clone(),
                source,
            })?;
        sources.push((change.path.clone(), content));
    }
    Ok(sources)
}
