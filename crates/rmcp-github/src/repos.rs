//! Repository lifecycle and commit history.

use crate::api::{CommitFile, CommitFilter, GitCommit, GitHubApi, NewRepository, Repository};
use crate::error::{Error, Result};
use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct CommitDetails {
    pub commit: GitCommit,
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloneOutcome {
    pub repository: String,
    pub output_dir: PathBuf,
    pub branch: Option<String>,
    pub head: Option<String>,
}

pub async fn create_repository(
    api: &dyn GitHubApi,
    name: &str,
    description: &str,
    private: bool,
) -> Result<Repository> {
    let created = api
        .create_repository(&NewRepository {
            name: name.to_string(),
            description: description.to_string(),
            private,
        })
        .await?;
    info!(name = %created.full_name, private, "Created repository");
    Ok(created)
}

pub async fn rename_repository(
    api: &dyn GitHubApi,
    owner: &str,
    repo: &str,
    new_name: &str,
) -> Result<Repository> {
    if new_name.trim().is_empty() {
        return Err(Error::InvalidParams("new_name must not be empty".into()));
    }
    let renamed = api.rename_repository(owner, repo, new_name).await?;
    info!(owner, from = repo, to = %renamed.name, "Renamed repository");
    Ok(renamed)
}

/// Checks that `since`/`until` are ISO 8601 timestamps or dates before they reach the service.
pub fn validate_filter(filter: &CommitFilter) -> Result<()> {
    for (name, value) in [("since", &filter.since), ("until", &filter.until)] {
        if let Some(value) = value {
            if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
                continue;
            }
            chrono::DateTime::parse_from_rfc3339(value).map_err(|e| {
                Error::InvalidParams(format!(
                    "{} must be an ISO 8601 timestamp or date ({}): {}",
                    name, e, value
                ))
            })?;
        }
    }
    Ok(())
}

pub async fn list_commits(
    api: &dyn GitHubApi,
    owner: &str,
    repo: &str,
    filter: &CommitFilter,
) -> Result<Value> {
    validate_filter(filter)?;
    api.list_commits(owner, repo, filter).await
}

/// Commit metadata and its changed files, fetched concurrently.
pub async fn get_commit(
    api: &dyn GitHubApi,
    owner: &str,
    repo: &str,
    sha: &str,
) -> Result<CommitDetails> {
    let (commit, files) = tokio::join!(
        api.get_git_commit(owner, repo, sha),
        api.get_commit_files(owner, repo, sha)
    );
    Ok(CommitDetails {
        commit: commit?,
        files: files?,
    })
}

/// Clones `repo` into `output_dir`, authenticating with the account's token.
pub async fn clone_repository(
    api: &dyn GitHubApi,
    owner: &str,
    repo: &str,
    output_dir: &Path,
    branch: Option<&str>,
) -> Result<CloneOutcome> {
    let repository = api.get_repository(owner, repo).await?;
    let url = repository.clone_url.clone();
    let token = api.access_token().map(str::to_string);
    let target = output_dir.to_path_buf();
    let branch_name = branch.map(str::to_string);

    let head = tokio::task::spawn_blocking(move || {
        clone_blocking(&url, &target, branch_name.as_deref(), token.as_deref())
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))??;

    info!(
        repository = %repository.full_name,
        output = %output_dir.display(),
        "Cloned repository"
    );
    Ok(CloneOutcome {
        repository: repository.full_name,
        output_dir: output_dir.to_path_buf(),
        branch: branch.map(str::to_string),
        head,
    })
}

fn clone_blocking(
    url: &str,
    target: &Path,
    branch: Option<&str>,
    token: Option<&str>,
) -> Result<Option<String>> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(token) = token {
        let token = token.to_string();
        callbacks.credentials(move |_url, _username, _allowed| {
            Cred::userpass_plaintext("x-access-token", &token)
        });
    }
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    let cloned = builder.clone(url, target)?;
    let head = cloned
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| oid.to_string());
    Ok(head)
}
