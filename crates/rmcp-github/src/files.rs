//! Single-file and directory operations on top of the contents API.
//!
//! Every write is its own round trip; nothing here is atomic across files.

use crate::api::{encode_content, ContentItem, Contents, DeleteContents, GitHubApi, PutContents};
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct PulledFile {
    pub path: String,
    pub output_path: PathBuf,
    pub size: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PullSummary {
    pub files: usize,
    pub directories: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub pulled: PullSummary,
    pub pushed: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareStatus {
    Identical,
    Different,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub status: CompareStatus,
    pub path: String,
    pub local_path: PathBuf,
    pub local_size: usize,
    pub remote_size: usize,
}

/// File operations against one repository of one account.
pub struct RepoFiles<'a> {
    api: &'a dyn GitHubApi,
    owner: &'a str,
    repo: &'a str,
}

impl<'a> RepoFiles<'a> {
    pub fn new(api: &'a dyn GitHubApi, owner: &'a str, repo: &'a str) -> Self {
        Self { api, owner, repo }
    }

    async fn file_item(&self, path: &str, branch: &str) -> Result<ContentItem> {
        match self.api.get_contents(self.owner, self.repo, path, Some(branch)).await? {
            Contents::Item(item) => Ok(*item),
            Contents::Directory(_) => Err(Error::InvalidContent(path.to_string())),
        }
    }

    pub async fn get_file_bytes(&self, path: &str, branch: &str) -> Result<Vec<u8>> {
        self.file_item(path, branch).await?.decoded()
    }

    pub async fn get_file(&self, path: &str, branch: &str) -> Result<String> {
        let bytes = self.get_file_bytes(path, branch).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn pull_file(&self, path: &str, output: &Path, branch: &str) -> Result<PulledFile> {
        let bytes = self.get_file_bytes(path, branch).await?;
        write_local(output, &bytes).await?;
        info!(repo = self.repo, path, output = %output.display(), "Pulled file");
        Ok(PulledFile {
            path: path.to_string(),
            output_path: output.to_path_buf(),
            size: bytes.len(),
        })
    }

    /// Current content-hash of `path`, or `None` when nothing exists there yet.
    pub async fn current_sha(&self, path: &str, branch: &str) -> Result<Option<String>> {
        match self.file_item(path, branch).await {
            Ok(item) => Ok(Some(item.sha)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Uploads the local `source` to `path`, creating or updating it.
    pub async fn push_file(
        &self,
        path: &str,
        message: &str,
        source: &Path,
        branch: &str,
        sha: Option<String>,
    ) -> Result<Value> {
        let content = tokio::fs::read(source)
            .await
            .map_err(|e| Error::SourceUnavailable {
                path: source.to_path_buf(),
                source: e,
            })?;
        let sha = match sha {
            Some(sha) => Some(sha),
            None => self.current_sha(path, branch).await?,
        };
        debug!(repo = self.repo, path, update = sha.is_some(), "Pushing file");

        let body = PutContents {
            message: message.to_string(),
            content: encode_content(&content),
            sha,
            branch: Some(branch.to_string()),
        };
        let response = self.api.put_contents(self.owner, self.repo, path, &body).await?;
        info!(repo = self.repo, path, bytes = content.len(), "Pushed file");
        Ok(response)
    }

    pub async fn delete_file(
        &self,
        path: &str,
        message: &str,
        branch: &str,
        sha: Option<String>,
    ) -> Result<Value> {
        let sha = match sha {
            Some(sha) => sha,
            None => self.file_item(path, branch).await?.sha,
        };
        let body = DeleteContents {
            message: message.to_string(),
            sha,
            branch: Some(branch.to_string()),
        };
        let response = self.api.delete_contents(self.owner, self.repo, path, &body).await?;
        info!(repo = self.repo, path, "Deleted file");
        Ok(response)
    }

    /// Mirrors the remote directory `path` into `output`, depth first.
    pub async fn pull_directory(
        &self,
        path: &str,
        output: &Path,
        branch: &str,
        recursive: bool,
    ) -> Result<PullSummary> {
        let mut summary = PullSummary {
            output_path: output.to_path_buf(),
            ..Default::default()
        };
        tokio::fs::create_dir_all(output).await?;

        let mut pending = vec![(path.to_string(), output.to_path_buf())];
        while let Some((remote_dir, local_dir)) = pending.pop() {
            let listing = match self
                .api
                .get_contents(self.owner, self.repo, &remote_dir, Some(branch))
                .await?
            {
                Contents::Directory(items) => items,
                Contents::Item(item) => vec![*item],
            };

            let mut subdirectories = Vec::new();
            for item in listing {
                let target = local_dir.join(&item.name);
                if item.is_dir() {
                    if recursive {
                        tokio::fs::create_dir_all(&target).await?;
                        summary.directories += 1;
                        subdirectories.push((item.path, target));
                    }
                } else if item.is_file() {
                    let bytes = self.get_file_bytes(&item.path, branch).await?;
                    write_local(&target, &bytes).await?;
                    summary.files += 1;
                } else {
                    debug!(path = %item.path, kind = %item.kind, "Skipping entry");
                }
            }
            // Reversed so the first subdirectory listed is visited first.
            pending.extend(subdirectories.into_iter().rev());
        }

        info!(
            repo = self.repo,
            path,
            files = summary.files,
            directories = summary.directories,
            "Pulled directory"
        );
        Ok(summary)
    }

    /// Pulls `path` into `local`, then pushes each top-level local file back one by one.
    ///
    /// A failed push stops the loop; files pushed before it stay pushed.
    pub async fn sync_directory(&self, path: &str, local: &Path, branch: &str) -> Result<SyncSummary> {
        let pulled = self.pull_directory(path, local, branch, true).await?;

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(local).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        let mut pushed = Vec::with_capacity(names.len());
        for name in names {
            let remote_path = join_remote(path, &name);
            let message = format!("Sync {}", remote_path);
            self.push_file(&remote_path, &message, &local.join(&name), branch, None)
                .await?;
            pushed.push(remote_path);
        }

        Ok(SyncSummary { pulled, pushed })
    }

    pub async fn compare_files(&self, path: &str, local: &Path, branch: &str) -> Result<Comparison> {
        let local_bytes = tokio::fs::read(local)
            .await
            .map_err(|e| Error::SourceUnavailable {
                path: local.to_path_buf(),
                source: e,
            })?;
        let remote_bytes = self.get_file_bytes(path, branch).await?;
        let status = if local_bytes == remote_bytes {
            CompareStatus::Identical
        } else {
            CompareStatus::Different
        };
        Ok(Comparison {
            status,
            path: path.to_string(),
            local_path: local.to_path_buf(),
            local_size: local_bytes.len(),
            remote_size: remote_bytes.len(),
        })
    }
}

fn join_remote(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

async fn write_local(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
