//! `reqwest` implementation of [`GitHubApi`] against the REST v3 API.

use crate::api::{
    encode_content, CommitFile, CommitFilter, Contents, DeleteContents, GitCommit, GitHubApi,
    NewCommit, NewRepository, PutContents, Reference, Repository, TreeEntry,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

/// Authenticated client for one account.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ShaOnly {
    sha: String,
}

#[derive(Deserialize)]
struct CommitWithFiles {
    #[serde(default)]
    files: Vec<CommitFile>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

impl RestClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn repo_url(&self, owner: &str, repo: &str, rest: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.base_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            rest
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(
                "User-Agent",
                format!("rmcp-github/{}", env!("CARGO_PKG_VERSION")),
            )
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        Err(Error::Remote {
            status: Some(status.as_u16()),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Percent-encodes each segment of a repository path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl GitHubApi for RestClient {
    async fn get_ref(&self, owner: &str, repo: &str, branch: &str) -> Result<Reference> {
        debug!(owner, repo, branch, "get ref");
        let url = self.repo_url(owner, repo, &format!("/git/ref/heads/{}", branch));
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<Reference> {
        debug!(owner, repo, branch, sha, force, "update ref");
        let url = self.repo_url(owner, repo, &format!("/git/refs/heads/{}", branch));
        let body = json!({ "sha": sha, "force": force });
        self.send_json(self.request(Method::PATCH, &url).json(&body))
            .await
    }

    async fn get_git_commit(&self, owner: &str, repo: &str, sha: &str) -> Result<GitCommit> {
        debug!(owner, repo, sha, "get git commit");
        let url = self.repo_url(owner, repo, &format!("/git/commits/{}", sha));
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn create_git_commit(
        &self,
        owner: &str,
        repo: &str,
        commit: &NewCommit,
    ) -> Result<GitCommit> {
        debug!(owner, repo, tree = %commit.tree, "create git commit");
        let url = self.repo_url(owner, repo, "/git/commits");
        self.send_json(self.request(Method::POST, &url).json(commit))
            .await
    }

    async fn create_blob(&self, owner: &str, repo: &str, content: &[u8]) -> Result<String> {
        debug!(owner, repo, bytes = content.len(), "create blob");
        let url = self.repo_url(owner, repo, "/git/blobs");
        let body = json!({ "content": encode_content(content), "encoding": "base64" });
        let blob: ShaOnly = self
            .send_json(self.request(Method::POST, &url).json(&body))
            .await?;
        Ok(blob.sha)
    }

    async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String> {
        debug!(owner, repo, base_tree, entries = entries.len(), "create tree");
        let url = self.repo_url(owner, repo, "/git/trees");
        let body = json!({ "base_tree": base_tree, "tree": entries });
        let tree: ShaOnly = self
            .send_json(self.request(Method::POST, &url).json(&body))
            .await?;
        Ok(tree.sha)
    }

    async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Contents> {
        debug!(owner, repo, path, git_ref, "get contents");
        let url = self.repo_url(owner, repo, &format!("/contents/{}", encode_path(path)));
        let mut builder = self.request(Method::GET, &url);
        if let Some(git_ref) = git_ref {
            builder = builder.query(&[("ref", git_ref)]);
        }
        self.send_json(builder).await
    }

    async fn put_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        body: &PutContents,
    ) -> Result<Value> {
        debug!(owner, repo, path, update = body.sha.is_some(), "put contents");
        let url = self.repo_url(owner, repo, &format!("/contents/{}", encode_path(path)));
        self.send_json(self.request(Method::PUT, &url).json(body))
            .await
    }

    async fn delete_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        body: &DeleteContents,
    ) -> Result<Value> {
        debug!(owner, repo, path, "delete contents");
        let url = self.repo_url(owner, repo, &format!("/contents/{}", encode_path(path)));
        self.send_json(self.request(Method::DELETE, &url).json(body))
            .await
    }

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        debug!(owner, repo, "get repository");
        let url = self.repo_url(owner, repo, "");
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn create_repository(&self, repo: &NewRepository) -> Result<Repository> {
        debug!(name = %repo.name, private = repo.private, "create repository");
        let url = format!("{}/user/repos", self.base_url);
        self.send_json(self.request(Method::POST, &url).json(repo))
            .await
    }

    async fn rename_repository(
        &self,
        owner: &str,
        repo: &str,
        new_name: &str,
    ) -> Result<Repository> {
        debug!(owner, repo, new_name, "rename repository");
        let url = self.repo_url(owner, repo, "");
        let body = json!({ "name": new_name });
        self.send_json(self.request(Method::PATCH, &url).json(&body))
            .await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        filter: &CommitFilter,
    ) -> Result<Value> {
        debug!(owner, repo, ?filter, "list commits");
        let url = self.repo_url(owner, repo, "/commits");
        self.send_json(self.request(Method::GET, &url).query(filter))
            .await
    }

    async fn get_commit_files(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<CommitFile>> {
        debug!(owner, repo, sha, "get commit files");
        let url = self.repo_url(owner, repo, &format!("/commits/{}", sha));
        let commit: CommitWithFiles = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(commit.files)
    }

    fn access_token(&self) -> Option<&str> {
        Some(&self.token)
    }
}
