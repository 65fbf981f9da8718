use crate::accounts::{AccountRegistry, OwnerKey, Session};
use crate::api::{CommitFilter, GitHubApi, Signature};
use crate::commit::{CommitAssembler, CommitObserver, CommitRequest};
use crate::error::Error;
use crate::files::RepoFiles;
use crate::params::*;
use crate::repos;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::*,
    ErrorData as McpError,
};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_BRANCH: &str = "main";

/// Resolves the account for a call or returns the rendered error from the tool.
macro_rules! resolve {
    ($server:expr, $owner:expr) => {
        match $server.client($owner).await {
            Ok(resolved) => resolved,
            Err(e) => return e.into_tool_result(),
        }
    };
}

#[derive(Debug)]
pub struct GitHubServer {
    pub tool_router: ToolRouter<Self>,
    registry: Arc<AccountRegistry>,
    session: Mutex<Session>,
    observer: Option<Arc<dyn CommitObserver>>,
}

impl GitHubServer {
    pub fn new(registry: Arc<AccountRegistry>) -> Self {
        let session = registry.new_session();
        Self {
            tool_router: Self::tool_router(),
            registry,
            session: Mutex::new(session),
            observer: None,
        }
    }

    /// Registers the capability told about every commit this server creates.
    pub fn with_observer(mut self, observer: Arc<dyn CommitObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    async fn client(
        &self,
        owner: Option<&str>,
    ) -> crate::error::Result<(OwnerKey, Arc<dyn GitHubApi>)> {
        let session = self.session.lock().await;
        self.registry.client_for(&session, owner)
    }

    fn respond<T: Serialize>(
        result: crate::error::Result<T>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match result {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value).map_err(|e| {
                    McpError::internal_error(format!("Failed to serialize result: {}", e), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Tool call failed");
                e.into_tool_result()
            }
        }
    }
}

fn branch_or_default(branch: &Option<String>) -> &str {
    branch.as_deref().unwrap_or(DEFAULT_BRANCH)
}

#[rmcp::tool_router]
impl GitHubServer {
    #[rmcp::tool(description = "List the configured GitHub accounts and the currently selected one")]
    pub async fn list_accounts(&self) -> std::result::Result<CallToolResult, McpError> {
        let session = self.session.lock().await;
        Self::respond(Ok(json!({
            "accounts": self.registry.list_accounts(),
            "selected": session.selected().map(OwnerKey::as_str),
        })))
    }

    #[rmcp::tool(description = "Select the account used when a tool call omits 'owner'")]
    pub async fn select_account(
        &self,
        Parameters(params): Parameters<SelectAccountParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        let result = self
            .registry
            .select(&mut session, &params.owner)
            .map(|owner| json!({ "selected": owner.as_str() }));
        Self::respond(result)
    }

    #[rmcp::tool(description = "Create a new repository under the account")]
    pub async fn create_repository(
        &self,
        Parameters(params): Parameters<CreateRepositoryParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (_, api) = resolve!(self, params.owner.as_deref());
        Self::respond(
            repos::create_repository(
                api.as_ref(),
                &params.name,
                &params.description,
                params.private.unwrap_or(false),
            )
            .await,
        )
    }

    #[rmcp::tool(description = "Clone a repository into a local directory")]
    pub async fn clone_repository(
        &self,
        Parameters(params): Parameters<CloneRepositoryParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        Self::respond(
            repos::clone_repository(
                api.as_ref(),
                owner.as_str(),
                &params.repo,
                Path::new(&params.output_dir),
                params.branch.as_deref(),
            )
            .await,
        )
    }

    #[rmcp::tool(description = "Rename a repository")]
    pub async fn rename_repository(
        &self,
        Parameters(params): Parameters<RenameRepositoryParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        Self::respond(
            repos::rename_repository(api.as_ref(), owner.as_str(), &params.repo, &params.new_name)
                .await,
        )
    }

    #[rmcp::tool(description = "Upload a local file to a repository path, creating or updating it")]
    pub async fn push_file(
        &self,
        Parameters(params): Parameters<PushFileParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let files = RepoFiles::new(api.as_ref(), owner.as_str(), &params.repo);
        Self::respond(
            files
                .push_file(
                    &params.path,
                    &params.message,
                    Path::new(&params.source_path),
                    branch_or_default(&params.branch),
                    None,
                )
                .await,
        )
    }

    #[rmcp::tool(description = "Download a repository file to a local path")]
    pub async fn pull_file(
        &self,
        Parameters(params): Parameters<PullFileParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let files = RepoFiles::new(api.as_ref(), owner.as_str(), &params.repo);
        Self::respond(
            files
                .pull_file(
                    &params.path,
                    Path::new(&params.output_path),
                    branch_or_default(&params.branch),
                )
                .await,
        )
    }

    #[rmcp::tool(description = "Download a repository directory to a local path")]
    pub async fn pull_directory(
        &self,
        Parameters(params): Parameters<PullDirectoryParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let files = RepoFiles::new(api.as_ref(), owner.as_str(), &params.repo);
        Self::respond(
            files
                .pull_directory(
                    &params.path,
                    Path::new(&params.output_path),
                    branch_or_default(&params.branch),
                    params.recursive.unwrap_or(true),
                )
                .await,
        )
    }

    #[rmcp::tool(
        description = "Pull a repository directory locally, then push each top-level local file back (one commit per file)"
    )]
    pub async fn sync_directory(
        &self,
        Parameters(params): Parameters<SyncDirectoryParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let files = RepoFiles::new(api.as_ref(), owner.as_str(), &params.repo);
        Self::respond(
            files
                .sync_directory(
                    &params.path,
                    Path::new(&params.local_path),
                    branch_or_default(&params.branch),
                )
                .await,
        )
    }

    #[rmcp::tool(description = "Compare a repository file with a local file byte for byte")]
    pub async fn compare_files(
        &self,
        Parameters(params): Parameters<CompareFilesParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let files = RepoFiles::new(api.as_ref(), owner.as_str(), &params.repo);
        Self::respond(
            files
                .compare_files(
                    &params.path,
                    Path::new(&params.local_path),
                    branch_or_default(&params.branch),
                )
                .await,
        )
    }

    #[rmcp::tool(description = "Read the text content of a repository file")]
    pub async fn get_file(
        &self,
        Parameters(params): Parameters<GetFileParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let files = RepoFiles::new(api.as_ref(), owner.as_str(), &params.repo);
        match files.get_file(&params.path, branch_or_default(&params.branch)).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => e.into_tool_result(),
        }
    }

    #[rmcp::tool(description = "Delete a repository file")]
    pub async fn delete_file(
        &self,
        Parameters(params): Parameters<DeleteFileParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let files = RepoFiles::new(api.as_ref(), owner.as_str(), &params.repo);
        Self::respond(
            files
                .delete_file(
                    &params.path,
                    &params.message,
                    branch_or_default(&params.branch),
                    params.sha,
                )
                .await,
        )
    }

    #[rmcp::tool(
        description = "Create or update a repository file from a local source file (inline content is rejected)"
    )]
    pub async fn create_or_update_file(
        &self,
        Parameters(params): Parameters<CreateOrUpdateFileParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if params.content.is_some() {
            return Error::InvalidParams(
                "Inline content is not accepted; write it to a local file and pass sourcePath"
                    .into(),
            )
            .into_tool_result();
        }
        let Some(source_path) = params.source_path.as_deref() else {
            return Error::InvalidParams("sourcePath is required".into()).into_tool_result();
        };
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let files = RepoFiles::new(api.as_ref(), owner.as_str(), &params.repo);
        Self::respond(
            files
                .push_file(
                    &params.path,
                    &params.message,
                    Path::new(source_path),
                    branch_or_default(&params.branch),
                    params.sha.clone(),
                )
                .await,
        )
    }

    #[rmcp::tool(
        description = "Create one commit with several file changes (add/modify from local files) on a branch"
    )]
    pub async fn create_commit(
        &self,
        Parameters(params): Parameters<CreateCommitParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let request = CommitRequest {
            repo: params.repo,
            branch: params.branch,
            message: params.message,
            changes: params.changes,
            author: params.author.map(|a| Signature {
                name: a.name,
                email: a.email,
                date: None,
            }),
            sign: params.sign,
        };
        let assembler = CommitAssembler::new(api.as_ref(), owner.as_str())
            .with_observer(self.observer.as_deref());
        Self::respond(assembler.create_commit(request).await)
    }

    #[rmcp::tool(description = "List commits, optionally filtered by branch, author, date range or path")]
    pub async fn list_commits(
        &self,
        Parameters(params): Parameters<ListCommitsParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let filter = CommitFilter {
            branch: params.branch,
            author: params.author,
            since: params.since,
            until: params.until,
            path: params.path,
        };
        Self::respond(repos::list_commits(api.as_ref(), owner.as_str(), &params.repo, &filter).await)
    }

    #[rmcp::tool(description = "Get a commit's metadata and the files it changed")]
    pub async fn get_commit(
        &self,
        Parameters(params): Parameters<GetCommitParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        Self::respond(
            repos::get_commit(api.as_ref(), owner.as_str(), &params.repo, &params.commit_sha).await,
        )
    }

    #[rmcp::tool(description = "Add a commit on a branch that undoes the changes of an earlier commit")]
    pub async fn revert_commit(
        &self,
        Parameters(params): Parameters<RevertCommitParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let (owner, api) = resolve!(self, params.owner.as_deref());
        let assembler = CommitAssembler::new(api.as_ref(), owner.as_str())
            .with_observer(self.observer.as_deref());
        Self::respond(
            assembler
                .revert_commit(
                    &params.repo,
                    branch_or_default(&params.branch),
                    &params.commit_sha,
                    params.message,
                )
                .await,
        )
    }
}

#[rmcp::tool_handler]
impl ServerHandler for GitHubServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "GitHub repository operations across several accounts. Call list_accounts, \
                 then select_account or pass 'owner' on each call."
                    .into(),
            ),
        }
    }
}
