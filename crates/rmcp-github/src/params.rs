//! Tool parameter structs.

use crate::commit::Change;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SelectAccountParams {
    #[schemars(description = "Owner name of a configured account (case-insensitive)")]
    pub owner: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateRepositoryParams {
    #[schemars(description = "Name of the new repository")]
    pub name: String,
    #[schemars(description = "Repository description")]
    pub description: String,
    #[schemars(description = "Account to create it under (defaults to the selected account)")]
    #[serde(default)]
    pub owner: Option<String>,
    #[schemars(description = "Create a private repository (default false)")]
    #[serde(default)]
    pub private: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CloneRepositoryParams {
    pub repo: String,
    #[schemars(description = "Local directory to clone into")]
    #[serde(rename = "outputDir")]
    pub output_dir: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[schemars(description = "Branch to check out (defaults to the remote HEAD)")]
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RenameRepositoryParams {
    pub repo: String,
    #[schemars(description = "New repository name")]
    pub new_name: String,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PushFileParams {
    pub repo: String,
    #[schemars(description = "Destination path in the repository")]
    pub path: String,
    #[schemars(description = "Commit message")]
    pub message: String,
    #[schemars(description = "Local file to upload")]
    #[serde(rename = "sourcePath")]
    pub source_path: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[schemars(description = "Branch (default 'main')")]
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PullFileParams {
    pub repo: String,
    pub path: String,
    #[schemars(description = "Local file to write")]
    #[serde(rename = "outputPath")]
    pub output_path: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PullDirectoryParams {
    pub repo: String,
    #[schemars(description = "Directory in the repository ('' for the root)")]
    pub path: String,
    #[schemars(description = "Local directory to mirror into")]
    #[serde(rename = "outputPath")]
    pub output_path: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[schemars(description = "Descend into subdirectories (default true)")]
    #[serde(default)]
    pub recursive: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SyncDirectoryParams {
    pub repo: String,
    pub path: String,
    #[schemars(description = "Local directory to pull into and push from")]
    #[serde(rename = "localPath")]
    pub local_path: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CompareFilesParams {
    pub repo: String,
    pub path: String,
    #[schemars(description = "Local file to compare against")]
    #[serde(rename = "localPath")]
    pub local_path: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetFileParams {
    pub repo: String,
    pub path: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteFileParams {
    pub repo: String,
    pub path: String,
    pub message: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[schemars(description = "Current blob sha (looked up when omitted)")]
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateOrUpdateFileParams {
    pub repo: String,
    pub path: String,
    pub message: String,
    #[schemars(description = "Local file holding the new content")]
    #[serde(rename = "sourcePath", default)]
    pub source_path: Option<String>,
    #[schemars(description = "Not accepted; use sourcePath")]
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[schemars(description = "Current blob sha when updating (looked up when omitted)")]
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuthorParams {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateCommitParams {
    pub repo: String,
    pub branch: String,
    pub message: String,
    #[schemars(description = "File changes to include in the commit")]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub author: Option<AuthorParams>,
    #[schemars(description = "Ask the service to sign the commit")]
    #[serde(default)]
    pub sign: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListCommitsParams {
    pub repo: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[schemars(description = "GitHub login or email of the author")]
    #[serde(default)]
    pub author: Option<String>,
    #[schemars(description = "ISO 8601 timestamp or YYYY-MM-DD date")]
    #[serde(default)]
    pub since: Option<String>,
    #[schemars(description = "ISO 8601 timestamp or YYYY-MM-DD date")]
    #[serde(default)]
    pub until: Option<String>,
    #[schemars(description = "Only commits touching this path")]
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetCommitParams {
    pub repo: String,
    pub commit_sha: String,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RevertCommitParams {
    pub repo: String,
    pub commit_sha: String,
    pub message: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}
