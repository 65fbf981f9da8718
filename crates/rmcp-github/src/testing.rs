//! In-memory stand-in for the remote service, shared by the unit tests.

use crate::api::{
    encode_content, CommitFile, CommitFilter, ContentItem, Contents, DeleteContents, GitCommit,
    GitHubApi, NewCommit, NewRepository, ObjectRef, PutContents, Reference, Repository,
    TreeEntry,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

type Tree = BTreeMap<String, String>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteCounts {
    pub blobs: usize,
    pub trees: usize,
    pub commits: usize,
    pub ref_updates: usize,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, Tree>,
    commits: HashMap<String, GitCommit>,
    refs: HashMap<(String, String), String>,
    repos: HashMap<String, Repository>,
    writes: WriteCounts,
    /// Branch a simulated concurrent writer advances on the next commit creation.
    race_on_commit: Option<(String, String)>,
    /// Paths whose contents upload is refused.
    rejected_puts: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeGitHub {
    state: Mutex<State>,
    token: Option<String>,
}

fn not_found(what: impl Into<String>) -> Error {
    Error::Remote {
        status: Some(404),
        message: what.into(),
    }
}

fn unprocessable(what: impl Into<String>) -> Error {
    Error::Remote {
        status: Some(422),
        message: what.into(),
    }
}

impl State {
    fn id(&mut self) -> String {
        self.next_id += 1;
        format!("{:040x}", self.next_id)
    }

    fn blob(&mut self, content: &[u8]) -> String {
        let sha = self.id();
        self.blobs.insert(sha.clone(), content.to_vec());
        sha
    }

    fn tree(&mut self, tree: Tree) -> String {
        let sha = self.id();
        self.trees.insert(sha.clone(), tree);
        sha
    }

    fn commit(&mut self, message: &str, tree: String, parents: Vec<String>) -> GitCommit {
        let sha = self.id();
        let commit = GitCommit {
            sha: sha.clone(),
            message: message.to_string(),
            tree: ObjectRef { sha: tree, kind: Some("tree".into()) },
            parents: parents
                .into_iter()
                .map(|sha| ObjectRef { sha, kind: Some("commit".into()) })
                .collect(),
            author: None,
            committer: None,
            html_url: None,
        };
        self.commits.insert(sha, commit.clone());
        commit
    }

    fn head(&self, repo: &str, branch: &str) -> Option<String> {
        self.refs.get(&(repo.to_string(), branch.to_string())).cloned()
    }

    /// A branch name or a commit sha.
    fn resolve(&self, repo: &str, git_ref: &str) -> Option<String> {
        self.head(repo, git_ref)
            .or_else(|| self.commits.contains_key(git_ref).then(|| git_ref.to_string()))
    }

    fn tree_of(&self, commit: &str) -> Tree {
        self.commits
            .get(commit)
            .and_then(|c| self.trees.get(&c.tree.sha))
            .cloned()
            .unwrap_or_default()
    }

    /// Commits `tree` on top of `branch`, creating the branch when it does not exist.
    fn commit_on(&mut self, repo: &str, branch: &str, message: &str, tree: Tree) -> String {
        let parents = self.head(repo, branch).into_iter().collect();
        let tree = self.tree(tree);
        let commit = self.commit(message, tree, parents);
        self.refs
            .insert((repo.to_string(), branch.to_string()), commit.sha.clone());
        commit.sha
    }
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..Self::default()
        }
    }

    /// Creates `repo` if needed and commits `files` on `branch`.
    pub fn seed(&self, repo: &str, branch: &str, files: &[(&str, &str)]) -> String {
        let mut state = self.state.lock().unwrap();
        state.repos.entry(repo.to_string()).or_insert_with(|| Repository {
            name: repo.to_string(),
            full_name: format!("fake/{}", repo),
            description: None,
            private: false,
            html_url: None,
            clone_url: format!("https://example.invalid/{}.git", repo),
            default_branch: Some(branch.to_string()),
        });
        let mut tree = state
            .head(repo, branch)
            .map(|head| state.tree_of(&head))
            .unwrap_or_default();
        for (path, content) in files {
            let sha = state.blob(content.as_bytes());
            tree.insert(path.to_string(), sha);
        }
        state.commit_on(repo, branch, "seed", tree)
    }

    pub fn set_clone_url(&self, repo: &str, url: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(r) = state.repos.get_mut(repo) {
            r.clone_url = url.to_string();
        }
    }

    /// Makes another writer advance `branch` as soon as the next commit object is created.
    pub fn race_on_next_commit(&self, repo: &str, branch: &str) {
        self.state.lock().unwrap().race_on_commit = Some((repo.to_string(), branch.to_string()));
    }

    /// Makes every contents upload to `path` fail.
    pub fn reject_put(&self, path: &str) {
        self.state.lock().unwrap().rejected_puts.push(path.to_string());
    }

    pub fn head(&self, repo: &str, branch: &str) -> Option<String> {
        self.state.lock().unwrap().head(repo, branch)
    }

    pub fn commit(&self, sha: &str) -> Option<GitCommit> {
        self.state.lock().unwrap().commits.get(sha).cloned()
    }

    pub fn file_at(&self, repo: &str, branch: &str, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let head = state.head(repo, branch)?;
        let sha = state.tree_of(&head).get(path)?.clone();
        state.blobs.get(&sha).cloned()
    }

    pub fn paths_at(&self, repo: &str, branch: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .head(repo, branch)
            .map(|head| state.tree_of(&head).into_keys().collect())
            .unwrap_or_default()
    }

    pub fn writes(&self) -> WriteCounts {
        self.state.lock().unwrap().writes
    }

    pub fn has_repo(&self, repo: &str) -> bool {
        self.state.lock().unwrap().repos.contains_key(repo)
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get_ref(&self, _owner: &str, repo: &str, branch: &str) -> Result<Reference> {
        let state = self.state.lock().unwrap();
        let sha = state.head(repo, branch).ok_or_else(|| not_found("Not Found"))?;
        Ok(Reference {
            name: format!("refs/heads/{}", branch),
            object: ObjectRef { sha, kind: Some("commit".into()) },
        })
    }

    async fn update_ref(
        &self,
        _owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<Reference> {
        let mut state = self.state.lock().unwrap();
        let current = state
            .head(repo, branch)
            .ok_or_else(|| unprocessable("Reference does not exist"))?;
        let target = state
            .commits
            .get(sha)
            .ok_or_else(|| unprocessable("Object does not exist"))?;
        if !force && !target.parents.iter().any(|p| p.sha == current) {
            return Err(unprocessable("Update is not a fast forward"));
        }
        state.writes.ref_updates += 1;
        state
            .refs
            .insert((repo.to_string(), branch.to_string()), sha.to_string());
        Ok(Reference {
            name: format!("refs/heads/{}", branch),
            object: ObjectRef { sha: sha.to_string(), kind: Some("commit".into()) },
        })
    }

    async fn get_git_commit(&self, _owner: &str, _repo: &str, sha: &str) -> Result<GitCommit> {
        let state = self.state.lock().unwrap();
        state.commits.get(sha).cloned().ok_or_else(|| not_found("Not Found"))
    }

    async fn create_git_commit(
        &self,
        _owner: &str,
        _repo: &str,
        commit: &NewCommit,
    ) -> Result<GitCommit> {
        let mut state = self.state.lock().unwrap();
        if !state.trees.contains_key(&commit.tree) {
            return Err(unprocessable("Tree SHA does not exist"));
        }
        state.writes.commits += 1;
        let mut created = state.commit(&commit.message, commit.tree.clone(), commit.parents.clone());
        created.author = commit.author.clone();
        state.commits.insert(created.sha.clone(), created.clone());

        if let Some((repo, branch)) = state.race_on_commit.take() {
            let tree = state
                .head(&repo, &branch)
                .map(|head| state.tree_of(&head))
                .unwrap_or_default();
            state.commit_on(&repo, &branch, "concurrent change", tree);
        }
        Ok(created)
    }

    async fn create_blob(&self, _owner: &str, _repo: &str, content: &[u8]) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.writes.blobs += 1;
        Ok(state.blob(content))
    }

    async fn create_tree(
        &self,
        _owner: &str,
        _repo: &str,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let mut tree = state
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| unprocessable("base_tree is not a valid tree"))?;
        for entry in entries {
            match &entry.sha {
                Some(sha) => {
                    tree.insert(entry.path.clone(), sha.clone());
                }
                None => {
                    tree.remove(&entry.path);
                }
            }
        }
        state.writes.trees += 1;
        Ok(state.tree(tree))
    }

    async fn get_contents(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Contents> {
        let state = self.state.lock().unwrap();
        let git_ref = git_ref.unwrap_or("main");
        let commit = state.resolve(repo, git_ref).ok_or_else(|| not_found("No commit found for the ref"))?;
        let tree = state.tree_of(&commit);
        let path = path.trim_matches('/');

        if let Some(sha) = tree.get(path) {
            let content = state.blobs.get(sha).cloned().unwrap_or_default();
            return Ok(Contents::Item(Box::new(ContentItem {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
                path: path.to_string(),
                sha: sha.clone(),
                size: content.len() as u64,
                kind: "file".into(),
                content: Some(encode_content(&content)),
                encoding: Some("base64".into()),
            })));
        }

        let prefix = if path.is_empty() { String::new() } else { format!("{}/", path) };
        let mut files = Vec::new();
        let mut dirs = BTreeSet::new();
        for (file, sha) in tree.iter().filter(|(p, _)| p.starts_with(&prefix)) {
            let rest = &file[prefix.len()..];
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
                None => files.push(ContentItem {
                    name: rest.to_string(),
                    path: file.clone(),
                    sha: sha.clone(),
                    size: state.blobs.get(sha).map(|b| b.len() as u64).unwrap_or(0),
                    kind: "file".into(),
                    content: None,
                    encoding: None,
                }),
            }
        }
        if files.is_empty() && dirs.is_empty() {
            return Err(not_found("Not Found"));
        }
        let mut listing: Vec<ContentItem> = dirs
            .into_iter()
            .map(|dir| ContentItem {
                path: format!("{}{}", prefix, dir),
                name: dir,
                sha: "0".repeat(40),
                size: 0,
                kind: "dir".into(),
                content: None,
                encoding: None,
            })
            .collect();
        listing.extend(files);
        Ok(Contents::Directory(listing))
    }

    async fn put_contents(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        body: &PutContents,
    ) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        if state.rejected_puts.iter().any(|p| p == path) {
            return Err(Error::Remote {
                status: Some(500),
                message: format!("upload of {} rejected", path),
            });
        }
        let branch = body.branch.clone().unwrap_or_else(|| "main".into());
        let mut tree = state
            .head(repo, &branch)
            .map(|head| state.tree_of(&head))
            .unwrap_or_default();
        match (tree.get(path), &body.sha) {
            (Some(current), Some(sha)) if current != sha => {
                return Err(Error::Remote {
                    status: Some(409),
                    message: format!("{} does not match {}", path, sha),
                })
            }
            (Some(_), None) => return Err(unprocessable("\"sha\" wasn't supplied.")),
            _ => {}
        }
        let content = crate::api::decode_content(&body.content)
            .map_err(|e| unprocessable(e.to_string()))?;
        let sha = state.blob(&content);
        tree.insert(path.to_string(), sha.clone());
        let commit = state.commit_on(repo, &branch, &body.message, tree);
        Ok(json!({ "content": { "path": path, "sha": sha }, "commit": { "sha": commit } }))
    }

    async fn delete_contents(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        body: &DeleteContents,
    ) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        let branch = body.branch.clone().unwrap_or_else(|| "main".into());
        let head = state.head(repo, &branch).ok_or_else(|| not_found("Not Found"))?;
        let mut tree = state.tree_of(&head);
        match tree.get(path) {
            Some(current) if *current == body.sha => {}
            Some(_) => return Err(Error::Remote { status: Some(409), message: "sha mismatch".into() }),
            None => return Err(not_found("Not Found")),
        }
        tree.remove(path);
        let commit = state.commit_on(repo, &branch, &body.message, tree);
        Ok(json!({ "content": null, "commit": { "sha": commit } }))
    }

    async fn get_repository(&self, _owner: &str, repo: &str) -> Result<Repository> {
        let state = self.state.lock().unwrap();
        state.repos.get(repo).cloned().ok_or_else(|| not_found("Not Found"))
    }

    async fn create_repository(&self, repo: &NewRepository) -> Result<Repository> {
        let mut state = self.state.lock().unwrap();
        if state.repos.contains_key(&repo.name) {
            return Err(unprocessable("name already exists on this account"));
        }
        let created = Repository {
            name: repo.name.clone(),
            full_name: format!("fake/{}", repo.name),
            description: Some(repo.description.clone()),
            private: repo.private,
            html_url: None,
            clone_url: format!("https://example.invalid/{}.git", repo.name),
            default_branch: Some("main".into()),
        };
        state.repos.insert(repo.name.clone(), created.clone());
        Ok(created)
    }

    async fn rename_repository(
        &self,
        _owner: &str,
        repo: &str,
        new_name: &str,
    ) -> Result<Repository> {
        let mut state = self.state.lock().unwrap();
        let mut renamed = state.repos.remove(repo).ok_or_else(|| not_found("Not Found"))?;
        renamed.name = new_name.to_string();
        renamed.full_name = format!("fake/{}", new_name);
        state.repos.insert(new_name.to_string(), renamed.clone());
        let moved: Vec<_> = state.refs.keys().filter(|(r, _)| r == repo).cloned().collect();
        for key in moved {
            if let Some(sha) = state.refs.remove(&key) {
                state.refs.insert((new_name.to_string(), key.1), sha);
            }
        }
        Ok(renamed)
    }

    async fn list_commits(
        &self,
        _owner: &str,
        repo: &str,
        filter: &CommitFilter,
    ) -> Result<Value> {
        let state = self.state.lock().unwrap();
        let branch = filter.branch.as_deref().unwrap_or("main");
        let mut next = state.resolve(repo, branch);
        let mut listed = Vec::new();
        while let Some(sha) = next {
            let commit = &state.commits[&sha];
            listed.push(json!({ "sha": sha, "commit": { "message": commit.message } }));
            next = commit.parents.first().map(|p| p.sha.clone());
        }
        Ok(Value::Array(listed))
    }

    async fn get_commit_files(
        &self,
        _owner: &str,
        _repo: &str,
        sha: &str,
    ) -> Result<Vec<CommitFile>> {
        let state = self.state.lock().unwrap();
        let commit = state.commits.get(sha).ok_or_else(|| not_found("Not Found"))?;
        let after = state.tree_of(sha);
        let before = commit
            .parents
            .first()
            .map(|p| state.tree_of(&p.sha))
            .unwrap_or_default();

        let file = |filename: &str, status: &str| CommitFile {
            filename: filename.to_string(),
            status: status.to_string(),
            additions: 0,
            deletions: 0,
            previous_filename: None,
        };
        let mut files = Vec::new();
        for (path, sha) in &after {
            match before.get(path) {
                None => files.push(file(path, "added")),
                Some(old) if old != sha => files.push(file(path, "modified")),
                Some(_) => {}
            }
        }
        for path in before.keys().filter(|p| !after.contains_key(*p)) {
            files.push(file(path, "removed"));
        }
        Ok(files)
    }

    fn access_token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
