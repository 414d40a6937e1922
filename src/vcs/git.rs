// src/vcs/git.rs

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{Result, SoapCiError};
use crate::types::{BoxFuture, CommitId};
use crate::vcs::AncestryOracle;

async fn run_git(dir: &Path, args: &[&str]) -> Result<Output> {
    debug!(dir = ?dir, ?args, "running git");
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| SoapCiError::Git(format!("failed to run git {:?}: {e}", args)))
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// The shared mirror of one configured repository.
#[derive(Debug, Clone)]
pub struct GitRepository {
    url: String,
    repo_dir: PathBuf,
    checkout_dir: PathBuf,
    branch_dir: PathBuf,
}

impl GitRepository {
    pub fn new(
        url: impl Into<String>,
        repo_dir: impl Into<PathBuf>,
        checkout_dir: impl Into<PathBuf>,
        branch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            repo_dir: repo_dir.into(),
            checkout_dir: checkout_dir.into(),
            branch_dir: branch_dir.into(),
        }
    }

    pub fn checkout_dir(&self) -> &Path {
        &self.checkout_dir
    }

    /// Create the repository directories and clone the mirror if it is not
    /// there yet.
    pub async fn clone_if_necessary(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.repo_dir).await?;
        tokio::fs::create_dir_all(&self.branch_dir).await?;

        if self.checkout_dir.join(".git").exists() {
            debug!(checkout = ?self.checkout_dir, "repository already cloned");
            return Ok(());
        }

        info!(url = %self.url, checkout = ?self.checkout_dir, "cloning repository");
        let checkout = self.checkout_dir.to_string_lossy();
        let output = run_git(
            &self.repo_dir,
            &["clone", "--no-checkout", &self.url, &checkout],
        )
        .await?;

        if !output.status.success() {
            return Err(SoapCiError::Git(format!(
                "failed to clone repository {}: {}",
                self.url,
                stderr_of(&output)
            )));
        }
        Ok(())
    }

    /// `git fetch origin`. A failed fetch is logged; the branch processes
    /// still run against whatever was fetched before.
    pub async fn fetch(&self) -> Result<()> {
        let output = run_git(&self.checkout_dir, &["fetch", "origin"]).await?;
        if !output.status.success() {
            warn!(
                checkout = ?self.checkout_dir,
                stderr = %stderr_of(&output),
                "git fetch failed"
            );
        }
        Ok(())
    }

    /// Create the branch worktree at `dir` if it does not exist yet.
    ///
    /// The worktree is detached at `origin/<branch>`, so it never competes
    /// with the mirror (or another worktree) for the local branch ref.
    pub async fn ensure_worktree(&self, branch: &str, dir: &Path) -> Result<()> {
        if dir.exists() {
            return Ok(());
        }

        info!(branch = %branch, dir = ?dir, "creating branch worktree");
        let dir_str = dir.to_string_lossy();
        let upstream = format!("origin/{branch}");
        let output = run_git(
            &self.checkout_dir,
            &["worktree", "add", "--force", "--detach", &dir_str, &upstream],
        )
        .await?;

        if !output.status.success() {
            return Err(SoapCiError::Git(format!(
                "failed to create worktree for {branch}: {}",
                stderr_of(&output)
            )));
        }
        Ok(())
    }
}

/// [`AncestryOracle`] backed by a branch worktree and the repository mirror.
#[derive(Debug, Clone)]
pub struct GitBranch {
    branch: String,
    working_dir: PathBuf,
    checkout_dir: PathBuf,
}

impl GitBranch {
    pub fn new(
        branch: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        checkout_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            branch: branch.into(),
            working_dir: working_dir.into(),
            checkout_dir: checkout_dir.into(),
        }
    }

    async fn ancestry(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool> {
        let output = run_git(
            &self.working_dir,
            &["merge-base", "--is-ancestor", ancestor.as_str(), descendant.as_str()],
        )
        .await
        .map_err(|e| SoapCiError::AncestryQuery {
            ancestor: ancestor.to_string(),
            descendant: descendant.to_string(),
            detail: e.to_string(),
        })?;

        // merge-base --is-ancestor: 0 = yes, 1 = no, anything else = error.
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            other => Err(SoapCiError::AncestryQuery {
                ancestor: ancestor.to_string(),
                descendant: descendant.to_string(),
                detail: format!("git exited with {:?}: {}", other, stderr_of(&output)),
            }),
        }
    }

    async fn fast_forward(&self, commit: &CommitId) -> Result<()> {
        info!(branch = %self.branch, commit = %commit, "updating working tree");
        let output = run_git(&self.working_dir, &["merge", "--ff-only", commit.as_str()]).await?;
        if !output.status.success() {
            warn!(
                branch = %self.branch,
                commit = %commit,
                stderr = %stderr_of(&output),
                "fast-forward failed; building the working tree as it is"
            );
        }
        Ok(())
    }

    async fn remote_head(&self) -> Result<CommitId> {
        let upstream = format!("origin/{}", self.branch);
        let output = run_git(&self.checkout_dir, &["rev-parse", &upstream]).await?;
        if !output.status.success() {
            return Err(SoapCiError::Git(format!(
                "git rev-parse {upstream} failed: {}",
                stderr_of(&output)
            )));
        }
        String::from_utf8_lossy(&output.stdout).parse()
    }
}

impl AncestryOracle for GitBranch {
    fn is_ancestor_or_equal<'a>(
        &'a self,
        ancestor: &'a CommitId,
        descendant: &'a CommitId,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(self.ancestry(ancestor, descendant))
    }

    fn update_to<'a>(&'a self, commit: &'a CommitId) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.fast_forward(commit))
    }

    fn latest_remote_commit(&self) -> BoxFuture<'_, Result<CommitId>> {
        Box::pin(self.remote_head())
    }
}
