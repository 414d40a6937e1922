// src/vcs/mod.rs

//! Version-control collaborators.
//!
//! The drain loop only talks to an [`AncestryOracle`]; [`git`] implements it
//! (and the repository-level clone/fetch/worktree plumbing) on top of the
//! `git` command-line tool.

pub mod git;

pub use git::{GitBranch, GitRepository};

use crate::errors::Result;
use crate::types::{BoxFuture, CommitId};

/// History-graph queries and working-tree updates for one branch.
pub trait AncestryOracle: Send + Sync {
    /// True if `ancestor` equals `descendant` or precedes it in history.
    ///
    /// A failed query must surface as `Err`; it is never a silent "covered" or
    /// "not covered".
    fn is_ancestor_or_equal<'a>(
        &'a self,
        ancestor: &'a CommitId,
        descendant: &'a CommitId,
    ) -> BoxFuture<'a, Result<bool>>;

    /// Move the branch working tree to `commit`.
    fn update_to<'a>(&'a self, commit: &'a CommitId) -> BoxFuture<'a, Result<()>>;

    /// Current head of the tracked branch on the remote.
    fn latest_remote_commit(&self) -> BoxFuture<'_, Result<CommitId>>;
}
