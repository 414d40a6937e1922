// src/engine/mod.rs

//! Per-branch build engine.
//!
//! - [`queue`] is the durable queue/marker/watermark state machine. It only
//!   touches the filesystem abstraction and the ancestry oracle.
//! - [`runtime`] is the drain loop around it. It updates the working tree,
//!   runs the staged build and records the result for each untested commit.

use std::path::PathBuf;

use crate::build::Stage;
use crate::record::RecordReport;
use crate::types::{sanitize_branch_name, CommitId};

pub mod queue;
pub mod runtime;

pub use queue::{BuildQueue, DrainLease, DrainState};
pub use runtime::BranchRuntime;

/// Which branch of which repository a runtime drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTarget {
    pub repo: String,
    pub branch: String,
    /// `branch` with `/` replaced, usable as one path component.
    pub safe_branch: String,
    /// The branch worktree; commands run here.
    pub working_dir: PathBuf,
}

impl BranchTarget {
    pub fn new(repo: impl Into<String>, branch: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        let branch = branch.into();
        Self {
            repo: repo.into(),
            safe_branch: sanitize_branch_name(&branch),
            branch,
            working_dir: working_dir.into(),
        }
    }
}

/// One commit processed by a drain loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommit {
    pub commit: CommitId,
    pub succeeded: bool,
    pub failed_stage: Option<Stage>,
    pub record: RecordReport,
}

/// Result of [`BranchRuntime::drain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainReport {
    /// Another drain held the marker; nothing was touched.
    AlreadyDraining,
    /// The queue was drained; `built` lists the commits built, in order.
    Drained { built: Vec<BuiltCommit> },
}

impl DrainReport {
    pub fn built(&self) -> &[BuiltCommit] {
        match self {
            DrainReport::AlreadyDraining => &[],
            DrainReport::Drained { built } => built,
        }
    }
}
