// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::build::StagedBuild;
use crate::errors::Result;
use crate::exec::ShellSession;
use crate::macros::{expand, MacroContext};
use crate::record::ResultRecorder;
use crate::sandbox::Sandbox;
use crate::types::CommitId;
use crate::vcs::AncestryOracle;

use super::queue::BuildQueue;
use super::{BranchTarget, BuiltCommit, DrainReport};

/// Drives one branch: enqueue discovered commits and drain the queue.
///
/// Everything runs sequentially on the caller's task. One commit's working
/// tree update, build, watermark advance and recording complete before the
/// next commit is even selected.
pub struct BranchRuntime {
    target: BranchTarget,
    macros: MacroContext,
    build: StagedBuild,
    pre_test_cmd: Option<String>,
    queue: BuildQueue,
    oracle: Arc<dyn AncestryOracle>,
    recorder: ResultRecorder,
    session: ShellSession,
}

impl fmt::Debug for BranchRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchRuntime")
            .field("target", &self.target)
            .field("queue", &self.queue)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl BranchRuntime {
    pub fn new(
        target: BranchTarget,
        macros: MacroContext,
        build: StagedBuild,
        queue: BuildQueue,
        oracle: Arc<dyn AncestryOracle>,
        recorder: ResultRecorder,
        session: ShellSession,
    ) -> Self {
        Self {
            target,
            macros,
            build,
            pre_test_cmd: None,
            queue,
            oracle,
            recorder,
            session,
        }
    }

    /// Command run after every working-tree update, before the build.
    pub fn with_pre_test_cmd(mut self, cmd: Option<String>) -> Self {
        self.pre_test_cmd = cmd;
        self
    }

    pub fn target(&self) -> &BranchTarget {
        &self.target
    }

    pub fn queue(&self) -> &BuildQueue {
        &self.queue
    }

    pub fn session(&self) -> &ShellSession {
        &self.session
    }

    pub async fn enter_sandbox(&mut self, sandbox: &Sandbox) -> Result<()> {
        sandbox.enter_or_create(&self.macros, &mut self.session).await
    }

    /// Look up the remote head and append it to the queue.
    pub async fn enqueue_remote_head(&self) -> Result<CommitId> {
        let head = self.oracle.latest_remote_commit().await?;
        info!(branch = %self.target.branch, commit = %head, "latest remote commit");
        self.queue.enqueue(&head)?;
        Ok(head)
    }

    /// Branch process body: enqueue the remote head, then drain unless a
    /// drain is already active.
    pub async fn run_once(&mut self) -> Result<DrainReport> {
        self.enqueue_remote_head().await?;

        if self.queue.is_draining() {
            info!(branch = %self.target.branch, "build already in progress; leaving queue to it");
            return Ok(DrainReport::AlreadyDraining);
        }
        self.drain().await
    }

    /// Build every queued commit not covered by the watermark.
    ///
    /// The watermark advances past each built commit whatever the outcome, so
    /// failed commits are not retried. An `Err` aborts the loop and leaves
    /// the marker, queue and watermark exactly as they were.
    pub async fn drain(&mut self) -> Result<DrainReport> {
        let Some(lease) = self.queue.try_begin_drain()? else {
            info!(branch = %self.target.branch, "drain already active; nothing to do");
            return Ok(DrainReport::AlreadyDraining);
        };

        let mut built = Vec::new();
        while let Some(commit) = self.queue.next_untested(self.oracle.as_ref()).await? {
            built.push(self.build_commit(commit).await?);
        }

        self.queue.finish_drain(lease)?;
        info!(branch = %self.target.branch, built = built.len(), "queue drained");
        Ok(DrainReport::Drained { built })
    }

    async fn build_commit(&mut self, commit: CommitId) -> Result<BuiltCommit> {
        info!(
            repo = %self.target.repo,
            branch = %self.target.branch,
            commit = %commit,
            "building commit"
        );

        self.oracle.update_to(&commit).await?;
        self.run_pre_test_cmd().await?;

        let outcome = self
            .build
            .execute(&commit, &self.macros, &mut self.session)
            .await?;

        self.queue.mark_finished(&commit)?;

        let record = self.recorder.record(
            &self.target.repo,
            &self.target.safe_branch,
            &commit,
            &outcome,
        );

        self.build
            .run_hooks(outcome.succeeded, &self.macros, &mut self.session)
            .await;

        Ok(BuiltCommit {
            commit,
            succeeded: outcome.succeeded,
            failed_stage: outcome.failed_stage,
            record,
        })
    }

    async fn run_pre_test_cmd(&mut self) -> Result<()> {
        let Some(template) = self.pre_test_cmd.as_deref() else {
            return Ok(());
        };
        let cmd = expand(template, &self.macros)?;
        let dispatch = self.session.dispatch(&cmd).await;
        if !dispatch.succeeded() {
            warn!(cmd = %cmd, ?dispatch, "pre-test command failed; building anyway");
        }
        Ok(())
    }
}
