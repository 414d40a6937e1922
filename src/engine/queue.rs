// src/engine/queue.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::CommitId;
use crate::vcs::AncestryOracle;

/// Observable drain state of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// No marker: nobody is draining the queue.
    Idle,
    /// Marker present: a drain loop owns the branch (or crashed holding it).
    Draining,
}

/// Proof that the caller created the `.testing` marker.
///
/// Dropping a lease does **not** remove the marker: a drain that ends in an
/// error leaves the branch marked for manual inspection. Only
/// [`BuildQueue::finish_drain`] releases it.
#[derive(Debug)]
#[must_use = "a drain lease must be finished to release the branch"]
pub struct DrainLease {
    marker: PathBuf,
}

impl DrainLease {
    pub fn marker(&self) -> &Path {
        &self.marker
    }
}

/// Durable per-branch build queue.
///
/// Three independent files in the branch state directory:
///
/// - `<branch>.queue`: append-only commit ids, one per line.
/// - `<branch>.testing`: empty marker; present while a drain runs.
/// - `<branch>.finished`: the watermark, the last processed commit.
#[derive(Debug, Clone)]
pub struct BuildQueue {
    fs: Arc<dyn FileSystem>,
    state_dir: PathBuf,
    branch: String,
}

impl BuildQueue {
    pub fn new(fs: Arc<dyn FileSystem>, state_dir: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            fs,
            state_dir: state_dir.into(),
            branch: branch.into(),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn slot(&self, slot: &str) -> PathBuf {
        self.state_dir.join(format!("{}.{slot}", self.branch))
    }

    pub fn queue_path(&self) -> PathBuf {
        self.slot("queue")
    }

    pub fn marker_path(&self) -> PathBuf {
        self.slot("testing")
    }

    pub fn watermark_path(&self) -> PathBuf {
        self.slot("finished")
    }

    /// Append `commit` to the queue. Duplicates are not filtered here; the
    /// coverage check absorbs them when draining.
    pub fn enqueue(&self, commit: &CommitId) -> Result<()> {
        self.fs
            .append(&self.queue_path(), format!("{commit}\n").as_bytes())?;
        info!(branch = %self.branch, commit = %commit, "enqueued commit");
        Ok(())
    }

    pub fn state(&self) -> DrainState {
        if self.fs.exists(&self.marker_path()) {
            DrainState::Draining
        } else {
            DrainState::Idle
        }
    }

    /// Advisory: true iff the marker exists.
    pub fn is_draining(&self) -> bool {
        self.state() == DrainState::Draining
    }

    /// Queue entries in file order. A missing queue file is an empty queue.
    pub fn queued(&self) -> Result<Vec<CommitId>> {
        let path = self.queue_path();
        if !self.fs.exists(&path) {
            return Ok(Vec::new());
        }

        self.fs
            .read_to_string(&path)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(CommitId::new)
            .collect()
    }

    /// Current watermark, read from disk on every call.
    pub fn watermark(&self) -> Result<Option<CommitId>> {
        let path = self.watermark_path();
        if !self.fs.exists(&path) {
            return Ok(None);
        }

        let raw = self.fs.read_to_string(&path)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(CommitId::new(raw)?))
    }

    pub fn mark_finished(&self, commit: &CommitId) -> Result<()> {
        self.fs
            .write(&self.watermark_path(), commit.as_str().as_bytes())?;
        debug!(branch = %self.branch, commit = %commit, "watermark advanced");
        Ok(())
    }

    /// Atomically move IDLE -> DRAINING.
    ///
    /// Returns `None` if the marker already exists.
    pub fn try_begin_drain(&self) -> Result<Option<DrainLease>> {
        let marker = self.marker_path();
        if self.fs.create_new(&marker)? {
            info!(branch = %self.branch, "drain started");
            Ok(Some(DrainLease { marker }))
        } else {
            debug!(branch = %self.branch, "marker already present");
            Ok(None)
        }
    }

    /// Whether `commit` is already covered by `watermark`.
    ///
    /// Equality is decided locally; anything else asks the oracle, and its
    /// errors propagate.
    pub async fn is_covered(
        &self,
        commit: &CommitId,
        watermark: Option<&CommitId>,
        oracle: &dyn AncestryOracle,
    ) -> Result<bool> {
        let Some(watermark) = watermark else {
            return Ok(false);
        };
        if commit == watermark {
            return Ok(true);
        }
        oracle.is_ancestor_or_equal(commit, watermark).await
    }

    /// First queued commit not covered by the current watermark.
    pub async fn next_untested(&self, oracle: &dyn AncestryOracle) -> Result<Option<CommitId>> {
        let watermark = self.watermark()?;

        for commit in self.queued()? {
            debug!(branch = %self.branch, commit = %commit, watermark = ?watermark, "considering");
            if !self.is_covered(&commit, watermark.as_ref(), oracle).await? {
                return Ok(Some(commit));
            }
        }
        Ok(None)
    }

    /// DRAINING -> IDLE: delete the queue, then the marker.
    pub fn finish_drain(&self, lease: DrainLease) -> Result<()> {
        let queue = self.queue_path();
        if self.fs.exists(&queue) {
            self.fs.remove_file(&queue)?;
        }
        self.fs.remove_file(&lease.marker)?;
        info!(branch = %self.branch, "drain finished; queue cleared");
        Ok(())
    }
}
