// src/record/mod.rs

//! Durable build results.
//!
//! Layout under the output root:
//!
//! ```text
//! <output_root>/<repo>/<safe_branch>/<commit>/status.<ext>  -> success/failure image
//! <output_root>/<repo>/<safe_branch>/<commit>/log.txt
//! <output_root>/<repo>/<safe_branch>/current                -> most recent <commit>/
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::build::BuildOutcome;
use crate::fs::FileSystem;
use crate::types::CommitId;

pub const LOG_FILE: &str = "log.txt";
pub const CURRENT_LINK: &str = "current";

/// One step of [`ResultRecorder::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStep {
    CreateDir,
    StatusLink,
    WriteLog,
    CurrentLink,
}

impl fmt::Display for RecordStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStep::CreateDir => "create result directory",
            RecordStep::StatusLink => "link status image",
            RecordStep::WriteLog => "write log",
            RecordStep::CurrentLink => "repoint current",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub step: RecordStep,
    pub message: String,
}

/// What [`ResultRecorder::record`] managed to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    pub result_dir: PathBuf,
    pub failures: Vec<RecordFailure>,
}

impl RecordReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes one result directory per tested commit.
#[derive(Debug, Clone)]
pub struct ResultRecorder {
    fs: Arc<dyn FileSystem>,
    output_root: PathBuf,
    success_image: PathBuf,
    failure_image: PathBuf,
}

impl ResultRecorder {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        output_root: impl Into<PathBuf>,
        success_image: impl Into<PathBuf>,
        failure_image: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            output_root: output_root.into(),
            success_image: success_image.into(),
            failure_image: failure_image.into(),
        }
    }

    pub fn branch_dir(&self, repo: &str, safe_branch: &str) -> PathBuf {
        self.output_root.join(repo).join(safe_branch)
    }

    pub fn result_dir(&self, repo: &str, safe_branch: &str, commit: &CommitId) -> PathBuf {
        self.branch_dir(repo, safe_branch).join(commit.as_str())
    }

    /// Name of the status link: `status` plus the image's extension.
    pub fn status_link_name(&self, succeeded: bool) -> String {
        let image = self.image_for(succeeded);
        match image.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("status.{ext}"),
            None => "status".to_string(),
        }
    }

    /// Configured status images that do not exist. Status links pointing at
    /// them are still written but dangle.
    pub fn missing_images(&self) -> Vec<&Path> {
        [&self.success_image, &self.failure_image]
            .into_iter()
            .map(PathBuf::as_path)
            .filter(|image| !self.fs.exists(image))
            .collect()
    }

    fn image_for(&self, succeeded: bool) -> &Path {
        if succeeded {
            &self.success_image
        } else {
            &self.failure_image
        }
    }

    /// Persist `outcome` for `(repo, safe_branch, commit)`.
    ///
    /// Every step is attempted even if an earlier one failed; failures are
    /// logged and returned in the report, never propagated.
    pub fn record(
        &self,
        repo: &str,
        safe_branch: &str,
        commit: &CommitId,
        outcome: &BuildOutcome,
    ) -> RecordReport {
        let result_dir = self.result_dir(repo, safe_branch, commit);
        let mut failures = Vec::new();
        let mut note = |step: RecordStep, res: anyhow::Result<()>| {
            if let Err(err) = res {
                warn!(dir = ?result_dir, %step, error = %err, "recording step failed");
                failures.push(RecordFailure {
                    step,
                    message: format!("{err:#}"),
                });
            }
        };

        note(RecordStep::CreateDir, self.fs.create_dir_all(&result_dir));

        // A re-recorded commit gets the status of its latest outcome.
        let status_link = result_dir.join(self.status_link_name(outcome.succeeded));
        let other_link = result_dir.join(self.status_link_name(!outcome.succeeded));
        note(
            RecordStep::StatusLink,
            self.replace_link(&[&status_link, &other_link], self.image_for(outcome.succeeded), &status_link),
        );

        note(
            RecordStep::WriteLog,
            self.fs
                .write(&result_dir.join(LOG_FILE), render_log(outcome).as_bytes()),
        );

        let current = self.branch_dir(repo, safe_branch).join(CURRENT_LINK);
        note(
            RecordStep::CurrentLink,
            self.replace_link(&[&current], &result_dir, &current),
        );

        info!(
            repo = %repo,
            branch = %safe_branch,
            commit = %commit,
            succeeded = outcome.succeeded,
            "recorded build result"
        );

        RecordReport {
            result_dir,
            failures,
        }
    }

    /// Remove whatever is at `stale` and create `link -> target`.
    ///
    /// Not atomic: between removal and creation there is no link.
    fn replace_link(&self, stale: &[&PathBuf], target: &Path, link: &Path) -> anyhow::Result<()> {
        for path in stale {
            if self.fs.exists(path) {
                self.fs.remove_file(path)?;
            }
        }
        self.fs.symlink(target, link)
    }
}

/// Log body: result header followed by both labelled streams.
pub fn render_log(outcome: &BuildOutcome) -> String {
    let header = match outcome.failed_stage {
        Some(stage) if !outcome.succeeded => format!("Result: FAIL at {stage}"),
        _ if outcome.succeeded => "Result: Success".to_string(),
        _ => "Result: FAIL".to_string(),
    };

    format!(
        "{header}\n\n*********STDOUT**********:\n{}\n*********STDERR**********:\n{}\n",
        outcome.stdout, outcome.stderr
    )
}
