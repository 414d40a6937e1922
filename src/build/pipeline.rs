// src/build/pipeline.rs

use std::fmt;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::{Dispatch, ShellSession};
use crate::macros::{expand, MacroContext};
use crate::types::CommitId;

/// Named phase of a build pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Build,
    Teardown,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Setup, Stage::Build, Stage::Teardown];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Build => "build",
            Stage::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of running a [`StagedBuild`] for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub succeeded: bool,
    /// Stage whose command failed; `None` on success.
    pub failed_stage: Option<Stage>,
    /// stdout of every executed command, in execution order.
    pub stdout: String,
    /// stderr of every executed command, in execution order.
    pub stderr: String,
}

/// Build definition: three ordered stages plus optional outcome hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedBuild {
    pub setup: Vec<String>,
    pub build: Vec<String>,
    pub teardown: Vec<String>,
    /// Run after a successful build has been recorded.
    pub success: Vec<String>,
    /// Run after a failed build has been recorded.
    pub failure: Vec<String>,
}

impl StagedBuild {
    pub fn stage(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::Setup => &self.setup,
            Stage::Build => &self.build,
            Stage::Teardown => &self.teardown,
        }
    }

    /// Run setup, build and teardown for `commit`.
    ///
    /// Fail-fast: the first failing command ends the pipeline and the
    /// remaining stages (teardown included) are skipped. A template that
    /// cannot be expanded is an `Err`, not a failed build.
    pub async fn execute(
        &self,
        commit: &CommitId,
        macros: &MacroContext,
        session: &mut ShellSession,
    ) -> Result<BuildOutcome> {
        let mut outcome = BuildOutcome::default();

        for stage in Stage::ALL {
            debug!(commit = %commit, stage = %stage, "entering stage");

            for template in self.stage(stage) {
                let cmd = expand(template, macros)?;

                match session.dispatch(&cmd).await {
                    Dispatch::Ran(out) => {
                        outcome.stdout.push_str(&out.stdout);
                        outcome.stderr.push_str(&out.stderr);

                        if !out.success() {
                            info!(
                                commit = %commit,
                                stage = %stage,
                                cmd = %cmd,
                                exit_code = out.exit_code,
                                "build command failed"
                            );
                            outcome.failed_stage = Some(stage);
                            return Ok(outcome);
                        }
                    }
                    // Sourcing problems were already logged by the session and
                    // never fail the build.
                    Dispatch::Sourced { .. } | Dispatch::SourceFailed(_) => {}
                }
            }
        }

        info!(commit = %commit, "build succeeded");
        outcome.succeeded = true;
        Ok(outcome)
    }

    /// Run the `success` or `failure` hook list.
    ///
    /// Best-effort: expansion errors and failing hooks are logged and the
    /// remaining hooks still run.
    pub async fn run_hooks(
        &self,
        succeeded: bool,
        macros: &MacroContext,
        session: &mut ShellSession,
    ) {
        let hooks = if succeeded { &self.success } else { &self.failure };

        for template in hooks {
            let cmd = match expand(template, macros) {
                Ok(cmd) => cmd,
                Err(err) => {
                    warn!(template = %template, error = %err, "skipping hook");
                    continue;
                }
            };

            let dispatch = session.dispatch(&cmd).await;
            if !dispatch.succeeded() {
                warn!(cmd = %cmd, ?dispatch, "hook failed");
            }
        }
    }
}
