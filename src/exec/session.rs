// src/exec/session.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::exec::{CommandExecutor, CommandOutput, EnvironmentOverlay, ParsedCommand};

/// What happened to one expanded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The command ran (or failed to start, reported as exit code -1).
    Ran(CommandOutput),
    /// A sourcing directive succeeded; `vars` variables were merged.
    Sourced { vars: usize },
    /// A sourcing directive failed; the overlay is unchanged.
    SourceFailed(String),
}

impl Dispatch {
    pub fn succeeded(&self) -> bool {
        match self {
            Dispatch::Ran(out) => out.success(),
            Dispatch::Sourced { .. } => true,
            Dispatch::SourceFailed(_) => false,
        }
    }
}

/// Execution state of one branch process.
///
/// Holds the working directory commands run in and the environment overlay
/// accumulated from sourcing directives. Every command dispatched through the
/// same session sees the variables sourced before it.
pub struct ShellSession {
    executor: Arc<dyn CommandExecutor>,
    cwd: PathBuf,
    overlay: EnvironmentOverlay,
}

impl ShellSession {
    pub fn new(executor: Arc<dyn CommandExecutor>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            cwd: cwd.into(),
            overlay: EnvironmentOverlay::new(),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn overlay(&self) -> &EnvironmentOverlay {
        &self.overlay
    }

    /// Run or source one already-expanded command.
    ///
    /// Never fails: executor errors become a `Ran` with exit code -1 and the
    /// error text as stderr, sourcing errors become `SourceFailed`.
    pub async fn dispatch(&mut self, command: &str) -> Dispatch {
        match ParsedCommand::parse(command) {
            ParsedCommand::Source(script) => self.source(&script).await,
            ParsedCommand::Shell(cmd) => {
                match self.executor.run(&cmd, &self.cwd, &self.overlay).await {
                    Ok(out) => Dispatch::Ran(out),
                    Err(err) => {
                        error!(cmd = %cmd, error = %err, "command could not be executed");
                        Dispatch::Ran(CommandOutput {
                            exit_code: -1,
                            stdout: String::new(),
                            stderr: format!("{err}\n"),
                        })
                    }
                }
            }
        }
    }

    async fn source(&mut self, script: &Path) -> Dispatch {
        match self.executor.source(script, &self.cwd, &self.overlay).await {
            Ok(vars) => {
                let count = vars.len();
                self.overlay.merge(vars);
                info!(script = ?script, vars = count, "environment overlay updated");
                Dispatch::Sourced { vars: count }
            }
            Err(err) => {
                warn!(
                    script = ?script,
                    error = %err,
                    "sourcing failed; continuing without environment update"
                );
                Dispatch::SourceFailed(err.to_string())
            }
        }
    }
}

impl std::fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellSession")
            .field("cwd", &self.cwd)
            .field("overlay_vars", &self.overlay.len())
            .finish_non_exhaustive()
    }
}
