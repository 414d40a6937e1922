// src/exec/backend.rs

//! Pluggable command executor abstraction.
//!
//! Everything that runs a command (build stages, sandbox entry, the
//! `pre_test_cmd`) goes through a `CommandExecutor` instead of spawning
//! processes directly. This makes it easy to swap in a scripted fake in tests.
//!
//! - `ShellExecutor` is the implementation used by `soapci`. It runs each
//!   command through the platform shell and waits for it to exit.
//! - Tests provide their own `CommandExecutor` that records what was asked of
//!   it and returns canned outputs.

use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, Context};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{Result, SoapCiError};
use crate::exec::{CommandOutput, EnvironmentOverlay};
use crate::types::BoxFuture;

/// Trait abstracting how a single command is executed.
///
/// Production code uses [`ShellExecutor`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion in `cwd` with `env` layered over the
    /// inherited environment, capturing both output streams.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`];
    /// `Err` means the command could not be run at all.
    fn run<'a>(
        &'a self,
        command: &'a str,
        cwd: &'a Path,
        env: &'a EnvironmentOverlay,
    ) -> BoxFuture<'a, Result<CommandOutput>>;

    /// Source `script` in a shell and return the environment it leaves
    /// behind.
    fn source<'a>(
        &'a self,
        script: &'a Path,
        cwd: &'a Path,
        env: &'a EnvironmentOverlay,
    ) -> BoxFuture<'a, Result<EnvironmentOverlay>>;
}

/// Real executor used in production.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for ShellExecutor {
    fn run<'a>(
        &'a self,
        command: &'a str,
        cwd: &'a Path,
        env: &'a EnvironmentOverlay,
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(run_shell(command, cwd, env))
    }

    fn source<'a>(
        &'a self,
        script: &'a Path,
        cwd: &'a Path,
        env: &'a EnvironmentOverlay,
    ) -> BoxFuture<'a, Result<EnvironmentOverlay>> {
        Box::pin(source_script(script, cwd, env))
    }
}

async fn run_shell(command: &str, cwd: &Path, env: &EnvironmentOverlay) -> Result<CommandOutput> {
    info!(cmd = %command, cwd = ?cwd, "running command");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    env.apply(&mut cmd);

    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning `{command}` in {:?}", cwd))?;

    let exit_code = output.status.code().unwrap_or(-1);
    debug!(cmd = %command, exit_code, "command exited");

    Ok(CommandOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

async fn source_script(
    script: &Path,
    cwd: &Path,
    env: &EnvironmentOverlay,
) -> Result<EnvironmentOverlay> {
    if cfg!(windows) {
        return Err(SoapCiError::Other(anyhow!(
            "sourcing scripts is only supported with a POSIX shell"
        )));
    }

    let resolved = cwd.join(script);
    if !resolved.is_file() {
        return Err(SoapCiError::Other(anyhow!(
            "script {:?} does not exist",
            resolved
        )));
    }

    info!(script = ?resolved, "sourcing script");

    // The script's own stdout is discarded so only `env -0` output is parsed.
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(". \"$1\" >/dev/null && env -0")
        .arg("soapci-source")
        .arg(&resolved)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    env.apply(&mut cmd);

    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning shell to source {:?}", resolved))?;

    if !output.status.success() {
        return Err(SoapCiError::Other(anyhow!(
            "sourcing {:?} exited with {:?}: {}",
            resolved,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(EnvironmentOverlay::from_env_output(&String::from_utf8_lossy(
        &output.stdout,
    )))
}
