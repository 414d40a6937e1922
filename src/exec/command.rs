// src/exec/command.rs

use std::path::PathBuf;

/// An expanded command template, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// Opaque string handed to the shell.
    Shell(String),
    /// `source <script>` / `. <script>`: load the script's resulting
    /// environment instead of running a build step.
    Source(PathBuf),
}

impl ParsedCommand {
    pub fn parse(cmd: &str) -> Self {
        let script = cmd
            .strip_prefix("source ")
            .or_else(|| cmd.strip_prefix(". "))
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match script {
            Some(script) => ParsedCommand::Source(PathBuf::from(script)),
            None => ParsedCommand::Shell(cmd.to_string()),
        }
    }
}

/// Exit status and captured streams of one finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code; `-1` when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
