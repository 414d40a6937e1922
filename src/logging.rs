// src/logging.rs

//! `tracing` setup shared by every soapci process.
//!
//! A single `soapci run` fans out into one `repo` process per repository and
//! one `branch` process per branch. Children inherit the parent's stderr, so
//! all of them write to the same stream, usually a cron log file. Each
//! process therefore wraps its work in a `process` span (see
//! [`process_span`]) so interleaved lines can be told apart.
//!
//! The level comes from `--log-level`, which parents forward to their
//! children. Without it, `SOAPCI_LOG` is consulted, then `info`.

use std::io::IsTerminal;

use anyhow::Result;
use tracing::{Level, Span};
use tracing_subscriber::fmt;

use crate::cli::{Command, LogLevel};

/// Environment variable read when no `--log-level` is given.
pub const LOG_ENV: &str = "SOAPCI_LOG";

/// Install the global subscriber. Call once, before any role runs.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_level = std::env::var(LOG_ENV).ok();
    let level = effective_level(cli_level, env_level.as_deref());

    // Colour codes only make sense on a terminal, not in cron logs.
    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// CLI flag wins; an unparsable environment value falls back to `info`.
pub fn effective_level(cli_level: Option<LogLevel>, env_level: Option<&str>) -> Level {
    cli_level
        .map(Level::from)
        .or_else(|| env_level.and_then(parse_level_str))
        .unwrap_or(Level::INFO)
}

/// Span identifying the process role and its repository or branch.
pub fn process_span(command: &Command) -> Span {
    match command {
        Command::Run => tracing::info_span!("process", role = "run"),
        Command::Repo { repo } => tracing::info_span!("process", role = "repo", %repo),
        Command::Branch { repo, branch, .. } => {
            tracing::info_span!("process", role = "branch", %repo, %branch)
        }
    }
}

impl From<LogLevel> for Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Parse a level name as accepted by `SOAPCI_LOG`.
pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
