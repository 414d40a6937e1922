// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! One binary, three process roles. `run` is what a cron job invokes; it
//! re-executes the binary as `repo` and `branch` children.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `soapci`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "soapci",
    version,
    about = "Build and record every new commit of the tracked branches.",
    long_about = None
)]
pub struct CliArgs {
    /// Working directory holding the config, repositories and results.
    #[arg(short = 'w', long, value_name = "DIR", default_value = ".", global = true)]
    pub working_dir: PathBuf,

    /// Path to the config file (TOML), relative to the working directory.
    ///
    /// Default: `soapci.toml` in the working directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SOAPCI_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Clone every configured repository and start a `repo` process for each.
    Run,

    /// Fetch one repository and start a `branch` process for each branch.
    Repo {
        #[arg(long, value_name = "NAME")]
        repo: String,
    },

    /// Queue the remote head of one branch and drain the queue.
    Branch {
        #[arg(long, value_name = "NAME")]
        repo: String,

        #[arg(long, value_name = "NAME")]
        branch: String,

        /// Print the macro context and expanded pipeline; run nothing.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Name accepted by `--log-level`, used when forwarding to children.
    pub fn as_arg(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
