// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] classifies expanded command strings (normal shell command vs.
//!   environment-sourcing directive) and defines [`CommandOutput`].
//! - [`env`] holds the [`EnvironmentOverlay`] that sourced scripts feed into.
//! - [`backend`] provides the [`CommandExecutor`] trait and the production
//!   [`ShellExecutor`]; tests swap in a fake implementation.
//! - [`session`] ties an executor to a branch's working directory and overlay.

pub mod backend;
pub mod command;
pub mod env;
pub mod session;

pub use backend::{CommandExecutor, ShellExecutor};
pub use command::{CommandOutput, ParsedCommand};
pub use env::EnvironmentOverlay;
pub use session::{Dispatch, ShellSession};
