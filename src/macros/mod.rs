// src/macros/mod.rs

//! `${name}` command-template substitution.
//!
//! - [`context`] builds the immutable per-branch [`MacroContext`] from
//!   precedence-ordered layers and rejects cyclic definitions.
//! - [`expand`] performs the substitution itself.

pub mod context;
pub mod expand;

pub use context::{MacroContext, MacroContextBuilder, MacroLayer};
pub use expand::{expand, placeholder_names, MAX_SUBSTITUTIONS};

/// Reserved name: repository name.
pub const REPO_NAME: &str = "__repo_name__";
/// Reserved name: branch name as configured.
pub const BRANCH_NAME: &str = "__branch_name__";
/// Reserved name: branch name with `/` replaced by `_`.
pub const BRANCH_NAME_SAFE: &str = "__branch_name_safe__";
/// Reserved name: the branch's worktree directory.
pub const BRANCH_WORKING_DIR: &str = "__branch_working_dir__";
/// Injected into the global layer: the soapci working directory.
pub const WORKING_DIR: &str = "__working_dir__";
