// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoapCiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A `${name}` placeholder referenced a name the context does not define.
    #[error("undefined macro '{name}' in \"{template}\" (known names: {})", .known.join(", "))]
    UndefinedMacro {
        name: String,
        template: String,
        known: Vec<String>,
    },

    #[error("Cyclic macro definition: {0}")]
    CyclicMacro(String),

    #[error("macro expansion of \"{template}\" exceeded {limit} substitutions")]
    ExpansionLimitExceeded { template: String, limit: usize },

    /// The history graph could not answer an ancestor-or-equal query.
    #[error("ancestry query {ancestor} <= {descendant} failed: {detail}")]
    AncestryQuery {
        ancestor: String,
        descendant: String,
        detail: String,
    },

    #[error("git error: {0}")]
    Git(String),

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Branch '{branch}' not configured for repository '{repo}'")]
    BranchNotFound { repo: String, branch: String },

    #[error("invalid commit identifier: {0:?}")]
    InvalidCommit(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SoapCiError>;
