// src/config/mod.rs

//! Configuration loading and validation for soapci.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate repository, branch and sandbox references (`validate.rs`).
//! - Resolve paths, macro layers and build definitions per branch (`resolve.rs`).

pub mod loader;
pub mod model;
pub mod resolve;
pub mod validate;

pub use loader::{config_path, load_and_validate, load_from_path, DEFAULT_CONFIG_FILE};
pub use model::{
    BranchConfig, BuildConfig, CommandList, ConfigFile, RawConfigFile, RepoConfig, SandboxConfig,
};
pub use resolve::{
    output_root, resolve_branch, resolve_repo, status_images, ResolvedBranch, ResolvedRepo,
};
