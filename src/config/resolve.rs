// src/config/resolve.rs

//! Turn a validated [`ConfigFile`] into the concrete paths, macro context and
//! build definition one process role needs.

use std::path::{Path, PathBuf};

use crate::build::StagedBuild;
use crate::config::model::{define_value_text, BuildConfig, ConfigFile, RepoConfig};
use crate::engine::BranchTarget;
use crate::errors::{Result, SoapCiError};
use crate::macros::{
    self, expand, MacroContext, MacroContextBuilder, MacroLayer,
};
use crate::sandbox::Sandbox;
use crate::types::sanitize_branch_name;

/// Directory holding every repository, relative to the working directory.
pub const REPOS_DIR: &str = "repos";
/// Per-repository directory holding worktrees and branch state files.
pub const BRANCHES_DIR: &str = "branches";

/// On-disk locations of one configured repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepo {
    pub name: String,
    pub url: String,
    /// `<working_dir>/repos/<name>`
    pub repo_dir: PathBuf,
    /// The mirror clone inside `repo_dir`.
    pub checkout_dir: PathBuf,
    /// Worktrees and `<branch>.{queue,testing,finished}` live here.
    pub branch_dir: PathBuf,
}

/// Everything a branch process needs before it can drain.
#[derive(Debug, Clone)]
pub struct ResolvedBranch {
    pub repo: ResolvedRepo,
    pub target: BranchTarget,
    pub macros: MacroContext,
    pub build: StagedBuild,
    pub sandbox: Option<Sandbox>,
    pub pre_test_cmd: Option<String>,
}

fn repo_config<'a>(cfg: &'a ConfigFile, repo: &str) -> Result<&'a RepoConfig> {
    cfg.repo
        .get(repo)
        .ok_or_else(|| SoapCiError::RepoNotFound(repo.to_string()))
}

pub fn resolve_repo(cfg: &ConfigFile, working_dir: &Path, repo: &str) -> Result<ResolvedRepo> {
    let repo_cfg = repo_config(cfg, repo)?;
    let repo_dir = working_dir.join(REPOS_DIR).join(repo);

    Ok(ResolvedRepo {
        name: repo.to_string(),
        url: repo_cfg.url.clone(),
        checkout_dir: repo_dir.join(&repo_cfg.checkout_dir),
        branch_dir: repo_dir.join(BRANCHES_DIR),
        repo_dir,
    })
}

/// Global layer only: the `[define]` table plus `__working_dir__`.
fn global_layer(cfg: &ConfigFile, working_dir: &Path) -> MacroContextBuilder {
    MacroContext::builder()
        .define_all(
            MacroLayer::Global,
            cfg.define.iter().map(|(k, v)| (k.clone(), define_value_text(v))),
        )
        .define(
            MacroLayer::Global,
            macros::WORKING_DIR,
            working_dir.to_string_lossy(),
        )
}

pub fn resolve_branch(
    cfg: &ConfigFile,
    working_dir: &Path,
    repo: &str,
    branch: &str,
) -> Result<ResolvedBranch> {
    let resolved_repo = resolve_repo(cfg, working_dir, repo)?;
    let repo_cfg = repo_config(cfg, repo)?;
    let branch_cfg = repo_cfg
        .branch
        .iter()
        .find(|b| b.name == branch)
        .ok_or_else(|| SoapCiError::BranchNotFound {
            repo: repo.to_string(),
            branch: branch.to_string(),
        })?;

    // Worktree named after the safe name so nested branch names stay one
    // directory deep.
    let working = resolved_repo.branch_dir.join(sanitize_branch_name(branch));
    let target = BranchTarget::new(repo, branch, working.clone());

    let mut builder = global_layer(cfg, working_dir)
        .define(MacroLayer::Repository, "name", repo)
        .define(MacroLayer::Repository, "url", repo_cfg.url.as_str())
        .define(MacroLayer::Repository, "checkout_dir", repo_cfg.checkout_dir.as_str());
    if let Some(sandbox) = &repo_cfg.sandbox_type {
        builder = builder.define(MacroLayer::Repository, "sandbox_type", sandbox.as_str());
    }
    if let Some(cmd) = &repo_cfg.pre_test_cmd {
        builder = builder.define(MacroLayer::Repository, "pre_test_cmd", cmd.as_str());
    }

    let macros = builder
        .define_all(
            MacroLayer::Repository,
            repo_cfg.define.iter().map(|(k, v)| (k.clone(), define_value_text(v))),
        )
        .define(MacroLayer::Branch, "name", branch)
        .define_all(
            MacroLayer::Branch,
            branch_cfg.define.iter().map(|(k, v)| (k.clone(), define_value_text(v))),
        )
        .define(MacroLayer::Reserved, macros::REPO_NAME, repo)
        .define(MacroLayer::Reserved, macros::BRANCH_NAME, branch)
        .define(MacroLayer::Reserved, macros::BRANCH_NAME_SAFE, target.safe_branch.as_str())
        .define(
            MacroLayer::Reserved,
            macros::BRANCH_WORKING_DIR,
            working.to_string_lossy(),
        )
        .build()?;

    let build = branch_cfg
        .build
        .as_ref()
        .or(repo_cfg.default_build.as_ref())
        .map(staged_build)
        .ok_or_else(|| {
            SoapCiError::ConfigError(format!(
                "branch '{branch}' of repo '{repo}' has no build definition"
            ))
        })?;

    let sandbox = match &repo_cfg.sandbox_type {
        Some(name) => {
            let sandbox_cfg = cfg.sandbox.get(name).ok_or_else(|| {
                SoapCiError::ConfigError(format!("unknown sandbox_type '{name}'"))
            })?;
            Some(Sandbox {
                name: name.clone(),
                create: sandbox_cfg.create_cmd.to_vec(),
                enter: sandbox_cfg.enter_cmd.to_vec(),
            })
        }
        None => None,
    };

    Ok(ResolvedBranch {
        repo: resolved_repo,
        target,
        macros,
        build,
        sandbox,
        pre_test_cmd: repo_cfg.pre_test_cmd.clone(),
    })
}

fn staged_build(cfg: &BuildConfig) -> StagedBuild {
    StagedBuild {
        setup: cfg.setup.to_vec(),
        build: cfg.build.to_vec(),
        teardown: cfg.teardown.to_vec(),
        success: cfg.success.to_vec(),
        failure: cfg.failure.to_vec(),
    }
}

/// Root of the result tree.
pub fn output_root(cfg: &ConfigFile, working_dir: &Path) -> PathBuf {
    working_dir.join(&cfg.output_dir)
}

/// `(success_image, failure_image)`, expanded against the global layer.
pub fn status_images(cfg: &ConfigFile, working_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let globals = global_layer(cfg, working_dir).build()?;
    let success = expand(&cfg.success_image, &globals)?;
    let failure = expand(&cfg.failure_image, &globals)?;
    Ok((working_dir.join(success), working_dir.join(failure)))
}
