// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod macros;
pub mod record;
pub mod sandbox;
pub mod types;
pub mod vcs;

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::model::ConfigFile;
use crate::config::{
    config_path, load_and_validate, output_root, resolve_branch, resolve_repo, status_images,
    ResolvedBranch,
};
use crate::engine::{BranchRuntime, BuildQueue, DrainReport};
use crate::exec::{ShellExecutor, ShellSession};
use crate::fs::{FileSystem, RealFileSystem};
use crate::macros::expand;
use crate::record::ResultRecorder;
use crate::vcs::{GitBranch, GitRepository};

/// High-level entry point used by `main.rs`.
///
/// Loads the config from the working directory and runs the requested role:
/// - `run`: manager, clones and spawns one `repo` process per repository
/// - `repo`: fetches and spawns one `branch` process per branch
/// - `branch`: enqueues the remote head and drains the branch queue
pub async fn run(args: CliArgs) -> Result<()> {
    let working_dir = std::path::absolute(&args.working_dir)
        .with_context(|| format!("invalid working directory {:?}", args.working_dir))?;
    let path = config_path(&working_dir, args.config.as_deref());
    let cfg = load_and_validate(&path)
        .with_context(|| format!("failed to load config {path:?}"))?;

    let spawner = Spawner::new(&args, &working_dir)?;

    match &args.command {
        Command::Run => run_manager(&cfg, &working_dir, &spawner).await,
        Command::Repo { repo } => run_repository(&cfg, &working_dir, repo, &spawner).await,
        Command::Branch {
            repo,
            branch,
            dry_run,
        } => {
            let resolved = resolve_branch(&cfg, &working_dir, repo, branch)?;
            if *dry_run {
                print!("{}", render_dry_run(&resolved));
                return Ok(());
            }
            run_branch(&cfg, &working_dir, resolved).await
        }
    }
}

/// Manager role: make sure every repository is cloned, then hand each one to
/// its own process.
pub async fn run_manager(cfg: &ConfigFile, working_dir: &Path, spawner: &Spawner) -> Result<()> {
    for name in cfg.repo.keys() {
        let repo = resolve_repo(cfg, working_dir, name)?;
        let git = GitRepository::new(&repo.url, &repo.repo_dir, &repo.checkout_dir, &repo.branch_dir);

        if let Err(err) = git.clone_if_necessary().await {
            error!(repo = %name, error = %err, "skipping repository");
            continue;
        }
        if let Err(err) = spawner.spawn(&["repo", "--repo", name]) {
            error!(repo = %name, error = %err, "could not start repository process");
        }
    }
    Ok(())
}

/// Repository role: fetch once, then start one process per tracked branch.
pub async fn run_repository(
    cfg: &ConfigFile,
    working_dir: &Path,
    name: &str,
    spawner: &Spawner,
) -> Result<()> {
    let repo = resolve_repo(cfg, working_dir, name)?;
    let git = GitRepository::new(&repo.url, &repo.repo_dir, &repo.checkout_dir, &repo.branch_dir);
    git.fetch().await?;

    for branch in cfg.repo[name].branch.iter() {
        if let Err(err) = spawner.spawn(&["branch", "--repo", name, "--branch", &branch.name]) {
            error!(repo = %name, branch = %branch.name, error = %err, "could not start branch process");
        }
    }
    Ok(())
}

/// Branch role: prepare the worktree and sandbox, queue the remote head and
/// drain unless another process already is.
pub async fn run_branch(
    cfg: &ConfigFile,
    working_dir: &Path,
    resolved: ResolvedBranch,
) -> Result<()> {
    let ResolvedBranch {
        repo,
        target,
        macros,
        build,
        sandbox,
        pre_test_cmd,
    } = resolved;

    let git = GitRepository::new(&repo.url, &repo.repo_dir, &repo.checkout_dir, &repo.branch_dir);
    git.ensure_worktree(&target.branch, &target.working_dir).await?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let (success_image, failure_image) = status_images(cfg, working_dir)?;
    let recorder = ResultRecorder::new(
        fs.clone(),
        output_root(cfg, working_dir),
        success_image,
        failure_image,
    );
    for image in recorder.missing_images() {
        warn!(?image, "status image does not exist; status links will dangle");
    }
    let queue = BuildQueue::new(fs, &repo.branch_dir, &target.safe_branch);
    let oracle = Arc::new(GitBranch::new(
        &target.branch,
        &target.working_dir,
        &repo.checkout_dir,
    ));
    let session = ShellSession::new(Arc::new(ShellExecutor::new()), &target.working_dir);

    let mut runtime = BranchRuntime::new(target, macros, build, queue, oracle, recorder, session)
        .with_pre_test_cmd(pre_test_cmd);

    if let Some(sandbox) = &sandbox {
        runtime.enter_sandbox(sandbox).await?;
    }

    match runtime.run_once().await? {
        DrainReport::AlreadyDraining => {}
        DrainReport::Drained { built } => {
            let failed = built.iter().filter(|b| !b.succeeded).count();
            info!(
                repo = %runtime.target().repo,
                branch = %runtime.target().branch,
                built = built.len(),
                failed,
                "branch run complete"
            );
        }
    }
    Ok(())
}

/// Re-executes the current binary for child roles, forwarding the global
/// options. Children are not awaited.
#[derive(Debug, Clone)]
pub struct Spawner {
    exe: PathBuf,
    common: Vec<String>,
}

impl Spawner {
    pub fn new(args: &CliArgs, working_dir: &Path) -> Result<Self> {
        let exe = std::env::current_exe().context("cannot locate the soapci executable")?;
        Ok(Self::with_executable(exe, args, working_dir))
    }

    /// Like [`Spawner::new`] but re-executes `exe` instead of the running
    /// binary.
    pub fn with_executable(exe: impl Into<PathBuf>, args: &CliArgs, working_dir: &Path) -> Self {
        let mut common = vec![
            "--working-dir".to_string(),
            working_dir.to_string_lossy().into_owned(),
        ];
        if let Some(config) = &args.config {
            common.push("--config".to_string());
            common.push(config.to_string_lossy().into_owned());
        }
        if let Some(level) = args.log_level {
            common.push("--log-level".to_string());
            common.push(level.as_arg().to_string());
        }

        Self {
            exe: exe.into(),
            common,
        }
    }

    /// Full argument list of a child: forwarded global options, then the
    /// role and its arguments.
    pub fn child_args(&self, role_args: &[&str]) -> Vec<String> {
        self.common
            .iter()
            .cloned()
            .chain(role_args.iter().map(|a| a.to_string()))
            .collect()
    }

    pub fn spawn(&self, role_args: &[&str]) -> Result<()> {
        let child = std::process::Command::new(&self.exe)
            .args(self.child_args(role_args))
            .spawn()
            .with_context(|| format!("failed to spawn soapci {}", role_args.join(" ")))?;
        info!(pid = child.id(), args = ?role_args, "spawned child process");
        Ok(())
    }
}

/// Dry-run output: macro context and the expanded pipeline.
///
/// Nothing is executed; expansion errors are rendered inline.
pub fn render_dry_run(resolved: &ResolvedBranch) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_dry_run(&mut out, resolved);
    out
}

fn write_dry_run(out: &mut String, resolved: &ResolvedBranch) -> fmt::Result {
    writeln!(out, "soapci dry-run")?;
    writeln!(out, "  repo = {}", resolved.target.repo)?;
    writeln!(out, "  branch = {}", resolved.target.branch)?;
    writeln!(out, "  working_dir = {}", resolved.target.working_dir.display())?;
    writeln!(out)?;

    writeln!(out, "macros ({}):", resolved.macros.len())?;
    for (name, value) in resolved.macros.iter() {
        writeln!(out, "  {name} = {value}")?;
    }
    writeln!(out)?;

    if let Some(sandbox) = &resolved.sandbox {
        writeln!(out, "sandbox {}:", sandbox.name)?;
        write_commands(out, "create", &sandbox.create, resolved)?;
        write_commands(out, "enter", &sandbox.enter, resolved)?;
    }
    if let Some(cmd) = &resolved.pre_test_cmd {
        write_commands(out, "pre_test_cmd", std::slice::from_ref(cmd), resolved)?;
    }

    let build = &resolved.build;
    writeln!(out, "pipeline:")?;
    for stage in crate::build::Stage::ALL {
        write_commands(out, stage.name(), build.stage(stage), resolved)?;
    }
    write_commands(out, "success", &build.success, resolved)?;
    write_commands(out, "failure", &build.failure, resolved)
}

fn write_commands(
    out: &mut String,
    label: &str,
    templates: &[String],
    resolved: &ResolvedBranch,
) -> fmt::Result {
    writeln!(out, "  {label}:")?;
    for template in templates {
        match expand(template, &resolved.macros) {
            Ok(cmd) => writeln!(out, "      {cmd}")?,
            Err(err) => writeln!(out, "      <error: {err}>")?,
        }
    }
    Ok(())
}
