// tests/git_ancestry.rs
#![cfg(unix)]

use std::path::Path;
use std::process::Command;

use soapci::errors::SoapCiError;
use soapci::types::CommitId;
use soapci::vcs::{AncestryOracle, GitBranch, GitRepository};

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(["-c", "user.name=ci", "-c", "user.email=ci@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git runs");
    assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn commit_file(dir: &Path, name: &str) -> CommitId {
    std::fs::write(dir.join(name), name).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", name]);
    git(dir, &["rev-parse", "HEAD"]).parse().unwrap()
}

#[tokio::test]
async fn ancestry_worktree_and_remote_head_against_a_real_repo() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let upstream = tmp.path().join("upstream");
    std::fs::create_dir_all(&upstream).unwrap();
    git(&upstream, &["init", "-q", "-b", "main"]);
    let c1 = commit_file(&upstream, "a.txt");
    let c2 = commit_file(&upstream, "b.txt");

    let repo_dir = tmp.path().join("repos/upstream");
    let checkout = repo_dir.join(".repo_mirror");
    let branches = repo_dir.join("branches");
    let worktree = branches.join("main");
    let repo = GitRepository::new(
        upstream.to_string_lossy(),
        &repo_dir,
        &checkout,
        &branches,
    );

    repo.clone_if_necessary().await.unwrap();
    repo.clone_if_necessary().await.unwrap();
    repo.fetch().await.unwrap();
    repo.ensure_worktree("main", &worktree).await.unwrap();
    assert!(worktree.join("b.txt").exists());

    let branch = GitBranch::new("main", &worktree, &checkout);
    assert_eq!(branch.latest_remote_commit().await.unwrap(), c2);
    assert!(branch.is_ancestor_or_equal(&c1, &c2).await.unwrap());
    assert!(branch.is_ancestor_or_equal(&c2, &c2).await.unwrap());
    assert!(!branch.is_ancestor_or_equal(&c2, &c1).await.unwrap());

    let bogus = CommitId::new("0123456789abcdef0123456789abcdef01234567").unwrap();
    match branch.is_ancestor_or_equal(&bogus, &c2).await {
        Err(SoapCiError::AncestryQuery { ancestor, .. }) => assert_eq!(ancestor, bogus.to_string()),
        other => panic!("expected AncestryQuery, got {other:?}"),
    }

    // New upstream commit: fetch, then fast-forward the worktree to it.
    let c3 = commit_file(&upstream, "c.txt");
    repo.fetch().await.unwrap();
    assert_eq!(branch.latest_remote_commit().await.unwrap(), c3);
    branch.update_to(&c3).await.unwrap();
    assert!(worktree.join("c.txt").exists());
}
