// tests/shell_executor.rs
#![cfg(unix)]

use std::sync::Arc;

use soapci::exec::{CommandExecutor, Dispatch, EnvironmentOverlay, ShellExecutor, ShellSession};
use soapci_test_utils::with_timeout;

#[tokio::test]
async fn captures_exit_code_and_streams() {
    let dir = tempfile::tempdir().unwrap();
    let out = with_timeout(ShellExecutor::new().run(
        "echo hello; echo oops >&2; exit 3",
        dir.path(),
        &EnvironmentOverlay::new(),
    ))
    .await
    .unwrap();

    assert_eq!(out.exit_code, 3);
    assert_eq!(out.stdout, "hello\n");
    assert_eq!(out.stderr, "oops\n");
}

#[tokio::test]
async fn runs_in_the_given_directory_with_the_overlay() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
    let mut env = EnvironmentOverlay::new();
    env.set("SOAPCI_TEST_VALUE", "42");

    let out = ShellExecutor::new()
        .run("cat marker.txt; echo \" $SOAPCI_TEST_VALUE\"", dir.path(), &env)
        .await
        .unwrap();

    assert!(out.success());
    assert_eq!(out.stdout, "here 42\n");
}

#[tokio::test]
async fn sourced_script_environment_reaches_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("env.sh"),
        "echo noise\nexport SOAPCI_SANDBOX=/opt/sandbox\n",
    )
    .unwrap();
    let mut session = ShellSession::new(Arc::new(ShellExecutor::new()), dir.path());

    let sourced = session.dispatch("source env.sh").await;
    assert!(matches!(sourced, Dispatch::Sourced { .. }), "{sourced:?}");
    assert_eq!(session.overlay().get("SOAPCI_SANDBOX"), Some("/opt/sandbox"));

    match session.dispatch("echo $SOAPCI_SANDBOX").await {
        Dispatch::Ran(out) => assert_eq!(out.stdout, "/opt/sandbox\n"),
        other => panic!("expected Ran, got {other:?}"),
    }
}

#[tokio::test]
async fn multi_line_values_survive_sourcing_intact() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("env.sh"),
        "export SOAPCI_MSG='first\nSOAPCI_INJECTED=/evil'\n",
    )
    .unwrap();
    let mut session = ShellSession::new(Arc::new(ShellExecutor::new()), dir.path());

    let sourced = session.dispatch("source env.sh").await;
    assert!(matches!(sourced, Dispatch::Sourced { .. }), "{sourced:?}");
    assert_eq!(
        session.overlay().get("SOAPCI_MSG"),
        Some("first\nSOAPCI_INJECTED=/evil")
    );
    assert_eq!(session.overlay().get("SOAPCI_INJECTED"), None);

    match session.dispatch("echo \"[${SOAPCI_INJECTED:-}]\"").await {
        Dispatch::Ran(out) => assert_eq!(out.stdout, "[]\n"),
        other => panic!("expected Ran, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_or_failing_scripts_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.sh"), "return 1\n").unwrap();
    let executor = ShellExecutor::new();
    let env = EnvironmentOverlay::new();

    assert!(executor.source("missing.sh".as_ref(), dir.path(), &env).await.is_err());
    assert!(executor.source("bad.sh".as_ref(), dir.path(), &env).await.is_err());
}
