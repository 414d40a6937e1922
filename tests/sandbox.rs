// tests/sandbox.rs

use std::sync::Arc;

use soapci::errors::SoapCiError;
use soapci::exec::ShellSession;
use soapci::sandbox::Sandbox;
use soapci_test_utils::fake_executor::FakeExecutor;
use soapci_test_utils::harness::branch_macros;
use soapci_test_utils::init_tracing;

fn chroot() -> Sandbox {
    Sandbox {
        name: "chroot".to_string(),
        create: vec!["mkchroot ${__branch_working_dir__}/root".to_string()],
        enter: vec![
            "test -d ${__branch_working_dir__}/root".to_string(),
            "source ${__branch_working_dir__}/root/env.sh".to_string(),
        ],
    }
}

#[tokio::test]
async fn existing_sandbox_is_entered_without_creating() {
    let executor = FakeExecutor::new();
    executor.script("/ws/repos/widget/branches/main/root/env.sh", &[("SANDBOX", "1")]);
    let mut session = ShellSession::new(Arc::new(executor.clone()), "/w");

    chroot()
        .enter_or_create(&branch_macros(&[]), &mut session)
        .await
        .unwrap();

    assert_eq!(
        executor.commands(),
        vec!["test -d /ws/repos/widget/branches/main/root"]
    );
    assert_eq!(session.overlay().get("SANDBOX"), Some("1"));
}

#[tokio::test]
async fn failed_enter_creates_then_enters_again() {
    init_tracing();
    let executor = FakeExecutor::new();
    executor.fail_once("test -d", 1, "");
    executor.script("/ws/repos/widget/branches/main/root/env.sh", &[("SANDBOX", "1")]);
    let mut session = ShellSession::new(Arc::new(executor.clone()), "/w");

    chroot()
        .enter_or_create(&branch_macros(&[]), &mut session)
        .await
        .unwrap();

    assert_eq!(
        executor.commands(),
        vec![
            "test -d /ws/repos/widget/branches/main/root",
            "mkchroot /ws/repos/widget/branches/main/root",
            "test -d /ws/repos/widget/branches/main/root",
        ]
    );
    assert_eq!(session.overlay().get("SANDBOX"), Some("1"));
}

#[tokio::test]
async fn missing_environment_script_counts_as_not_entered() {
    init_tracing();
    let executor = FakeExecutor::new();
    let mut session = ShellSession::new(Arc::new(executor.clone()), "/w");

    let err = chroot()
        .enter_or_create(&branch_macros(&[]), &mut session)
        .await
        .unwrap_err();

    match err {
        SoapCiError::Sandbox(msg) => assert!(msg.contains("chroot"), "{msg}"),
        other => panic!("expected Sandbox error, got {other:?}"),
    }
    assert_eq!(executor.sourced().len(), 2);
}

#[tokio::test]
async fn failing_create_is_reported() {
    let executor = FakeExecutor::new();
    executor.fail_on("test -d", 1, "");
    executor.fail_on("mkchroot", 3, "no space left");
    let mut session = ShellSession::new(Arc::new(executor.clone()), "/w");

    let err = chroot()
        .enter_or_create(&branch_macros(&[]), &mut session)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("failed to create sandbox 'chroot'"));
    assert_eq!(executor.commands().len(), 2);
}
