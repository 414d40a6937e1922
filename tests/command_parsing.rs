// tests/command_parsing.rs

use std::path::PathBuf;

use soapci::exec::{EnvironmentOverlay, ParsedCommand};
use soapci::cli::LogLevel;
use soapci::logging::{effective_level, parse_level_str};
use soapci::types::{sanitize_branch_name, CommitId};

#[test]
fn sourcing_directives_are_recognised() {
    assert_eq!(
        ParsedCommand::parse("source /sb/env.sh"),
        ParsedCommand::Source(PathBuf::from("/sb/env.sh"))
    );
    assert_eq!(
        ParsedCommand::parse(". ./env.sh"),
        ParsedCommand::Source(PathBuf::from("./env.sh"))
    );
}

#[test]
fn everything_else_goes_to_the_shell() {
    for cmd in ["make source", "sources x", "./configure", ".. ", "source ", "echo . x"] {
        assert_eq!(ParsedCommand::parse(cmd), ParsedCommand::Shell(cmd.to_string()));
    }
}

#[test]
fn env_output_is_split_on_nul_records() {
    let overlay = EnvironmentOverlay::from_env_output(
        "PATH=/usr/bin:/bin\0EMPTY=\0EQ=a=b\0MSG=first\nPATH=/evil\0=bad\0",
    );

    assert_eq!(overlay.get("PATH"), Some("/usr/bin:/bin"));
    assert_eq!(overlay.get("EMPTY"), Some(""));
    assert_eq!(overlay.get("EQ"), Some("a=b"));
    assert_eq!(overlay.get("MSG"), Some("first\nPATH=/evil"));
    assert_eq!(overlay.len(), 4);
}

#[test]
fn merging_overlays_lets_later_values_win() {
    let mut base = EnvironmentOverlay::new();
    base.set("A", "1");
    base.set("B", "1");
    let mut later = EnvironmentOverlay::new();
    later.set("B", "2");

    base.merge(later);

    assert_eq!(base.iter().collect::<Vec<_>>(), vec![("A", "1"), ("B", "2")]);
}

#[test]
fn commit_ids_reject_blank_and_whitespace() {
    assert!(CommitId::new("").is_err());
    assert!(CommitId::new("ab cd").is_err());
    assert_eq!("  abc123\n".parse::<CommitId>().unwrap().as_str(), "abc123");
}

#[test]
fn branch_names_are_flattened() {
    assert_eq!(sanitize_branch_name("feature/a/b"), "feature_a_b");
    assert_eq!(sanitize_branch_name("main"), "main");
}

#[test]
fn log_level_names() {
    assert_eq!(parse_level_str(" Debug "), Some(tracing::Level::DEBUG));
    assert_eq!(parse_level_str("warning"), Some(tracing::Level::WARN));
    assert_eq!(parse_level_str("loud"), None);
}

#[test]
fn forwarded_flag_beats_environment() {
    use tracing::Level;

    assert_eq!(effective_level(Some(LogLevel::Trace), Some("error")), Level::TRACE);
    assert_eq!(effective_level(None, Some("warn")), Level::WARN);
    assert_eq!(effective_level(None, Some("chatty")), Level::INFO);
    assert_eq!(effective_level(None, None), Level::INFO);
}
