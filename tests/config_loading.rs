// tests/config_loading.rs

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use soapci::config::{
    config_path, load_and_validate, output_root, resolve_branch, resolve_repo, status_images,
    CommandList, ConfigFile,
};
use soapci::errors::SoapCiError;
use soapci::macros::expand;
use soapci_test_utils::builders::{
    BranchConfigBuilder, ConfigFileBuilder, RepoConfigBuilder, StagedBuildBuilder,
};

fn load(toml: &str) -> Result<ConfigFile, SoapCiError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{toml}").unwrap();
    load_and_validate(file.path())
}

fn expect_config_error(toml: &str, needle: &str) {
    match load(toml) {
        Err(SoapCiError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} should mention {needle:?}")
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

const FULL: &str = r#"
[define]
jobs = 8
prefix = "/opt/${flavor}"

[sandbox.chroot]
create_cmd = "mkchroot ${__branch_working_dir__}"
enter_cmd = ["test -d ${__branch_working_dir__}", "source ${__branch_working_dir__}/env.sh"]

[repo.widget]
url = "https://example.com/widget.git"
sandbox_type = "chroot"
pre_test_cmd = "git submodule update --init"
define = { flavor = "release" }
default_build = { setup = "autoreconf", build = ["make -j${jobs}", "make check"] }

[[repo.widget.branch]]
name = "main"

[[repo.widget.branch]]
name = "feature/fast"
define = { flavor = "debug" }
build = { build_cmd = "make ${flavor}", success = "notify ${__branch_name__}" }
"#;

#[test]
fn full_config_parses_with_defaults() {
    let cfg = load(FULL).unwrap();

    assert_eq!(cfg.output_dir, PathBuf::from("results"));
    assert_eq!(cfg.success_image, "${__working_dir__}/assets/success.png");

    let sandbox = &cfg.sandbox["chroot"];
    assert_eq!(sandbox.create_cmd.0.len(), 1);
    assert_eq!(sandbox.enter_cmd.0.len(), 2);

    let repo = &cfg.repo["widget"];
    assert_eq!(repo.checkout_dir, ".repo_mirror");
    assert_eq!(repo.branch.len(), 2);
    let default_build = repo.default_build.as_ref().unwrap();
    assert_eq!(default_build.setup, CommandList(vec!["autoreconf".to_string()]));
    assert_eq!(default_build.build.0, vec!["make -j${jobs}", "make check"]);
    assert!(default_build.teardown.is_empty());

    let fast = repo.branch[1].build.as_ref().unwrap();
    assert_eq!(fast.build.0, vec!["make ${flavor}"]);
    assert_eq!(fast.success.0, vec!["notify ${__branch_name__}"]);
}

#[test]
fn resolve_branch_layers_macros_and_paths() {
    let cfg = load(FULL).unwrap();
    let wd = Path::new("/srv/ci");

    let main = resolve_branch(&cfg, wd, "widget", "main").unwrap();
    assert_eq!(main.target.working_dir, PathBuf::from("/srv/ci/repos/widget/branches/main"));
    assert_eq!(main.repo.checkout_dir, PathBuf::from("/srv/ci/repos/widget/.repo_mirror"));
    assert_eq!(main.macros.get("jobs"), Some("8"));
    assert_eq!(main.macros.get("name"), Some("main"));
    assert_eq!(main.macros.get("url"), Some("https://example.com/widget.git"));
    assert_eq!(main.macros.get("__working_dir__"), Some("/srv/ci"));
    assert_eq!(expand("${prefix}", &main.macros).unwrap(), "/opt/release");
    assert_eq!(main.build.build, vec!["make -j${jobs}", "make check"]);
    assert_eq!(main.pre_test_cmd.as_deref(), Some("git submodule update --init"));
    let sandbox = main.sandbox.as_ref().unwrap();
    assert_eq!(sandbox.name, "chroot");
    assert_eq!(sandbox.enter.len(), 2);

    let fast = resolve_branch(&cfg, wd, "widget", "feature/fast").unwrap();
    assert_eq!(fast.target.safe_branch, "feature_fast");
    assert_eq!(
        fast.target.working_dir,
        PathBuf::from("/srv/ci/repos/widget/branches/feature_fast")
    );
    assert_eq!(fast.macros.get("__branch_name__"), Some("feature/fast"));
    assert_eq!(fast.macros.get("__branch_name_safe__"), Some("feature_fast"));
    assert_eq!(expand("${prefix}", &fast.macros).unwrap(), "/opt/debug");
    assert_eq!(fast.build.build, vec!["make ${flavor}"]);
    assert!(fast.build.setup.is_empty());
}

#[test]
fn reserved_names_cannot_be_overridden() {
    let cfg = ConfigFileBuilder::new()
        .with_define("__repo_name__", "global")
        .with_repo(
            "widget",
            RepoConfigBuilder::new("u")
                .define("__branch_name__", "repo")
                .default_build(StagedBuildBuilder::new().build_cmd("make").into_config())
                .branch("main")
                .build(),
        )
        .build();

    let main = resolve_branch(&cfg, Path::new("/w"), "widget", "main").unwrap();
    assert_eq!(main.macros.get("__repo_name__"), Some("widget"));
    assert_eq!(main.macros.get("__branch_name__"), Some("main"));
}

#[test]
fn branch_define_beats_repository_define_beats_global() {
    let cfg = ConfigFileBuilder::new()
        .with_define("level", "global")
        .with_define("g", 1i64)
        .with_repo(
            "widget",
            RepoConfigBuilder::new("u")
                .define("level", "repo")
                .define("r", true)
                .default_build(StagedBuildBuilder::new().build_cmd("make").into_config())
                .branch_with(BranchConfigBuilder::new("main").define("level", "branch").build())
                .branch("dev")
                .build(),
        )
        .build();

    let main = resolve_branch(&cfg, Path::new("/w"), "widget", "main").unwrap();
    assert_eq!(main.macros.get("level"), Some("branch"));
    assert_eq!(main.macros.get("g"), Some("1"));
    assert_eq!(main.macros.get("r"), Some("true"));

    let dev = resolve_branch(&cfg, Path::new("/w"), "widget", "dev").unwrap();
    assert_eq!(dev.macros.get("level"), Some("repo"));
}

#[test]
fn cyclic_defines_fail_resolution() {
    let cfg = ConfigFileBuilder::new()
        .with_define("a", "${b}")
        .with_repo(
            "widget",
            RepoConfigBuilder::new("u")
                .define("b", "${a}")
                .default_build(StagedBuildBuilder::new().build_cmd("make").into_config())
                .branch("main")
                .build(),
        )
        .build();

    let err = resolve_branch(&cfg, Path::new("/w"), "widget", "main").unwrap_err();
    assert!(matches!(err, SoapCiError::CyclicMacro(_)));
}

#[test]
fn unknown_repo_and_branch_are_reported() {
    let cfg = load(FULL).unwrap();
    let wd = Path::new("/w");

    assert!(matches!(
        resolve_repo(&cfg, wd, "gadget"),
        Err(SoapCiError::RepoNotFound(name)) if name == "gadget"
    ));
    assert!(matches!(
        resolve_branch(&cfg, wd, "widget", "release"),
        Err(SoapCiError::BranchNotFound { branch, .. }) if branch == "release"
    ));
}

#[test]
fn images_and_output_are_relative_to_the_working_dir() {
    let cfg = ConfigFileBuilder::new()
        .with_output_dir("out")
        .with_repo(
            "widget",
            RepoConfigBuilder::new("u")
                .default_build(StagedBuildBuilder::new().build_cmd("make").into_config())
                .branch("main")
                .build(),
        )
        .build();
    let wd = Path::new("/srv/ci");

    assert_eq!(output_root(&cfg, wd), PathBuf::from("/srv/ci/out"));
    let (ok, bad) = status_images(&cfg, wd).unwrap();
    assert_eq!(ok, PathBuf::from("/srv/ci/assets/success.png"));
    assert_eq!(bad, PathBuf::from("/srv/ci/assets/failure.png"));
}

#[test]
fn config_path_defaults_to_the_working_dir() {
    let wd = Path::new("/srv/ci");
    assert_eq!(config_path(wd, None), PathBuf::from("/srv/ci/soapci.toml"));
    assert_eq!(
        config_path(wd, Some(Path::new("other.toml"))),
        PathBuf::from("/srv/ci/other.toml")
    );
    assert_eq!(
        config_path(wd, Some(Path::new("/etc/soapci.toml"))),
        PathBuf::from("/etc/soapci.toml")
    );
}

#[test]
fn empty_config_is_rejected() {
    expect_config_error("", "at least one");
}

#[test]
fn unknown_sandbox_type_is_rejected() {
    expect_config_error(
        r#"
[repo.widget]
url = "u"
sandbox_type = "docker"
default_build = { build = "make" }
[[repo.widget.branch]]
name = "main"
"#,
        "docker",
    );
}

#[test]
fn repo_without_branches_is_rejected() {
    expect_config_error(
        r#"
[repo.widget]
url = "u"
default_build = { build = "make" }
"#,
        "at least one",
    );
}

#[test]
fn duplicate_branch_is_rejected() {
    expect_config_error(
        r#"
[repo.widget]
url = "u"
default_build = { build = "make" }
[[repo.widget.branch]]
name = "main"
[[repo.widget.branch]]
name = "main"
"#,
        "more than once",
    );
}

#[test]
fn branch_without_any_build_is_rejected() {
    expect_config_error(
        r#"
[repo.widget]
url = "u"
[[repo.widget.branch]]
name = "main"
"#,
        "no build",
    );
}

#[test]
fn unusable_macro_name_is_rejected() {
    expect_config_error(
        r#"
[define]
"with-dash" = "x"
[repo.widget]
url = "u"
default_build = { build = "make" }
[[repo.widget.branch]]
name = "main"
"#,
        "with-dash",
    );
}

#[test]
fn empty_url_is_rejected() {
    expect_config_error(
        r#"
[repo.widget]
url = " "
default_build = { build = "make" }
[[repo.widget.branch]]
name = "main"
"#,
        "url",
    );
}

#[test]
fn malformed_toml_is_a_toml_error() {
    assert!(matches!(load("[repo.widget"), Err(SoapCiError::TomlError(_))));
}
