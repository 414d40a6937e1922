// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from `soapci.toml`.
///
/// ```toml
/// output_dir = "results"
///
/// [define]
/// jobs = 8
///
/// [sandbox.chroot]
/// create_cmd = "mkchroot ${__branch_working_dir__}"
/// enter_cmd = ["source ${__branch_working_dir__}/env.sh"]
///
/// [repo.widget]
/// url = "https://example.com/widget.git"
/// sandbox_type = "chroot"
/// default_build = { build = ["make -j${jobs}"] }
///
/// [[repo.widget.branch]]
/// name = "main"
/// ```
///
/// This is the unvalidated form; the rest of the crate works with
/// [`ConfigFile`], obtained through `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Where result directories go, relative to the working directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Image linked as the status of a passing build (macro-expanded against
    /// the global layer).
    ///
    /// The default `${__working_dir__}/assets/success.png` is not created by
    /// soapci; provide the file or point this elsewhere. Branch processes
    /// warn when it is missing.
    #[serde(default = "default_success_image")]
    pub success_image: String,

    /// Image linked as the status of a failing build. Same caveat as
    /// `success_image`, default `${__working_dir__}/assets/failure.png`.
    #[serde(default = "default_failure_image")]
    pub failure_image: String,

    /// Global macro definitions.
    #[serde(default)]
    pub define: BTreeMap<String, toml::Value>,

    /// Sandbox types from `[sandbox.<name>]`.
    #[serde(default)]
    pub sandbox: BTreeMap<String, SandboxConfig>,

    /// Repositories from `[repo.<name>]`.
    #[serde(default)]
    pub repo: BTreeMap<String, RepoConfig>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_success_image() -> String {
    "${__working_dir__}/assets/success.png".to_string()
}

fn default_failure_image() -> String {
    "${__working_dir__}/assets/failure.png".to_string()
}

fn default_checkout_dir() -> String {
    ".repo_mirror".to_string()
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub output_dir: PathBuf,
    pub success_image: String,
    pub failure_image: String,
    pub define: BTreeMap<String, toml::Value>,
    pub sandbox: BTreeMap<String, SandboxConfig>,
    pub repo: BTreeMap<String, RepoConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            output_dir: raw.output_dir,
            success_image: raw.success_image,
            failure_image: raw.failure_image,
            define: raw.define,
            sandbox: raw.sandbox,
            repo: raw.repo,
        }
    }
}

/// `[sandbox.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    pub create_cmd: CommandList,
    pub enter_cmd: CommandList,
}

/// `[repo.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
    pub url: String,

    /// Mirror directory, relative to the repository directory.
    #[serde(default = "default_checkout_dir")]
    pub checkout_dir: String,

    /// Name of a `[sandbox.<name>]` section to enter before building.
    #[serde(default)]
    pub sandbox_type: Option<String>,

    /// Run after each working-tree update, before the build.
    #[serde(default)]
    pub pre_test_cmd: Option<String>,

    #[serde(default)]
    pub define: BTreeMap<String, toml::Value>,

    /// Build used by branches without their own `build`.
    #[serde(default)]
    pub default_build: Option<BuildConfig>,

    /// Tracked branches (`[[repo.<name>.branch]]`).
    #[serde(default)]
    pub branch: Vec<BranchConfig>,
}

/// `[[repo.<name>.branch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchConfig {
    pub name: String,

    #[serde(default)]
    pub define: BTreeMap<String, toml::Value>,

    /// Replaces the repository's `default_build` for this branch.
    #[serde(default)]
    pub build: Option<BuildConfig>,
}

/// Staged build definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub setup: CommandList,

    #[serde(default, alias = "build_cmd")]
    pub build: CommandList,

    #[serde(default)]
    pub teardown: CommandList,

    #[serde(default)]
    pub success: CommandList,

    #[serde(default)]
    pub failure: CommandList,
}

/// Ordered command templates. Accepts a single string or a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct CommandList(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for CommandList {
    fn from(v: OneOrMany) -> Self {
        match v {
            OneOrMany::One(s) => CommandList(vec![s]),
            OneOrMany::Many(v) => CommandList(v),
        }
    }
}

impl CommandList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Render a `define` value as macro text: strings verbatim, anything else in
/// its TOML form.
pub fn define_value_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
