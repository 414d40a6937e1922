#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use soapci::build::StagedBuild;
use soapci::config::{
    BranchConfig, BuildConfig, CommandList, ConfigFile, RawConfigFile, RepoConfig, SandboxConfig,
};

fn list(cmds: &[&str]) -> CommandList {
    CommandList(cmds.iter().map(|c| c.to_string()).collect())
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                output_dir: PathBuf::from("results"),
                success_image: "${__working_dir__}/assets/success.png".to_string(),
                failure_image: "${__working_dir__}/assets/failure.png".to_string(),
                define: BTreeMap::new(),
                sandbox: BTreeMap::new(),
                repo: BTreeMap::new(),
            },
        }
    }

    pub fn with_define(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.config.define.insert(name.to_string(), value.into());
        self
    }

    pub fn with_sandbox(mut self, name: &str, create: &[&str], enter: &[&str]) -> Self {
        self.config.sandbox.insert(
            name.to_string(),
            SandboxConfig {
                create_cmd: list(create),
                enter_cmd: list(enter),
            },
        );
        self
    }

    pub fn with_repo(mut self, name: &str, repo: RepoConfig) -> Self {
        self.config.repo.insert(name.to_string(), repo);
        self
    }

    pub fn with_output_dir(mut self, dir: &str) -> Self {
        self.config.output_dir = PathBuf::from(dir);
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RepoConfig`.
pub struct RepoConfigBuilder {
    repo: RepoConfig,
}

impl RepoConfigBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            repo: RepoConfig {
                url: url.to_string(),
                checkout_dir: ".repo_mirror".to_string(),
                sandbox_type: None,
                pre_test_cmd: None,
                define: BTreeMap::new(),
                default_build: None,
                branch: vec![],
            },
        }
    }

    pub fn sandbox_type(mut self, name: &str) -> Self {
        self.repo.sandbox_type = Some(name.to_string());
        self
    }

    pub fn pre_test_cmd(mut self, cmd: &str) -> Self {
        self.repo.pre_test_cmd = Some(cmd.to_string());
        self
    }

    pub fn define(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.repo.define.insert(name.to_string(), value.into());
        self
    }

    pub fn default_build(mut self, build: BuildConfig) -> Self {
        self.repo.default_build = Some(build);
        self
    }

    /// Track `name` with the repository's default build.
    pub fn branch(mut self, name: &str) -> Self {
        self.repo.branch.push(BranchConfig {
            name: name.to_string(),
            define: BTreeMap::new(),
            build: None,
        });
        self
    }

    pub fn branch_with(mut self, branch: BranchConfig) -> Self {
        self.repo.branch.push(branch);
        self
    }

    pub fn build(self) -> RepoConfig {
        self.repo
    }
}

/// Builder for `BranchConfig`.
pub struct BranchConfigBuilder {
    branch: BranchConfig,
}

impl BranchConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            branch: BranchConfig {
                name: name.to_string(),
                define: BTreeMap::new(),
                build: None,
            },
        }
    }

    pub fn define(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.branch.define.insert(name.to_string(), value.into());
        self
    }

    pub fn build_with(mut self, build: BuildConfig) -> Self {
        self.branch.build = Some(build);
        self
    }

    pub fn build(self) -> BranchConfig {
        self.branch
    }
}

/// Builder for a staged build; produces either the runtime `StagedBuild` or
/// its config form.
#[derive(Default)]
pub struct StagedBuildBuilder {
    build: StagedBuild,
}

impl StagedBuildBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setup(mut self, cmd: &str) -> Self {
        self.build.setup.push(cmd.to_string());
        self
    }

    pub fn build_cmd(mut self, cmd: &str) -> Self {
        self.build.build.push(cmd.to_string());
        self
    }

    pub fn teardown(mut self, cmd: &str) -> Self {
        self.build.teardown.push(cmd.to_string());
        self
    }

    pub fn on_success(mut self, cmd: &str) -> Self {
        self.build.success.push(cmd.to_string());
        self
    }

    pub fn on_failure(mut self, cmd: &str) -> Self {
        self.build.failure.push(cmd.to_string());
        self
    }

    pub fn build(self) -> StagedBuild {
        self.build
    }

    pub fn into_config(self) -> BuildConfig {
        BuildConfig {
            setup: CommandList(self.build.setup),
            build: CommandList(self.build.build),
            teardown: CommandList(self.build.teardown),
            success: CommandList(self.build.success),
            failure: CommandList(self.build.failure),
        }
    }
}
