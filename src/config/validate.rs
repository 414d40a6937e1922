// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SoapCiError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SoapCiError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_repos(cfg)?;
    validate_define_names("[define]", &cfg.define)?;
    validate_sandboxes(cfg)?;
    for name in cfg.repo.keys() {
        validate_repo(cfg, name)?;
    }
    Ok(())
}

fn ensure_has_repos(cfg: &RawConfigFile) -> Result<()> {
    if cfg.repo.is_empty() {
        return Err(SoapCiError::ConfigError(
            "config must contain at least one [repo.<name>] section".to_string(),
        ));
    }
    Ok(())
}

/// Only `\w+` names can ever be referenced as `${name}`.
fn validate_define_names<V>(section: &str, define: &BTreeMap<String, V>) -> Result<()> {
    for name in define.keys() {
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(SoapCiError::ConfigError(format!(
                "{section}: macro name '{name}' must consist of letters, digits and '_'"
            )));
        }
    }
    Ok(())
}

fn validate_sandboxes(cfg: &RawConfigFile) -> Result<()> {
    for (name, sandbox) in cfg.sandbox.iter() {
        if sandbox.enter_cmd.is_empty() {
            return Err(SoapCiError::ConfigError(format!(
                "[sandbox.{name}] has an empty enter_cmd"
            )));
        }
    }
    Ok(())
}

fn validate_repo(cfg: &RawConfigFile, name: &str) -> Result<()> {
    let repo = &cfg.repo[name];

    if repo.url.trim().is_empty() {
        return Err(SoapCiError::ConfigError(format!(
            "[repo.{name}] must set a non-empty url"
        )));
    }

    validate_define_names(&format!("[repo.{name}.define]"), &repo.define)?;

    if let Some(sandbox) = repo.sandbox_type.as_deref() {
        if !cfg.sandbox.contains_key(sandbox) {
            return Err(SoapCiError::ConfigError(format!(
                "repo '{name}' uses unknown sandbox_type '{sandbox}'"
            )));
        }
    }

    if repo.branch.is_empty() {
        return Err(SoapCiError::ConfigError(format!(
            "repo '{name}' must track at least one [[repo.{name}.branch]]"
        )));
    }

    let mut seen = HashSet::new();
    for branch in repo.branch.iter() {
        if branch.name.trim().is_empty() {
            return Err(SoapCiError::ConfigError(format!(
                "repo '{name}' has a branch with an empty name"
            )));
        }
        if !seen.insert(branch.name.as_str()) {
            return Err(SoapCiError::ConfigError(format!(
                "repo '{name}' lists branch '{}' more than once",
                branch.name
            )));
        }
        if branch.build.is_none() && repo.default_build.is_none() {
            return Err(SoapCiError::ConfigError(format!(
                "branch '{}' of repo '{name}' has no build and the repo has no default_build",
                branch.name
            )));
        }
        validate_define_names(
            &format!("[repo.{name}.branch '{}'.define]", branch.name),
            &branch.define,
        )?;
    }

    Ok(())
}
