// src/exec/env.rs

use std::collections::BTreeMap;

use tokio::process::Command;

/// Environment variables collected from sourced scripts.
///
/// Applied on top of the inherited process environment for every command a
/// branch process runs after the script was sourced. The process-wide
/// environment itself is never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvironmentOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the output of `env -0`: `KEY=VALUE` records separated by NUL.
    ///
    /// Values may span several lines. Records without a usable key are
    /// dropped.
    pub fn from_env_output(output: &str) -> Self {
        let vars = output
            .split('\0')
            .filter_map(|record| record.split_once('='))
            .filter(|(k, _)| !k.is_empty() && !k.contains(char::is_whitespace))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { vars }
    }

    /// Later values win.
    pub fn merge(&mut self, other: EnvironmentOverlay) {
        self.vars.extend(other.vars);
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn apply(&self, cmd: &mut Command) {
        cmd.envs(&self.vars);
    }
}
