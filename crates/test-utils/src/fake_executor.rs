use std::collections::HashMap;
use std::future::ready;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use soapci::errors::{Result, SoapCiError};
use soapci::exec::{CommandExecutor, CommandOutput, EnvironmentOverlay};
use soapci::types::BoxFuture;

/// One `run` call as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub command: String,
    pub cwd: PathBuf,
    pub env: EnvironmentOverlay,
}

#[derive(Debug, Clone)]
enum Response {
    Output(CommandOutput),
    Error(String),
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    response: Response,
    /// `None` means the rule never wears out.
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    /// The first live rule whose pattern occurs in the command wins.
    rules: Vec<Rule>,
    scripts: HashMap<PathBuf, Vec<(String, String)>>,
    executed: Vec<ExecutedCommand>,
    sourced: Vec<PathBuf>,
}

/// A scripted executor that:
/// - records every command it was asked to run, with the overlay it saw
/// - answers unscripted commands with exit code 0 and the command itself as
///   stdout (like `echo`)
/// - "sources" only scripts registered with [`FakeExecutor::script`].
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<State>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` exit with `exit_code` and print `stderr`.
    pub fn fail_on(&self, pattern: &str, exit_code: i32, stderr: &str) -> &Self {
        self.respond(
            pattern,
            CommandOutput {
                exit_code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Like [`FakeExecutor::fail_on`], but only for the first matching run.
    pub fn fail_once(&self, pattern: &str, exit_code: i32, stderr: &str) -> &Self {
        let output = CommandOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        };
        self.push_rule(pattern, Response::Output(output), Some(1))
    }

    /// Commands containing `pattern` return `output`.
    pub fn respond(&self, pattern: &str, output: CommandOutput) -> &Self {
        self.push_rule(pattern, Response::Output(output), None)
    }

    /// Commands containing `pattern` cannot be started at all.
    pub fn error_on(&self, pattern: &str, message: &str) -> &Self {
        self.push_rule(pattern, Response::Error(message.to_string()), None)
    }

    fn push_rule(&self, pattern: &str, response: Response, remaining: Option<usize>) -> &Self {
        self.state.lock().unwrap().rules.push(Rule {
            pattern: pattern.to_string(),
            response,
            remaining,
        });
        self
    }

    /// Register a sourceable script and the variables it exports.
    pub fn script(&self, path: impl AsRef<Path>, vars: &[(&str, &str)]) -> &Self {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(path.as_ref().to_path_buf(), vars);
        self
    }

    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.state.lock().unwrap().executed.clone()
    }

    /// Just the command strings, in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.executed().into_iter().map(|c| c.command).collect()
    }

    pub fn sourced(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().sourced.clone()
    }

    fn run_now(&self, command: &str, cwd: &Path, env: &EnvironmentOverlay) -> Result<CommandOutput> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(ExecutedCommand {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            env: env.clone(),
        });

        let response = state
            .rules
            .iter_mut()
            .find(|r| r.remaining != Some(0) && command.contains(r.pattern.as_str()))
            .map(|r| {
                if let Some(n) = r.remaining.as_mut() {
                    *n -= 1;
                }
                r.response.clone()
            });

        match response {
            Some(Response::Output(out)) => Ok(out),
            Some(Response::Error(msg)) => Err(SoapCiError::Other(anyhow!(msg))),
            None => Ok(CommandOutput {
                exit_code: 0,
                stdout: format!("{command}\n"),
                stderr: String::new(),
            }),
        }
    }

    fn source_now(&self, script: &Path) -> Result<EnvironmentOverlay> {
        let mut state = self.state.lock().unwrap();
        state.sourced.push(script.to_path_buf());

        match state.scripts.get(script) {
            Some(vars) => {
                let mut overlay = EnvironmentOverlay::new();
                for (k, v) in vars {
                    overlay.set(k.clone(), v.clone());
                }
                Ok(overlay)
            }
            None => Err(SoapCiError::Other(anyhow!(
                "script {:?} does not exist",
                script
            ))),
        }
    }
}

impl CommandExecutor for FakeExecutor {
    fn run<'a>(
        &'a self,
        command: &'a str,
        cwd: &'a Path,
        env: &'a EnvironmentOverlay,
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        Box::pin(ready(self.run_now(command, cwd, env)))
    }

    fn source<'a>(
        &'a self,
        script: &'a Path,
        _cwd: &'a Path,
        _env: &'a EnvironmentOverlay,
    ) -> BoxFuture<'a, Result<EnvironmentOverlay>> {
        Box::pin(ready(self.source_now(script)))
    }
}
