// src/sandbox.rs

//! Isolated build environments.
//!
//! A sandbox is just two command sequences from the config: `create` builds
//! the environment, `enter` makes the branch process use it (typically a
//! `source` directive that loads its environment into the session overlay).

use tracing::{info, warn};

use crate::errors::{Result, SoapCiError};
use crate::exec::ShellSession;
use crate::macros::{expand, MacroContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    pub name: String,
    pub create: Vec<String>,
    pub enter: Vec<String>,
}

impl Sandbox {
    /// Enter the sandbox, creating it first if entering fails.
    pub async fn enter_or_create(
        &self,
        macros: &MacroContext,
        session: &mut ShellSession,
    ) -> Result<()> {
        match self.run_sequence(&self.enter, macros, session).await {
            Ok(()) => {
                info!(sandbox = %self.name, "entered sandbox");
                return Ok(());
            }
            Err(SoapCiError::Sandbox(reason)) => {
                warn!(sandbox = %self.name, %reason, "could not enter sandbox; creating it");
            }
            Err(other) => return Err(other),
        }

        self.run_sequence(&self.create, macros, session)
            .await
            .map_err(|e| self.wrap("failed to create sandbox", e))?;
        self.run_sequence(&self.enter, macros, session)
            .await
            .map_err(|e| self.wrap("failed to enter sandbox", e))?;

        info!(sandbox = %self.name, "created and entered sandbox");
        Ok(())
    }

    async fn run_sequence(
        &self,
        templates: &[String],
        macros: &MacroContext,
        session: &mut ShellSession,
    ) -> Result<()> {
        for template in templates {
            let cmd = expand(template, macros)?;
            let dispatch = session.dispatch(&cmd).await;
            if !dispatch.succeeded() {
                return Err(SoapCiError::Sandbox(format!("`{cmd}` failed: {dispatch:?}")));
            }
        }
        Ok(())
    }

    fn wrap(&self, what: &str, err: SoapCiError) -> SoapCiError {
        match err {
            SoapCiError::Sandbox(reason) => {
                SoapCiError::Sandbox(format!("{what} '{}': {reason}", self.name))
            }
            other => other,
        }
    }
}
