use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use crate::errors::SoapCiError;

/// Boxed future returned by the pluggable backends (executor, ancestry oracle).
///
/// The backends are object-safe traits so that tests can swap in fakes; this
/// alias keeps their signatures readable.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque commit identifier (a content hash).
///
/// Commits are only ordered through the ancestor-or-equal relation answered by
/// an [`AncestryOracle`](crate::vcs::AncestryOracle); arrival order in the
/// queue means nothing on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    /// Build a commit id, rejecting empty strings and embedded whitespace
    /// (either would corrupt the line-oriented queue file).
    pub fn new(raw: impl Into<String>) -> Result<Self, SoapCiError> {
        let raw = raw.into();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(SoapCiError::InvalidCommit(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CommitId {
    type Err = SoapCiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitId::new(s.trim())
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace `/` so a branch name can be used as a single path component.
pub fn sanitize_branch_name(branch: &str) -> String {
    branch.replace('/', "_")
}
