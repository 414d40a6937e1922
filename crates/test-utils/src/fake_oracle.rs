use std::future::ready;
use std::sync::{Arc, Mutex};

use soapci::errors::{Result, SoapCiError};
use soapci::types::{BoxFuture, CommitId};
use soapci::vcs::AncestryOracle;

#[derive(Debug, Default)]
struct State {
    /// Linear history, oldest first.
    history: Vec<CommitId>,
    remote_head: Option<CommitId>,
    failing: bool,
    queries: Vec<(CommitId, CommitId)>,
    updates: Vec<CommitId>,
}

/// In-memory [`AncestryOracle`] over a single linear history.
///
/// `a` is an ancestor-or-equal of `b` iff `a` appears no later than `b`.
/// Commits not in the history make the query fail, like `git merge-base`
/// on an unknown object. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeOracle {
    state: Arc<Mutex<State>>,
}

pub fn commit(id: &str) -> CommitId {
    CommitId::new(id).expect("valid commit id")
}

impl FakeOracle {
    /// History `ids[0] <- ids[1] <- ...`; the remote head is the last one.
    pub fn linear(ids: &[&str]) -> Self {
        let oracle = Self::default();
        {
            let mut state = oracle.state.lock().unwrap();
            state.history = ids.iter().map(|id| commit(id)).collect();
        }
        oracle
    }

    /// Append `id` to the history and make it the remote head.
    pub fn push(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.history.push(commit(id));
        state.remote_head = None;
    }

    pub fn set_remote_head(&self, id: &str) {
        self.state.lock().unwrap().remote_head = Some(commit(id));
    }

    /// Make every ancestry query fail from now on.
    pub fn fail_queries(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// `(ancestor, descendant)` pairs queried, in order.
    pub fn queries(&self) -> Vec<(CommitId, CommitId)> {
        self.state.lock().unwrap().queries.clone()
    }

    /// Commits the working tree was moved to, in order.
    pub fn updates(&self) -> Vec<CommitId> {
        self.state.lock().unwrap().updates.clone()
    }

    fn query(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.queries.push((ancestor.clone(), descendant.clone()));

        let fail = |detail: &str| SoapCiError::AncestryQuery {
            ancestor: ancestor.to_string(),
            descendant: descendant.to_string(),
            detail: detail.to_string(),
        };

        if state.failing {
            return Err(fail("history graph unavailable"));
        }
        let pos = |c: &CommitId| state.history.iter().position(|h| h == c);
        match (pos(ancestor), pos(descendant)) {
            (Some(a), Some(d)) => Ok(a <= d),
            _ => Err(fail("unknown commit")),
        }
    }

    fn head(&self) -> Result<CommitId> {
        let state = self.state.lock().unwrap();
        state
            .remote_head
            .clone()
            .or_else(|| state.history.last().cloned())
            .ok_or_else(|| SoapCiError::Git("remote branch has no commits".to_string()))
    }
}

impl AncestryOracle for FakeOracle {
    fn is_ancestor_or_equal<'a>(
        &'a self,
        ancestor: &'a CommitId,
        descendant: &'a CommitId,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(ready(self.query(ancestor, descendant)))
    }

    fn update_to<'a>(&'a self, commit: &'a CommitId) -> BoxFuture<'a, Result<()>> {
        self.state.lock().unwrap().updates.push(commit.clone());
        Box::pin(ready(Ok(())))
    }

    fn latest_remote_commit(&self) -> BoxFuture<'_, Result<CommitId>> {
        Box::pin(ready(self.head()))
    }
}
