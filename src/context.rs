//! Cancellable run context shared by the dispatcher, workers and generators.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::RunError;

/// Cancellation scope for one run.
///
/// A context is done once it is cancelled explicitly, once any ancestor is
/// cancelled, or once its deadline passes. Cloning shares the same scope;
/// [`RunContext::child`] derives a narrower one.
#[derive(Debug, Clone)]
pub struct RunContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    /// When `cancel` was called on this scope, then on each ancestor in turn.
    cancelled_at: Vec<Arc<OnceLock<Instant>>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Creates a root context with no deadline.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            cancelled_at: vec![Arc::new(OnceLock::new())],
        }
    }

    /// Creates a root context that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().child_with_timeout(timeout)
    }

    /// Derives a context cancelled together with `self`.
    ///
    /// Cancelling the child leaves the parent untouched.
    pub fn child(&self) -> Self {
        let mut cancelled_at = Vec::with_capacity(self.cancelled_at.len() + 1);
        cancelled_at.push(Arc::new(OnceLock::new()));
        cancelled_at.extend(self.cancelled_at.iter().cloned());
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            cancelled_at,
        }
    }

    /// Derives a child whose deadline is the earlier of the parent's and `now + timeout`.
    ///
    /// A timeout too large to represent adds no deadline of its own.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let mut child = self.child();
        child.deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(existing), Some(candidate)) => Some(existing.min(candidate)),
            (existing, candidate) => existing.or(candidate),
        };
        child
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        let _ = self.cancelled_at[0].set(Instant::now());
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` while it is still live.
    ///
    /// When both an explicit cancel (here or on an ancestor) and the deadline
    /// apply, whichever happened first is reported.
    pub fn err(&self) -> Option<RunError> {
        let cancelled = self
            .cancelled_at
            .iter()
            .filter_map(|at| at.get().copied())
            .min();
        match (cancelled, self.deadline) {
            (Some(at), Some(deadline)) if deadline <= at => Some(RunError::DeadlineExceeded),
            (Some(_), _) => Some(RunError::Cancelled),
            (None, _) if self.deadline_passed() => Some(RunError::DeadlineExceeded),
            (None, _) if self.token.is_cancelled() => Some(RunError::Cancelled),
            (None, _) => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the context is done, either by cancellation or deadline.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Runs `fut` unless the context finishes first.
    ///
    /// A future abandoned this way is dropped, so generators built on async
    /// I/O stop as soon as the run is cancelled.
    pub async fn run_until_done<F, T>(&self, fut: F) -> Result<T, RunError>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.done() => Err(self.err().unwrap_or(RunError::Cancelled)),
            value = fut => Ok(value),
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
