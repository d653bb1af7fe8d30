//! Single-flight guard for the token refresh call.
//!
//! The first caller that needs a refresh becomes the leader and performs it.
//! Everyone arriving while it runs is parked in a FIFO queue and released in
//! enqueue order once the leader succeeds. If the leader fails, the queue is
//! discarded and parked callers observe a closed channel instead of being
//! released. A leader dropped mid-flight (its caller was cancelled) hands
//! [`Release::Abandoned`] to the parked callers, which then re-enter the gate.
//!
//! All state transitions happen under a synchronous lock that is never held
//! across an await point.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

/// Why a parked caller was woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    Refreshed,
    /// The leader stopped without an outcome; stored tokens are unchanged.
    Abandoned,
}

#[derive(Debug, Default)]
struct GateState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<Release>>,
}

#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
    state: Mutex<GateState>,
}

pub(crate) enum Ticket<'a> {
    /// Perform the refresh, then call [`LeaderGuard::succeed`] or [`LeaderGuard::fail`].
    Leader(LeaderGuard<'a>),
    /// Wait for the leader. A closed channel means the refresh failed.
    Waiter(oneshot::Receiver<Release>),
    /// A refresh completed after the failing call was dispatched; just retry.
    AlreadyRefreshed,
}

impl RefreshGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Joins the refresh protocol.
    ///
    /// `is_stale` is evaluated under the lock when no refresh is running and
    /// reports whether the credentials the caller used have been replaced.
    pub(crate) fn enter(&self, is_stale: impl FnOnce() -> bool) -> Ticket<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            tracing::debug!(queued = state.waiters.len(), "Queued request behind token refresh");
            return Ticket::Waiter(rx);
        }
        if is_stale() {
            return Ticket::AlreadyRefreshed;
        }
        state.refreshing = true;
        tracing::debug!("Starting token refresh");
        Ticket::Leader(LeaderGuard {
            gate: self,
            finished: false,
        })
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, commit: Option<&mut dyn FnMut()>) -> Vec<oneshot::Sender<Release>> {
        let mut state = self.lock();
        if let Some(commit) = commit {
            commit();
        }
        state.refreshing = false;
        std::mem::take(&mut state.waiters)
    }
}

pub(crate) struct LeaderGuard<'a> {
    gate: &'a RefreshGate,
    finished: bool,
}

impl LeaderGuard<'_> {
    /// Runs `commit` (storing the new tokens) under the gate lock, then
    /// releases every parked caller in FIFO order.
    pub(crate) fn succeed(mut self, mut commit: impl FnMut()) {
        self.finished = true;
        let waiters = self.gate.release(Some(&mut commit));
        tracing::debug!(replayed = waiters.len(), "Token refresh succeeded");
        for waiter in waiters {
            let _ = waiter.send(Release::Refreshed);
        }
    }

    /// Discards the queue without releasing anyone.
    pub(crate) fn fail(mut self) {
        self.finished = true;
        let dropped = self.gate.release(None);
        tracing::debug!(dropped = dropped.len(), "Token refresh failed");
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let waiters = self.gate.release(None);
            tracing::warn!(waiters = waiters.len(), "Token refresh abandoned");
            for waiter in waiters {
                let _ = waiter.send(Release::Abandoned);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_caller_leads() {
        let gate = RefreshGate::new();
        let ticket = gate.enter(|| false);
        assert!(matches!(ticket, Ticket::Leader(_)));
        assert!(gate.is_refreshing());
    }

    #[test]
    fn test_stale_credentials_skip_refresh() {
        let gate = RefreshGate::new();
        assert!(matches!(gate.enter(|| true), Ticket::AlreadyRefreshed));
        assert!(!gate.is_refreshing());
    }

    #[tokio::test]
    async fn test_waiters_released_in_order_on_success() {
        let gate = RefreshGate::new();
        let Ticket::Leader(leader) = gate.enter(|| false) else {
            panic!("expected leader");
        };

        let mut receivers = Vec::new();
        for _ in 0..3 {
            match gate.enter(|| panic!("not evaluated while refreshing")) {
                Ticket::Waiter(rx) => receivers.push(rx),
                _ => panic!("expected waiter"),
            }
        }
        assert_eq!(gate.queued(), 3);

        let mut committed = false;
        leader.succeed(|| committed = true);
        assert!(committed);
        assert!(!gate.is_refreshing());
        assert_eq!(gate.queued(), 0);

        for rx in receivers {
            assert_eq!(rx.await.unwrap(), Release::Refreshed);
        }
    }

    #[tokio::test]
    async fn test_waiters_dropped_on_failure() {
        let gate = RefreshGate::new();
        let Ticket::Leader(leader) = gate.enter(|| false) else {
            panic!("expected leader");
        };
        let Ticket::Waiter(rx) = gate.enter(|| false) else {
            panic!("expected waiter");
        };

        leader.fail();
        assert!(rx.await.is_err());
        assert!(!gate.is_refreshing());
    }

    #[tokio::test]
    async fn test_abandoned_leader_unblocks_gate() {
        let gate = RefreshGate::new();
        let Ticket::Leader(leader) = gate.enter(|| false) else {
            panic!("expected leader");
        };
        let Ticket::Waiter(rx) = gate.enter(|| false) else {
            panic!("expected waiter");
        };

        drop(leader);
        assert_eq!(rx.await.unwrap(), Release::Abandoned);
        assert!(matches!(gate.enter(|| false), Ticket::Leader(_)));
    }
}
