//! Observable session state and the controller driving it.

mod controller;
mod teardown;

pub use controller::SessionController;
pub use teardown::{SessionResource, Teardown};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::api::user::UserInfo;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub status: SessionStatus,
    pub user_info: Option<UserInfo>,
    pub loading: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Persisted form of the session. Never carries tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionSnapshot {
    pub is_authenticated: bool,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

/// Shared handle to the current [`Session`].
///
/// Subscribers are woken on every change, like a UI store re-rendering its
/// consumers.
#[derive(Clone)]
pub struct SessionState {
    sender: watch::Sender<Session>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Session::default());
        Self { sender }
    }

    pub fn snapshot(&self) -> Session {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sender.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sender.borrow().is_authenticated()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut Session)) {
        self.sender.send_modify(f);
    }

    pub(crate) fn reset(&self) {
        self.sender.send_replace(Session::default());
    }
}
