//! Client event bus and navigation port.
//!
//! The pipeline and the session controller never touch UI state directly.
//! Notifications and session transitions are published on an [`EventBus`];
//! redirects go through a [`Navigator`] supplied by the shell.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

/// Events beyond this limit are dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A message the shell should show to the user (toast).
    Notice { level: NoticeLevel, message: String },
    /// The session could not be recovered; `redirect` is the sign-in target.
    SessionExpired { redirect: String },
    /// Login or logout completed.
    SessionChanged { authenticated: bool },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event. Returns the number of receivers that got it.
    pub fn publish(&self, event: ClientEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) -> usize {
        self.publish(ClientEvent::Notice {
            level,
            message: message.into(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Routing seam between the client core and whatever renders it.
pub trait Navigator: Send + Sync {
    /// Current path and query, e.g. `/system/user?page=2`.
    fn current_location(&self) -> String;

    fn navigate(&self, to: &str);
}

/// Navigator that keeps the location in memory and records every navigation.
#[derive(Debug)]
pub struct RecordingNavigator {
    location: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn shared(location: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(location))
    }

    pub fn set_location(&self, location: impl Into<String>) {
        if let Ok(mut current) = self.location.lock() {
            *current = location.into();
        }
    }

    /// Every target passed to [`Navigator::navigate`], oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

impl Default for RecordingNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .map(|l| l.clone())
            .unwrap_or_else(|_| "/".to_string())
    }

    fn navigate(&self, to: &str) {
        tracing::debug!(to, "Navigating");
        if let Ok(mut history) = self.history.lock() {
            history.push(to.to_string());
        }
        self.set_location(to);
    }
}

/// Builds the sign-in target carrying the location to return to.
pub fn login_redirect(login_route: &str, location: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(location.as_bytes()).collect();
    format!("{login_route}?redirect={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_encodes_path_and_query() {
        assert_eq!(
            login_redirect("/login", "/system/user?page=2&size=10"),
            "/login?redirect=%2Fsystem%2Fuser%3Fpage%3D2%26size%3D10"
        );
        assert_eq!(login_redirect("/login", "/"), "/login?redirect=%2F");
    }

    #[test]
    fn test_recording_navigator() {
        let nav = RecordingNavigator::new("/dashboard");
        assert_eq!(nav.current_location(), "/dashboard");

        nav.navigate("/login?redirect=%2Fdashboard");
        assert_eq!(nav.current_location(), "/login?redirect=%2Fdashboard");
        assert_eq!(nav.history(), vec!["/login?redirect=%2Fdashboard"]);
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.notify(NoticeLevel::Info, "nobody listening"), 0);

        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        bus.notify(NoticeLevel::Error, "boom");

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ClientEvent::Notice {
                level: NoticeLevel::Error,
                message: "boom".into()
            }
        );
    }
}
