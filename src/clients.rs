//! Pages controlled by the worker, and the notification surface.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::message::PageMessage;

/// Identifier of a page client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A page known to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client identifier.
    pub id: ClientId,
    /// URL the page is showing.
    pub url: String,
    /// Whether this worker controls the page.
    pub controlled: bool,
}

/// Display options for a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    /// Notification body text.
    pub body: String,
    /// Icon URL.
    pub icon: String,
    /// Badge URL.
    pub badge: String,
    /// Text direction.
    pub dir: String,
    /// Language tag.
    pub lang: String,
    /// Opaque payload data carried through to click handling.
    pub data: Option<Value>,
}

/// Abstraction over the pages a worker can see and talk to.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Returns window clients; controlled ones only unless
    /// `include_uncontrolled` is set.
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<ClientInfo>>;

    /// Posts a message to one client.
    async fn post_message(&self, id: ClientId, message: PageMessage) -> Result<()>;

    /// Focuses an existing window.
    async fn focus(&self, id: ClientId) -> Result<()>;

    /// Opens a new window at `url`.
    async fn open_window(&self, url: &str) -> Result<ClientId>;

    /// Takes control of every open page in scope.
    async fn claim(&self) -> Result<()>;

    /// Displays a notification.
    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<()>;
}

#[derive(Debug, Default)]
struct Recorded {
    windows: Vec<ClientInfo>,
    messages: Vec<(ClientId, PageMessage)>,
    focused: Vec<ClientId>,
    opened: Vec<String>,
    notifications: Vec<(String, NotificationOptions)>,
    claims: usize,
}

/// In-memory client host that records every effect.
#[derive(Debug, Default)]
pub struct MemoryClients {
    recorded: Mutex<Recorded>,
}

impl MemoryClients {
    /// Creates a host with no open windows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an open window and returns its identifier.
    pub fn add_window(&self, url: &str, controlled: bool) -> ClientId {
        let id = ClientId::new();
        self.recorded().windows.push(ClientInfo {
            id,
            url: url.to_string(),
            controlled,
        });
        id
    }

    /// Messages posted so far.
    #[must_use]
    pub fn messages(&self) -> Vec<(ClientId, PageMessage)> {
        self.recorded().messages.clone()
    }

    /// Windows focused so far.
    #[must_use]
    pub fn focused(&self) -> Vec<ClientId> {
        self.recorded().focused.clone()
    }

    /// URLs of windows opened so far.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.recorded().opened.clone()
    }

    /// Notifications shown so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<(String, NotificationOptions)> {
        self.recorded().notifications.clone()
    }

    /// Number of times `claim` was called.
    #[must_use]
    pub fn claims(&self) -> usize {
        self.recorded().claims
    }
}

#[async_trait]
impl Clients for MemoryClients {
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<ClientInfo>> {
        Ok(self
            .recorded()
            .windows
            .iter()
            .filter(|c| include_uncontrolled || c.controlled)
            .cloned()
            .collect())
    }

    async fn post_message(&self, id: ClientId, message: PageMessage) -> Result<()> {
        let mut recorded = self.recorded();
        if !recorded.windows.iter().any(|c| c.id == id) {
            return Err(Error::Network(format!("client {id} is gone")));
        }
        recorded.messages.push((id, message));
        Ok(())
    }

    async fn focus(&self, id: ClientId) -> Result<()> {
        self.recorded().focused.push(id);
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<ClientId> {
        self.recorded().opened.push(url.to_string());
        Ok(self.add_window(url, true))
    }

    async fn claim(&self) -> Result<()> {
        let mut recorded = self.recorded();
        recorded.claims += 1;
        for client in &mut recorded.windows {
            client.controlled = true;
        }
        Ok(())
    }

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<()> {
        self.recorded()
            .notifications
            .push((title.to_string(), options.clone()));
        Ok(())
    }
}
