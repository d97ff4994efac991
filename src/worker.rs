//! The cache worker: precaching, generation cleanup, and per-request
//! strategy dispatch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::try_join_all;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::CacheStorage;
use crate::clients::{ClientId, Clients, NotificationOptions};
use crate::config::WorkerConfig;
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::lifecycle::{ExtendableEvent, WorkerState};
use crate::message::{ControlMessage, PageMessage};
use crate::network::Network;

/// How a request is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from cache, use the network only on a miss.
    CacheFirst,
    /// Try the network, fall back to cache when it fails.
    NetworkFirst,
}

impl Strategy {
    /// Picks a strategy for a GET request. Returns `None` for requests the
    /// worker should not touch.
    #[must_use]
    pub fn route(config: &WorkerConfig, request: &Request) -> Option<Self> {
        if request.method != Method::GET {
            return None;
        }
        let path = request.path();
        if path.starts_with(&config.api_prefix)
            || path.starts_with(&config.uploads_prefix)
            || request.accepts_html()
        {
            Some(Self::NetworkFirst)
        } else {
            Some(Self::CacheFirst)
        }
    }
}

/// Result of intercepting a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled; the request goes to the network untouched.
    Passthrough,
    /// Respond with this response.
    Respond(Response),
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
}

/// Push payload fields the worker understands. Everything is optional.
#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    data: Option<Value>,
}

/// Cache worker over pluggable cache, network, and client capabilities.
pub struct CacheWorker<C, N, P> {
    config: Arc<WorkerConfig>,
    caches: Arc<C>,
    network: Arc<N>,
    clients: Arc<P>,
    lifecycle: Mutex<Lifecycle>,
}

impl<C, N, P> CacheWorker<C, N, P>
where
    C: CacheStorage + 'static,
    N: Network,
    P: Clients,
{
    /// Creates a worker in the `Parsed` state.
    #[must_use]
    pub fn new(config: WorkerConfig, caches: Arc<C>, network: Arc<N>, clients: Arc<P>) -> Self {
        Self {
            config: Arc::new(config),
            caches,
            network,
            clients,
            lifecycle: Mutex::default(),
        }
    }

    /// Returns the worker configuration.
    #[must_use]
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.lifecycle().state
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: WorkerState) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != state {
            log::debug!("Worker state {} -> {state}", lifecycle.state);
            lifecycle.state = state;
        }
    }

    /// Precaches every configured asset into the static generation.
    ///
    /// Population is all-or-nothing: every asset is fetched before anything
    /// is stored, and a single failure leaves the worker `Redundant` with no
    /// static entries written. When skip-waiting was requested (by config or
    /// message), a successful install continues straight into activation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Install`] naming the first asset that failed, or
    /// [`Error::InvalidState`] if install already ran.
    pub async fn install(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state != WorkerState::Parsed {
                return Err(Error::InvalidState {
                    expected: "parsed",
                    actual: lifecycle.state.to_string(),
                });
            }
            lifecycle.state = WorkerState::Installing;
            lifecycle.skip_waiting |= self.config.skip_waiting_on_install;
        }
        log::info!("Installing {}", self.config.cache_version);

        if let Err(e) = self.precache().await {
            log::error!("Install failed: {e}");
            self.set_state(WorkerState::Redundant);
            return Err(e);
        }

        self.set_state(WorkerState::Installed);
        if self.lifecycle().skip_waiting {
            self.activate().await?;
        }
        Ok(())
    }

    async fn precache(&self) -> Result<()> {
        let name = self.config.static_cache_name();
        let existed = self.caches.has(&name).await?;
        self.caches.open(&name).await?;
        log::info!("Caching static assets into {name}");

        let urls = self.config.precache_urls();
        let fetched = try_join_all(urls.iter().map(|url| self.fetch_asset(url))).await;
        let responses = match fetched {
            Ok(responses) => responses,
            Err(e) => {
                if !existed {
                    self.caches.delete(&name).await?;
                }
                return Err(e);
            }
        };

        for (url, response) in urls.iter().zip(responses) {
            let key = Request::get(url.as_str()).cache_key(&self.config.origin);
            self.caches.put(&name, &key, response).await?;
        }
        Ok(())
    }

    async fn fetch_asset(&self, url: &str) -> Result<Response> {
        let response = self
            .network
            .fetch(&Request::get(url))
            .await
            .map_err(|e| Error::Install {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if !response.is_success() {
            return Err(Error::Install {
                url: url.to_string(),
                reason: format!("status {}", response.status),
            });
        }
        Ok(response)
    }

    /// Deletes every generation other than this version's static and
    /// dynamic ones, then claims all open pages. Returns the deleted names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the worker is `Installed`, or
    /// any cache or client error. A failed activation leaves the worker
    /// `Installed` so it can be retried.
    pub async fn activate(&self) -> Result<Vec<String>> {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state != WorkerState::Installed {
                return Err(Error::InvalidState {
                    expected: "installed",
                    actual: lifecycle.state.to_string(),
                });
            }
            lifecycle.state = WorkerState::Activating;
        }
        log::info!("Activating {}", self.config.cache_version);

        match self.evict_and_claim().await {
            Ok(removed) => {
                self.set_state(WorkerState::Activated);
                Ok(removed)
            }
            Err(e) => {
                log::error!("Activation failed: {e}");
                self.set_state(WorkerState::Installed);
                Err(e)
            }
        }
    }

    async fn evict_and_claim(&self) -> Result<Vec<String>> {
        let keep = [
            self.config.static_cache_name(),
            self.config.dynamic_cache_name(),
        ];
        let mut removed = Vec::new();
        for name in self.caches.keys().await? {
            if keep.contains(&name) {
                continue;
            }
            log::info!("Removing old cache: {name}");
            if self.caches.delete(&name).await? {
                removed.push(name);
            }
        }

        self.clients.claim().await?;
        Ok(removed)
    }

    /// Activates without waiting for older versions' pages to close.
    ///
    /// Called during install, the request is remembered and honoured once
    /// install succeeds. Once activating or active it does nothing.
    ///
    /// # Errors
    ///
    /// Returns any error from activation.
    pub async fn skip_waiting(&self) -> Result<()> {
        let state = {
            let mut lifecycle = self.lifecycle();
            lifecycle.skip_waiting = true;
            lifecycle.state
        };
        if state == WorkerState::Installed {
            self.activate().await?;
        }
        Ok(())
    }

    /// Intercepts a fetch.
    ///
    /// Cache writes triggered by the response are registered on `event`.
    ///
    /// # Errors
    ///
    /// Returns an error when the network fails and no cached fallback exists.
    pub async fn handle_fetch(
        &self,
        request: &Request,
        event: &ExtendableEvent,
    ) -> Result<FetchOutcome> {
        if !self.state().can_intercept_fetch() {
            return Ok(FetchOutcome::Passthrough);
        }
        let response = match Strategy::route(&self.config, request) {
            None => return Ok(FetchOutcome::Passthrough),
            Some(Strategy::CacheFirst) => self.cache_first(request, event).await?,
            Some(Strategy::NetworkFirst) => self.network_first(request, event).await?,
        };
        Ok(FetchOutcome::Respond(response))
    }

    /// Serves from any generation; on a miss fetches and stores successful
    /// responses in the dynamic generation. Offline misses fall back to the
    /// cached root document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheMiss`] when offline with nothing to fall back to.
    pub async fn cache_first(&self, request: &Request, event: &ExtendableEvent) -> Result<Response> {
        let key = request.cache_key(&self.config.origin);
        if let Some(cached) = self.caches.match_any(&key).await? {
            return Ok(cached);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_dynamic(event, key, &response);
                }
                Ok(response)
            }
            Err(e) => {
                log::info!("Fetch failed for {}: {e}", request.url);
                self.offline_fallback(request).await
            }
        }
    }

    /// Fetches from the network, storing successful responses in the dynamic
    /// generation. On network failure serves a cached match, then for HTML
    /// requests the cached root document.
    ///
    /// # Errors
    ///
    /// Returns the network error for non-HTML requests with no cached match,
    /// or [`Error::CacheMiss`] for HTML requests when even the root is absent.
    pub async fn network_first(
        &self,
        request: &Request,
        event: &ExtendableEvent,
    ) -> Result<Response> {
        let key = request.cache_key(&self.config.origin);
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_dynamic(event, key, &response);
                }
                Ok(response)
            }
            Err(e) => {
                log::info!("Network failed for {}, trying cache: {e}", request.url);
                if let Some(cached) = self.caches.match_any(&key).await? {
                    return Ok(cached);
                }
                if request.accepts_html() {
                    return self.offline_fallback(request).await;
                }
                Err(e)
            }
        }
    }

    async fn offline_fallback(&self, request: &Request) -> Result<Response> {
        let fallback =
            Request::get(self.config.offline_fallback.as_str()).cache_key(&self.config.origin);
        self.caches
            .match_any(&fallback)
            .await?
            .ok_or_else(|| Error::CacheMiss {
                url: request.url.clone(),
            })
    }

    fn store_dynamic(&self, event: &ExtendableEvent, key: String, response: &Response) {
        let caches = Arc::clone(&self.caches);
        let name = self.config.dynamic_cache_name();
        let response = response.clone();
        event.wait_until(async move { caches.put(&name, &key, response).await });
    }

    /// Handles a background sync event. For the report sync tag, tells every
    /// controlled page to replay its queue; the worker itself never touches
    /// queued reports. Returns how many pages were notified.
    ///
    /// # Errors
    ///
    /// Returns an error if the controlled pages cannot be listed.
    pub async fn handle_sync(&self, tag: &str) -> Result<usize> {
        log::info!("Sync event: {tag}");
        if tag != self.config.sync_tag {
            return Ok(0);
        }

        let mut notified = 0;
        for client in self.clients.match_all(false).await? {
            match self
                .clients
                .post_message(client.id, PageMessage::SyncReports)
                .await
            {
                Ok(()) => notified += 1,
                Err(e) => log::warn!("Could not notify client {}: {e}", client.id),
            }
        }
        Ok(notified)
    }

    /// Shows a notification for a push. Missing or malformed payloads, and
    /// empty titles or bodies, fall back to the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be displayed.
    pub async fn handle_push(&self, payload: Option<&[u8]>) -> Result<()> {
        log::info!("Push received");
        let payload = payload
            .and_then(|bytes| match serde_json::from_slice::<PushPayload>(bytes) {
                Ok(p) => Some(p),
                Err(e) => {
                    log::warn!("Malformed push payload, using defaults: {e}");
                    None
                }
            })
            .unwrap_or_default();

        let defaults = &self.config.notification;
        let title = payload
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| defaults.title.clone());
        let options = NotificationOptions {
            body: payload
                .body
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| defaults.body.clone()),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            dir: defaults.dir.clone(),
            lang: defaults.lang.clone(),
            data: payload.data,
        };
        self.clients.show_notification(&title, &options).await
    }

    /// Handles a notification click: focuses the first open window, or opens
    /// the configured route when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if windows cannot be listed, focused, or opened.
    pub async fn handle_notification_click(&self) -> Result<ClientId> {
        log::info!("Notification clicked");
        if let Some(client) = self.clients.match_all(true).await?.into_iter().next() {
            self.clients.focus(client.id).await?;
            return Ok(client.id);
        }
        self.clients
            .open_window(&self.config.notification.click_route)
            .await
    }

    /// Handles a raw message from a page. Unrecognised messages are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested action fails.
    pub async fn handle_message(&self, data: &Value) -> Result<()> {
        log::info!("Message received: {data}");
        match ControlMessage::parse(data) {
            Some(ControlMessage::SkipWaiting) => self.skip_waiting().await,
            Some(ControlMessage::ClearCache) => self.clear_caches().await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Deletes every cache generation unconditionally. Returns how many
    /// were deleted.
    ///
    /// # Errors
    ///
    /// Returns any cache error.
    pub async fn clear_caches(&self) -> Result<usize> {
        let mut deleted = 0;
        for name in self.caches.keys().await? {
            if self.caches.delete(&name).await? {
                deleted += 1;
            }
        }
        log::info!("Cleared {deleted} caches");
        Ok(deleted)
    }
}
