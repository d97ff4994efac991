//! proshield-offline - offline support for the Proshield reports app.
//!
//! Two halves that never share state directly:
//!
//! - the page side: an [`OfflineQueue`] of reports created without
//!   connectivity, replayed later with [`sync_pending`], plus small
//!   formatting helpers;
//! - the worker side: a [`CacheWorker`] that precaches assets into a
//!   versioned generation, evicts stale generations on activation, and
//!   answers each request cache-first or network-first.
//!
//! Browser facilities sit behind traits ([`KeyValueStore`], [`CacheStorage`],
//! [`Network`], [`Clients`]) so the policy runs anywhere.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use proshield_offline::{
//!     CacheWorker, ExtendableEvent, FetchOutcome, HttpNetwork, MemoryCacheStorage,
//!     MemoryClients, Request, WorkerConfig,
//! };
//!
//! # async fn example() -> proshield_offline::Result<()> {
//! let origin = "https://reports.example";
//! let worker = CacheWorker::new(
//!     WorkerConfig::default().with_origin(origin),
//!     Arc::new(MemoryCacheStorage::new()),
//!     Arc::new(HttpNetwork::new(origin)?),
//!     Arc::new(MemoryClients::new()),
//! );
//! worker.install().await?;
//!
//! let event = ExtendableEvent::new();
//! if let FetchOutcome::Respond(response) =
//!     worker.handle_fetch(&Request::get("/static/js/app.js"), &event).await?
//! {
//!     println!("{} bytes", response.body.len());
//! }
//! event.settled().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cache;
pub mod clients;
pub mod config;
pub mod connectivity;
pub mod debounce;
pub mod error;
pub mod format;
pub mod http;
pub mod lifecycle;
pub mod message;
pub mod network;
pub mod queue;
pub mod storage;
pub mod sync;
pub mod worker;

// Re-export main types for convenience
pub use cache::{CacheStorage, MemoryCacheStorage};
pub use clients::{ClientId, ClientInfo, Clients, MemoryClients, NotificationOptions};
pub use config::{AppConfig, NotificationDefaults, QueueConfig, WorkerConfig};
pub use connectivity::{ConnectivityMonitor, StatusUpdate};
pub use debounce::Debouncer;
pub use error::{Error, Result};
pub use format::{
    escape_html, file_extension, fit_width, format_date, format_file_size, format_number,
    is_image_file, is_pdf_file, validate_email, validate_required,
};
pub use http::{Request, Response};
pub use lifecycle::{ExtendableEvent, WorkerState};
pub use message::{ControlMessage, PageMessage};
pub use network::{HttpNetwork, Network};
pub use queue::{OfflineQueue, QueuedReport};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use sync::{HttpUploader, ReportUploader, SyncSummary, sync_pending};
pub use worker::{CacheWorker, FetchOutcome, Strategy};
