//! Replaying queued offline reports once connectivity returns.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::queue::{OfflineQueue, QueuedReport};
use crate::storage::KeyValueStore;

/// Abstraction over submitting one report to the server.
#[async_trait]
pub trait ReportUploader: Send + Sync {
    /// Uploads a report payload.
    async fn upload(&self, report: &Value) -> Result<()>;
}

/// Uploader posting JSON to the reports endpoint.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpUploader {
    /// Creates an uploader posting to `path` on `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub fn new(origin: &str, path: &str) -> Result<Self> {
        let endpoint = reqwest::Url::parse(origin)
            .and_then(|o| o.join(path))
            .map_err(|e| Error::Network(format!("{origin}{path}: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl ReportUploader for HttpUploader {
    async fn upload(&self, report: &Value) -> Result<()> {
        self.client
            .post(self.endpoint.clone())
            .json(report)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Outcome of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncSummary {
    /// Reports uploaded and removed from the queue.
    pub uploaded: usize,
    /// Reports still queued.
    pub remaining: usize,
}

/// Uploads queued reports oldest first, removing each one once accepted.
///
/// A failure stops the pass and leaves that report and everything after it
/// queued for the next attempt. Nothing is retried here.
///
/// # Errors
///
/// Returns an error only if the queue itself cannot be read or written.
pub async fn sync_pending<S, U>(queue: &OfflineQueue<S>, uploader: &U) -> Result<SyncSummary>
where
    S: KeyValueStore,
    U: ReportUploader + ?Sized,
{
    let pending: Vec<QueuedReport> = queue.list()?;
    let mut summary = SyncSummary {
        uploaded: 0,
        remaining: pending.len(),
    };

    for report in pending {
        if let Err(e) = uploader.upload(&report.payload()).await {
            log::warn!("Sync stopped at report {}: {e}", report.offline_id);
            break;
        }
        queue.remove(report.offline_id)?;
        summary.uploaded += 1;
        summary.remaining -= 1;
    }

    log::info!(
        "Synced {} offline reports, {} remaining",
        summary.uploaded,
        summary.remaining
    );
    Ok(summary)
}
