//! Offline queue of reports created while the network was unavailable.
//!
//! The whole queue lives under a single storage key as a JSON array, in
//! insertion order. Each entry is the caller's report object with an
//! `offlineId` field added: a millisecond timestamp that also serves as the
//! entry's identifier.
//!
//! There is no cross-process locking. Two writers sharing one store can race
//! and the last write wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;

/// Default storage key for the queue.
pub const REPORTS_KEY: &str = "offlineReports";

/// A report waiting to be synced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedReport {
    /// Identifier assigned when the report was queued.
    #[serde(rename = "offlineId")]
    pub offline_id: i64,
    /// Caller-defined report fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl QueuedReport {
    /// Returns the report fields as a JSON object, without the queue identifier.
    #[must_use]
    pub fn payload(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// Ordered, persistent queue of offline reports.
pub struct OfflineQueue<S: KeyValueStore> {
    store: S,
    key: String,
    clock: Clock,
}

impl<S: KeyValueStore> OfflineQueue<S> {
    /// Creates a queue over `store` using the default key.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_key(store, REPORTS_KEY)
    }

    /// Creates a queue over `store` under a custom key.
    #[must_use]
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            clock: Box::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Replaces the millisecond clock used for identifiers.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Appends a report and persists the queue, returning its identifier.
    ///
    /// Identifiers are the current time in milliseconds, bumped past the last
    /// queued identifier when the clock has not advanced.
    ///
    /// # Errors
    ///
    /// Returns an error if the report is not a JSON object, the last queued
    /// identifier is already `i64::MAX`, or the store cannot be written. In
    /// that case the report is not queued.
    pub fn save<T: Serialize>(&self, report: &T) -> Result<i64> {
        let Value::Object(mut fields) = serde_json::to_value(report)? else {
            return Err(Error::Serialization(serde::ser::Error::custom(
                "queued report must be a JSON object",
            )));
        };
        fields.remove("offlineId");

        let mut reports = self.list()?;
        let now = (self.clock)();
        let offline_id = match reports.last() {
            None => now,
            Some(last) => {
                let next = last.offline_id.checked_add(1).ok_or_else(|| {
                    Error::Storage(format!("no identifier left after {}", last.offline_id))
                })?;
                now.max(next)
            }
        };

        reports.push(QueuedReport { offline_id, fields });
        self.persist(&reports)?;
        log::debug!("Queued offline report {offline_id} ({} pending)", reports.len());
        Ok(offline_id)
    }

    /// Returns all queued reports in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or holds malformed data.
    pub fn list(&self) -> Result<Vec<QueuedReport>> {
        match self.store.get_item(&self.key)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Returns the report with the given identifier, if queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get(&self, offline_id: i64) -> Result<Option<QueuedReport>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|r| r.offline_id == offline_id))
    }

    /// Removes the report with the given identifier. Unknown identifiers are
    /// ignored and leave the stored queue untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn remove(&self, offline_id: i64) -> Result<()> {
        let mut reports = self.list()?;
        let before = reports.len();
        reports.retain(|r| r.offline_id != offline_id);
        if reports.len() != before {
            self.persist(&reports)?;
        }
        Ok(())
    }

    /// Deletes the entire queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(&self.key)
    }

    /// Returns the number of queued reports.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    fn persist(&self, reports: &[QueuedReport]) -> Result<()> {
        let json = serde_json::to_string(reports)?;
        self.store.set_item(&self.key, &json)
    }
}
