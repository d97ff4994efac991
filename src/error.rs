//! Error types for the proshield-offline library.

use thiserror::Error;

/// Errors that can occur in the offline queue or the cache worker.
#[derive(Error, Debug)]
pub enum Error {
    /// The persistent key-value store could not be read or written.
    #[error("Storage unavailable: {0}")]
    Storage(String),

    /// Queue contents could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A network fetch failed before a response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A precache asset could not be fetched or stored during install.
    #[error("Failed to precache {url}: {reason}")]
    Install {
        /// URL of the asset that failed.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// Network failed and nothing usable was cached for the request.
    #[error("No cached response for {url}")]
    CacheMiss {
        /// URL of the unresolved request.
        url: String,
    },

    /// A lifecycle step was requested from the wrong worker state.
    #[error("Invalid worker state: expected {expected}, got {actual}")]
    InvalidState {
        /// State the step requires.
        expected: &'static str,
        /// State the worker was in.
        actual: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for failures caused by losing connectivity.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http(_))
    }
}

/// A specialized `Result` type for proshield-offline operations.
pub type Result<T> = std::result::Result<T, Error>;
