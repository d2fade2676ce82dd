//! Error types for the download module.
//!
//! These errors never leave a fetch-and-persist task: the task logs them and
//! reports a [`PersistOutcome`](super::PersistOutcome) instead. They are
//! public so page writers and feed fetches can surface them to their callers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching or persisting a resource.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error (create directory, open, write, close).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A rate gate refused to hand out a permit.
    #[error("{gate} gate closed")]
    GateClosed {
        /// Name of the gate.
        gate: &'static str,
    },

    /// The pending-write registry is closed because the process is shutting down.
    #[error("shutting down, refusing to open {path}")]
    ShuttingDown {
        /// The file that would have been written.
        path: PathBuf,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a shutdown refusal for the given output path.
    pub fn shutting_down(path: impl Into<PathBuf>) -> Self {
        Self::ShuttingDown { path: path.into() }
    }

    /// Returns true when the error means the write was refused during shutdown.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::ShuttingDown { .. })
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path the source error lacks, so callers use the constructors above.
