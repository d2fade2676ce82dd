//! Error types for feed retrieval and parsing.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors that can occur while fetching or reading a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed could not be fetched.
    #[error("failed to fetch feed {url}: {source}")]
    Fetch {
        /// Feed URL.
        url: String,
        /// The underlying download error.
        #[source]
        source: DownloadError,
    },

    /// The document stopped being well-formed XML.
    #[error("malformed XML at byte {position}: {message}")]
    Malformed {
        /// Byte offset where the reader gave up.
        position: u64,
        /// Reader error text.
        message: String,
    },
}

impl FeedError {
    /// Creates a fetch error for the given feed URL.
    pub fn fetch(url: impl Into<String>, source: DownloadError) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }

    /// Creates a malformed-document error.
    pub fn malformed(position: u64, error: impl std::fmt::Display) -> Self {
        Self::Malformed {
            position,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_names_url() {
        let err = FeedError::fetch(
            "https://example.com/feed",
            DownloadError::http_status("https://example.com/feed", 503),
        );
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/feed"), "got: {msg}");
        assert!(msg.contains("503"), "got: {msg}");
    }

    #[test]
    fn test_malformed_display() {
        let err = FeedError::malformed(17, "mismatched end tag");
        assert_eq!(
            err.to_string(),
            "malformed XML at byte 17: mismatched end tag"
        );
    }
}
