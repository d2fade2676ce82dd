//! Collection and item records parsed from the gallery feeds.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};

use crate::download::constants::THUMBNAIL_SIZE_TOKEN;

/// One album from the user's collection feed.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Service-assigned identifier; names the output page and image directory.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Owning user, as reported by the feed.
    pub owner: String,
    /// Number of items the service reports for this collection.
    pub item_count: usize,
    /// Link to the collection's item feed.
    pub feed_link: Option<String>,
    /// Remote last-updated timestamp, kept verbatim for freshness checks.
    pub updated: String,
    /// Remote timestamp in epoch milliseconds.
    pub timestamp_ms: Option<i64>,
    /// Cover image URL.
    pub thumbnail_url: Option<String>,
    thumbnail_base: OnceLock<Option<String>>,
}

impl Collection {
    /// Creates a collection with the given identifier and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Cover URL up to and including its last `/`. Computed once.
    pub fn thumbnail_base(&self) -> Option<&str> {
        self.thumbnail_base
            .get_or_init(|| self.thumbnail_url.as_deref().and_then(media_base))
            .as_deref()
    }

    /// URL of the index-sized cover thumbnail.
    #[must_use]
    pub fn thumbnail_fetch_url(&self) -> Option<String> {
        self.thumbnail_base()
            .map(|base| format!("{base}{THUMBNAIL_SIZE_TOKEN}/"))
    }
}

/// One photo from a collection's item feed.
#[derive(Debug, Clone, Default)]
pub struct Item {
    /// Identifier; derived from the source path when the feed has none.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Remote last-updated timestamp, kept verbatim for freshness checks.
    pub updated: String,
    /// Capture time.
    pub timestamp: Option<DateTime<Utc>>,
    source: String,
    file_name: OnceLock<Option<String>>,
    media_base: OnceLock<Option<String>>,
}

impl Item {
    /// Creates an item from its source URL. The identifier falls back to the
    /// source's directory segment when `id` is empty.
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut id = id.into();
        if id.is_empty() {
            id = parent_segment(&source).unwrap_or_default().to_string();
        }
        Self {
            id,
            source,
            ..Self::default()
        }
    }

    /// Full-size source URL. Fixed at construction so derived fields never
    /// drift from it.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Local file name: the source's directory segment plus the extension
    /// of its last segment, e.g. `.../AbC123/IMG_0001.JPG` → `AbC123.JPG`.
    /// Computed once.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name
            .get_or_init(|| derive_file_name(&self.source))
            .as_deref()
    }

    /// Source URL up to and including its last `/`. Computed once.
    pub fn media_base(&self) -> Option<&str> {
        self.media_base
            .get_or_init(|| media_base(&self.source))
            .as_deref()
    }

    /// URL of the page-sized thumbnail that gets mirrored.
    #[must_use]
    pub fn thumbnail_url(&self) -> Option<String> {
        self.media_base()
            .map(|base| format!("{base}{THUMBNAIL_SIZE_TOKEN}/"))
    }

    /// Remote URL for another rendition, e.g. `s640` or `h196`.
    #[must_use]
    pub fn sized_url(&self, size: &str) -> Option<String> {
        let base = self.media_base()?;
        let name = self.file_name()?;
        Some(format!("{base}{size}/{name}"))
    }
}

fn media_base(url: &str) -> Option<String> {
    url.rfind('/').map(|idx| url[..=idx].to_string())
}

fn parent_segment(url: &str) -> Option<&str> {
    let mut segments = url.rsplit('/');
    segments.next()?;
    segments.next().filter(|s| !s.is_empty())
}

fn derive_file_name(url: &str) -> Option<String> {
    let last = url.rsplit('/').next()?;
    let extension = last.split('.').nth(1).filter(|ext| !ext.is_empty())?;
    let parent = parent_segment(url)?;
    Some(format!("{parent}.{extension}"))
}
