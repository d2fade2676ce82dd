//! Output paths under the destination directory.
//!
//! ```text
//! <dest>/
//! ├── index.html                 # redirect to html/index.html
//! ├── bootstrap.min.css
//! ├── html/
//! │   ├── index.html             # collection grid
//! │   └── <collectionId>.html    # item grid
//! └── img/
//!     ├── index/<collectionId>.jpg
//!     └── <collectionId>/<itemFile>
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name of the mirrored stylesheet, relative to the destination root.
pub const STYLESHEET_FILE: &str = "bootstrap.min.css";

/// Errors from mapping feed values onto output paths.
#[derive(Debug, Error)]
pub enum SiteError {
    /// A feed value would escape its directory or is empty.
    #[error("unsafe path segment {segment:?}")]
    UnsafeSegment {
        /// The rejected value.
        segment: String,
    },
}

/// Returns `segment` when it is usable as a single path component.
///
/// # Errors
///
/// Returns [`SiteError::UnsafeSegment`] for empty values, `.`/`..`, and
/// anything containing a path separator or NUL.
pub fn safe_segment(segment: &str) -> Result<&str, SiteError> {
    let unsafe_segment = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if unsafe_segment {
        return Err(SiteError::UnsafeSegment {
            segment: segment.to_string(),
        });
    }
    Ok(segment)
}

/// Path helpers rooted at the destination directory.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    root: PathBuf,
}

impl SiteLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The destination directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `index.html` at the root, redirecting into `html/`.
    #[must_use]
    pub fn redirect_page(&self) -> PathBuf {
        self.root.join("index.html")
    }

    /// The mirrored stylesheet.
    #[must_use]
    pub fn stylesheet(&self) -> PathBuf {
        self.root.join(STYLESHEET_FILE)
    }

    /// `html/index.html`.
    #[must_use]
    pub fn index_page(&self) -> PathBuf {
        self.root.join("html").join("index.html")
    }

    /// `html/<collectionId>.html`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::UnsafeSegment`] for an unusable identifier.
    pub fn collection_page(&self, collection_id: &str) -> Result<PathBuf, SiteError> {
        let id = safe_segment(collection_id)?;
        Ok(self.root.join("html").join(format!("{id}.html")))
    }

    /// `img/index/<collectionId>.jpg`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::UnsafeSegment`] for an unusable identifier.
    pub fn collection_thumbnail(&self, collection_id: &str) -> Result<PathBuf, SiteError> {
        let id = safe_segment(collection_id)?;
        Ok(self.root.join("img").join("index").join(format!("{id}.jpg")))
    }

    /// `img/<collectionId>/<itemFile>`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::UnsafeSegment`] if either value is unusable.
    pub fn item_image(&self, collection_id: &str, file_name: &str) -> Result<PathBuf, SiteError> {
        let id = safe_segment(collection_id)?;
        let file = safe_segment(file_name)?;
        Ok(self.root.join("img").join(id).join(file))
    }
}
