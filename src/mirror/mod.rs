//! One mirror run: collection feed, item feeds, images and pages.
//!
//! [`Mirror::run_once`] walks the user's collection feed, schedules one
//! fetch-and-persist unit per thumbnail, renders the index and one page per
//! collection, then waits for every unit it spawned.

mod orchestrator;

pub use orchestrator::Mirror;

use crate::schedule::SchedulerConfig;

/// Default collection feed prefix; the user ID is appended.
pub const DEFAULT_FEED_BASE_URL: &str = "https://picasaweb.google.com/data/feed/api/user/";

/// Default user mirrored when none is given.
pub const DEFAULT_USER_ID: &str = "sample.user";

/// Bootstrap release the pages are styled against.
pub const STYLESHEET_VERSION: &str = "3.0.1";

/// Default stylesheet source.
#[must_use]
pub fn default_stylesheet_url() -> String {
    format!(
        "https://github.com/twbs/bootstrap/raw/v{STYLESHEET_VERSION}/dist/css/bootstrap.min.css"
    )
}

/// What to mirror and how hard to push.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Account whose collections are mirrored.
    pub user_id: String,
    /// Collection feed prefix; `user_id` is appended verbatim.
    pub feed_base_url: String,
    /// Stylesheet to mirror next to the pages; `None` skips it.
    pub stylesheet_url: Option<String>,
    /// Admission tuning for spawned units.
    pub scheduler: SchedulerConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            stylesheet_url: Some(default_stylesheet_url()),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl MirrorConfig {
    /// URL of the user's collection feed.
    #[must_use]
    pub fn collection_feed_url(&self) -> String {
        format!("{}{}", self.feed_base_url, self.user_id)
    }
}
