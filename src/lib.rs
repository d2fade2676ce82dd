//! picasa-dl core library
//!
//! Mirrors a photo-gallery account into a static site: the user's albums are
//! fetched from the collection feed, every album's item feed is walked,
//! thumbnails are downloaded and a small set of cross-linked HTML pages is
//! rendered next to them.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Rate gates, HTTP client and the fetch-and-persist task
//! - [`schedule`] - Unit scheduler with adaptive backoff and completion barriers
//! - [`feed`] - Collection and item records parsed from Atom/GData XML
//! - [`site`] - Output layout and HTML rendering
//! - [`mirror`] - The orchestrator tying one run together
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use picasa_dl_core::download::{HttpClient, Persister, RateGate};
//! use picasa_dl_core::mirror::{Mirror, MirrorConfig};
//! use picasa_dl_core::schedule::CompletionBarrier;
//! use picasa_dl_core::site::SiteLayout;
//!
//! # async fn example() {
//! let writes = CompletionBarrier::new("writes");
//! let persister = Persister::new(
//!     HttpClient::new(),
//!     Arc::new(RateGate::sized_for_host("network")),
//!     Arc::new(RateGate::sized_for_host("file")),
//!     writes.clone(),
//! );
//! let mirror = Mirror::new(MirrorConfig::default(), persister, SiteLayout::new("./gallery"));
//! let stats = mirror.run_once().await;
//! println!("{} fetched, {} fresh", stats.fetched(), stats.fresh());
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod feed;
pub mod mirror;
pub mod schedule;
pub mod site;
mod user_agent;

// Re-export commonly used types
pub use download::{
    DownloadError, HttpClient, PersistOutcome, PersistTask, Persister, RateGate,
};
pub use feed::{Collection, FeedError, Item};
pub use mirror::{Mirror, MirrorConfig};
pub use schedule::{CompletionBarrier, RunStats, Scheduler, SchedulerConfig};
pub use site::SiteLayout;
