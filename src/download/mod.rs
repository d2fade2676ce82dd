//! Gated fetch-and-persist of remote resources.
//!
//! This module owns everything between a URL and a file on disk:
//!
//! - [`RateGate`] bounds concurrent network requests and open output files
//!   (two independent instances)
//! - [`HttpClient`] applies timeouts and the tool User-Agent
//! - [`Persister`] runs [`PersistTask`]s: freshness check, streamed download,
//!   pending-write registration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use picasa_dl_core::download::{HttpClient, PersistTask, Persister, RateGate};
//! use picasa_dl_core::schedule::CompletionBarrier;
//!
//! # async fn example() {
//! let persister = Persister::new(
//!     HttpClient::new(),
//!     Arc::new(RateGate::sized_for_host("network")),
//!     Arc::new(RateGate::sized_for_host("file")),
//!     CompletionBarrier::new("writes"),
//! );
//! let outcome = persister
//!     .run(PersistTask::new(
//!         "https://lh3.example.com/abc/w197-h134-p/",
//!         "img/index/123.jpg",
//!         "2013-04-01T12:30:45.000Z",
//!     ))
//!     .await;
//! println!("{outcome:?}");
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod gate;
mod persist;
mod validate;

pub use client::HttpClient;
pub use error::DownloadError;
pub use gate::{GateError, GatePermit, RateGate, gate_capacity_for, host_parallelism};
pub use persist::{PersistOutcome, PersistTask, Persister, parse_remote_timestamp};
pub use validate::decodes_as_image;

// No module-local Result alias; signatures spell out `Result<T, DownloadError>`.
