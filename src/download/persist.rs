//! Fetch-and-persist: conditionally download one resource to one file.
//!
//! A [`PersistTask`] names a source URL, a destination path and the remote
//! last-updated timestamp. [`Persister::run`] skips the download when the
//! destination is already fresh, otherwise streams the body to disk under the
//! network gate, the file gate and a pending-write registration.
//!
//! Failures are logged and folded into a [`PersistOutcome`]; nothing is
//! retried and no error escapes the task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use super::client::HttpClient;
use super::constants::REMOTE_TIMESTAMP_FORMAT;
use super::error::DownloadError;
use super::gate::RateGate;
use super::validate;
use crate::schedule::CompletionBarrier;

/// One resource to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistTask {
    /// Source URL.
    pub url: String,
    /// Output file.
    pub dest: PathBuf,
    /// Remote last-updated timestamp, `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub updated: String,
    /// Whether the destination holds an image. Only image destinations are
    /// decoded when the persister validates images.
    pub image: bool,
}

impl PersistTask {
    /// Creates a task for an image resource.
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>, updated: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            updated: updated.into(),
            image: true,
        }
    }

    /// Creates a task for a resource that is not an image, such as a
    /// stylesheet. Freshness never depends on decoding it.
    pub fn non_image(
        url: impl Into<String>,
        dest: impl Into<PathBuf>,
        updated: impl Into<String>,
    ) -> Self {
        Self {
            image: false,
            ..Self::new(url, dest, updated)
        }
    }
}

/// Terminal state of a [`PersistTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The destination was already up to date; no request was made.
    Fresh,
    /// The resource was downloaded and written.
    Fetched {
        /// Bytes written to the destination.
        bytes: u64,
    },
    /// A network, status or filesystem error ended the task.
    Failed,
    /// The pending-write registry refused the write during shutdown.
    Cancelled,
}

/// Parses a remote timestamp. Anything unparseable maps to the earliest
/// representable instant, so every non-empty local file counts as newer.
#[must_use]
pub fn parse_remote_timestamp(updated: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(updated, REMOTE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Runs fetch-and-persist tasks and page writes against shared gates.
///
/// Cheap to clone; clones share the client pool, both gates and the
/// pending-write registry.
#[derive(Debug, Clone)]
pub struct Persister {
    client: HttpClient,
    network: Arc<RateGate>,
    files: Arc<RateGate>,
    writes: CompletionBarrier,
    validate_images: bool,
}

impl Persister {
    /// Creates a persister over the given client, gates and write registry.
    #[must_use]
    pub fn new(
        client: HttpClient,
        network: Arc<RateGate>,
        files: Arc<RateGate>,
        writes: CompletionBarrier,
    ) -> Self {
        Self {
            client,
            network,
            files,
            writes,
            validate_images: false,
        }
    }

    /// Also requires existing files to decode as images before they count as fresh.
    #[must_use]
    pub fn with_image_validation(mut self, enabled: bool) -> Self {
        self.validate_images = enabled;
        self
    }

    /// The gate bounding concurrent HTTP requests.
    #[must_use]
    pub fn network_gate(&self) -> &Arc<RateGate> {
        &self.network
    }

    /// The gate bounding concurrently open output files.
    #[must_use]
    pub fn file_gate(&self) -> &Arc<RateGate> {
        &self.files
    }

    /// The process-wide pending-write registry.
    #[must_use]
    pub fn writes(&self) -> &CompletionBarrier {
        &self.writes
    }

    /// Runs one task to a terminal outcome.
    #[instrument(level = "debug", skip(self, task), fields(url = %task.url, dest = %task.dest.display()))]
    pub async fn run(&self, task: PersistTask) -> PersistOutcome {
        if self.task_is_fresh(&task).await {
            debug!("destination is fresh, skipping");
            return PersistOutcome::Fresh;
        }

        match self.fetch_to_file(&task).await {
            Ok(bytes) => {
                debug!(bytes, "resource written");
                PersistOutcome::Fetched { bytes }
            }
            Err(e) if e.is_shutdown() => {
                debug!("write refused during shutdown");
                PersistOutcome::Cancelled
            }
            Err(e) => {
                warn!(url = %task.url, error = %e, "fetch failed");
                PersistOutcome::Failed
            }
        }
    }

    /// Returns true when `path` exists, is non-empty and was modified strictly
    /// after `updated`. With image validation on, the file must also decode.
    pub async fn is_fresh(&self, path: &Path, updated: &str) -> bool {
        if !newer_than_remote(path, updated).await {
            return false;
        }
        if self.validate_images {
            return validate::decodes_as_image(path).await;
        }
        true
    }

    async fn task_is_fresh(&self, task: &PersistTask) -> bool {
        if task.image {
            self.is_fresh(&task.dest, &task.updated).await
        } else {
            newer_than_remote(&task.dest, &task.updated).await
        }
    }

    /// Fetches a feed document as text under the network gate.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the gate is closed or the request fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let _permit = self.network.acquire().await?;
        self.client.get_text(url).await
    }

    /// Writes `contents` to `path` under the file gate and a pending-write
    /// registration, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ShuttingDown`] if the registry is closed, or an
    /// IO error if the directory or file cannot be written.
    pub async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<u64, DownloadError> {
        ensure_parent_dir(path).await?;
        let _file_permit = self.files.acquire().await?;
        let Some(_registration) = self.writes.try_register() else {
            return Err(DownloadError::shutting_down(path));
        };

        tokio::fs::write(path, contents)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        Ok(contents.len() as u64)
    }

    async fn fetch_to_file(&self, task: &PersistTask) -> Result<u64, DownloadError> {
        ensure_parent_dir(&task.dest).await?;

        let network_permit = self.network.acquire().await?;
        let response = self.client.get(&task.url).await?;

        let _file_permit = self.files.acquire().await?;
        let Some(_registration) = self.writes.try_register() else {
            return Err(DownloadError::shutting_down(&task.dest));
        };

        let mut file = File::create(&task.dest)
            .await
            .map_err(|e| DownloadError::io(&task.dest, e))?;
        let streamed = stream_to_file(&mut file, response, &task.url, &task.dest).await;
        drop(network_permit);

        let closed = file
            .sync_all()
            .await
            .map_err(|e| DownloadError::io(&task.dest, e));
        drop(file);

        if streamed.is_err() || closed.is_err() {
            debug!(path = %task.dest.display(), "removing partial file after error");
            let _ = tokio::fs::remove_file(&task.dest).await;
        }
        let bytes = streamed?;
        closed?;
        Ok(bytes)
    }
}

/// True when `path` is a non-empty file modified strictly after `updated`.
async fn newer_than_remote(path: &Path, updated: &str) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    if !metadata.is_file() || metadata.len() == 0 {
        return false;
    }
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    let local: DateTime<Utc> = modified.into();
    local > parse_remote_timestamp(updated)
}

async fn ensure_parent_dir(path: &Path) -> Result<(), DownloadError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(super::constants::DIR_MODE);
    builder
        .create(parent)
        .await
        .map_err(|e| DownloadError::io(parent, e))
}

async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
