//! Optional decode check for files that already pass the timestamp test.

use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::debug;

/// Returns true when the file at `path` decodes as an image.
///
/// Decoding is CPU-bound, so it runs on the blocking pool. The format is
/// sniffed from the content rather than trusted from the extension.
pub async fn decodes_as_image(path: &Path) -> bool {
    let owned: PathBuf = path.to_path_buf();
    match tokio::task::spawn_blocking(move || decode(&owned)).await {
        Ok(Ok(())) => true,
        Ok(Err(reason)) => {
            debug!(path = %path.display(), %reason, "existing file does not decode");
            false
        }
        Err(join_error) => {
            debug!(path = %path.display(), error = %join_error, "decode check aborted");
            false
        }
    }
}

fn decode(path: &Path) -> Result<(), String> {
    ImageReader::open(path)
        .map_err(|e| e.to_string())?
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .decode()
        .map(|_| ())
        .map_err(|e| e.to_string())
}
