//! Constants for the download module (timeouts, gate sizing, thumbnail size).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Upper bound on permits for either rate gate.
pub const MAX_GATE_CAPACITY: usize = 8;

/// Permits granted per unit of hardware parallelism before the cap applies.
pub const GATE_PERMITS_PER_CPU: usize = 2 * 2;

/// Size token inserted into media base URLs to request index thumbnails.
pub const THUMBNAIL_SIZE_TOKEN: &str = "w197-h134-p";

/// Layout of the remote "updated" timestamps, e.g. `2013-04-01T12:30:45.000Z`.
pub const REMOTE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Unix permission bits for created directories.
#[cfg(unix)]
pub const DIR_MODE: u32 = 0o755;
