//! Counting admission gates for network and file I/O.
//!
//! A [`RateGate`] bounds how many operations of one class run at once. Two
//! independent gates exist per process: one for outbound HTTP requests and one
//! for open output files. Both are sized from hardware parallelism and capped
//! at [`MAX_GATE_CAPACITY`] so a large fan-out cannot overwhelm the remote
//! service or the local file descriptor limit.
//!
//! # Example
//!
//! ```
//! use picasa_dl_core::download::RateGate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = RateGate::new("network", 2)?;
//! let permit = gate.acquire().await?;
//! assert_eq!(gate.in_use(), 1);
//! drop(permit);
//! assert_eq!(gate.in_use(), 0);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, trace};

use super::constants::{GATE_PERMITS_PER_CPU, MAX_GATE_CAPACITY};
use super::error::DownloadError;

/// Error returned when constructing a gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// A gate must admit at least one operation.
    #[error("{gate} gate capacity must be at least 1")]
    ZeroCapacity {
        /// Name of the gate.
        gate: &'static str,
    },
}

/// Fixed-capacity permit pool.
///
/// `RateGate` is `Send + Sync`; wrap it in `Arc` to share across tasks.
/// Permits are RAII values: dropping a [`GatePermit`] returns its slot, so a
/// permit is released exactly once on success, error and panic paths alike.
#[derive(Debug)]
pub struct RateGate {
    name: &'static str,
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot in a [`RateGate`]. Released on drop.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

/// Computes gate capacity for a host with `parallelism` hardware threads.
///
/// `min(MAX_GATE_CAPACITY, parallelism * 2 * 2)`, never less than 1.
#[must_use]
pub fn gate_capacity_for(parallelism: usize) -> usize {
    parallelism
        .saturating_mul(GATE_PERMITS_PER_CPU)
        .clamp(1, MAX_GATE_CAPACITY)
}

/// Returns the host's available parallelism, falling back to 1.
#[must_use]
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

impl RateGate {
    /// Creates a gate admitting at most `capacity` concurrent holders.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ZeroCapacity`] when `capacity` is 0.
    #[instrument(level = "debug")]
    pub fn new(name: &'static str, capacity: usize) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(GateError::ZeroCapacity { gate: name });
        }
        debug!(gate = name, capacity, "creating rate gate");
        Ok(Self {
            name,
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Creates a gate sized for the current host.
    #[must_use]
    pub fn sized_for_host(name: &'static str) -> Self {
        let capacity = gate_capacity_for(host_parallelism());
        debug!(gate = name, capacity, "creating host-sized rate gate");
        Self {
            name,
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot and returns a permit holding it.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::GateClosed`] if the underlying semaphore was
    /// closed. Gates are never closed by this crate, so this indicates a bug.
    pub async fn acquire(&self) -> Result<GatePermit, DownloadError> {
        trace!(gate = self.name, available = self.available(), "acquiring permit");
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DownloadError::GateClosed { gate: self.name })?;
        Ok(GatePermit { _permit: permit })
    }

    /// Returns the gate's name, used in log fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Returns the number of held slots.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}
