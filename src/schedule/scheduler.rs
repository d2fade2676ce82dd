//! Unit scheduler with adaptive backoff.
//!
//! Rate gates bound how much network and file I/O happens at once, but not how
//! many units of work get spawned. A run over a large account would otherwise
//! create thousands of tasks parked on the gates. The [`Scheduler`] applies a
//! cheap admission heuristic before every spawn:
//!
//! - [`ThrottleState::Normal`]: roughly one spawn in `sample_every` samples the
//!   in-flight unit count. Above `ceiling`, diagnostics are logged and the
//!   scheduler switches to `Throttled`.
//! - [`ThrottleState::Throttled`]: the next spawn first waits, sleeping with
//!   exponential backoff ([`next_backoff`]) until the in-flight count drops
//!   below `ceiling`, then switches back to `Normal`. Once the backoff hits its
//!   cap, each round may give up waiting at random so a stuck unit cannot stall
//!   the run forever.
//!
//! It is an admission heuristic, not an exact limiter.
//!
//! Every spawned unit is registered with the scheduler's unit barrier before
//! it starts; [`Scheduler::drain`] waits for all of them.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, trace};

use super::barrier::CompletionBarrier;
use crate::download::RateGate;

/// Default in-flight unit ceiling.
pub const DEFAULT_IN_FLIGHT_CEILING: usize = 100;

/// Default sampling rate: one spawn in this many checks the in-flight count.
pub const DEFAULT_SAMPLE_EVERY: u32 = 10;

/// First backoff sleep once throttled.
pub const INITIAL_BACKOFF: Duration = Duration::from_micros(128);

/// Backoff cap.
pub const MAX_BACKOFF: Duration = Duration::from_micros(8192);

/// Default odds (1 in N) of giving up the wait per round once at the cap.
pub const DEFAULT_CAP_ESCAPE_ODDS: u32 = 16;

/// Sleep abstraction so backoff can be observed without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Admission mode of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    /// Spawns proceed immediately; the in-flight count is sampled.
    Normal,
    /// The next spawn waits for the in-flight count to drop below the ceiling.
    Throttled,
}

/// Tuning for the admission heuristic.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// In-flight unit count above which the scheduler throttles.
    pub ceiling: usize,
    /// One spawn in `sample_every` samples the in-flight count (1 = every spawn).
    pub sample_every: u32,
    /// First backoff sleep once throttled.
    pub initial_backoff: Duration,
    /// Backoff cap.
    pub max_backoff: Duration,
    /// Once at the cap, each round stops waiting with odds 1 in `cap_escape_odds`.
    pub cap_escape_odds: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_IN_FLIGHT_CEILING,
            sample_every: DEFAULT_SAMPLE_EVERY,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
            cap_escape_odds: DEFAULT_CAP_ESCAPE_ODDS,
        }
    }
}

impl SchedulerConfig {
    /// Default tuning with a custom in-flight ceiling.
    #[must_use]
    pub fn with_ceiling(ceiling: usize) -> Self {
        Self {
            ceiling,
            ..Self::default()
        }
    }
}

/// Returns the backoff to use after sleeping `current`: doubled, capped at `cap`.
#[must_use]
pub fn next_backoff(current: Duration, cap: Duration) -> Duration {
    if current.is_zero() {
        return INITIAL_BACKOFF.min(cap);
    }
    current.saturating_mul(2).min(cap)
}

fn roll(odds: u32) -> bool {
    rand::thread_rng().gen_ratio(1, odds.max(1))
}

/// Spawns units of work and tracks them until they finish.
///
/// One scheduler exists per run; nothing is shared between runs except what
/// the caller passes in explicitly.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    units: CompletionBarrier,
    state: Mutex<ThrottleState>,
    spawned: AtomicUsize,
    sleeper: Arc<dyn Sleeper>,
    observed_gates: Vec<Arc<RateGate>>,
    observed_writes: Option<CompletionBarrier>,
}

impl Scheduler {
    /// Creates a scheduler using real sleeps.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            units: CompletionBarrier::new("units"),
            state: Mutex::new(ThrottleState::Normal),
            spawned: AtomicUsize::new(0),
            sleeper: Arc::new(TokioSleeper),
            observed_gates: Vec::new(),
            observed_writes: None,
        }
    }

    /// Replaces the sleeper used while throttled.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Includes a gate's occupancy in throttle diagnostics.
    #[must_use]
    pub fn observe_gate(mut self, gate: Arc<RateGate>) -> Self {
        self.observed_gates.push(gate);
        self
    }

    /// Includes the pending-write count in throttle diagnostics.
    #[must_use]
    pub fn observe_writes(mut self, writes: CompletionBarrier) -> Self {
        self.observed_writes = Some(writes);
        self
    }

    /// Returns the current admission mode.
    #[must_use]
    pub fn state(&self) -> ThrottleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ThrottleState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Returns the number of spawned units that have not finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.units.outstanding()
    }

    /// Returns the number of units spawned so far.
    #[must_use]
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Returns the configured tuning.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Admits and spawns one unit of work.
    ///
    /// May wait first when throttled. The unit is registered with the unit
    /// barrier before it starts and deregistered when it finishes, including
    /// when it panics. The unit's own failures never reach the scheduler.
    pub async fn spawn<F>(&self, unit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.admit().await;
        let guard = self.units.register();
        self.spawned.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let _guard = guard;
            unit.await;
        });
    }

    /// Waits for every spawned unit, including units spawned while waiting.
    pub async fn drain(&self) {
        debug!(in_flight = self.in_flight(), spawned = self.spawned(), "draining scheduler");
        self.units.wait().await;
    }

    async fn admit(&self) {
        if self.state() == ThrottleState::Throttled {
            self.wait_below_ceiling().await;
            self.set_state(ThrottleState::Normal);
            return;
        }

        if !roll(self.config.sample_every) {
            return;
        }

        let in_flight = self.in_flight();
        trace!(in_flight, "sampled in-flight units");
        if in_flight > self.config.ceiling {
            self.log_pressure(in_flight);
            self.set_state(ThrottleState::Throttled);
        }
    }

    async fn wait_below_ceiling(&self) {
        let mut backoff = self.config.initial_backoff;
        loop {
            let in_flight = self.in_flight();
            if in_flight < self.config.ceiling {
                debug!(in_flight, "in-flight units below ceiling, resuming");
                return;
            }
            if backoff >= self.config.max_backoff && roll(self.config.cap_escape_odds) {
                debug!(in_flight, "backoff at cap, spawning anyway");
                return;
            }
            trace!(in_flight, backoff_us = backoff.as_micros(), "throttled");
            self.sleeper.sleep(backoff).await;
            backoff = next_backoff(backoff, self.config.max_backoff);
        }
    }

    fn log_pressure(&self, in_flight: usize) {
        let gates = self
            .observed_gates
            .iter()
            .map(|gate| format!("{}={}/{}", gate.name(), gate.in_use(), gate.capacity()))
            .collect::<Vec<_>>()
            .join(" ");
        let pending_writes = self
            .observed_writes
            .as_ref()
            .map_or(0, CompletionBarrier::outstanding);
        debug!(
            in_flight,
            ceiling = self.config.ceiling,
            spawned = self.spawned(),
            pending_writes,
            gates = %gates,
            "in-flight ceiling exceeded, throttling"
        );
    }
}
