//! Unit scheduling and drain tracking.
//!
//! - [`Scheduler`] admits and spawns units of work with adaptive backoff
//! - [`CompletionBarrier`] is the counted join behind both the scheduler's
//!   unit tracking and the process-wide pending-write registry
//! - [`RunStats`] counts per-run outcomes

mod barrier;
mod scheduler;
mod stats;

pub use barrier::{BarrierGuard, CompletionBarrier};
pub use scheduler::{
    DEFAULT_CAP_ESCAPE_ODDS, DEFAULT_IN_FLIGHT_CEILING, DEFAULT_SAMPLE_EVERY, INITIAL_BACKOFF,
    MAX_BACKOFF, Scheduler, SchedulerConfig, Sleeper, ThrottleState, TokioSleeper, next_backoff,
};
pub use stats::RunStats;
