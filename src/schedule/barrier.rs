//! Counted join used to hold the process open until work drains.
//!
//! A [`CompletionBarrier`] counts outstanding registrations. Each
//! [`register`](CompletionBarrier::register) returns a [`BarrierGuard`]; the
//! count drops when the guard is dropped, whether the work succeeded, failed
//! or panicked. [`wait`](CompletionBarrier::wait) resolves once the count is
//! zero. Completion order does not matter.
//!
//! The same type serves as the per-run unit barrier and as the process-wide
//! pending-write registry. The registry is additionally
//! [closed](CompletionBarrier::close) on interrupt so no new file is opened
//! while the process drains.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default)]
struct BarrierState {
    outstanding: usize,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    name: &'static str,
    state: watch::Sender<BarrierState>,
}

/// Counted join primitive. Cheap to clone; clones share the same count.
#[derive(Debug, Clone)]
pub struct CompletionBarrier {
    shared: Arc<Shared>,
}

/// Registration handle. Dropping it marks the registered work as done.
#[derive(Debug)]
#[must_use = "dropping the guard immediately marks the work as done"]
pub struct BarrierGuard {
    shared: Arc<Shared>,
}

impl CompletionBarrier {
    /// Creates an open barrier with nothing outstanding.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(BarrierState::default());
        Self {
            shared: Arc::new(Shared { name, state }),
        }
    }

    /// Registers one unit of outstanding work, even when closed.
    pub fn register(&self) -> BarrierGuard {
        self.shared.state.send_modify(|state| state.outstanding += 1);
        trace!(barrier = self.shared.name, outstanding = self.outstanding(), "registered");
        BarrierGuard {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Registers one unit of work unless the barrier has been closed.
    ///
    /// The closed check and the increment happen under the channel's lock, so
    /// a registration can never slip in after [`close`](Self::close) returned.
    pub fn try_register(&self) -> Option<BarrierGuard> {
        let admitted = self.shared.state.send_if_modified(|state| {
            if state.closed {
                false
            } else {
                state.outstanding += 1;
                true
            }
        });
        admitted.then(|| BarrierGuard {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Refuses further [`try_register`](Self::try_register) calls.
    pub fn close(&self) {
        self.shared.state.send_modify(|state| state.closed = true);
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.borrow().closed
    }

    /// Returns the number of registrations not yet done.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.shared.state.borrow().outstanding
    }

    /// Waits until every registration has been dropped.
    ///
    /// Returns immediately when nothing is outstanding.
    pub async fn wait(&self) {
        let mut receiver = self.shared.state.subscribe();
        // The sender lives in `shared`, which `self` keeps alive, so the
        // channel cannot close while we wait.
        let _ = receiver.wait_for(|state| state.outstanding == 0).await;
    }
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        self.shared
            .state
            .send_modify(|state| state.outstanding = state.outstanding.saturating_sub(1));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_empty() {
        let barrier = CompletionBarrier::new("units");
        let mut wait = task::spawn(barrier.wait());
        assert_ready!(wait.poll());
    }

    #[tokio::test]
    async fn test_wait_blocks_until_every_guard_dropped() {
        let barrier = CompletionBarrier::new("units");
        let first = barrier.register();
        let second = barrier.register();
        assert_eq!(barrier.outstanding(), 2);

        let mut wait = task::spawn(barrier.wait());
        assert_pending!(wait.poll());

        drop(second);
        assert_pending!(wait.poll());

        drop(first);
        assert!(wait.is_woken());
        assert_ready!(wait.poll());
        assert_eq!(barrier.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_completion_order_does_not_matter() {
        let barrier = CompletionBarrier::new("units");
        let mut handles = Vec::new();
        for delay_ms in [30_u64, 10, 20] {
            let guard = barrier.register();
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                drop(guard);
            }));
        }

        tokio::time::timeout(Duration::from_secs(5), barrier.wait())
            .await
            .expect("barrier should drain");
        assert_eq!(barrier.outstanding(), 0);
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_guard_dropped_when_task_panics() {
        let barrier = CompletionBarrier::new("units");
        let guard = barrier.register();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("unit failed");
        });
        assert!(handle.await.is_err());
        assert_eq!(barrier.outstanding(), 0);
    }

    #[test]
    fn test_close_refuses_new_registrations_only() {
        let barrier = CompletionBarrier::new("writes");
        let open = barrier.try_register().expect("open barrier admits");
        barrier.close();

        assert!(barrier.is_closed());
        assert!(barrier.try_register().is_none());
        assert_eq!(barrier.outstanding(), 1);

        drop(open);
        assert_eq!(barrier.outstanding(), 0);
    }

    #[test]
    fn test_clones_share_count() {
        let barrier = CompletionBarrier::new("writes");
        let clone = barrier.clone();
        let _guard = clone.register();
        assert_eq!(barrier.outstanding(), 1);
    }
}
