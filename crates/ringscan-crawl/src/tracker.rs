//! Counter of in-flight crawl branches.
//!
//! A branch increments the counter when it is initiated and decrements it
//! once its lookup result has been processed and all of its children have
//! been initiated. The counter therefore only returns to zero when no
//! branch anywhere in the recursion is still unresolved.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;
use tracing::warn;

/// Lock-free in-flight counter with an async wake-up on completion.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    in_flight: AtomicUsize,
    started: AtomicBool,
    notify: Notify,
}

impl CompletionTracker {
    /// Create a tracker with no branches in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a branch has been initiated.
    pub fn increment(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
    }

    /// Record that a branch has been fully processed.
    ///
    /// A decrement with nothing in flight is refused; the counter never
    /// wraps.
    pub fn decrement(&self) {
        let prev = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match prev {
            Ok(1) => self.notify.notify_waiters(),
            Ok(_) => {}
            Err(_) => warn!("completion tracker decremented with no branch in flight"),
        }
    }

    /// Number of branches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether no branch is in flight.
    pub fn is_quiescent(&self) -> bool {
        self.in_flight() == 0
    }

    /// Whether at least one branch ran and none is left in flight.
    pub fn is_finished(&self) -> bool {
        self.started.load(Ordering::SeqCst) && self.is_quiescent()
    }

    /// Wait until [`is_finished`](Self::is_finished) holds.
    pub async fn wait_finished(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent final decrement is not missed.
            notified.as_mut().enable();
            if self.is_finished() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fresh_tracker_is_quiescent_but_not_finished() {
        let tracker = CompletionTracker::new();
        assert!(tracker.is_quiescent());
        assert!(!tracker.is_finished());
    }

    #[test]
    fn test_increment_decrement() {
        let tracker = CompletionTracker::new();
        tracker.increment();
        tracker.increment();
        assert_eq!(tracker.in_flight(), 2);
        assert!(!tracker.is_quiescent());

        tracker.decrement();
        assert!(!tracker.is_finished());
        tracker.decrement();
        assert!(tracker.is_quiescent());
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_decrement_does_not_underflow() {
        let tracker = CompletionTracker::new();
        tracker.decrement();
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_wait_finished_wakes_on_last_decrement() {
        let tracker = Arc::new(CompletionTracker::new());
        tracker.increment();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait_finished().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        tracker.decrement();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .expect("waiter task");
    }

    #[tokio::test]
    async fn test_wait_finished_returns_immediately_when_done() {
        let tracker = CompletionTracker::new();
        tracker.increment();
        tracker.decrement();
        tokio::time::timeout(Duration::from_millis(100), tracker.wait_finished())
            .await
            .expect("already finished");
    }
}
