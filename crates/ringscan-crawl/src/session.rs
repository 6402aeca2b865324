//! Shared state of one crawl run.
//!
//! A [`CrawlSession`] owns the completion tracker and the global node set.
//! It is shared (`Arc`) between every branch task and the driving loop; the
//! node set is guarded by a mutex, the tracker and counters are atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{CompletionTracker, NodeSet};

/// Process-wide state for a single crawl.
#[derive(Debug)]
pub struct CrawlSession {
    tracker: CompletionTracker,
    nodes: Mutex<NodeSet>,
    branches: AtomicU64,
    lookups_completed: AtomicU64,
    lookups_failed: AtomicU64,
    started_at: Instant,
}

/// Summary of a crawl, suitable for printing or JSON output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrawlReport {
    /// Number of distinct nodes discovered.
    pub nodes_found: usize,
    /// Number of branches initiated (one lookup each).
    pub branches: u64,
    /// Lookups that completed successfully.
    pub lookups_completed: u64,
    /// Lookups that failed or timed out.
    pub lookups_failed: u64,
    /// Wall-clock time since the session was created.
    pub elapsed_ms: u64,
    /// Whether the crawl had terminated when the report was taken.
    pub finished: bool,
    /// Discovered node identifiers, ascending.
    pub nodes: NodeSet,
}

impl Default for CrawlSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self {
            tracker: CompletionTracker::new(),
            nodes: Mutex::new(NodeSet::new()),
            branches: AtomicU64::new(0),
            lookups_completed: AtomicU64::new(0),
            lookups_failed: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// The in-flight branch tracker.
    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    /// Merge a lookup result into the global set, returning the number of
    /// newly discovered nodes.
    pub fn merge(&self, found: &NodeSet) -> usize {
        self.lock_nodes().merge(found)
    }

    /// Copy of the global set as it is right now.
    pub fn snapshot(&self) -> NodeSet {
        self.lock_nodes().clone()
    }

    /// Number of distinct nodes discovered so far.
    pub fn node_count(&self) -> usize {
        self.lock_nodes().len()
    }

    pub(crate) fn record_branch(&self) {
        self.branches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lookup(&self, ok: bool) {
        let counter = if ok {
            &self.lookups_completed
        } else {
            &self.lookups_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of branches initiated so far.
    pub fn branches(&self) -> u64 {
        self.branches.load(Ordering::Relaxed)
    }

    /// Number of failed lookups so far.
    pub fn lookups_failed(&self) -> u64 {
        self.lookups_failed.load(Ordering::Relaxed)
    }

    /// Build a report of the current state.
    pub fn report(&self) -> CrawlReport {
        let nodes = self.snapshot();
        CrawlReport {
            nodes_found: nodes.len(),
            branches: self.branches(),
            lookups_completed: self.lookups_completed.load(Ordering::Relaxed),
            lookups_failed: self.lookups_failed(),
            elapsed_ms: u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            finished: self.tracker.is_finished(),
            nodes,
        }
    }

    // Set inserts are atomic per element; a poisoned lock still holds a valid set.
    fn lock_nodes(&self) -> MutexGuard<'_, NodeSet> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InfoHash, HASH_LEN};

    fn set(bytes: &[u8]) -> NodeSet {
        bytes
            .iter()
            .map(|b| InfoHash::from_bytes([*b; HASH_LEN]))
            .collect()
    }

    #[test]
    fn test_merge_overlapping_results() {
        let session = CrawlSession::new();
        assert_eq!(session.merge(&set(&[0xA, 0xB, 0xC])), 3);
        assert_eq!(session.merge(&set(&[0xB, 0xC, 0xD])), 1);
        assert_eq!(session.snapshot(), set(&[0xA, 0xB, 0xC, 0xD]));
        assert_eq!(session.node_count(), 4);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let session = CrawlSession::new();
        session.merge(&set(&[1]));
        let snap = session.snapshot();
        session.merge(&set(&[2]));
        assert_eq!(snap.len(), 1);
        assert_eq!(session.node_count(), 2);
    }

    #[test]
    fn test_report_counts() {
        let session = CrawlSession::new();
        session.record_branch();
        session.record_branch();
        session.record_lookup(true);
        session.record_lookup(false);
        session.merge(&set(&[1, 2]));

        let report = session.report();
        assert_eq!(report.nodes_found, 2);
        assert_eq!(report.branches, 2);
        assert_eq!(report.lookups_completed, 1);
        assert_eq!(report.lookups_failed, 1);
        assert!(!report.finished);
    }

    #[test]
    fn test_report_serializes() {
        let session = CrawlSession::new();
        session.merge(&set(&[1]));
        let json = serde_json::to_value(session.report()).expect("serialize");
        assert_eq!(json["nodes_found"], 1);
        assert_eq!(json["nodes"][0], "01".repeat(20));
    }
}
