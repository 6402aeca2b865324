//! Recursive keyspace-bisection crawl.
//!
//! Each [`Branch`] is a probe identifier plus the number of leading bits
//! already fixed along its path. Resolving a branch looks the probe up,
//! merges the result into the session's global node set, then measures how
//! tightly the returned nodes cluster:
//!
//! ```text
//! observed_depth = common_bits(result.first(), result.last()) + 1
//! ```
//!
//! If the branch's depth is below `observed_depth`, the neighbourhood is
//! denser than what the branch has accounted for, so for every bit `b` in
//! `[depth, observed_depth)` a child `(prefix | bit b, b + 1)` is spawned to
//! cover the bit-1 subtree at that level. Otherwise the subtree is resolved.
//!
//! With [`CrawlConfig::prune_outside_subtree`] set, a result containing any
//! node outside the branch's subtree ends that branch: an exact K-closest
//! lookup only leaves the subtree once the subtree holds fewer than K nodes,
//! all of which were just returned. This keeps the crawl linear in cluster
//! depth on populations whose identifiers share long prefixes.
//!
//! Branches run as independent Tokio tasks. A branch is counted in the
//! [`CompletionTracker`](crate::CompletionTracker) from the moment it is
//! spawned until it has spawned all of its children, so the tracker only
//! returns to zero once the whole recursion has resolved.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::session::{CrawlReport, CrawlSession};
use crate::{CrawlError, InfoHash, Lookup, NodeSet, Result, HASH_BITS, HASH_LEN};

/// One unit of crawl work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Branch {
    /// Identifier to look up.
    pub prefix: InfoHash,
    /// Leading bits already fixed by subdivision along this branch.
    pub depth: usize,
}

/// Root probe bytes: only bit 159 (the last bit of the last byte) set.
const ROOT_PREFIX: [u8; HASH_LEN] = {
    let mut bytes = [0u8; HASH_LEN];
    bytes[HASH_LEN - 1] = 0x01;
    bytes
};

impl Branch {
    /// The root probe at depth 0.
    pub fn root() -> Self {
        Self {
            prefix: InfoHash::from_bytes(ROOT_PREFIX),
            depth: 0,
        }
    }

    /// Whether `id` shares the `depth` leading bits fixed along this branch.
    pub fn covers(&self, id: &InfoHash) -> bool {
        InfoHash::common_bits(id, &self.prefix) >= self.depth
    }
}

/// Crawl tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Upper bound on `observed_depth`; never above the identifier width.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Per-lookup watchdog. `None` waits for the engine's own timeout.
    #[serde(default)]
    pub lookup_timeout_ms: Option<u64>,
    /// End a branch whose result reaches outside its subtree.
    #[serde(default)]
    pub prune_outside_subtree: bool,
}

fn default_max_depth() -> usize {
    HASH_BITS
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            lookup_timeout_ms: None,
            prune_outside_subtree: false,
        }
    }
}

/// Density estimate for a lookup result.
///
/// Returns `None` when the result holds fewer than two nodes, since a
/// single node says nothing about how the neighbourhood is populated.
pub fn observed_depth(result: &NodeSet, max_depth: usize) -> Option<usize> {
    if result.len() < 2 {
        return None;
    }
    let common = result.common_prefix_bits().ok()?;
    Some((common + 1).min(max_depth).min(HASH_BITS))
}

/// Children of `branch` given the observed density: one per bit position in
/// `[branch.depth, observed)`, each with that bit forced to 1.
pub fn plan_children(branch: &Branch, observed: usize) -> Result<Vec<Branch>> {
    (branch.depth..observed)
        .map(|b| {
            Ok(Branch {
                prefix: branch.prefix.with_bit(b, true)?,
                depth: b + 1,
            })
        })
        .collect()
}

/// Drives a crawl over a [`Lookup`] implementation.
pub struct Crawler<L: Lookup> {
    lookup: Arc<L>,
    session: Arc<CrawlSession>,
    config: CrawlConfig,
}

impl<L: Lookup> Clone for Crawler<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: self.lookup.clone(),
            session: self.session.clone(),
            config: self.config.clone(),
        }
    }
}

/// Keeps a branch counted as in flight until dropped, including when the
/// branch task unwinds.
struct InFlight(Arc<CrawlSession>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.tracker().decrement();
    }
}

impl<L: Lookup> Crawler<L> {
    /// Create a crawler with a fresh session.
    pub fn new(lookup: Arc<L>, config: CrawlConfig) -> Self {
        Self::with_session(lookup, Arc::new(CrawlSession::new()), config)
    }

    /// Create a crawler over an existing session.
    pub fn with_session(lookup: Arc<L>, session: Arc<CrawlSession>, config: CrawlConfig) -> Self {
        Self {
            lookup,
            session,
            config,
        }
    }

    /// The shared crawl state.
    pub fn session(&self) -> &Arc<CrawlSession> {
        &self.session
    }

    /// Spawn the root branch. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        info!("Starting keyspace crawl");
        self.spawn_branch(Branch::root());
    }

    /// Start the crawl and wait for it to terminate.
    pub async fn run(&self) -> CrawlReport {
        self.start();
        self.session.tracker().wait_finished().await;
        let report = self.session.report();
        info!(
            nodes = report.nodes_found,
            branches = report.branches,
            failed = report.lookups_failed,
            "Crawl complete"
        );
        report
    }

    /// Count `branch` as in flight and resolve it on its own task.
    pub fn spawn_branch(&self, branch: Branch) {
        self.session.tracker().increment();
        self.session.record_branch();
        debug!(prefix = %branch.prefix, depth = branch.depth, "step");

        let crawler = self.clone();
        tokio::spawn(async move { crawler.resolve(branch).await });
    }

    async fn resolve(self, branch: Branch) {
        let _in_flight = InFlight(self.session.clone());

        let result = self.lookup_with_watchdog(branch.prefix).await;
        for child in self.next_step(&branch, result) {
            self.spawn_branch(child);
        }
    }

    async fn lookup_with_watchdog(&self, target: InfoHash) -> Result<NodeSet> {
        let on_candidate = move |candidate: &InfoHash| {
            trace!(%target, %candidate, "lookup candidate");
            true
        };
        let lookup = self.lookup.lookup(target, on_candidate);

        match self.config.lookup_timeout_ms {
            Some(timeout_ms) => tokio::time::timeout(Duration::from_millis(timeout_ms), lookup)
                .await
                .unwrap_or_else(|_| Err(CrawlError::LookupTimeout { target, timeout_ms })),
            None => lookup.await,
        }
    }

    fn next_step(&self, branch: &Branch, result: Result<NodeSet>) -> Vec<Branch> {
        let found = match result {
            Ok(found) => found,
            Err(e) => {
                self.session.record_lookup(false);
                warn!(prefix = %branch.prefix, depth = branch.depth, error = %e, "Lookup failed");
                return Vec::new();
            }
        };
        self.session.record_lookup(true);

        let added = self.session.merge(&found);
        if self.config.prune_outside_subtree && !found.iter().all(|id| branch.covers(id)) {
            debug!(
                prefix = %branch.prefix,
                depth = branch.depth,
                returned = found.len(),
                "Subtree fully enumerated"
            );
            return Vec::new();
        }

        let Some(observed) = observed_depth(&found, self.config.max_depth) else {
            debug!(
                prefix = %branch.prefix,
                returned = found.len(),
                "Result too small to subdivide"
            );
            return Vec::new();
        };

        debug!(
            prefix = %branch.prefix,
            returned = found.len(),
            added,
            observed_depth = observed,
            depth = branch.depth,
            "Lookup done"
        );

        if branch.depth >= observed {
            return Vec::new();
        }

        plan_children(branch, observed).unwrap_or_else(|e| {
            warn!(prefix = %branch.prefix, error = %e, "Cannot subdivide branch");
            Vec::new()
        })
    }
}
