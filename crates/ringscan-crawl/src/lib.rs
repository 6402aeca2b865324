//! # ringscan-crawl
//!
//! Keyspace-bisection crawler for Kademlia-style DHT swarms.
//!
//! Starting from a single probe identifier, the crawler recursively issues
//! lookups for narrower identifier prefixes, using the spread of each
//! lookup's result to decide whether a subtree of the keyspace still hides
//! unexplored nodes. Every discovered node lands in one process-wide set.
//!
//! ## Modules
//!
//! - [`infohash`] — 160-bit identifiers with MSB-first bit addressing
//! - [`node_set`] — ordered, deduplicating node collection
//! - [`tracker`] — in-flight branch counter used for termination detection
//! - [`session`] — shared crawl state (tracker, global node set, counters)
//! - [`engine`] — boundary to the external DHT engine
//! - [`crawler`] — the recursive subdivision algorithm
//!
//! ## Key Parameters
//!
//! | Parameter | Value |
//! |---|---|
//! | Identifier width | 160 bits |
//! | Root probe | bit 159 set, depth 0 |
//! | Default port | 4222 |

pub mod crawler;
pub mod engine;
pub mod infohash;
pub mod node_set;
pub mod session;
pub mod tracker;

pub use crawler::{Branch, CrawlConfig, Crawler};
pub use engine::{DhtEngine, Identity, Lookup, RunOptions};
pub use infohash::InfoHash;
pub use node_set::NodeSet;
pub use session::{CrawlReport, CrawlSession};
pub use tracker::CompletionTracker;

/// Identifier width in bytes.
pub const HASH_LEN: usize = 20;

/// Identifier width in bits.
pub const HASH_BITS: usize = HASH_LEN * 8;

/// Bit forced to 1 in the root probe identifier.
pub const ROOT_BIT: usize = HASH_BITS - 1;

/// Default UDP port of a DHT node.
pub const DEFAULT_PORT: u16 = 4222;

/// Error types for crawl operations.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// A bit position outside the identifier width was addressed.
    #[error("bit position {pos} out of range for {width}-bit identifier")]
    BitOutOfRange { pos: usize, width: usize },

    /// `first()`/`last()` was called on an empty node set.
    #[error("node set is empty")]
    EmptyNodeSet,

    /// A lookup reported failure.
    #[error("lookup for {target} failed: {reason}")]
    LookupFailed {
        /// The identifier that was looked up.
        target: InfoHash,
        /// Engine-supplied failure description.
        reason: String,
    },

    /// A lookup did not complete within the configured watchdog timeout.
    #[error("lookup for {target} timed out after {timeout_ms} ms")]
    LookupTimeout { target: InfoHash, timeout_ms: u64 },

    /// An identifier could not be parsed from its hex representation.
    #[error("invalid identifier: {0}")]
    InvalidHash(String),

    /// The DHT engine rejected an operation.
    #[error("engine error: {0}")]
    Engine(String),
}

/// Convenience result type for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;
