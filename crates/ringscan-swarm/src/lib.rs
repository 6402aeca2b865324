//! # ringscan-swarm
//!
//! In-process DHT engine for exercising the crawler without a network.
//!
//! [`SimulatedSwarm`] holds a fixed population of random node identifiers
//! and answers [`Lookup`](ringscan_crawl::Lookup) requests the way an ideal
//! Kademlia engine would: the `bucket_size` nodes closest to the target by
//! XOR distance, delivered after a random latency. Lookups can be made to
//! fail with a configurable probability to exercise partial-failure paths.
//!
//! ## Key Parameters
//!
//! | Parameter | Default |
//! |---|---|
//! | Population | 2000 nodes |
//! | Bucket size (nodes per lookup) | 8 |
//! | Lookup latency | 5–50 ms |
//! | Failure rate | 0.0 |

pub mod swarm;

pub use swarm::{SimulatedSwarm, SwarmConfig};

/// Error types for the simulated engine.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    /// The swarm configuration is unusable.
    #[error("invalid swarm config: {0}")]
    InvalidConfig(String),

    /// `run` was called twice.
    #[error("engine already running on port {port}")]
    AlreadyRunning { port: u16 },

    /// An operation needs the engine to be running first.
    #[error("engine not running")]
    NotRunning,

    /// Joining the swarm failed.
    #[error("bootstrap failed: {0}")]
    BootstrapFailed(String),
}

impl From<SwarmError> for ringscan_crawl::CrawlError {
    fn from(err: SwarmError) -> Self {
        ringscan_crawl::CrawlError::Engine(err.to_string())
    }
}

/// Convenience result type for swarm operations.
pub type Result<T> = std::result::Result<T, SwarmError>;
