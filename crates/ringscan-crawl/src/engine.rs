//! Boundary to the external DHT engine.
//!
//! The crawler never talks to the network itself. It needs one primitive,
//! [`Lookup::lookup`]: "find the nodes closest to this identifier". The
//! engine resolves it asynchronously on its own tasks; the returned future
//! completing is the single completion notification for that lookup.
//!
//! [`DhtEngine`] adds the lifecycle operations a process needs to join a
//! swarm before crawling it.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{InfoHash, NodeSet, Result};

/// Local node identity handed to the engine at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Node identifier, derived from the public key.
    pub node_id: InfoHash,
    /// Ed25519 public key of the node.
    #[serde(with = "hex_key")]
    pub public_key: [u8; 32],
}

impl Identity {
    /// Build an identity from an Ed25519 public key.
    pub fn from_public_key(public_key: [u8; 32]) -> Self {
        Self {
            node_id: InfoHash::from_public_key(&public_key),
            public_key,
        }
    }
}

/// Options passed to [`DhtEngine::run`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Run the engine on its own threads rather than the caller's runtime.
    #[serde(default)]
    pub threaded: bool,
    /// Accept only IPv4 peers.
    #[serde(default)]
    pub ipv4_only: bool,
}

/// The lookup primitive.
pub trait Lookup: Send + Sync + 'static {
    /// Look up `target` and resolve with the nodes the engine considers
    /// closest to it.
    ///
    /// `on_candidate` is called once per intermediate candidate visited by
    /// the engine's traversal; returning `false` asks the engine to stop
    /// considering further candidates. The future resolves exactly once,
    /// with either the result set or a
    /// [`LookupFailed`](crate::CrawlError::LookupFailed) error.
    fn lookup<F>(
        &self,
        target: InfoHash,
        on_candidate: F,
    ) -> impl Future<Output = Result<NodeSet>> + Send
    where
        F: FnMut(&InfoHash) -> bool + Send + 'static;
}

/// A DHT node the crawler can start, join to a swarm, and query.
pub trait DhtEngine: Lookup {
    /// Generate a fresh node identity.
    fn generate_identity(&self) -> Identity;

    /// Start the local node on `port`.
    fn run(
        &self,
        port: u16,
        identity: Identity,
        options: RunOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Join the swarm through a known peer.
    fn bootstrap(&self, host: &str, port: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Serde support for 32-byte keys as hex strings.
mod hex_key {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &[u8; 32], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(key))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32-byte key"))
    }
}
