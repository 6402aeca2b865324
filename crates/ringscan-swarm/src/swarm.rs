//! Simulated swarm engine.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use ringscan_crawl::{
    CrawlError, DhtEngine, Identity, InfoHash, Lookup, NodeSet, RunOptions, HASH_LEN,
};

use crate::{Result, SwarmError};

/// Shape of the simulated swarm.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Number of nodes in the swarm.
    #[serde(default = "default_nodes")]
    pub nodes: usize,
    /// Nodes returned per lookup.
    #[serde(default = "default_bucket_size")]
    pub bucket_size: usize,
    /// Lower bound of the per-lookup latency.
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,
    /// Upper bound of the per-lookup latency.
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    /// Probability in `[0, 1]` that a lookup fails.
    #[serde(default)]
    pub failure_rate: f64,
    /// RNG seed for a reproducible population. `None` = OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_nodes() -> usize {
    2000
}

fn default_bucket_size() -> usize {
    8
}

fn default_min_latency_ms() -> u64 {
    5
}

fn default_max_latency_ms() -> u64 {
    50
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            bucket_size: default_bucket_size(),
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            failure_rate: 0.0,
            seed: None,
        }
    }
}

impl SwarmConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.bucket_size == 0 {
            return Err(SwarmError::InvalidConfig(
                "bucket_size must be at least 1".to_string(),
            ));
        }
        if self.min_latency_ms > self.max_latency_ms {
            return Err(SwarmError::InvalidConfig(format!(
                "min_latency_ms ({}) exceeds max_latency_ms ({})",
                self.min_latency_ms, self.max_latency_ms,
            )));
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(SwarmError::InvalidConfig(format!(
                "failure_rate {} outside [0, 1]",
                self.failure_rate
            )));
        }
        Ok(())
    }
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Default)]
struct EngineState {
    running: Option<(u16, Identity)>,
    bootstrap_peer: Option<String>,
}

/// An ideal Kademlia swarm living in memory.
pub struct SimulatedSwarm {
    config: SwarmConfig,
    population: Vec<InfoHash>,
    state: Mutex<EngineState>,
    rng: Mutex<StdRng>,
}

impl SimulatedSwarm {
    /// Build a swarm of `config.nodes` distinct random identifiers.
    pub fn new(config: SwarmConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = rng_for(config.seed);

        let mut ids = NodeSet::new();
        while ids.len() < config.nodes {
            let mut bytes = [0u8; HASH_LEN];
            rng.fill_bytes(&mut bytes);
            ids.insert(InfoHash::from_bytes(bytes));
        }

        info!(
            nodes = ids.len(),
            bucket_size = config.bucket_size,
            "Simulated swarm created"
        );

        Ok(Self {
            config,
            population: ids.into_iter().collect(),
            state: Mutex::new(EngineState::default()),
            rng: Mutex::new(rng),
        })
    }

    /// Build a swarm over an explicit population. `config.nodes` is ignored.
    pub fn with_population(config: SwarmConfig, population: NodeSet) -> Result<Self> {
        config.validate()?;
        let rng = rng_for(config.seed);
        info!(nodes = population.len(), "Simulated swarm created");
        Ok(Self {
            config,
            population: population.into_iter().collect(),
            state: Mutex::new(EngineState::default()),
            rng: Mutex::new(rng),
        })
    }

    /// Every node in the swarm.
    pub fn population(&self) -> NodeSet {
        self.population.iter().copied().collect()
    }

    /// Port and identity of the local node, once running.
    pub fn local(&self) -> Option<(u16, Identity)> {
        self.lock_state().running.clone()
    }

    /// The `count` nodes closest to `target`, nearest first.
    pub fn closest(&self, target: &InfoHash, count: usize) -> Vec<InfoHash> {
        let mut sorted = self.population.clone();
        sorted.sort_by_key(|n| InfoHash::xor_distance(n, target));
        sorted.truncate(count);
        sorted
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draw_latency_and_failure(&self) -> (Duration, bool) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let latency = rng.gen_range(self.config.min_latency_ms..=self.config.max_latency_ms);
        let fail = rng.gen_bool(self.config.failure_rate);
        (Duration::from_millis(latency), fail)
    }
}

impl Lookup for SimulatedSwarm {
    fn lookup<F>(
        &self,
        target: InfoHash,
        mut on_candidate: F,
    ) -> impl Future<Output = ringscan_crawl::Result<NodeSet>> + Send
    where
        F: FnMut(&InfoHash) -> bool + Send + 'static,
    {
        let joined = self.lock_state().bootstrap_peer.is_some();
        let k = self.config.bucket_size;
        let candidates = self.closest(&target, k * 2);
        let (latency, fail) = self.draw_latency_and_failure();

        async move {
            if !joined {
                return Err(CrawlError::LookupFailed {
                    target,
                    reason: "engine has not joined a swarm".to_string(),
                });
            }

            tokio::time::sleep(latency).await;

            // The traversal converges on the target: visit far candidates first.
            for candidate in candidates.iter().rev() {
                if !on_candidate(candidate) {
                    trace!(%target, "candidate walk stopped early");
                    break;
                }
            }

            if fail {
                debug!(%target, "simulated lookup failure");
                return Err(CrawlError::LookupFailed {
                    target,
                    reason: "simulated packet loss".to_string(),
                });
            }

            Ok(candidates.into_iter().take(k).collect())
        }
    }
}

impl DhtEngine for SimulatedSwarm {
    fn generate_identity(&self) -> Identity {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        Identity::from_public_key(signing_key.verifying_key().to_bytes())
    }

    fn run(
        &self,
        port: u16,
        identity: Identity,
        options: RunOptions,
    ) -> impl Future<Output = ringscan_crawl::Result<()>> + Send {
        let outcome = {
            let mut state = self.lock_state();
            if let Some(running_port) = state.running.as_ref().map(|(p, _)| *p) {
                Err(SwarmError::AlreadyRunning { port: running_port })
            } else {
                info!(
                    port,
                    node_id = %identity.node_id,
                    threaded = options.threaded,
                    "DHT node running"
                );
                state.running = Some((port, identity));
                Ok(())
            }
        };
        async move { outcome.map_err(CrawlError::from) }
    }

    fn bootstrap(
        &self,
        host: &str,
        port: &str,
    ) -> impl Future<Output = ringscan_crawl::Result<()>> + Send {
        let outcome = self.join(host, port);
        async move { outcome.map_err(CrawlError::from) }
    }
}

impl SimulatedSwarm {
    fn join(&self, host: &str, port: &str) -> Result<()> {
        let mut state = self.lock_state();
        if state.running.is_none() {
            return Err(SwarmError::NotRunning);
        }
        if host.is_empty() {
            return Err(SwarmError::BootstrapFailed("empty host".to_string()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| SwarmError::BootstrapFailed(format!("invalid port {port:?}")))?;

        let peer = format!("{host}:{port}");
        info!(%peer, "Bootstrapping into simulated swarm");
        state.bootstrap_peer = Some(peer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(nodes: usize) -> SwarmConfig {
        SwarmConfig {
            nodes,
            min_latency_ms: 0,
            max_latency_ms: 1,
            seed: Some(7),
            ..Default::default()
        }
    }

    async fn joined(config: SwarmConfig) -> SimulatedSwarm {
        let swarm = SimulatedSwarm::new(config).expect("valid config");
        let identity = swarm.generate_identity();
        swarm
            .run(4222, identity, RunOptions::default())
            .await
            .expect("run");
        swarm.bootstrap("bootstrap.local", "4222").await.expect("bootstrap");
        swarm
    }

    #[test]
    fn test_config_default() {
        let config = SwarmConfig::default();
        assert_eq!(config.nodes, 2000);
        assert_eq!(config.bucket_size, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate() {
        let bad_k = SwarmConfig {
            bucket_size: 0,
            ..Default::default()
        };
        assert!(bad_k.validate().is_err());

        let bad_latency = SwarmConfig {
            min_latency_ms: 10,
            max_latency_ms: 1,
            ..Default::default()
        };
        assert!(bad_latency.validate().is_err());

        let bad_rate = SwarmConfig {
            failure_rate: 1.5,
            ..Default::default()
        };
        assert!(bad_rate.validate().is_err());
    }

    #[test]
    fn test_population_is_distinct_and_seeded() {
        let a = SimulatedSwarm::new(fast_config(100)).expect("valid");
        let b = SimulatedSwarm::new(fast_config(100)).expect("valid");
        assert_eq!(a.population().len(), 100);
        assert_eq!(a.population(), b.population());
    }

    #[test]
    fn test_closest_is_sorted_by_distance() {
        let swarm = SimulatedSwarm::new(fast_config(50)).expect("valid");
        let target = InfoHash::random();
        let closest = swarm.closest(&target, 10);
        assert_eq!(closest.len(), 10);
        for pair in closest.windows(2) {
            assert!(
                InfoHash::xor_distance(&pair[0], &target)
                    <= InfoHash::xor_distance(&pair[1], &target)
            );
        }
    }

    #[tokio::test]
    async fn test_lookup_returns_bucket_size_closest() {
        let swarm = joined(fast_config(200)).await;
        let target = InfoHash::random();
        let result = swarm.lookup(target, |_| true).await.expect("lookup");

        let expected: NodeSet = swarm.closest(&target, 8).into_iter().collect();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn test_lookup_walks_candidates() {
        let swarm = joined(fast_config(200)).await;
        let seen = std::sync::Arc::new(Mutex::new(0usize));
        let counter = seen.clone();
        swarm
            .lookup(InfoHash::random(), move |_| {
                *counter.lock().expect("counter lock") += 1;
                true
            })
            .await
            .expect("lookup");
        assert_eq!(*seen.lock().expect("counter lock"), 16);
    }

    #[tokio::test]
    async fn test_lookup_before_bootstrap_fails() {
        let swarm = SimulatedSwarm::new(fast_config(10)).expect("valid");
        let err = swarm
            .lookup(InfoHash::random(), |_| true)
            .await
            .expect_err("not joined");
        assert!(matches!(err, CrawlError::LookupFailed { .. }));
    }

    #[tokio::test]
    async fn test_failure_rate_one_always_fails() {
        let config = SwarmConfig {
            failure_rate: 1.0,
            ..fast_config(20)
        };
        let swarm = joined(config).await;
        assert!(swarm.lookup(InfoHash::random(), |_| true).await.is_err());
    }

    #[tokio::test]
    async fn test_lifecycle_errors() {
        let swarm = SimulatedSwarm::new(fast_config(5)).expect("valid");
        assert!(swarm.bootstrap("host", "4222").await.is_err());

        let identity = swarm.generate_identity();
        swarm
            .run(4222, identity.clone(), RunOptions::default())
            .await
            .expect("first run");
        assert!(swarm
            .run(4223, identity.clone(), RunOptions::default())
            .await
            .is_err());
        assert_eq!(swarm.local(), Some((4222, identity)));

        assert!(swarm.bootstrap("", "4222").await.is_err());
        assert!(swarm.bootstrap("host", "port").await.is_err());
        assert!(swarm.bootstrap("host", "4222").await.is_ok());
    }

    #[test]
    fn test_generated_identities_differ() {
        let swarm = SimulatedSwarm::new(fast_config(1)).expect("valid");
        let a = swarm.generate_identity();
        let b = swarm.generate_identity();
        assert_ne!(a.node_id, b.node_id);
        assert_eq!(a.node_id, InfoHash::from_public_key(&a.public_key));
    }
}
