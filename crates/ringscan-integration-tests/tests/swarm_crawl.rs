//! Integration test: crawling a simulated swarm end to end.
//!
//! Exercises the full pipeline:
//! 1. Build a seeded in-memory swarm and start/bootstrap the local node
//! 2. Crawl from the root probe until every branch resolves
//! 3. Compare the discovered set against the swarm population
//! 4. Project the result onto the ring
//!
//! No network I/O; lookups resolve after a short simulated latency.

use std::sync::Arc;
use std::time::Duration;

use ringscan_crawl::{CrawlConfig, CrawlReport, Crawler, DhtEngine, InfoHash, NodeSet, RunOptions};
use ringscan_ring::{ring_points, RingPlot};
use ringscan_swarm::{SimulatedSwarm, SwarmConfig};

fn swarm_config(nodes: usize, seed: u64) -> SwarmConfig {
    SwarmConfig {
        nodes,
        min_latency_ms: 0,
        max_latency_ms: 2,
        seed: Some(seed),
        ..Default::default()
    }
}

/// Start, bootstrap and crawl `swarm`, returning the final report.
async fn crawl(swarm: Arc<SimulatedSwarm>, config: CrawlConfig) -> CrawlReport {
    let identity = swarm.generate_identity();
    swarm
        .run(4222, identity, RunOptions::default())
        .await
        .expect("run local node");
    swarm
        .bootstrap("bootstrap.ring.cx", "4222")
        .await
        .expect("bootstrap");

    let crawler = Crawler::new(swarm, config);
    tokio::time::timeout(Duration::from_secs(30), crawler.run())
        .await
        .expect("crawl should terminate")
}

#[tokio::test]
async fn crawl_discovers_entire_swarm() {
    let swarm = Arc::new(SimulatedSwarm::new(swarm_config(300, 42)).expect("valid swarm"));
    let population = swarm.population();

    let report = crawl(swarm, CrawlConfig::default()).await;

    assert!(report.finished);
    assert_eq!(report.lookups_failed, 0);
    assert_eq!(report.lookups_completed, report.branches);
    assert_eq!(
        report.nodes_found,
        population.len(),
        "every node of a loss-free swarm should be found"
    );
    assert_eq!(report.nodes, population);
    // Bisection needs far fewer lookups than there are nodes.
    assert!(report.branches < population.len() as u64);
}

#[tokio::test]
async fn crawl_swarm_smaller_than_bucket() {
    let swarm = Arc::new(SimulatedSwarm::new(swarm_config(5, 9)).expect("valid swarm"));
    let population = swarm.population();

    let report = crawl(swarm, CrawlConfig::default()).await;

    assert!(report.finished);
    assert_eq!(report.nodes, population);
}

#[tokio::test]
async fn crawl_with_pruning_resolves_clustered_swarm() {
    // Half the swarm shares a 40-bit prefix, the rest is spread uniformly.
    const CLUSTER_PREFIX: [u8; 5] = [0xA5, 0x5A, 0xC3, 0x3C, 0x0F];
    let mut population: NodeSet = (0..24)
        .map(|_| {
            let mut bytes = *InfoHash::random().as_bytes();
            bytes[..CLUSTER_PREFIX.len()].copy_from_slice(&CLUSTER_PREFIX);
            InfoHash::from_bytes(bytes)
        })
        .collect();
    population.extend((0..24).map(|_| InfoHash::random()));

    let swarm = Arc::new(
        SimulatedSwarm::with_population(swarm_config(0, 5), population.clone())
            .expect("valid swarm"),
    );
    let config = CrawlConfig {
        prune_outside_subtree: true,
        ..Default::default()
    };

    let report = crawl(swarm, config).await;

    assert!(report.finished);
    assert_eq!(report.nodes, population);
    assert!(
        report.branches < 2_000,
        "clustered crawl took {} branches",
        report.branches
    );
}

#[tokio::test]
async fn pruning_matches_plain_crawl_on_uniform_swarm() {
    let plain = crawl(
        Arc::new(SimulatedSwarm::new(swarm_config(200, 21)).expect("valid swarm")),
        CrawlConfig::default(),
    )
    .await;
    let pruned = crawl(
        Arc::new(SimulatedSwarm::new(swarm_config(200, 21)).expect("valid swarm")),
        CrawlConfig {
            prune_outside_subtree: true,
            ..Default::default()
        },
    )
    .await;

    assert_eq!(pruned.nodes, plain.nodes);
    assert!(pruned.branches <= plain.branches);
}

#[tokio::test]
async fn crawl_tolerates_lookup_failures() {
    let config = SwarmConfig {
        failure_rate: 0.3,
        ..swarm_config(300, 7)
    };
    let swarm = Arc::new(SimulatedSwarm::new(config).expect("valid swarm"));
    let population = swarm.population();

    let report = crawl(swarm, CrawlConfig::default()).await;

    assert!(report.finished);
    assert_eq!(
        report.lookups_completed + report.lookups_failed,
        report.branches
    );
    assert!(report.nodes_found <= population.len());
    for node in &report.nodes {
        assert!(population.contains(node), "found node not in swarm: {node}");
    }
}

#[tokio::test]
async fn watchdog_bounds_slow_lookups() {
    let config = SwarmConfig {
        min_latency_ms: 500,
        max_latency_ms: 500,
        ..swarm_config(50, 1)
    };
    let swarm = Arc::new(SimulatedSwarm::new(config).expect("valid swarm"));
    let crawl_config = CrawlConfig {
        lookup_timeout_ms: Some(20),
        ..Default::default()
    };

    let report = crawl(swarm, crawl_config).await;

    assert!(report.finished);
    assert_eq!(report.branches, 1);
    assert_eq!(report.lookups_failed, 1);
    assert_eq!(report.nodes_found, 0);
}

#[tokio::test]
async fn crawl_without_bootstrap_finds_nothing() {
    let swarm = Arc::new(SimulatedSwarm::new(swarm_config(20, 3)).expect("valid swarm"));
    let crawler = Crawler::new(swarm, CrawlConfig::default());

    let report = tokio::time::timeout(Duration::from_secs(5), crawler.run())
        .await
        .expect("crawl should terminate");

    assert!(report.finished);
    assert_eq!(report.lookups_failed, 1);
    assert!(report.nodes.is_empty());
}

#[tokio::test]
async fn report_projects_onto_ring_and_serializes() {
    let swarm = Arc::new(SimulatedSwarm::new(swarm_config(64, 11)).expect("valid swarm"));
    let report = crawl(swarm, CrawlConfig::default()).await;

    let points = ring_points(&report.nodes, 4).expect("valid keep_bytes");
    assert_eq!(points.len(), report.nodes_found);
    for p in &points {
        assert!((0.0..1.0).contains(&p.turn));
    }

    let svg = RingPlot::default().render(&report.nodes).expect("render");
    assert_eq!(svg.matches("<polygon").count(), report.nodes_found);

    let json = serde_json::to_string(&report).expect("serialize report");
    let back: CrawlReport = serde_json::from_str(&json).expect("parse report");
    assert_eq!(back.nodes, report.nodes);
}
