//! ringscan: crawl a DHT swarm from a single bootstrap peer and plot the
//! discovered nodes on a ring.
//!
//! Startup order: config, logging, engine start, bootstrap, crawl. While the
//! crawl runs the ring plot is refreshed on an interval; once every branch
//! has resolved a final plot is written and the node list is printed.

mod cli;
mod config;
mod driver;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use ringscan_crawl::{CrawlReport, Crawler, DhtEngine, RunOptions};
use ringscan_swarm::SimulatedSwarm;

use crate::cli::Args;
use crate::config::{parse_bootstrap, ScanConfig};
use crate::driver::Driver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    // 1. Load config
    let mut config = ScanConfig::load(args.config.as_deref())?;
    config.apply_args(&args);

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("ringscan={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("ringscan starting");

    // 3. Start the local DHT node
    let engine = Arc::new(SimulatedSwarm::new(config.swarm.clone())?);
    let identity = engine.generate_identity();
    info!(node_id = %identity.node_id, "Generated identity");

    let options = RunOptions {
        threaded: true,
        ipv4_only: config.network.ipv4_only,
    };
    engine
        .run(config.network.listen_port, identity, options)
        .await
        .context("starting DHT node")?;

    // 4. Join the swarm
    bootstrap(engine.as_ref(), &config.network.bootstrap_nodes).await?;

    // 5. Crawl, rendering on an interval until every branch has resolved
    let crawler = Crawler::new(engine, config.crawl.clone());
    let driver = Driver::new(
        crawler.session().clone(),
        config.render.plot(),
        config.render.output_path(),
        Duration::from_millis(config.render.interval_ms.max(1)),
    );

    crawler.start();
    let report = tokio::select! {
        report = driver.drive() => report,
        _ = tokio::signal::ctrl_c() => {
            warn!("Ctrl-C received, reporting partial results");
            driver.render();
            crawler.session().report()
        }
    };

    print_report(&report, args.json)?;
    Ok(())
}

/// Try each bootstrap peer in order until one succeeds.
async fn bootstrap<E: DhtEngine>(engine: &E, peers: &[String]) -> anyhow::Result<()> {
    for peer in peers {
        let (host, port) = parse_bootstrap(peer);
        match engine.bootstrap(&host, &port).await {
            Ok(()) => {
                info!(%host, %port, "Bootstrapped");
                return Ok(());
            }
            Err(e) => warn!(%host, %port, error = %e, "Bootstrap peer failed"),
        }
    }
    anyhow::bail!("no bootstrap peer reachable ({} tried)", peers.len())
}

fn print_report(report: &CrawlReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{} nodes found :", report.nodes_found);
    for node in &report.nodes {
        println!("{node}");
    }
    println!(
        "{} lookups ({} failed) in {} ms",
        report.branches, report.lookups_failed, report.elapsed_ms
    );
    Ok(())
}
