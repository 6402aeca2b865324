//! Command-line arguments.

use std::path::PathBuf;

/// Crawl a DHT swarm and plot the discovered nodes on a ring.
#[derive(clap::Parser, Debug, Default)]
#[command(version)]
pub struct Args {
    /// TOML config file. Defaults to `$RINGSCAN_CONFIG` if set.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Port of the local DHT node.
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Bootstrap peer as `host[:port]`; the port defaults to 4222.
    #[arg(long, short = 'b')]
    pub bootstrap: Option<String>,

    /// SVG output path for the ring plot.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print the final report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Number of nodes in the simulated swarm.
    #[arg(long)]
    pub swarm_size: Option<usize>,

    /// Seed for a reproducible simulated swarm.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level override ("trace", "debug", "info", "warn", "error").
    #[arg(long)]
    pub log_level: Option<String>,
}
