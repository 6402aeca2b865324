//! Configuration file management.
//!
//! Settings come from a TOML file (`--config`, else `$RINGSCAN_CONFIG`,
//! else built-in defaults) and are then overridden by command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use ringscan_crawl::{CrawlConfig, DEFAULT_PORT};
use ringscan_ring::RingPlot;
use ringscan_swarm::SwarmConfig;

use crate::cli::Args;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "RINGSCAN_CONFIG";

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Local node and bootstrap settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Crawl tuning.
    #[serde(default)]
    pub crawl: CrawlConfig,
    /// Ring plot output.
    #[serde(default)]
    pub render: RenderConfig,
    /// Simulated swarm shape.
    #[serde(default)]
    pub swarm: SwarmConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Port of the local DHT node.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Bootstrap peers as `host[:port]`, tried in order.
    #[serde(default = "default_bootstrap_nodes")]
    pub bootstrap_nodes: Vec<String>,
    /// Accept only IPv4 peers.
    #[serde(default)]
    pub ipv4_only: bool,
}

/// Ring plot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// SVG output path. Empty = no plot.
    #[serde(default = "default_output")]
    pub output: String,
    /// Re-render interval while the crawl is running.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Leading identifier bytes used for the angular position.
    #[serde(default = "default_keep_bytes")]
    pub keep_bytes: usize,
    /// Image width and height in pixels.
    #[serde(default = "default_size_px")]
    pub size_px: u32,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_listen_port() -> u16 {
    DEFAULT_PORT
}

fn default_bootstrap_nodes() -> Vec<String> {
    vec![format!("bootstrap.ring.cx:{DEFAULT_PORT}")]
}

fn default_output() -> String {
    "ring.svg".to_string()
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_keep_bytes() -> usize {
    ringscan_ring::DEFAULT_KEEP_BYTES
}

fn default_size_px() -> u32 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            bootstrap_nodes: default_bootstrap_nodes(),
            ipv4_only: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            interval_ms: default_interval_ms(),
            keep_bytes: default_keep_bytes(),
            size_px: default_size_px(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl RenderConfig {
    /// Plot output path, if plotting is enabled.
    pub fn output_path(&self) -> Option<PathBuf> {
        (!self.output.is_empty()).then(|| PathBuf::from(&self.output))
    }

    /// Plot settings for the renderer.
    pub fn plot(&self) -> RingPlot {
        RingPlot {
            keep_bytes: self.keep_bytes,
            size_px: self.size_px,
            ..Default::default()
        }
    }
}

impl ScanConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Otherwise `$RINGSCAN_CONFIG` is used
    /// if it names an existing file, and defaults apply if not.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match std::env::var(CONFIG_ENV).map(PathBuf::from) {
                Ok(env_path) if env_path.exists() => Self::from_file(&env_path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ScanConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Apply command-line overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(port) = args.port {
            self.network.listen_port = port;
        }
        if let Some(bootstrap) = &args.bootstrap {
            self.network.bootstrap_nodes = vec![bootstrap.clone()];
        }
        if let Some(output) = &args.output {
            self.render.output = output.display().to_string();
        }
        if let Some(nodes) = args.swarm_size {
            self.swarm.nodes = nodes;
        }
        if let Some(seed) = args.seed {
            self.swarm.seed = Some(seed);
        }
        if let Some(level) = &args.log_level {
            self.advanced.log_level = level.clone();
        }
    }
}

/// Split a `host[:port]` bootstrap address, defaulting the port to 4222.
///
/// Bracketed IPv6 literals (`[::1]:4222`) are unwrapped.
pub fn parse_bootstrap(addr: &str) -> (String, String) {
    let default_port = DEFAULT_PORT.to_string();

    if let Some(rest) = addr.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').filter(|p| !p.is_empty());
            return (
                host.to_string(),
                port.map_or(default_port, str::to_string),
            );
        }
    }

    match addr.rsplit_once(':') {
        // More than one colon without brackets: a bare IPv6 address.
        Some((host, _)) if host.contains(':') => (addr.to_string(), default_port),
        Some((host, port)) if !port.is_empty() => (host.to_string(), port.to_string()),
        Some((host, _)) => (host.to_string(), default_port),
        None => (addr.to_string(), default_port),
    }
}
