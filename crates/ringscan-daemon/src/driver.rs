//! Driving loop: re-render the ring while the crawl runs, once more after it
//! terminates, then hand back the final report.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use ringscan_crawl::{CrawlReport, CrawlSession};
use ringscan_ring::{bucket_histogram, RingPlot};

/// Number of arcs in the density summary logged with each render.
const HISTOGRAM_BUCKETS: usize = 16;

/// Periodic renderer over a crawl session.
pub struct Driver {
    session: Arc<CrawlSession>,
    plot: RingPlot,
    output: Option<PathBuf>,
    interval: Duration,
}

impl Driver {
    /// Create a driver. With `output == None` only progress is logged.
    pub fn new(
        session: Arc<CrawlSession>,
        plot: RingPlot,
        output: Option<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            session,
            plot,
            output,
            interval,
        }
    }

    /// Render on every tick until the crawl finishes, then render a last time.
    pub async fn drive(&self) -> CrawlReport {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.session.tracker().wait_finished() => break,
                _ = ticker.tick() => {
                    info!(
                        nodes = self.session.node_count(),
                        in_flight = self.session.tracker().in_flight(),
                        "Crawl progress"
                    );
                    self.render();
                }
            }
        }

        self.render();
        self.session.report()
    }

    /// Render the current node set.
    pub fn render(&self) {
        let Some(path) = &self.output else {
            return;
        };
        let nodes = self.session.snapshot();
        if let Err(e) = self.plot.write(path, &nodes) {
            warn!(path = %path.display(), error = %e, "Failed to write ring plot");
            return;
        }
        let histogram = bucket_histogram(&nodes, HISTOGRAM_BUCKETS);
        debug!(?histogram, "Ring density");
    }
}
