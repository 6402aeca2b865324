//! SVG ring plot.
//!
//! The plot is rebuilt from scratch on every render; the driving loop calls
//! [`RingPlot::write`] on an interval while the crawl runs and once more
//! after it terminates.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use ringscan_crawl::NodeSet;

use crate::projection::ring_points;
use crate::{Result, DEFAULT_KEEP_BYTES};

/// Ring plot settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RingPlot {
    /// Leading identifier bytes used for the angular position.
    #[serde(default = "default_keep_bytes")]
    pub keep_bytes: usize,
    /// Width and height of the image.
    #[serde(default = "default_size_px")]
    pub size_px: u32,
    /// Radius of each node marker.
    #[serde(default = "default_point_radius")]
    pub point_radius: f64,
}

fn default_keep_bytes() -> usize {
    DEFAULT_KEEP_BYTES
}

fn default_size_px() -> u32 {
    600
}

fn default_point_radius() -> f64 {
    3.0
}

impl Default for RingPlot {
    fn default() -> Self {
        Self {
            keep_bytes: default_keep_bytes(),
            size_px: default_size_px(),
            point_radius: default_point_radius(),
        }
    }
}

impl RingPlot {
    /// Render `nodes` as a standalone SVG document.
    pub fn render(&self, nodes: &NodeSet) -> Result<String> {
        let points = ring_points(nodes, self.keep_bytes)?;

        let size = f64::from(self.size_px);
        let center = size / 2.0;
        // Unit circle spans 2/3 of the canvas, as with axis limits of ±1.5.
        let radius = size / 3.0;

        let mut out = String::with_capacity(256 + points.len() * 96);
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{s}" height="{s}" viewBox="0 0 {s} {s}">"#,
            s = self.size_px
        );
        let _ = writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            out,
            r##"<circle cx="{center}" cy="{center}" r="{radius}" fill="none" stroke="#cccccc"/>"##
        );

        for p in &points {
            // SVG y grows downwards.
            let cx = center + p.x * radius;
            let cy = center - p.y * radius;
            let _ = writeln!(
                out,
                r#"<polygon points="{}" fill="blue"/>"#,
                hexagon(cx, cy, self.point_radius)
            );
        }

        let _ = writeln!(
            out,
            r#"<text x="10" y="20" font-family="monospace" font-size="14">{} nodes</text>"#,
            points.len()
        );
        out.push_str("</svg>\n");
        Ok(out)
    }

    /// Render `nodes` and replace `path` with the result.
    ///
    /// The document is written to a sibling temporary file first and renamed
    /// over `path`, so a reader never sees a partial plot.
    pub fn write(&self, path: &Path, nodes: &NodeSet) -> Result<()> {
        let svg = self.render(nodes)?;
        let tmp = temp_path(path);
        std::fs::write(&tmp, svg)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), nodes = nodes.len(), "Ring plot written");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn hexagon(cx: f64, cy: f64, r: f64) -> String {
    (0..6)
        .map(|i| {
            let a = std::f64::consts::FRAC_PI_3 * f64::from(i);
            format!("{:.2},{:.2}", cx + r * a.cos(), cy + r * a.sin())
        })
        .collect::<Vec<_>>()
        .join(" ")
}
