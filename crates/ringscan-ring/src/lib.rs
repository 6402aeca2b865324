//! # ringscan-ring
//!
//! Renders a discovered node set as points on a unit circle.
//!
//! Each identifier is mapped to a fraction of a full turn from its leading
//! bytes (see [`projection::identifier_to_unit_interval`]); a uniformly
//! populated swarm shows up as an evenly dotted ring, gaps and clusters show
//! up as uneven density.
//!
//! - [`projection`] — identifier → unit interval → ring coordinates
//! - [`svg`] — standalone SVG plot, written atomically

pub mod projection;
pub mod svg;

pub use projection::{bucket_histogram, identifier_to_unit_interval, ring_points, RingPoint};
pub use svg::RingPlot;

/// Leading identifier bytes used for the angular position by default.
pub const DEFAULT_KEEP_BYTES: usize = 4;

/// Largest supported `keep_bytes` (the projection goes through a `u64`).
pub const MAX_KEEP_BYTES: usize = 8;

/// Error types for ring rendering.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// `keep_bytes` outside `1..=8`.
    #[error("keep_bytes must be in 1..={max}, got {got}")]
    InvalidKeepBytes { got: usize, max: usize },

    /// Writing the rendered plot failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for ring rendering.
pub type Result<T> = std::result::Result<T, RingError>;
