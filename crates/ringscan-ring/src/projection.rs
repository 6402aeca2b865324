//! Identifier to ring-position mapping.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use ringscan_crawl::{InfoHash, NodeSet};

use crate::{Result, RingError, MAX_KEEP_BYTES};

/// Significant bits of an `f64` (including the implicit leading one).
const F64_MANTISSA_BITS: u32 = f64::MANTISSA_DIGITS;

/// A node placed on the unit circle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingPoint {
    /// Fraction of a full turn, in `[0, 1)`.
    pub turn: f64,
    /// `cos(2π·turn)`.
    pub x: f64,
    /// `sin(2π·turn)`.
    pub y: f64,
}

/// Map `id` to `[0, 1)`: the big-endian integer formed by its first
/// `keep_bytes` bytes, divided by `2^(8·keep_bytes)`.
pub fn identifier_to_unit_interval(id: &InfoHash, keep_bytes: usize) -> Result<f64> {
    if keep_bytes == 0 || keep_bytes > MAX_KEEP_BYTES {
        return Err(RingError::InvalidKeepBytes {
            got: keep_bytes,
            max: MAX_KEEP_BYTES,
        });
    }
    let value = id
        .leading_bytes(keep_bytes)
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    // Keep at most 53 significant bits so the conversion to f64 is exact
    // and the quotient stays strictly below 1.
    let bits = 8 * keep_bytes as u32;
    let (value, bits) = if bits > F64_MANTISSA_BITS {
        (value >> (bits - F64_MANTISSA_BITS), F64_MANTISSA_BITS)
    } else {
        (value, bits)
    };
    Ok(value as f64 / 2f64.powi(bits as i32))
}

/// Place every node of `nodes` on the unit circle.
pub fn ring_points(nodes: &NodeSet, keep_bytes: usize) -> Result<Vec<RingPoint>> {
    nodes
        .iter()
        .map(|id| {
            let turn = identifier_to_unit_interval(id, keep_bytes)?;
            let angle = turn * TAU;
            Ok(RingPoint {
                turn,
                x: angle.cos(),
                y: angle.sin(),
            })
        })
        .collect()
}

/// Count nodes per equal-width arc of the ring.
pub fn bucket_histogram(nodes: &NodeSet, buckets: usize) -> Vec<usize> {
    let mut counts = vec![0usize; buckets];
    if buckets == 0 {
        return counts;
    }
    for id in nodes {
        let turn = identifier_to_unit_interval(id, MAX_KEEP_BYTES).unwrap_or(0.0);
        let idx = ((turn * buckets as f64) as usize).min(buckets - 1);
        counts[idx] += 1;
    }
    counts
}
