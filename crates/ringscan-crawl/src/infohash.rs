//! 160-bit DHT keyspace identifiers.
//!
//! Bits are addressed MSB-first: bit `0` is the most significant bit of byte
//! `0` and bit `159` is the least significant bit of byte `19`. This is the
//! encoding used by OpenDHT's `InfoHash`, so a probe built here addresses the
//! same keyspace point the engine sees on the wire.
//!
//! The derived `Ord` compares bytes lexicographically, which is ascending
//! big-endian numeric order.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{CrawlError, Result, HASH_BITS, HASH_LEN};

/// A point in the 160-bit DHT keyspace.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InfoHash([u8; HASH_LEN]);

impl InfoHash {
    /// The all-zero identifier.
    pub const fn zero() -> Self {
        Self([0u8; HASH_LEN])
    }

    /// Wrap raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an identifier from a slice, which must be exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| {
            CrawlError::InvalidHash(format!(
                "expected {HASH_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// A uniformly random identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; HASH_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Derive a node identifier from an Ed25519 public key: the first 20
    /// bytes of its BLAKE3 digest.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest = blake3::hash(public_key);
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..HASH_LEN]);
        Self(bytes)
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// The first `n` bytes of the identifier (clamped to the width).
    pub fn leading_bytes(&self, n: usize) -> &[u8] {
        &self.0[..n.min(HASH_LEN)]
    }

    /// Read bit `pos`.
    pub fn get_bit(&self, pos: usize) -> Result<bool> {
        check_pos(pos)?;
        Ok(self.0[pos / 8] & mask(pos) != 0)
    }

    /// Set bit `pos` to `val` in place.
    pub fn set_bit(&mut self, pos: usize, val: bool) -> Result<()> {
        check_pos(pos)?;
        if val {
            self.0[pos / 8] |= mask(pos);
        } else {
            self.0[pos / 8] &= !mask(pos);
        }
        Ok(())
    }

    /// Copy of this identifier with bit `pos` set to `val`.
    ///
    /// Subdivision builds children through this so an identifier already
    /// handed to a lookup is never touched again.
    pub fn with_bit(&self, pos: usize, val: bool) -> Result<Self> {
        let mut child = *self;
        child.set_bit(pos, val)?;
        Ok(child)
    }

    /// Number of leading bits shared by `a` and `b`, from 0 (differ in the
    /// first bit) to 160 (identical).
    pub fn common_bits(a: &Self, b: &Self) -> usize {
        for (i, (x, y)) in a.0.iter().zip(b.0.iter()).enumerate() {
            let diff = x ^ y;
            if diff != 0 {
                return i * 8 + diff.leading_zeros() as usize;
            }
        }
        HASH_BITS
    }

    /// XOR distance between two identifiers.
    pub fn xor_distance(a: &Self, b: &Self) -> Self {
        let mut out = [0u8; HASH_LEN];
        for (o, (x, y)) in out.iter_mut().zip(a.0.iter().zip(b.0.iter())) {
            *o = x ^ y;
        }
        Self(out)
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

fn check_pos(pos: usize) -> Result<()> {
    if pos >= HASH_BITS {
        return Err(CrawlError::BitOutOfRange {
            pos,
            width: HASH_BITS,
        });
    }
    Ok(())
}

fn mask(pos: usize) -> u8 {
    0x80 >> (pos % 8)
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl FromStr for InfoHash {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CrawlError::InvalidHash(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl From<[u8; HASH_LEN]> for InfoHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for InfoHash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for InfoHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
