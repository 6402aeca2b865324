//! Ordered, deduplicating collection of discovered node identifiers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{CrawlError, InfoHash, Result};

/// A set of node identifiers kept in ascending identifier order.
///
/// Inserting an identifier that is already present is a no-op, so merging
/// is commutative and idempotent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSet {
    nodes: BTreeSet<InfoHash>,
}

impl NodeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one node. Returns `true` if it was not already present.
    pub fn insert(&mut self, id: InfoHash) -> bool {
        self.nodes.insert(id)
    }

    /// Union `other` into this set, returning how many members were new.
    pub fn merge(&mut self, other: &NodeSet) -> usize {
        let before = self.nodes.len();
        self.nodes.extend(other.nodes.iter().copied());
        self.nodes.len() - before
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: &InfoHash) -> bool {
        self.nodes.contains(id)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Smallest member.
    pub fn first(&self) -> Result<&InfoHash> {
        self.nodes.first().ok_or(CrawlError::EmptyNodeSet)
    }

    /// Largest member.
    pub fn last(&self) -> Result<&InfoHash> {
        self.nodes.last().ok_or(CrawlError::EmptyNodeSet)
    }

    /// Leading bits shared by every member, i.e. `common_bits(first, last)`.
    pub fn common_prefix_bits(&self) -> Result<usize> {
        Ok(InfoHash::common_bits(self.first()?, self.last()?))
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &InfoHash> + '_ {
        self.nodes.iter()
    }
}

impl Extend<InfoHash> for NodeSet {
    fn extend<I: IntoIterator<Item = InfoHash>>(&mut self, iter: I) {
        self.nodes.extend(iter);
    }
}

impl FromIterator<InfoHash> for NodeSet {
    fn from_iter<I: IntoIterator<Item = InfoHash>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for NodeSet {
    type Item = InfoHash;
    type IntoIter = std::collections::btree_set::IntoIter<InfoHash>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a InfoHash;
    type IntoIter = std::collections::btree_set::Iter<'a, InfoHash>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
