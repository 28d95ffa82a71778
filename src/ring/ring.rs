use std::collections::BTreeMap;

use super::hashing::{hash32, virtual_node_label};
use crate::membership::types::NodeIdentity;

/// Immutable consistent-hash ring.
///
/// Ordered map from ring position to owning node. Each physical node occupies
/// `virtual_nodes` positions. Lookups take the first position at or after the
/// key's hash and wrap to the lowest position past the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashRing {
    entries: BTreeMap<u32, NodeIdentity>,
}

impl HashRing {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Places `virtual_nodes` positions per member, hashing
    /// `"{address}-VN{i}"`. On a position collision the later member wins.
    pub fn build(members: &[NodeIdentity], virtual_nodes: usize) -> Self {
        let mut entries = BTreeMap::new();

        for member in members {
            let address = member.address();
            for i in 0..virtual_nodes {
                let label = virtual_node_label(&address, i);
                let position = hash32(&label);
                tracing::trace!("Virtual node {} at {}", label, position);
                entries.insert(position, member.clone());
            }
        }

        Self { entries }
    }

    /// Ring with explicit positions, bypassing virtual node hashing.
    pub fn from_entries(entries: impl IntoIterator<Item = (u32, NodeIdentity)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn owner_of(&self, key: &str) -> Option<&NodeIdentity> {
        self.owner_of_hash(hash32(key))
    }

    pub fn owner_of_hash(&self, hash: u32) -> Option<&NodeIdentity> {
        self.entries
            .range(hash..)
            .next()
            .or_else(|| self.entries.iter().next())
            .map(|(_, owner)| owner)
    }

    /// Number of ring positions (virtual nodes).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = (u32, &NodeIdentity)> {
        self.entries.iter().map(|(position, owner)| (*position, owner))
    }
}
