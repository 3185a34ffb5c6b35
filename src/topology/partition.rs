//! Contiguous vertex ranges, one per rank.
//!
//! After renumbering, rank `r` owns internal ids `offsets[r]..offsets[r + 1]`.
//! Any rank can decide locality of an id with one range check and find the
//! owner with a binary search over the `n_parts + 1` boundaries.

use crate::debug_invariants::DebugInvariants;
use crate::graph_error::GraphError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Serialized as its boundary list; deserializing validates it like
/// [`VertexPartition::from_offsets`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct VertexPartition {
    offsets: Vec<u64>,
}

impl VertexPartition {
    /// Build from `n_parts + 1` boundaries; the first must be zero and the
    /// sequence non-decreasing.
    pub fn from_offsets(offsets: Vec<u64>) -> Result<Self, GraphError> {
        let p = Self { offsets };
        p.validate_invariants()?;
        Ok(p)
    }

    /// Build from per-rank vertex counts.
    pub fn from_counts(counts: &[u64]) -> Result<Self, GraphError> {
        if counts.is_empty() {
            return Err(GraphError::ZeroRanks);
        }
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        offsets.push(0u64);
        let mut acc = 0u64;
        for &c in counts {
            acc = acc
                .checked_add(c)
                .ok_or_else(|| GraphError::InvalidPartition("vertex count overflows u64".into()))?;
            offsets.push(acc);
        }
        Self::from_offsets(offsets)
    }

    pub fn n_parts(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn n_vertices(&self) -> u64 {
        self.offsets[self.n_parts()]
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Range of internal ids owned by `rank`.
    pub fn range(&self, rank: usize) -> Result<Range<u64>, GraphError> {
        if rank >= self.n_parts() {
            return Err(GraphError::RankOutOfRange {
                rank,
                n_ranks: self.n_parts(),
            });
        }
        Ok(self.offsets[rank]..self.offsets[rank + 1])
    }

    pub fn count(&self, rank: usize) -> Result<usize, GraphError> {
        self.range(rank).map(|r| (r.end - r.start) as usize)
    }

    /// Rank owning internal id `v`.
    pub fn owner_of(&self, v: u64) -> Result<usize, GraphError> {
        if v >= self.n_vertices() {
            return Err(GraphError::VertexOutOfRange(v));
        }
        // last rank whose range starts at or before v; empty ranges are skipped
        Ok(self.offsets.partition_point(|&o| o <= v) - 1)
    }

    pub fn is_local(&self, rank: usize, v: u64) -> bool {
        rank < self.n_parts() && self.offsets[rank] <= v && v < self.offsets[rank + 1]
    }

    /// Position of `v` inside `rank`'s range, if it lives there.
    pub fn local_offset(&self, rank: usize, v: u64) -> Option<usize> {
        self.is_local(rank, v)
            .then(|| (v - self.offsets[rank]) as usize)
    }
}

impl DebugInvariants for VertexPartition {
    fn debug_assert_invariants(&self) {
        crate::assert_invariants!(self.validate_invariants(), "VertexPartition");
    }

    fn validate_invariants(&self) -> Result<(), GraphError> {
        match self.offsets.first() {
            None => return Err(GraphError::ZeroRanks),
            Some(&first) if first != 0 => {
                return Err(GraphError::InvalidPartition(format!(
                    "first boundary is {first}, expected 0"
                )));
            }
            _ => {}
        }
        if self.offsets.len() < 2 {
            return Err(GraphError::ZeroRanks);
        }
        if let Some(w) = self.offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(GraphError::InvalidPartition(format!(
                "boundary {} ({}) exceeds boundary {} ({})",
                w,
                self.offsets[w],
                w + 1,
                self.offsets[w + 1]
            )));
        }
        Ok(())
    }
}

impl TryFrom<Vec<u64>> for VertexPartition {
    type Error = GraphError;

    fn try_from(offsets: Vec<u64>) -> Result<Self, GraphError> {
        Self::from_offsets(offsets)
    }
}

impl From<VertexPartition> for Vec<u64> {
    fn from(p: VertexPartition) -> Self {
        p.offsets
    }
}
