//! Dense per-rank vertex property array.

use crate::data::property::PropertyValue;
use crate::graph_error::GraphError;
use crate::topology::graph::LocalGraph;
use crate::topology::renumber::RenumberMap;
use crate::topology::vertex::{EdgeIndex, VertexId};
use rayon::prelude::*;
use std::ops::Range;

/// One property value per internal id of a rank's local range, indexed by
/// local offset. Never mutated after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexPropertyTable<P> {
    first: u64,
    values: Vec<P>,
}

impl<P: PropertyValue> VertexPropertyTable<P> {
    /// Compute every local vertex's value from its *original* id with `seed_fn`.
    pub fn generate<V, E, F>(
        graph: &LocalGraph<V, E>,
        renumber: &RenumberMap,
        seed_fn: F,
    ) -> Result<Self, GraphError>
    where
        V: VertexId,
        E: EdgeIndex,
        F: Fn(u64) -> P + Sync,
    {
        let range = graph.local_range();
        let values = (range.start..range.end)
            .into_par_iter()
            .map(|internal| renumber.original_of(internal).map(&seed_fn))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            first: range.start,
            values,
        })
    }

    /// Wrap values already laid out for the range starting at `first`.
    pub fn from_values(first: u64, values: Vec<P>) -> Self {
        Self { first, values }
    }

    pub fn local_range(&self) -> Range<u64> {
        self.first..self.first + self.values.len() as u64
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of internal id `v`, if it is local.
    pub fn get(&self, v: u64) -> Option<&P> {
        v.checked_sub(self.first)
            .and_then(|off| self.values.get(off as usize))
    }

    pub fn value_at(&self, local_offset: usize) -> Option<&P> {
        self.values.get(local_offset)
    }

    pub fn values(&self) -> &[P] {
        &self.values
    }

    /// `(internal id, value)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &P)> + '_ {
        (self.first..).zip(self.values.iter())
    }
}
