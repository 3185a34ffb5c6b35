//! Partitioned graph store.
//!
//! [`partition_edges`] turns a raw edge list in original ids into one
//! [`LocalGraph`] per rank. Each edge lives on the rank owning its
//! destination; its source may be owned by any rank. Local slices are stored
//! column-wise (CSC): `offsets[i]..offsets[i + 1]` are the incoming edges of
//! the `i`-th local vertex, `sources` holds their internal source ids.

use crate::debug_invariants::{DebugInvariants, validate_each};
use crate::graph_error::GraphError;
use crate::topology::partition::VertexPartition;
use crate::topology::renumber::{RenumberMap, Renumberer};
use crate::topology::vertex::{EdgeIndex, VertexId};
use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;

/// Edges in original ids, as produced by a file reader or a generator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawEdgeList {
    pub edges: Vec<(u64, u64)>,
    /// One weight per edge, or none at all.
    pub weights: Option<Vec<f32>>,
    /// Explicit vertex set; isolated vertices only exist through it. When
    /// absent, the vertex set is the set of edge endpoints.
    pub vertices: Option<Vec<u64>>,
}

impl RawEdgeList {
    pub fn new(edges: Vec<(u64, u64)>) -> Self {
        Self {
            edges,
            weights: None,
            vertices: None,
        }
    }

    pub fn with_weights(mut self, weights: Vec<f32>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Declare vertices `0..n`.
    pub fn with_num_vertices(mut self, n: u64) -> Self {
        self.vertices = Some((0..n).collect());
        self
    }

    pub fn with_vertices(mut self, vertices: Vec<u64>) -> Self {
        self.vertices = Some(vertices);
        self
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if let Some(w) = &self.weights {
            if w.len() != self.edges.len() {
                return Err(GraphError::MalformedDataset(format!(
                    "{} weights for {} edges",
                    w.len(),
                    self.edges.len()
                )));
            }
        }
        if let Some(vs) = &self.vertices {
            let mut sorted = vs.clone();
            sorted.sort_unstable();
            if let Some(&(u, v)) = self
                .edges
                .iter()
                .find(|(u, v)| sorted.binary_search(u).is_err() || sorted.binary_search(v).is_err())
            {
                return Err(GraphError::MalformedDataset(format!(
                    "edge ({u}, {v}) references an undeclared vertex"
                )));
            }
        }
        Ok(())
    }

    /// Distinct vertex ids, ascending.
    pub fn vertex_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = match &self.vertices {
            Some(vs) => vs.clone(),
            None => self.edges.iter().flat_map(|&(u, v)| [u, v]).collect(),
        };
        ids.par_sort_unstable();
        ids.dedup();
        ids
    }
}

/// One rank's slice of the graph.
#[derive(Clone, Debug)]
pub struct LocalGraph<V, E> {
    rank: usize,
    partition: VertexPartition,
    /// Internal ids of the local range, in order.
    vertices: Vec<V>,
    offsets: Vec<E>,
    sources: Vec<V>,
    weights: Option<Vec<f32>>,
}

impl<V: VertexId, E: EdgeIndex> LocalGraph<V, E> {
    /// Build rank `rank`'s slice from `(src, dst)` pairs in internal ids.
    /// Every destination must be local; `weights`, when present, runs
    /// parallel to `edges`.
    pub fn from_edges(
        rank: usize,
        partition: VertexPartition,
        edges: &[(u64, u64)],
        weights: Option<&[f32]>,
    ) -> Result<Self, GraphError> {
        let range = partition.range(rank)?;
        if let Some(w) = weights {
            if w.len() != edges.len() {
                return Err(GraphError::LengthMismatch {
                    what: "edge weights",
                    expected: edges.len(),
                    found: w.len(),
                });
            }
        }
        let n_local = (range.end - range.start) as usize;
        if range.end > 0 {
            V::try_from_u64(range.end - 1)?;
        }
        E::try_from_usize(edges.len())?;

        // counting sort by local destination offset
        let mut counts = vec![0usize; n_local + 1];
        for &(src, dst) in edges {
            let off = partition
                .local_offset(rank, dst)
                .ok_or(GraphError::VertexOutOfRange(dst))?;
            if src >= partition.n_vertices() {
                return Err(GraphError::VertexOutOfRange(src));
            }
            counts[off + 1] += 1;
        }
        for i in 0..n_local {
            counts[i + 1] += counts[i];
        }
        let mut cursor = counts.clone();
        let mut sources = vec![V::zero(); edges.len()];
        let mut sorted_weights = weights.map(|_| vec![0f32; edges.len()]);
        for (i, &(src, dst)) in edges.iter().enumerate() {
            let off = (dst - range.start) as usize;
            let slot = cursor[off];
            cursor[off] += 1;
            sources[slot] = V::try_from_u64(src)?;
            if let (Some(out), Some(w)) = (sorted_weights.as_mut(), weights) {
                out[slot] = w[i];
            }
        }

        let offsets = counts
            .into_iter()
            .map(E::try_from_usize)
            .collect::<Result<Vec<_>, _>>()?;
        let vertices = range
            .map(V::try_from_u64)
            .collect::<Result<Vec<_>, _>>()?;

        let graph = Self {
            rank,
            partition,
            vertices,
            offsets,
            sources,
            weights: sorted_weights,
        };
        graph.debug_assert_invariants();
        Ok(graph)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn partition(&self) -> &VertexPartition {
        &self.partition
    }

    /// Internal ids owned by this rank.
    pub fn local_range(&self) -> Range<u64> {
        self.partition
            .range(self.rank)
            .unwrap_or(0..0)
    }

    pub fn local_vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn n_local_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_edges(&self) -> usize {
        self.sources.len()
    }

    pub fn offsets(&self) -> &[E] {
        &self.offsets
    }

    pub fn sources(&self) -> &[V] {
        &self.sources
    }

    pub fn weights(&self) -> Option<&[f32]> {
        self.weights.as_deref()
    }

    pub fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// Edge indices of the incoming edges of local vertex `local_offset`.
    pub fn edge_range(&self, local_offset: usize) -> Range<usize> {
        self.offsets[local_offset].as_index()..self.offsets[local_offset + 1].as_index()
    }

    /// `(edge index, source, destination)` in storage order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, V, V)> + '_ {
        (0..self.n_local_vertices()).flat_map(move |off| {
            let dst = self.vertices[off];
            self.edge_range(off).map(move |e| (e, self.sources[e], dst))
        })
    }

    /// Parallel version of [`LocalGraph::edges`].
    pub fn par_edges(&self) -> impl ParallelIterator<Item = (usize, V, V)> + '_ {
        (0..self.n_local_vertices())
            .into_par_iter()
            .flat_map_iter(move |off| {
                let dst = self.vertices[off];
                self.edge_range(off).map(move |e| (e, self.sources[e], dst))
            })
    }

    /// Position of internal id `v` inside the local range.
    pub fn local_offset(&self, v: u64) -> Option<usize> {
        self.partition.local_offset(self.rank, v)
    }
}

impl<V: VertexId, E: EdgeIndex> DebugInvariants for LocalGraph<V, E> {
    fn debug_assert_invariants(&self) {
        crate::assert_invariants!(self.validate_invariants(), "LocalGraph");
    }

    fn validate_invariants(&self) -> Result<(), GraphError> {
        self.partition.validate_invariants()?;
        let n_local = self.partition.count(self.rank)?;
        if self.vertices.len() != n_local {
            return Err(GraphError::LengthMismatch {
                what: "local vertex list",
                expected: n_local,
                found: self.vertices.len(),
            });
        }
        if self.offsets.len() != n_local + 1 {
            return Err(GraphError::LengthMismatch {
                what: "edge offsets",
                expected: n_local + 1,
                found: self.offsets.len(),
            });
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1])
            || self.offsets.first().is_some_and(|o| !o.is_zero())
        {
            return Err(GraphError::InvalidPartition(format!(
                "rank {} edge offsets are not monotone from zero",
                self.rank
            )));
        }
        let last = self.offsets.last().map_or(0, |o| o.as_index());
        if last != self.sources.len() {
            return Err(GraphError::LengthMismatch {
                what: "edge sources",
                expected: last,
                found: self.sources.len(),
            });
        }
        if let Some(w) = &self.weights {
            if w.len() != self.sources.len() {
                return Err(GraphError::LengthMismatch {
                    what: "edge weights",
                    expected: self.sources.len(),
                    found: w.len(),
                });
            }
        }
        let n = self.partition.n_vertices();
        if let Some(bad) = self.sources.iter().find(|s| s.widen() >= n) {
            return Err(GraphError::VertexOutOfRange(bad.widen()));
        }
        Ok(())
    }
}

/// All ranks' slices plus the shared renumber map.
#[derive(Clone, Debug)]
pub struct PartitionedGraph<V, E> {
    renumber: Arc<RenumberMap>,
    locals: Vec<LocalGraph<V, E>>,
}

impl<V: VertexId, E: EdgeIndex> PartitionedGraph<V, E> {
    pub fn n_parts(&self) -> usize {
        self.locals.len()
    }

    pub fn renumber(&self) -> &Arc<RenumberMap> {
        &self.renumber
    }

    pub fn local(&self, rank: usize) -> Option<&LocalGraph<V, E>> {
        self.locals.get(rank)
    }

    pub fn locals(&self) -> &[LocalGraph<V, E>] {
        &self.locals
    }

    pub fn n_edges(&self) -> usize {
        self.locals.iter().map(LocalGraph::n_edges).sum()
    }

    /// Hand every rank its slice; the renumber map is shared.
    pub fn into_parts(self) -> (Arc<RenumberMap>, Vec<LocalGraph<V, E>>) {
        (self.renumber, self.locals)
    }

    /// All edges in original ids, `(src, dst, weight)`, in rank then storage order.
    pub fn original_edges(&self) -> Result<Vec<(u64, u64, Option<f32>)>, GraphError> {
        let mut out = Vec::with_capacity(self.n_edges());
        for local in &self.locals {
            for (e, src, dst) in local.edges() {
                out.push((
                    self.renumber.original_of(src.widen())?,
                    self.renumber.original_of(dst.widen())?,
                    local.weights().map(|w| w[e]),
                ));
            }
        }
        Ok(out)
    }
}

impl<V: VertexId, E: EdgeIndex> DebugInvariants for PartitionedGraph<V, E> {
    fn debug_assert_invariants(&self) {
        crate::assert_invariants!(self.validate_invariants(), "PartitionedGraph");
    }

    fn validate_invariants(&self) -> Result<(), GraphError> {
        self.renumber.validate_invariants()?;
        if self.locals.len() != self.renumber.partition().n_parts() {
            return Err(GraphError::RankCountMismatch {
                expected: self.renumber.partition().n_parts(),
                actual: self.locals.len(),
            });
        }
        validate_each(&self.locals)
    }
}

/// Partition `raw` across `n_parts` ranks.
///
/// Fails with a configuration error on an empty rank count, inconsistent
/// weights, undeclared endpoints, or ids that overflow `V`/`E`.
pub fn partition_edges<V, E, R>(
    raw: &RawEdgeList,
    n_parts: usize,
    renumberer: &R,
) -> Result<PartitionedGraph<V, E>, GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    R: Renumberer + ?Sized,
{
    if n_parts == 0 {
        return Err(GraphError::ZeroRanks);
    }
    raw.validate()?;
    let renumber = RenumberMap::build(raw.vertex_ids(), n_parts, renumberer)?;
    let partition = renumber.partition().clone();

    let mut buckets: Vec<Vec<(u64, u64)>> = vec![Vec::new(); n_parts];
    let mut weight_buckets: Option<Vec<Vec<f32>>> = raw.weights.as_ref().map(|_| vec![Vec::new(); n_parts]);
    for (i, &(u, v)) in raw.edges.iter().enumerate() {
        let src = renumber.internal_of(u)?;
        let dst = renumber.internal_of(v)?;
        let owner = partition.owner_of(dst)?;
        buckets[owner].push((src, dst));
        if let (Some(wb), Some(w)) = (weight_buckets.as_mut(), raw.weights.as_ref()) {
            wb[owner].push(w[i]);
        }
    }

    let locals = buckets
        .into_par_iter()
        .enumerate()
        .map(|(rank, edges)| {
            let w = weight_buckets.as_ref().map(|wb| wb[rank].as_slice());
            LocalGraph::from_edges(rank, partition.clone(), &edges, w)
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "partitioned {} edges over {} vertices into {} ranks ({} ids), per-rank edges {:?}",
        raw.edges.len(),
        renumber.n_vertices(),
        n_parts,
        V::WIDTH_NAME,
        locals.iter().map(LocalGraph::n_edges).collect::<Vec<_>>()
    );

    let graph = PartitionedGraph {
        renumber: Arc::new(renumber),
        locals,
    };
    graph.debug_assert_invariants();
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::renumber::HashRenumberer;

    fn multiset(mut v: Vec<(u64, u64, Option<f32>)>) -> Vec<(u64, u64, Option<u32>)> {
        v.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)).then(a.2.partial_cmp(&b.2).unwrap()));
        v.into_iter().map(|(a, b, w)| (a, b, w.map(f32::to_bits))).collect()
    }

    #[test]
    fn union_of_slices_is_input() {
        let edges = vec![(0, 1), (1, 2), (2, 0), (2, 0), (3, 3), (5, 1)];
        let weights: Vec<f32> = (0..edges.len()).map(|i| i as f32 * 0.5).collect();
        let raw = RawEdgeList::new(edges.clone()).with_weights(weights.clone());
        let g = partition_edges::<u32, u32, _>(&raw, 3, &HashRenumberer).unwrap();
        assert_eq!(g.n_edges(), edges.len());
        let want: Vec<_> = edges
            .iter()
            .zip(&weights)
            .map(|(&(u, v), &w)| (u, v, Some(w)))
            .collect();
        assert_eq!(multiset(g.original_edges().unwrap()), multiset(want));
    }

    #[test]
    fn edges_live_with_their_destination() {
        let raw = RawEdgeList::new(vec![(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)]);
        let g = partition_edges::<u64, u64, _>(&raw, 2, &HashRenumberer).unwrap();
        for local in g.locals() {
            for (_, _, dst) in local.edges() {
                assert!(local.partition().is_local(local.rank(), dst));
            }
            assert!(local.validate_invariants().is_ok());
        }
    }

    #[test]
    fn isolated_vertices_are_owned() {
        let raw = RawEdgeList::new(vec![(0, 1)]).with_num_vertices(6);
        let g = partition_edges::<u32, u32, _>(&raw, 4, &HashRenumberer).unwrap();
        assert_eq!(g.renumber().n_vertices(), 6);
        let total: usize = g.locals().iter().map(LocalGraph::n_local_vertices).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn malformed_inputs_fail_before_partitioning() {
        let raw = RawEdgeList::new(vec![(0, 1)]).with_weights(vec![]);
        assert!(matches!(
            partition_edges::<u32, u32, _>(&raw, 2, &HashRenumberer),
            Err(GraphError::MalformedDataset(_))
        ));
        let raw = RawEdgeList::new(vec![(0, 9)]).with_num_vertices(4);
        assert!(matches!(
            partition_edges::<u32, u32, _>(&raw, 2, &HashRenumberer),
            Err(GraphError::MalformedDataset(_))
        ));
        let raw = RawEdgeList::new(vec![(0, 1)]);
        assert_eq!(
            partition_edges::<u32, u32, _>(&raw, 0, &HashRenumberer).map(|_| ()),
            Err(GraphError::ZeroRanks)
        );
    }
}
