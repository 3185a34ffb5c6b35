//! Property propagation: give every local edge the properties of both of its
//! endpoints.
//!
//! Destinations are always local, so their values come straight from the
//! rank's [`VertexPropertyTable`]. Sources may live anywhere; the values of
//! remote sources are fetched in one request/reply round:
//!  1. each rank sends every owner the distinct remote source ids it needs,
//!  2. each owner answers with the values of the requested ids, in order.
//!
//! Both rounds are [`all_to_all_values`] calls, and the pass ends with a
//! barrier so no operator pass starts before propagation finished everywhere.

use crate::algs::collective::all_to_all_values;
use crate::algs::communicator::Communicator;
use crate::algs::context::ExecContext;
use crate::data::property::PropertyValue;
use crate::data::property_table::VertexPropertyTable;
use crate::graph_error::GraphError;
use crate::topology::graph::LocalGraph;
use crate::topology::vertex::{EdgeIndex, VertexId};
use hashbrown::HashMap;
use rayon::prelude::*;

/// One endpoint property per local edge, in the graph's edge storage order.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeEndpointCache<P> {
    values: Vec<P>,
}

impl<P: PropertyValue> EdgeEndpointCache<P> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Property for edge index `e`.
    pub fn get(&self, e: usize) -> Option<&P> {
        self.values.get(e)
    }

    pub fn values(&self) -> &[P] {
        &self.values
    }
}

fn check_alignment<V, E, P, C>(
    ctx: &ExecContext<'_, C>,
    graph: &LocalGraph<V, E>,
    table: &VertexPropertyTable<P>,
) -> Result<(), GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    C: Communicator,
{
    let n_parts = graph.partition().n_parts();
    if ctx.size() != n_parts {
        return Err(GraphError::RankCountMismatch {
            expected: n_parts,
            actual: ctx.size(),
        });
    }
    if ctx.rank() != graph.rank() {
        return Err(GraphError::InvalidPartition(format!(
            "rank {} was handed the slice of rank {}",
            ctx.rank(),
            graph.rank()
        )));
    }
    if table.local_range() != graph.local_range() {
        return Err(GraphError::LengthMismatch {
            what: "vertex property table",
            expected: graph.n_local_vertices(),
            found: table.len(),
        });
    }
    Ok(())
}

/// Distinct remote source ids of `graph`, grouped by owning rank.
fn remote_requests<V: VertexId, E: EdgeIndex>(
    graph: &LocalGraph<V, E>,
) -> Result<Vec<Vec<u64>>, GraphError> {
    let partition = graph.partition();
    let me = graph.rank();
    let mut requests = vec![Vec::new(); partition.n_parts()];
    for src in graph.sources() {
        let src = src.widen();
        if !partition.is_local(me, src) {
            requests[partition.owner_of(src)?].push(src);
        }
    }
    requests.par_iter_mut().for_each(|ids| {
        ids.sort_unstable();
        ids.dedup();
    });
    Ok(requests)
}

/// Materialise `(source, destination)` properties for every local edge.
///
/// Collective: every rank of `ctx` must call it with its own slice and table.
/// Calling it twice yields identical caches.
pub fn propagate<V, E, P, C>(
    ctx: &ExecContext<'_, C>,
    graph: &LocalGraph<V, E>,
    table: &VertexPropertyTable<P>,
) -> Result<(EdgeEndpointCache<P>, EdgeEndpointCache<P>), GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    C: Communicator,
{
    check_alignment(ctx, graph, table)?;
    let me = ctx.rank();

    // destinations: one local value per incoming edge
    let dst_values: Vec<P> = (0..graph.n_local_vertices())
        .into_par_iter()
        .flat_map_iter(|off| {
            let value = table.values()[off];
            std::iter::repeat_n(value, graph.edge_range(off).len())
        })
        .collect();

    // sources: request remote ids, answer the requests addressed to us
    let requests = remote_requests(graph)?;
    let incoming = all_to_all_values(ctx, &requests)?;
    let answers = incoming
        .iter()
        .enumerate()
        .map(|(peer, ids)| {
            ids.iter()
                .map(|&id| {
                    table.get(id).copied().ok_or_else(|| {
                        GraphError::comm(peer, format!("asked rank {me} for vertex {id} it does not own"))
                    })
                })
                .collect::<Result<Vec<P>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    let replies = all_to_all_values(ctx, &answers)?;

    let mut remote: HashMap<u64, P> = HashMap::with_capacity(requests.iter().map(Vec::len).sum());
    for (peer, (ids, values)) in requests.iter().zip(&replies).enumerate() {
        if ids.len() != values.len() {
            return Err(GraphError::comm(
                peer,
                format!("requested {} source properties, received {}", ids.len(), values.len()),
            ));
        }
        remote.extend(ids.iter().copied().zip(values.iter().copied()));
    }

    let src_values = graph
        .sources()
        .par_iter()
        .map(|s| {
            let s = s.widen();
            table
                .get(s)
                .or_else(|| remote.get(&s))
                .copied()
                .ok_or(GraphError::VertexOutOfRange(s))
        })
        .collect::<Result<Vec<P>, _>>()?;

    log::debug!(
        "rank {me}: propagated {} edges, fetched {} remote sources",
        src_values.len(),
        remote.len()
    );
    ctx.barrier()?;

    Ok((
        EdgeEndpointCache { values: src_values },
        EdgeEndpointCache { values: dst_values },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, run_world};
    use crate::data::property::PropertyGenerator;
    use crate::topology::graph::{RawEdgeList, partition_edges};
    use crate::topology::renumber::HashRenumberer;
    use crate::topology::vertex::GraphIndex;
    use std::time::Duration;

    fn ring(n: u64) -> RawEdgeList {
        RawEdgeList::new((0..n).flat_map(|i| [(i, (i + 1) % n), (i, (i + 5) % n)]).collect())
    }

    #[test]
    fn single_rank_needs_no_fetch() {
        let g = partition_edges::<u32, u32, _>(&ring(12), 1, &HashRenumberer).unwrap();
        let generator = PropertyGenerator::new(7).unwrap();
        let local = &g.locals()[0];
        let table = VertexPropertyTable::generate(local, g.renumber(), |o| generator.value_of::<i32>(o)).unwrap();
        let comm = NoComm;
        let ctx = ExecContext::new(&comm).unwrap();
        let (src, dst) = propagate(&ctx, local, &table).unwrap();
        assert_eq!(src.len(), local.n_edges());
        for (e, s, d) in local.edges() {
            assert_eq!(src.get(e), table.get(s.widen()));
            assert_eq!(dst.get(e), table.get(d.widen()));
        }
    }

    #[test]
    fn endpoints_match_original_id_properties() {
        let g = partition_edges::<u64, u32, _>(&ring(30), 4, &HashRenumberer).unwrap();
        let generator = PropertyGenerator::new(5).unwrap();
        let renumber = g.renumber().clone();
        let results = run_world(4, Duration::from_secs(10), |c| {
            let local = &g.locals()[c.rank()];
            let table = VertexPropertyTable::generate(local, &renumber, |o| generator.value_of::<(i32, f32)>(o)).unwrap();
            let ctx = ExecContext::new(c).unwrap();
            let first = propagate(&ctx, local, &table).unwrap();
            let second = propagate(&ctx, local, &table).unwrap();
            assert_eq!(first, second);
            first
        })
        .unwrap();
        for (local, (src, dst)) in g.locals().iter().zip(results) {
            for (e, s, d) in local.edges() {
                let s_orig = renumber.original_of(s.widen()).unwrap();
                let d_orig = renumber.original_of(d.widen()).unwrap();
                assert_eq!(*src.get(e).unwrap(), generator.value_of::<(i32, f32)>(s_orig));
                assert_eq!(*dst.get(e).unwrap(), generator.value_of::<(i32, f32)>(d_orig));
            }
        }
    }

    #[test]
    fn misaligned_table_is_rejected() {
        let g = partition_edges::<u32, u32, _>(&ring(8), 1, &HashRenumberer).unwrap();
        let table = VertexPropertyTable::from_values(0, vec![0i32; 3]);
        let comm = NoComm;
        let ctx = ExecContext::new(&comm).unwrap();
        assert!(matches!(
            propagate(&ctx, &g.locals()[0], &table),
            Err(GraphError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn world_size_must_match_partition() {
        let g = partition_edges::<u32, u32, _>(&ring(8), 2, &HashRenumberer).unwrap();
        let local = &g.locals()[0];
        let table = VertexPropertyTable::generate(local, g.renumber(), |o| o as i64).unwrap();
        let comm = NoComm;
        let ctx = ExecContext::new(&comm).unwrap();
        assert_eq!(
            propagate(&ctx, local, &table).map(|_| ()),
            Err(GraphError::RankCountMismatch { expected: 2, actual: 1 })
        );
    }
}
