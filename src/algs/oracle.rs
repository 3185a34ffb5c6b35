//! Reference oracle and canonical comparison.
//!
//! The oracle gathers the whole distributed graph and property table onto
//! the root, undoes the renumbering, and rebuilds a single-rank copy
//! ([`ReferenceGraph`]). Rerunning propagation and the operator there gives
//! the expected output. Both sides are compared in original-id space after
//! sorting into one total order ([`canonicalize`]), so neither the partition
//! nor the parallel compaction order matters.

use crate::algs::collective::gather_values;
use crate::algs::communicator::{Communicator, NoComm};
use crate::algs::context::ExecContext;
use crate::algs::transform::{EdgeOperator, extract_transform_edges, extract_transform_weighted_edges};
use crate::data::property::PropertyValue;
use crate::data::property_table::VertexPropertyTable;
use crate::data::record::{EdgeRecord, RecordShape};
use crate::graph_error::{GraphError, VerificationError};
use crate::topology::graph::{LocalGraph, RawEdgeList, partition_edges};
use crate::topology::renumber::{HashRenumberer, RenumberMap};
use crate::topology::vertex::{EdgeIndex, VertexId};
use hashbrown::HashMap;
use rayon::prelude::*;
use std::fmt::Display;
use std::sync::Arc;

/// Unpartitioned copy of a distributed graph and its property table.
#[derive(Clone, Debug)]
pub struct ReferenceGraph<V, E, P> {
    renumber: Arc<RenumberMap>,
    graph: LocalGraph<V, E>,
    table: VertexPropertyTable<P>,
}

impl<V: VertexId, E: EdgeIndex, P: PropertyValue> ReferenceGraph<V, E, P> {
    /// Build from edges and per-vertex properties in original ids.
    pub fn from_original(
        edges: Vec<(u64, u64)>,
        weights: Option<Vec<f32>>,
        properties: Vec<(u64, P)>,
    ) -> Result<Self, GraphError> {
        let mut raw = RawEdgeList::new(edges).with_vertices(properties.iter().map(|&(v, _)| v).collect());
        raw.weights = weights;
        let (renumber, mut locals) = partition_edges::<V, E, _>(&raw, 1, &HashRenumberer)?.into_parts();
        let graph = locals.pop().ok_or(GraphError::ZeroRanks)?;

        let by_original: HashMap<u64, P> = properties.into_iter().collect();
        let values = renumber
            .originals()
            .iter()
            .map(|o| {
                by_original
                    .get(o)
                    .copied()
                    .ok_or_else(|| GraphError::MalformedDataset(format!("vertex {o} has no property")))
            })
            .collect::<Result<Vec<P>, _>>()?;
        Ok(Self {
            renumber,
            graph,
            table: VertexPropertyTable::from_values(0, values),
        })
    }

    pub fn graph(&self) -> &LocalGraph<V, E> {
        &self.graph
    }

    pub fn table(&self) -> &VertexPropertyTable<P> {
        &self.table
    }

    pub fn renumber(&self) -> &RenumberMap {
        &self.renumber
    }

    /// Single-rank run of `op`; records in original ids.
    pub fn run<O>(&self, shape: RecordShape, op: &O) -> Result<Vec<EdgeRecord<u64>>, GraphError>
    where
        O: EdgeOperator<V, P, ()> + ?Sized,
    {
        let comm = NoComm;
        let ctx = ExecContext::new(&comm)?;
        let records = extract_transform_edges(&ctx, &self.graph, &self.table, shape, op)?;
        unrenumber_records(&records, &self.renumber)
    }

    /// Single-rank run of a weight-aware `op`; records in original ids.
    pub fn run_weighted<O>(&self, shape: RecordShape, op: &O) -> Result<Vec<EdgeRecord<u64>>, GraphError>
    where
        O: EdgeOperator<V, P, f32> + ?Sized,
    {
        let comm = NoComm;
        let ctx = ExecContext::new(&comm)?;
        let records = extract_transform_weighted_edges(&ctx, &self.graph, &self.table, shape, op)?;
        unrenumber_records(&records, &self.renumber)
    }
}

/// Collect the distributed graph and properties on `root` as a
/// [`ReferenceGraph`]. Collective over `ctx`; non-root ranks get `None`.
pub fn reconstruct_reference<V, E, P, C>(
    ctx: &ExecContext<'_, C>,
    root: usize,
    graph: &LocalGraph<V, E>,
    table: &VertexPropertyTable<P>,
    renumber: &RenumberMap,
) -> Result<Option<ReferenceGraph<V, E, P>>, GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    C: Communicator,
{
    ctx.check_root(root)?;
    let original = |v: V| renumber.original_of(v.widen());
    let (mut src, mut dst) = (Vec::with_capacity(graph.n_edges()), Vec::with_capacity(graph.n_edges()));
    for (_, s, d) in graph.edges() {
        src.push(original(s)?);
        dst.push(original(d)?);
    }
    let vertices = table
        .iter()
        .map(|(internal, _)| renumber.original_of(internal))
        .collect::<Result<Vec<u64>, _>>()?;

    let src = gather_values(ctx, root, &src)?;
    let dst = gather_values(ctx, root, &dst)?;
    let weights = match graph.weights() {
        Some(w) => gather_values(ctx, root, w)?.map(Some),
        None => (ctx.rank() == root).then_some(None),
    };
    let vertices = gather_values(ctx, root, &vertices)?;
    let values = gather_values(ctx, root, table.values())?;

    let (Some(src), Some(dst), Some(weights), Some(vertices), Some(values)) = (src, dst, weights, vertices, values)
    else {
        return Ok(None);
    };

    let edges: Vec<(u64, u64)> = src.into_iter().flatten().zip(dst.into_iter().flatten()).collect();
    let weights = weights.map(|w| w.into_iter().flatten().collect::<Vec<f32>>());
    let vertices: Vec<u64> = vertices.into_iter().flatten().collect();
    let values: Vec<P> = values.into_iter().flatten().collect();
    if vertices.len() != values.len() {
        return Err(GraphError::LengthMismatch {
            what: "gathered vertex properties",
            expected: vertices.len(),
            found: values.len(),
        });
    }
    log::debug!(
        "reference graph on rank {root}: {} vertices, {} edges",
        vertices.len(),
        edges.len()
    );
    ReferenceGraph::from_original(edges, weights, vertices.into_iter().zip(values).collect()).map(Some)
}

/// Rewrite internal ids in `records` to original ids.
pub fn unrenumber_records<V: VertexId>(
    records: &[EdgeRecord<V>],
    renumber: &RenumberMap,
) -> Result<Vec<EdgeRecord<u64>>, GraphError> {
    records
        .par_iter()
        .map(|r| -> Result<EdgeRecord<u64>, GraphError> {
            Ok(EdgeRecord {
                key: r.key.try_map_vertex(|v| renumber.original_of(v.widen()))?,
                dst: renumber.original_of(r.dst.widen())?,
                payload: r.payload,
            })
        })
        .collect()
}

/// Sort records into the canonical total order: key vertex, tag, destination,
/// then payload fields.
pub fn canonicalize<V: Ord + Send>(mut records: Vec<EdgeRecord<V>>) -> Vec<EdgeRecord<V>> {
    records.par_sort_unstable();
    records
}

/// Exact element-wise comparison of two canonical buffers.
pub fn compare_canonical<V>(
    case: &str,
    expected: &[EdgeRecord<V>],
    actual: &[EdgeRecord<V>],
) -> Result<(), VerificationError>
where
    V: PartialEq + Display + Copy,
{
    let first_mismatch = expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .unwrap_or(expected.len().min(actual.len()));

    if expected.len() != actual.len() {
        return Err(VerificationError::LengthMismatch {
            case: case.to_string(),
            expected: expected.len(),
            actual: actual.len(),
            first_mismatch,
        });
    }
    if first_mismatch < expected.len() {
        return Err(VerificationError::RecordMismatch {
            case: case.to_string(),
            index: first_mismatch,
            expected: expected[first_mismatch].to_string(),
            actual: actual[first_mismatch].to_string(),
        });
    }
    Ok(())
}
