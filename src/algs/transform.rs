//! Edge transform-filter: run a user operator over every local edge and keep
//! the records it emits.
//!
//! The operator sees the edge's key, its destination, the properties of both
//! endpoints and an optional per-edge value, and either emits one payload or
//! nothing. With tagged keys it is invoked once per tag for every edge. Edges
//! are processed data-parallel; the order of the resulting records is not
//! specified.

use crate::algs::communicator::Communicator;
use crate::algs::context::ExecContext;
use crate::algs::propagation::{EdgeEndpointCache, propagate};
use crate::data::property::PropertyValue;
use crate::data::property_table::VertexPropertyTable;
use crate::data::record::{EdgeRecord, Payload, PayloadKind, RecordShape};
use crate::graph_error::GraphError;
use crate::topology::graph::LocalGraph;
use crate::topology::key::Key;
use crate::topology::vertex::{EdgeIndex, VertexId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-edge value handed to the operator, indexed by edge storage index.
pub trait EdgePropertyView: Sync {
    type Value: Copy + Send + Sync;

    /// Number of edges covered, or `None` if the view has no storage.
    fn len(&self) -> Option<usize>;

    fn value(&self, e: usize) -> Self::Value;
}

/// No per-edge data; the operator receives `()`.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoEdgeProperty;

impl EdgePropertyView for NoEdgeProperty {
    type Value = ();

    fn len(&self) -> Option<usize> {
        None
    }

    #[inline]
    fn value(&self, _e: usize) {}
}

/// Edge weights stored alongside a [`LocalGraph`].
#[derive(Copy, Clone, Debug)]
pub struct EdgeWeights<'a>(pub &'a [f32]);

impl EdgePropertyView for EdgeWeights<'_> {
    type Value = f32;

    fn len(&self) -> Option<usize> {
        Some(self.0.len())
    }

    #[inline]
    fn value(&self, e: usize) -> f32 {
        self.0[e]
    }
}

/// A pure per-edge transform-filter.
pub trait EdgeOperator<V, P, W>: Sync {
    fn apply(&self, key: Key<V>, dst: V, src_prop: &P, dst_prop: &P, edge: W) -> Option<Payload>;
}

impl<V, P, W, F> EdgeOperator<V, P, W> for F
where
    F: Fn(Key<V>, V, &P, &P, W) -> Option<Payload> + Sync,
{
    #[inline]
    fn apply(&self, key: Key<V>, dst: V, src_prop: &P, dst_prop: &P, edge: W) -> Option<Payload> {
        self(key, dst, src_prop, dst_prop, edge)
    }
}

/// Keeps an edge iff its source property is strictly smaller than its
/// destination property; emits the constant [`Payload::unit`] of `payload`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessThanOperator {
    pub payload: PayloadKind,
}

impl LessThanOperator {
    pub fn new(payload: PayloadKind) -> Self {
        Self { payload }
    }
}

impl<V, P: PropertyValue, W> EdgeOperator<V, P, W> for LessThanOperator {
    #[inline]
    fn apply(&self, _key: Key<V>, _dst: V, src_prop: &P, dst_prop: &P, _edge: W) -> Option<Payload> {
        src_prop.total_lt(dst_prop).then(|| Payload::unit(self.payload))
    }
}

/// Apply `op` to every local edge (and every tag, for tagged shapes).
///
/// `src` and `dst` must come from [`propagate`] on the same slice. Every
/// emitted payload must have `shape.payload`'s kind, otherwise the pass fails
/// with [`GraphError::ShapeMismatch`].
pub fn transform_filter_edges<V, E, P, W, O>(
    graph: &LocalGraph<V, E>,
    src: &EdgeEndpointCache<P>,
    dst: &EdgeEndpointCache<P>,
    view: &W,
    shape: RecordShape,
    op: &O,
) -> Result<Vec<EdgeRecord<V>>, GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    W: EdgePropertyView,
    O: EdgeOperator<V, P, W::Value> + ?Sized,
{
    shape.validate()?;
    let n_edges = graph.n_edges();
    for (what, len) in [
        ("source property cache", Some(src.len())),
        ("destination property cache", Some(dst.len())),
        ("edge property view", view.len()),
    ] {
        if let Some(found) = len {
            if found != n_edges {
                return Err(GraphError::LengthMismatch {
                    what,
                    expected: n_edges,
                    found,
                });
            }
        }
    }

    let src_props = src.values();
    let dst_props = dst.values();
    let records = graph
        .par_edges()
        .flat_map_iter(|(e, s, d)| {
            let edge = view.value(e);
            shape.key.keys(s).filter_map(move |key| {
                op.apply(key, d, &src_props[e], &dst_props[e], edge)
                    .map(|payload| EdgeRecord { key, dst: d, payload })
            })
        })
        .map(|record| shape.check(&record).map(|()| record))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "rank {}: {} of {} edges kept as {shape} records",
        graph.rank(),
        records.len(),
        n_edges
    );
    Ok(records)
}

/// Propagate endpoint properties, then run `op` with no per-edge data.
pub fn extract_transform_edges<V, E, P, O, C>(
    ctx: &ExecContext<'_, C>,
    graph: &LocalGraph<V, E>,
    table: &VertexPropertyTable<P>,
    shape: RecordShape,
    op: &O,
) -> Result<Vec<EdgeRecord<V>>, GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    O: EdgeOperator<V, P, ()> + ?Sized,
    C: Communicator,
{
    let (src, dst) = propagate(ctx, graph, table)?;
    transform_filter_edges(graph, &src, &dst, &NoEdgeProperty, shape, op)
}

/// Like [`extract_transform_edges`], handing the operator each edge's weight.
pub fn extract_transform_weighted_edges<V, E, P, O, C>(
    ctx: &ExecContext<'_, C>,
    graph: &LocalGraph<V, E>,
    table: &VertexPropertyTable<P>,
    shape: RecordShape,
    op: &O,
) -> Result<Vec<EdgeRecord<V>>, GraphError>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    O: EdgeOperator<V, P, f32> + ?Sized,
    C: Communicator,
{
    let weights = graph.weights().ok_or_else(|| {
        GraphError::InvalidShape(format!("rank {} slice carries no edge weights", graph.rank()))
    })?;
    let (src, dst) = propagate(ctx, graph, table)?;
    transform_filter_edges(graph, &src, &dst, &EdgeWeights(weights), shape, op)
}
