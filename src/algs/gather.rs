//! Result gathering: concatenate every rank's records on one root rank.
//!
//! Records travel column-wise. The fields present in a [`RecordShape`] are
//! split into parallel columns, each column is gathered with one
//! [`gather_values`] call, and the root stitches the columns back together
//! rank by rank.

use crate::algs::collective::gather_values;
use crate::algs::communicator::Communicator;
use crate::algs::context::ExecContext;
use crate::algs::wire::WireValue;
use crate::data::record::{EdgeRecord, Payload, PayloadKind, RecordShape};
use crate::graph_error::GraphError;
use crate::topology::key::{Key, Tag};
use crate::topology::vertex::VertexId;

/// Struct-of-arrays form of a record buffer. Columns absent from the shape
/// stay empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordColumns<V> {
    pub src: Vec<V>,
    pub tags: Vec<Tag>,
    pub dst: Vec<V>,
    pub floats: Vec<f32>,
    pub ints: Vec<i32>,
}

impl<V: VertexId> RecordColumns<V> {
    pub fn from_records(shape: RecordShape, records: &[EdgeRecord<V>]) -> Result<Self, GraphError> {
        let n = records.len();
        let mut cols = Self {
            src: Vec::with_capacity(n),
            dst: Vec::with_capacity(n),
            ..Self::default()
        };
        for r in records {
            shape.check(r)?;
            cols.src.push(r.key.vertex());
            if let Some(t) = r.key.tag() {
                cols.tags.push(t);
            }
            cols.dst.push(r.dst);
            match r.payload {
                Payload::Empty => {}
                Payload::Scalar(x) => cols.ints.push(x),
                Payload::Pair(f, x) => {
                    cols.floats.push(f);
                    cols.ints.push(x);
                }
            }
        }
        Ok(cols)
    }

    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Lengths every present column must have, for error reporting.
    fn check_lengths(&self, shape: RecordShape) -> Result<(), (&'static str, usize)> {
        let n = self.src.len();
        let want = |present: bool| if present { n } else { 0 };
        let floats = shape.payload == PayloadKind::Pair;
        let ints = shape.payload != PayloadKind::Empty;
        for (what, len, expected) in [
            ("tag", self.tags.len(), want(shape.key.is_tagged())),
            ("destination", self.dst.len(), n),
            ("float", self.floats.len(), want(floats)),
            ("int", self.ints.len(), want(ints)),
        ] {
            if len != expected {
                return Err((what, len));
            }
        }
        Ok(())
    }

    pub fn into_records(self, shape: RecordShape) -> Result<Vec<EdgeRecord<V>>, GraphError> {
        self.check_lengths(shape).map_err(|(what, found)| {
            GraphError::InvalidShape(format!(
                "{what} column has {found} entries for {} records",
                self.src.len()
            ))
        })?;
        Ok((0..self.src.len())
            .map(|i| EdgeRecord {
                key: if shape.key.is_tagged() {
                    Key::Tagged(self.src[i], self.tags[i])
                } else {
                    Key::Plain(self.src[i])
                },
                dst: self.dst[i],
                payload: match shape.payload {
                    PayloadKind::Empty => Payload::Empty,
                    PayloadKind::Scalar => Payload::Scalar(self.ints[i]),
                    PayloadKind::Pair => Payload::Pair(self.floats[i], self.ints[i]),
                },
            })
            .collect())
    }
}

/// Gather one column; on the root, the per-rank pieces.
fn gather_column<T, C>(
    ctx: &ExecContext<'_, C>,
    root: usize,
    present: bool,
    values: &[T],
) -> Result<Option<Vec<Vec<T>>>, GraphError>
where
    T: WireValue,
    C: Communicator,
{
    if present {
        gather_values(ctx, root, values)
    } else {
        Ok((ctx.rank() == root).then(|| vec![Vec::new(); ctx.size()]))
    }
}

/// Concatenate all ranks' `local` records on `root`, in rank order.
///
/// Collective over `ctx`. Non-root ranks get `None`. A rank whose columns
/// disagree in length fails the gather with [`GraphError::CommError`].
pub fn gather_records<V, C>(
    ctx: &ExecContext<'_, C>,
    root: usize,
    shape: RecordShape,
    local: &[EdgeRecord<V>],
) -> Result<Option<Vec<EdgeRecord<V>>>, GraphError>
where
    V: VertexId,
    C: Communicator,
{
    ctx.check_root(root)?;
    shape.validate()?;
    let cols = RecordColumns::from_records(shape, local)?;

    let tagged = shape.key.is_tagged();
    let has_floats = shape.payload == PayloadKind::Pair;
    let has_ints = shape.payload != PayloadKind::Empty;

    let src = gather_column(ctx, root, true, &cols.src)?;
    let tags = gather_column(ctx, root, tagged, &cols.tags)?;
    let dst = gather_column(ctx, root, true, &cols.dst)?;
    let floats = gather_column(ctx, root, has_floats, &cols.floats)?;
    let ints = gather_column(ctx, root, has_ints, &cols.ints)?;

    let (Some(src), Some(tags), Some(dst), Some(floats), Some(ints)) = (src, tags, dst, floats, ints) else {
        return Ok(None);
    };

    let mut all = Vec::with_capacity(src.iter().map(Vec::len).sum());
    for (rank, ((((src, tags), dst), floats), ints)) in
        src.into_iter().zip(tags).zip(dst).zip(floats).zip(ints).enumerate()
    {
        let part = RecordColumns {
            src,
            tags,
            dst,
            floats,
            ints,
        };
        if let Err((what, found)) = part.check_lengths(shape) {
            return Err(GraphError::comm(
                rank,
                format!("gathered {what} column has {found} entries for {} records", part.len()),
            ));
        }
        all.extend(part.into_records(shape)?);
    }
    log::debug!("gathered {} {shape} records on rank {root}", all.len());
    Ok(Some(all))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, run_world};
    use crate::topology::key::KeyKind;
    use std::time::Duration;

    fn sample(rank: u32, n: u32) -> Vec<EdgeRecord<u32>> {
        (0..n)
            .map(|i| EdgeRecord {
                key: Key::Tagged(rank * 100 + i, i as i32),
                dst: i,
                payload: Payload::Pair(i as f32 / 2.0, rank as i32),
            })
            .collect()
    }

    #[test]
    fn columns_rebuild_records() {
        let shape = RecordShape::new(KeyKind::Tagged { tags: 8 }, PayloadKind::Pair);
        let recs = sample(3, 5);
        let cols = RecordColumns::from_records(shape, &recs).unwrap();
        assert_eq!(cols.len(), 5);
        assert_eq!(cols.into_records(shape).unwrap(), recs);

        let plain = RecordShape::new(KeyKind::Plain, PayloadKind::Empty);
        assert!(RecordColumns::from_records(plain, &recs).is_err());
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let shape = RecordShape::new(KeyKind::Plain, PayloadKind::Scalar);
        let cols = RecordColumns::<u64> {
            src: vec![1, 2],
            dst: vec![3, 4],
            ints: vec![1],
            ..RecordColumns::default()
        };
        assert!(matches!(cols.into_records(shape), Err(GraphError::InvalidShape(_))));
    }

    #[test]
    fn single_rank_gather_is_identity() {
        let comm = NoComm;
        let ctx = ExecContext::new(&comm).unwrap();
        let shape = RecordShape::new(KeyKind::Tagged { tags: 8 }, PayloadKind::Pair);
        let recs = sample(0, 4);
        assert_eq!(gather_records(&ctx, 0, shape, &recs).unwrap(), Some(recs));
    }

    #[test]
    fn root_receives_rank_ordered_concatenation() {
        let shape = RecordShape::new(KeyKind::Tagged { tags: 8 }, PayloadKind::Pair);
        let results = run_world(3, Duration::from_secs(10), |c| {
            let ctx = ExecContext::new(c).unwrap();
            let mine = sample(c.rank() as u32, c.rank() as u32 + 1);
            gather_records(&ctx, 1, shape, &mine).unwrap()
        })
        .unwrap();
        let want: Vec<_> = (0..3).flat_map(|r| sample(r, r + 1)).collect();
        assert_eq!(results[1].as_ref(), Some(&want));
        assert!(results[0].is_none() && results[2].is_none());
    }
}
