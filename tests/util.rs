#![allow(dead_code)]
use edge_sieve::prelude::*;
use std::time::Duration;

/// Receive deadline for in-process test clusters.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `f` on every rank of an `n`-rank in-process world.
pub fn world<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&RayonComm) -> T + Sync,
{
    run_world(n, TEST_TIMEOUT, f).expect("rank worker panicked")
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Clone + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort();
    let mut b = want.to_vec();
    b.sort();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}

/// Distributed run of `op` over `raw` on `n_ranks` ranks, gathered on rank 0
/// and returned in original ids, canonical order.
pub fn distributed_records<V, E, P, O>(
    raw: &RawEdgeList,
    n_ranks: usize,
    bucket_count: u64,
    shape: RecordShape,
    op: &O,
) -> Vec<EdgeRecord<u64>>
where
    V: VertexId,
    E: EdgeIndex,
    P: PropertyValue,
    O: EdgeOperator<V, P, ()>,
{
    let graph = partition_edges::<V, E, _>(raw, n_ranks, &HashRenumberer).unwrap();
    let generator = PropertyGenerator::new(bucket_count).unwrap();
    let renumber = graph.renumber().clone();
    let mut per_rank = world(n_ranks, |c| {
        let ctx = ExecContext::new(c).unwrap();
        let local = graph.local(c.rank()).unwrap();
        let table = VertexPropertyTable::generate(local, &renumber, |o| generator.value_of::<P>(o)).unwrap();
        let mine = extract_transform_edges(&ctx, local, &table, shape, op).unwrap();
        gather_records(&ctx, 0, shape, &mine).unwrap()
    });
    let gathered = per_rank.swap_remove(0).expect("root holds the gathered records");
    canonicalize(unrenumber_records(&gathered, &renumber).unwrap())
}

/// Direct evaluation of `s < d` on original ids, without partitioning.
pub fn brute_force_less_than<P: PropertyValue>(raw: &RawEdgeList, bucket_count: u64) -> usize {
    let generator = PropertyGenerator::new(bucket_count).unwrap();
    raw.edges
        .iter()
        .filter(|&&(u, v)| generator.value_of::<P>(u).total_lt(&generator.value_of::<P>(v)))
        .count()
}

/// All six key/payload shapes.
pub fn all_shapes() -> Vec<RecordShape> {
    let mut shapes = Vec::new();
    for key in [KeyKind::Plain, KeyKind::Tagged { tags: 2 }] {
        for payload in [PayloadKind::Empty, PayloadKind::Scalar, PayloadKind::Pair] {
            shapes.push(RecordShape::new(key, payload));
        }
    }
    shapes
}
