use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::time::Duration;

use edge_sieve::prelude::*;

// 1) single-rank filter pass over R-MAT graphs of growing scale
fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_filter");
    group.sample_size(20);

    for scale in [10u32, 12, 14] {
        let raw = generate_rmat(&RmatConfig::default().with_scale(scale)).unwrap();
        let graph = partition_edges::<u32, u64, _>(&raw, 1, &HashRenumberer).unwrap();
        let local = graph.local(0).unwrap();
        let generator = PropertyGenerator::new(5).unwrap();
        let table = VertexPropertyTable::generate(local, graph.renumber(), |o| generator.value_of::<i32>(o)).unwrap();
        let comm = NoComm;
        let ctx = ExecContext::new(&comm).unwrap();
        let (src, dst) = propagate(&ctx, local, &table).unwrap();

        for shape in [
            RecordShape::new(KeyKind::Plain, PayloadKind::Empty),
            RecordShape::new(KeyKind::Tagged { tags: 2 }, PayloadKind::Pair),
        ] {
            let op = LessThanOperator::new(shape.payload);
            group.bench_with_input(BenchmarkId::new(shape.to_string(), scale), &scale, |b, _| {
                b.iter(|| transform_filter_edges(local, &src, &dst, &NoEdgeProperty, shape, &op).unwrap())
            });
        }
    }
    group.finish();
}

// 2) full distributed pipeline (propagate + filter + gather) on 4 in-process ranks
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("distributed_pipeline");
    group.sample_size(10);

    let raw = generate_rmat(&RmatConfig::default().with_scale(12)).unwrap();
    let shape = RecordShape::new(KeyKind::Plain, PayloadKind::Scalar);
    let op = LessThanOperator::new(PayloadKind::Scalar);
    let generator = PropertyGenerator::new(5).unwrap();
    for n_ranks in [1usize, 2, 4] {
        let graph = partition_edges::<u32, u64, _>(&raw, n_ranks, &HashRenumberer).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n_ranks), &n_ranks, |b, &n| {
            b.iter(|| {
                run_world(n, Duration::from_secs(60), |comm| {
                    let ctx = ExecContext::new(comm).unwrap();
                    let local = graph.local(comm.rank()).unwrap();
                    let table =
                        VertexPropertyTable::generate(local, graph.renumber(), |o| generator.value_of::<i32>(o))
                            .unwrap();
                    let mine = extract_transform_edges(&ctx, local, &table, shape, &op).unwrap();
                    gather_records(&ctx, 0, shape, &mine).unwrap().map(|all| all.len())
                })
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_filter, bench_pipeline);
criterion_main!(benches);
