//! Benchmarks for lattice construction and host-side state setup.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use spinbubble::mesh::{GroupTags, PeriodicSquare};
use spinbubble::topology::{extract, Extent};
use spinbubble::{NeighborGraph, Parameters, Seeding, SimulationState};

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_periodic_square");
    let tags = GroupTags::default();

    for resolution in [32usize, 128, 512] {
        group.bench_with_input(
            BenchmarkId::from_parameter(resolution),
            &resolution,
            |b, &resolution| {
                b.iter(|| {
                    let mut mesh = PeriodicSquare::new(resolution, Extent::default(), tags);
                    black_box(extract(&mut mesh, &tags, &Extent::default()))
                })
            },
        );
    }
    group.finish();
}

fn bench_from_adjacency(c: &mut Criterion) {
    let n = 100_000u32;
    let lists: Vec<[u32; 2]> = (0..n).map(|i| [(i + n - 1) % n, (i + 1) % n]).collect();

    c.bench_function("from_adjacency_ring_100k", |b| {
        b.iter(|| black_box(NeighborGraph::from_adjacency(&lists)))
    });
}

fn bench_state_from_lattice(c: &mut Criterion) {
    let tags = GroupTags::default();
    let mut mesh = PeriodicSquare::new(256, Extent::default(), tags);
    let lattice = match extract(&mut mesh, &tags, &Extent::default()) {
        Ok(lattice) => lattice,
        Err(e) => panic!("lattice: {}", e),
    };
    let params = Parameters::default();

    c.bench_function("state_from_lattice_256", |b| {
        b.iter(|| {
            black_box(SimulationState::from_lattice(
                lattice.clone(),
                &params,
                Seeding::Fixed(1),
            ))
        })
    });
}

criterion_group!(benches, bench_extract, bench_from_adjacency, bench_state_from_lattice);
criterion_main!(benches);
