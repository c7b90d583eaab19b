/*
 * Silhouette Swarm Benchmark
 *
 * Measures the per-frame hot spots: Sobel edge extraction over a person box,
 * the neighbour lookup and the full swarm update with and without the grid.
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nannou::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use silhouette_swarm::spatial_grid::SpatialGrid;
use silhouette_swarm::{
    EdgeExtractor, EdgePoint, FrameSource, ParticleSystem, Region, SimulationParams,
    SyntheticSource, VideoFrame,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn filtered_frame() -> VideoFrame {
    let mut source = SyntheticSource::new(WIDTH, HEIGHT).with_warmup(0);
    let mut frame = source
        .next_frame()
        .unwrap_or_else(|| VideoFrame::filled(WIDTH, HEIGHT, 0));
    frame.grayscale();
    frame.threshold(0.4);
    frame
}

fn traced_edges(frame: &VideoFrame) -> Vec<EdgePoint> {
    let region = Region::new(0, 0, WIDTH as usize - 1, HEIGHT as usize - 1);
    EdgeExtractor::default().extract(&frame.as_luma(), region)
}

// Benchmark the Sobel pass over regions of growing size
fn bench_edge_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_extraction");
    let frame = filtered_frame();
    let extractor = EdgeExtractor::default();

    for size in [120usize, 240, 479].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let region = Region::new(0, 0, size, size);
            b.iter(|| black_box(extractor.extract(&frame.as_luma(), region)));
        });
    }

    group.finish();
}

// Benchmark building and querying the spatial grid
fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");

    for num_particles in [100, 300, 1000, 2000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(num_particles), num_particles, |b, &n| {
            let mut rng = StdRng::seed_from_u64(7);
            let positions: Vec<Point2> = (0..n)
                .map(|_| {
                    pt2(
                        rng.gen_range(0.0..WIDTH as f32),
                        rng.gen_range(0.0..HEIGHT as f32),
                    )
                })
                .collect();
            let mut grid = SpatialGrid::new(50.0, WIDTH as f32, HEIGHT as f32);

            b.iter(|| {
                grid.rebuild(positions.iter().copied());
                let found: usize = positions
                    .iter()
                    .map(|p| grid.get_nearby_indices(*p).len())
                    .sum();
                black_box(found)
            });
        });
    }

    group.finish();
}

// Benchmark the full swarm update loop
fn bench_swarm_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("swarm_update");
    group.measurement_time(Duration::from_secs(10));

    let frame = filtered_frame();
    let edges = traced_edges(&frame);

    for use_grid in [false, true] {
        for num_particles in [100, 300, 1000].iter() {
            let label = if use_grid { "grid" } else { "brute_force" };
            group.bench_with_input(BenchmarkId::new(label, num_particles), num_particles, |b, &n| {
                let mut params = SimulationParams::seeded(42);
                params.max_particles = n;
                params.enable_spatial_grid = use_grid;
                let mut system = ParticleSystem::new(&params, WIDTH as f32, HEIGHT as f32);
                system.initialize_particles(&edges, &params);

                b.iter(|| black_box(system.update(&edges, &params)));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_edge_extraction, bench_spatial_grid, bench_swarm_update);
criterion_main!(benches);
