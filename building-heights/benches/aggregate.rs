//! Benchmarks pour la jointure spatiale et l'agrégation

use building_heights::enrich::aggregate;
use building_heights::Building;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{polygon, Geometry};
use height_raster::{linspace, HeightObservation};

const MINX: f64 = 72.93;
const MINY: f64 = 19.15;
const CELL: f64 = 0.02;

/// Bâtiments carrés de ~15 m répartis en grille sur la tuile
fn buildings(per_side: usize) -> Vec<Building> {
    let step = CELL / per_side as f64;
    let size = 0.00014;
    let mut out = Vec::with_capacity(per_side * per_side);
    for i in 0..per_side {
        for j in 0..per_side {
            let x = MINX + i as f64 * step;
            let y = MINY + j as f64 * step;
            out.push(Building {
                id: format!("{}-{}", i, j),
                geometry: Geometry::Polygon(polygon![
                    (x: x, y: y),
                    (x: x + size, y: y),
                    (x: x + size, y: y + size),
                    (x: x, y: y + size),
                    (x: x, y: y),
                ]),
                area_m2: 220.0,
            });
        }
    }
    out
}

/// Observations sur une grille régulière (une vignette de `size` x `size`)
fn observations(size: usize) -> Vec<HeightObservation> {
    let lats = linspace(MINY + CELL, MINY, size);
    let lngs = linspace(MINX, MINX + CELL, size);
    lats.iter()
        .enumerate()
        .flat_map(|(r, &lat)| {
            lngs.iter().enumerate().map(move |(c, &lng)| HeightObservation {
                lat,
                lng,
                height: ((r + c) % 40) as f64,
            })
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let obs = observations(512);
    let mut group = c.benchmark_group("aggregate");

    for per_side in [20usize, 60] {
        let buildings = buildings(per_side);
        group.throughput(Throughput::Elements(buildings.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(buildings.len()),
            &buildings,
            |b, buildings| b.iter(|| black_box(aggregate(buildings, &obs, 0.0001))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
