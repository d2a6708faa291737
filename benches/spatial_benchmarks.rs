use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geoquery::prelude::*;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn records(n: i64) -> Vec<PropertyRecord> {
    let side = (n as f64).sqrt().ceil() as i64;
    (0..n)
        .map(|i| {
            let lat = 55.55 + (i / side) as f64 * (0.4 / side as f64);
            let lng = 37.35 + (i % side) as f64 * (0.5 / side as f64);
            PropertyRecord::new(
                i,
                format!("POINT({} {})", lng, lat),
                1_000_000.0 + (i % 97) as f64 * 250_000.0,
            )
            .with_region(1 + i % 4)
        })
        .collect()
}

fn benchmark_radius_search(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("radius_search");
    let center = GeoPoint::new(55.7558, 37.6176).unwrap();
    let ctx = QueryContext::new();

    for size in [500, 2000] {
        let rows = records(size);
        let indexed = GeoQueryBuilder::embedded(PropertyIndex::from_records(rows.clone()))
            .build()
            .unwrap();
        let fallback = GeoQueryBuilder::new(rows).build().unwrap();

        group.bench_with_input(BenchmarkId::new("indexed", size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(indexed.radius_search(
                    black_box(center),
                    black_box(5.0),
                    PropertyFilters::new(),
                    &ctx,
                ))
                .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("fallback", size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(fallback.radius_search(
                    black_box(center),
                    black_box(5.0),
                    PropertyFilters::new(),
                    &ctx,
                ))
                .unwrap()
            })
        });
    }

    group.finish();
}

fn benchmark_bounds_search(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("bounds_search");
    let rows = records(2000);
    let indexed = GeoQueryBuilder::embedded(PropertyIndex::from_records(rows.clone()))
        .build()
        .unwrap();
    let fallback = GeoQueryBuilder::new(rows).build().unwrap();
    let bounds = GeoBounds::new(55.80, 55.70, 37.70, 37.50).unwrap();
    let filters = PropertyFilters::new().with_region(2);
    let ctx = QueryContext::new();

    group.bench_function("indexed_filtered", |b| {
        b.iter(|| {
            rt.block_on(indexed.bounds_search(black_box(bounds), filters, &ctx))
                .unwrap()
        })
    });

    group.bench_function("fallback_filtered", |b| {
        b.iter(|| {
            rt.block_on(fallback.bounds_search(black_box(bounds), filters, &ctx))
                .unwrap()
        })
    });

    group.finish();
}

fn benchmark_clustering(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cluster_for_view");
    let rows = records(2000);
    let indexed = GeoQueryBuilder::embedded(PropertyIndex::from_records(rows.clone()))
        .build()
        .unwrap();
    let fallback = GeoQueryBuilder::new(rows).build().unwrap();
    let viewport = GeoBounds::new(55.95, 55.55, 37.85, 37.35).unwrap();
    let ctx = QueryContext::new();

    for zoom in [8u8, 12, 16] {
        group.bench_with_input(BenchmarkId::new("indexed", zoom), &zoom, |b, &zoom| {
            b.iter(|| {
                rt.block_on(indexed.cluster_for_view(
                    black_box(viewport),
                    zoom,
                    PropertyFilters::new(),
                    &ctx,
                ))
                .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("fallback", zoom), &zoom, |b, &zoom| {
            b.iter(|| {
                rt.block_on(fallback.cluster_for_view(
                    black_box(viewport),
                    zoom,
                    PropertyFilters::new(),
                    &ctx,
                ))
                .unwrap()
            })
        });
    }

    group.finish();
}

fn benchmark_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    let rows = records(5000);

    group.bench_function("from_records_5000", |b| {
        b.iter(|| PropertyIndex::from_records(black_box(rows.clone())))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_radius_search,
    benchmark_bounds_search,
    benchmark_clustering,
    benchmark_index_build
);
criterion_main!(benches);
