//! Benchmarks for fingerprint resolution.
//!
//! Measures matcher throughput over a synthetic module shaped like an
//! obfuscated application: many small filler classes and one structural
//! needle placed deep in the declaration order.

extern crate dexscope;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use dexscope::prelude::*;
use std::hint::black_box;

const CLASS_COUNT: usize = 1_000;

/// Build a module with `CLASS_COUNT` classes, one of which has the gesture
/// detector shape the benchmarked fingerprint describes.
fn synthetic_module() -> DexModule {
    let needle = CLASS_COUNT * 3 / 4;
    let mut builder = ModuleBuilder::new();
    for index in 0..CLASS_COUNT {
        let name = format!("Lapp/obf/C{index};");
        let class = if index == needle {
            ClassBuilder::new(&name)
                .superclass("Ljava/lang/Object;")
                .field("a", "Lapp/obf/Detector;")
                .field("b", "Lapp/obf/Detector;")
                .field("c", "F")
                .method(MethodBuilder::new("a", &["Lapp/obf/Event;"], "Z"))
        } else {
            let mut filler = ClassBuilder::new(&name).superclass("Ljava/lang/Object;");
            for field in 0..(index % 5) {
                filler = filler.field(&format!("f{field}"), "I");
            }
            filler
        };
        builder = builder.class(class);
    }
    builder.build().expect("synthetic module must build")
}

/// The fingerprint under test: field shape plus a member selector, no
/// reliance on names anywhere.
fn gesture_fingerprint() -> Fingerprint {
    Fingerprint::named("gesture-detector")
        .with_field_count(3)
        .with_field_of_type("F")
        .selecting_method(MethodQuery::new().with_params(&["Lapp/obf/Event;"]).returning("Z"))
}

/// Benchmark full candidate scans (cold cache) against repeated cached
/// lookups of the same fingerprint.
fn bench_fingerprint_resolution(c: &mut Criterion) {
    let module = synthetic_module();
    let needle = gesture_fingerprint();

    let mut group = c.benchmark_group("matcher");
    group.throughput(Throughput::Elements(CLASS_COUNT as u64));

    group.bench_function("resolve_cold", |b| {
        b.iter(|| {
            let matcher = Matcher::new(module.catalog());
            black_box(matcher.resolve(black_box(&needle)))
        });
    });

    group.bench_function("resolve_cached", |b| {
        let matcher = Matcher::new(module.catalog());
        assert!(matcher.resolve(&needle).is_some(), "needle must resolve");
        b.iter(|| black_box(matcher.resolve(black_box(&needle))));
    });

    group.finish();
}

/// Benchmark a bare catalog predicate scan as a baseline for the fingerprint
/// machinery above.
fn bench_catalog_scan(c: &mut Criterion) {
    let module = synthetic_module();

    c.bench_function("catalog_classes_where", |b| {
        b.iter(|| {
            let catalog = module.catalog();
            black_box(catalog.classes_where(|class| class.field_count() == 3))
        });
    });
}

criterion_group!(benches, bench_fingerprint_resolution, bench_catalog_scan);
criterion_main!(benches);
