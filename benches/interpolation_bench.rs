use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use phylo_movie::interpolation::{Easing, TrailOptions};
use phylo_movie::layout::SplitSet;
use phylo_movie::style::HighlightSets;
use phylo_movie::{
    interpolate, ColorManager, InterpolationOptions, LayerFactory, Layout, LayoutCalculator,
    LayoutOptions, Options, RadialLayout, RenderStateCache, TreeData,
};

/// Balanced tree over `leaves` taxa; `stretch` varies branch lengths.
fn tree(leaves: usize, stretch: f64) -> TreeData {
    fn build(lo: usize, hi: usize, stretch: f64) -> TreeData {
        if hi - lo == 1 {
            return TreeData::leaf(format!("t{lo}"), 1.0 + (lo % 7) as f64 * stretch);
        }
        let mid = (lo + hi) / 2;
        TreeData::internal(
            0.5 + stretch * 0.1,
            vec![build(lo, mid, stretch), build(mid, hi, stretch)],
        )
    }
    build(0, leaves, stretch)
}

fn layouts(leaves: usize) -> (Layout, Layout) {
    let opts = LayoutOptions::default();
    let from = RadialLayout.calculate(&tree(leaves, 0.1), &opts).unwrap();
    let to = RadialLayout.calculate(&tree(leaves, 0.4), &opts).unwrap();
    (from, to)
}

fn easing_benchmark(c: &mut Criterion) {
    c.bench_function("gentle_easing", |b| {
        b.iter(|| black_box(Easing::Gentle.evaluate(black_box(0.5))))
    });
}

fn layout_benchmark(c: &mut Criterion) {
    let tree = tree(500, 0.2);
    let opts = LayoutOptions::default();
    c.bench_function("radial_layout_500_leaves", |b| {
        b.iter(|| black_box(RadialLayout.calculate(black_box(&tree), &opts)))
    });
}

fn interpolation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolate");
    for leaves in [50, 200, 500] {
        let (from, to) = layouts(leaves);
        let plain = InterpolationOptions::default();
        group.bench_function(format!("{leaves}_leaves"), |b| {
            b.iter(|| black_box(interpolate(&from, &to, black_box(0.37), &plain)))
        });
        let trails = InterpolationOptions {
            motion_trails: Some(TrailOptions {
                length: 6,
                step: 0.04,
            }),
            ..InterpolationOptions::default()
        };
        group.bench_function(format!("{leaves}_leaves_with_trails"), |b| {
            b.iter(|| black_box(interpolate(&from, &to, black_box(0.37), &trails)))
        });
    }
    group.finish();
}

fn layer_build_benchmark(c: &mut Criterion) {
    let (from, to) = layouts(500);
    let frame = interpolate(&from, &to, 0.5, &InterpolationOptions::default());
    let options = Options::default();
    let taxa: Vec<String> = (0..500).map(|i| format!("t{i}")).collect();
    let manager = ColorManager::new(&options.colors, &taxa, false).with_highlights(HighlightSets {
        marked: vec![SplitSet::new(0..20)],
        active_edges: vec![SplitSet::new(0..40)],
        ..HighlightSets::default()
    });
    let manager = Arc::new(manager);

    let mut group = c.benchmark_group("layer_factory_500_leaves");
    group.bench_function("rebuild", |b| {
        let mut version = 0;
        b.iter(|| {
            version += 1;
            let cache = RenderStateCache::new(&options, Some(Arc::clone(&manager)), version, 0.8);
            let mut factory = LayerFactory::new();
            black_box(factory.build(&frame, &cache))
        })
    });
    group.bench_function("reuse", |b| {
        let cache = RenderStateCache::new(&options, Some(Arc::clone(&manager)), 1, 0.8);
        let mut factory = LayerFactory::new();
        let _ = factory.build(&frame, &cache);
        b.iter(|| black_box(factory.build(&frame, &cache)))
    });
    group.finish();
}

criterion_group!(
    benches,
    easing_benchmark,
    layout_benchmark,
    interpolation_benchmark,
    layer_build_benchmark
);
criterion_main!(benches);
