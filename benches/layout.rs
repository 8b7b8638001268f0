use archmap_layout::config::LayoutConfig;
use archmap_layout::layout::compute_layout_with;
use archmap_layout::model::parse_graph;
use archmap_layout::text_metrics::CharMetricSizer;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// Synthetic architecture graph: `categories` clusters of `leaves`
/// chained leaves each, plus cross-cluster edges and one reciprocal
/// pair per cluster.
fn clustered_graph_source(categories: usize, leaves: usize, cross_edges: usize) -> String {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut cats = Vec::new();

    for c in 0..categories {
        let members: Vec<String> = (0..leaves).map(|l| format!("\"n{c}_{l}\"")).collect();
        cats.push(format!(
            "{{\"id\": \"cat{c}\", \"label\": \"Category {c}\", \"members\": [{}]}}",
            members.join(", ")
        ));
        for l in 0..leaves {
            nodes.push(format!(
                "{{\"id\": \"n{c}_{l}\", \"label\": \"component {c}-{l}\"}}"
            ));
            if l + 1 < leaves {
                edges.push(format!(
                    "{{\"source\": \"n{c}_{l}\", \"target\": \"n{c}_{}\"}}",
                    l + 1
                ));
            }
        }
        if leaves > 2 {
            edges.push(format!(
                "{{\"source\": \"n{c}_2\", \"target\": \"n{c}_0\", \"label\": \"feedback\"}}"
            ));
            edges.push(format!(
                "{{\"source\": \"n{c}_0\", \"target\": \"n{c}_2\", \"label\": \"dispatch\"}}"
            ));
        }
    }
    for k in 0..cross_edges {
        let from = k % categories;
        let to = (k + 1) % categories;
        edges.push(format!(
            "{{\"source\": \"n{from}_{}\", \"target\": \"n{to}_{}\"}}",
            k % leaves,
            (k + 1) % leaves
        ));
    }

    format!(
        "{{\"nodes\": [{}], \"edges\": [{}], \"categories\": [{}]}}",
        nodes.join(", "),
        edges.join(", "),
        cats.join(", ")
    )
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let source = clustered_graph_source(8, 12, 40);
    group.bench_function("medium", |b| {
        b.iter(|| {
            let input = parse_graph(black_box(&source)).expect("parse failed");
            black_box(input.nodes.len());
        });
    });
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = LayoutConfig::default();
    let sizer = CharMetricSizer::new(&config.label);
    for (name, categories, leaves, cross) in [
        ("small", 4usize, 6usize, 8usize),
        ("medium", 8, 12, 40),
        ("large", 16, 25, 150),
    ] {
        let source = clustered_graph_source(categories, leaves, cross);
        let input = parse_graph(&source).expect("parse failed");
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| {
                let layout = compute_layout_with(black_box(input), &sizer, &config);
                black_box(layout.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_refined_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_refined");
    let mut config = LayoutConfig::default();
    config.refine.iterations = 30;
    let sizer = CharMetricSizer::new(&config.label);
    let source = clustered_graph_source(8, 12, 40);
    let input = parse_graph(&source).expect("parse failed");
    group.bench_function("medium", |b| {
        b.iter(|| {
            let layout = compute_layout_with(black_box(&input), &sizer, &config);
            black_box(layout.nodes.len());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_layout, bench_refined_layout);
criterion_main!(benches);
