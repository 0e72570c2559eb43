//! Benchmark suite for curriculum-algo
//!
//! Run with: cargo bench

use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use curriculum_algo::enrich::{COMPLEXITY_LEVELS, LESSON_NAMES};
use curriculum_algo::{
    build_features, build_targets, generate_enriched_metadata, recommend, CurriculumGraph,
    EnrichmentTables, GcnConfig, GraphDescription, LessonGcn,
};

fn curriculum() -> CurriculumGraph {
    let labels: Vec<&str> = COMPLEXITY_LEVELS.iter().map(|(id, _)| *id).collect();
    let links: Vec<(usize, usize)> = (1..labels.len()).map(|i| (i - 1, i)).collect();
    let desc = GraphDescription::from_labels(&labels, &links);
    let students = vec![vec!["2.1", "3.2"], vec!["4.6"]];
    let tables = EnrichmentTables {
        complexity_levels: COMPLEXITY_LEVELS,
        lesson_names: LESSON_NAMES,
    };
    let meta = generate_enriched_metadata(&desc, students, &tables);
    match CurriculumGraph::build(desc, meta, None) {
        Ok(graph) => graph,
        Err(err) => panic!("bench curriculum is invalid: {err}"),
    }
}

fn unmastered() -> BTreeSet<String> {
    ["2.1", "2.2", "3.4", "4.6", "8.3"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn bench_features(c: &mut Criterion) {
    let graph = curriculum();
    let set = unmastered();
    c.bench_function("build_features", |b| {
        b.iter(|| build_features(black_box(&graph), black_box(&set)))
    });
}

fn bench_gcn_fit(c: &mut Criterion) {
    let graph = curriculum();
    let set = unmastered();
    let x = build_features(&graph, &set);
    let y = build_targets(&graph, &set);
    c.bench_function("LessonGcn::fit (200 epochs)", |b| {
        b.iter(|| {
            let mut model = LessonGcn::new(GcnConfig::default());
            model.fit(black_box(&x), graph.adjacency(), black_box(&y))
        })
    });
}

fn bench_recommend(c: &mut Criterion) {
    let graph = curriculum();
    let set = unmastered();
    c.bench_function("recommend", |b| {
        b.iter(|| recommend(black_box(&graph), black_box(&set), &GcnConfig::default(), 5))
    });
}

criterion_group!(benches, bench_features, bench_gcn_fit, bench_recommend);
criterion_main!(benches);
