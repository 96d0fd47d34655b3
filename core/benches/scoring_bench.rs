use criterion::{criterion_group, criterion_main, Criterion};
use vecspace_core::config::ScoringOptions;
use vecspace_core::normalizer::{Normalizer, StopWords};
use vecspace_core::pipeline::{build_from_str, PipelineOptions};
use vecspace_core::scorer::{QueryScorer, SearchIndex};

const WORDS: &[&str] = &[
    "boundary", "layer", "flow", "supersonic", "wedge", "shock", "laminar", "turbulent",
    "heat", "transfer", "pressure", "gradient", "wing", "airfoil", "lift", "drag",
];

fn corpus(docs: usize) -> String {
    (0..docs)
        .map(|d| {
            let body: Vec<&str> = (0..40).map(|i| WORDS[(d * 7 + i * i) % WORDS.len()]).collect();
            format!("doc {d} {}\n", body.join(" "))
        })
        .collect()
}

fn bench_scoring(c: &mut Criterion) {
    let norm = Normalizer::english(StopWords::english());
    let text = corpus(2_000);
    c.bench_function("build_2k_docs", |b| {
        b.iter(|| build_from_str(&text, &norm, &PipelineOptions::default()).unwrap())
    });

    let (sealed, _) = build_from_str(&text, &norm, &PipelineOptions::default()).unwrap();
    let weighted = sealed.weigh().unwrap();
    let index = SearchIndex::from_weighted(&sealed, &weighted);
    let scorer = QueryScorer::new(&index, &norm);
    let options = ScoringOptions::default();
    c.bench_function("query_three_terms", |b| {
        b.iter(|| scorer.search("supersonic boundary layer", &options).unwrap())
    });
}

criterion_group!(benches, bench_scoring);
criterion_main!(benches);
