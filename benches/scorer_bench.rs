use criterion::{Criterion, black_box, criterion_group, criterion_main};
use reranker::{
    Candidate, CandidateSet, CandidateSetScorer, DefaultCandidateSetScorer, Model,
    RandomPairCandidateSetScorer,
};

fn candidate_set(num_candidates: usize) -> CandidateSet {
    let mut set = CandidateSet::new("bench");
    for i in 0..num_candidates {
        set.push(
            Candidate::new((i % 7) as f64)
                .with_feature(i as u32 % 50, 1.0)
                .with_feature(100 + i as u32 % 13, 0.5)
                .with_symbolic_feature(format!("rank={}", i % 10), 1.0)
                .with_symbolic_feature("bias", 1.0),
        );
    }
    set
}

fn trained_model() -> Model {
    let mut model = Model::new("bench");
    let set = candidate_set(100);
    for candidate in set.iter() {
        let features = model.candidate_features(candidate, true);
        model.update_weights(&features, 0.1 * (candidate.index % 3) as f64);
    }
    model
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    group.bench_function("default", |b| {
        let mut model = trained_model();
        let mut set = candidate_set(100);
        b.iter(|| {
            DefaultCandidateSetScorer.score(&mut model, black_box(&mut set), false);
        })
    });
    group.bench_function("random_pair", |b| {
        let mut model = trained_model();
        let scorer = RandomPairCandidateSetScorer::with_seed(7);
        let mut set = candidate_set(100);
        b.iter(|| {
            scorer.score(&mut model, black_box(&mut set), true);
        })
    });
    group.bench_function("candidate", |b| {
        let mut model = trained_model();
        let mut candidate = candidate_set(1).iter().next().cloned().unwrap();
        b.iter(|| {
            let _score = model.score_candidate(black_box(&mut candidate), false);
        })
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
