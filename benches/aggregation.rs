use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

use tribunal::domain::models::{Case, Config, CriticOutput, Verdict};
use tribunal::domain::ports::Critic;
use tribunal::infrastructure::critics::ScriptedCritic;
use tribunal::services::{Aggregator, ConflictDetector, DissentAnalyzer, GovernanceEngine};

const VERDICTS: [Verdict; 4] = [Verdict::Allow, Verdict::Block, Verdict::Review, Verdict::Allow];

fn panel(size: usize) -> Vec<CriticOutput> {
    (0..size)
        .map(|i| {
            let confidence = 0.3 + (i % 7) as f64 * 0.1;
            CriticOutput::new(format!("critic-{i}"), VERDICTS[i % VERDICTS.len()], confidence)
                .with_weight(1.0 + (i % 3) as f64 * 0.5)
                .with_justification(format!("principle {} weighed against harm", i % 5))
        })
        .collect()
}

fn bench_analysis(c: &mut Criterion) {
    let aggregator = Aggregator::default();
    let detector = ConflictDetector::default();
    let dissent = DissentAnalyzer::new();

    let mut group = c.benchmark_group("analysis");
    for size in [3usize, 10, 50] {
        let outputs = panel(size);
        group.bench_with_input(BenchmarkId::new("aggregate", size), &outputs, |b, outputs| {
            b.iter(|| aggregator.aggregate(black_box(outputs)));
        });
        group.bench_with_input(BenchmarkId::new("detect_conflicts", size), &outputs, |b, outputs| {
            b.iter(|| detector.detect(black_box(outputs)));
        });
        group.bench_with_input(BenchmarkId::new("dissent", size), &outputs, |b, outputs| {
            b.iter(|| dissent.analyze(black_box(outputs)));
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let Ok(runtime) = Runtime::new() else {
        return;
    };

    let critics: Vec<Arc<dyn Critic>> = panel(5)
        .into_iter()
        .map(|o| Arc::new(ScriptedCritic::returning(o.critic_name, o.verdict, o.confidence)) as Arc<dyn Critic>)
        .collect();
    let Ok(engine) = GovernanceEngine::new(&Config::default(), critics) else {
        return;
    };
    let case = Case::new("Summarize the attached medical record for the patient");

    c.bench_function("evaluate_case/5_critics", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(engine.evaluate_case(&case).await.ok());
        });
    });
}

criterion_group!(benches, bench_analysis, bench_pipeline);
criterion_main!(benches);
