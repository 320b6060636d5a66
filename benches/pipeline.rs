use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use taskalloc::generator::{generate_instance, GeneratorConfig};
use taskalloc::middleware::{
    ContinuousIndexer, CycleRemover, DependencyPruner, ImpossibleTaskRemover, Pipeline, Stage,
    TabuSearch,
};
use taskalloc::solvers::GreedySolver;

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    group.sampling_mode(criterion::SamplingMode::Flat);

    for (num_tasks, num_teams) in [(30, 4), (60, 6)] {
        let config = GeneratorConfig {
            num_tasks,
            num_teams,
            ..GeneratorConfig::default()
        };
        let problem = generate_instance(&config, 42);

        group.bench_with_input(
            BenchmarkId::new("full_pipeline", format!("{num_tasks}x{num_teams}")),
            &problem,
            |b, problem| {
                b.iter(|| {
                    let pipeline = Pipeline::new(
                        vec![
                            Stage::transform(ImpossibleTaskRemover),
                            Stage::transform(CycleRemover),
                            Stage::transform(DependencyPruner),
                            Stage::adapt(ContinuousIndexer),
                            Stage::refine(TabuSearch::default()),
                        ],
                        GreedySolver,
                    )
                    .with_total_budget(Duration::from_millis(50));
                    pipeline.run(problem).unwrap()
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("greedy_only", format!("{num_tasks}x{num_teams}")),
            &problem,
            |b, problem| {
                b.iter(|| {
                    Pipeline::new(vec![], GreedySolver)
                        .without_validation()
                        .run(problem)
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
