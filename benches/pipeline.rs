use biomarker_fusion::config::{FeatureSelectionConfig, IntegrationConfig, ModelConfig};
use biomarker_fusion::integration::integrate;
use biomarker_fusion::synthetic::{generate, SyntheticConfig};
use biomarker_fusion::training::train;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_integration(c: &mut Criterion) {
    let mut group = c.benchmark_group("integration");

    for n_samples in [80, 200, 500].iter() {
        let cohort = generate(&SyntheticConfig::default().with_samples(*n_samples)).unwrap();
        let tables = cohort.tables();
        let integration_cfg = IntegrationConfig::default();
        let fs_cfg = FeatureSelectionConfig::default().with_top_k(100);

        group.bench_with_input(BenchmarkId::new("integrate", n_samples), &tables, |b, tables| {
            b.iter(|| {
                integrate(black_box(tables), &cohort.clinical, &integration_cfg, &fs_cfg).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let cohort = generate(&SyntheticConfig::default().with_samples(200)).unwrap();
    let integrated = integrate(
        &cohort.tables(),
        &cohort.clinical,
        &IntegrationConfig::default(),
        &FeatureSelectionConfig::default().with_top_k(100),
    )
    .unwrap();

    for estimator in ["logistic_regression", "sgd", "random_forest"].iter() {
        let config = ModelConfig::default().with_estimator(*estimator).with_n_jobs(-1);
        group.bench_with_input(BenchmarkId::new("train", estimator), &config, |b, config| {
            b.iter(|| {
                train(
                    black_box(&integrated.combined_features),
                    &integrated.clinical,
                    config,
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_integration, bench_training);
criterion_main!(benches);
