//! Integration test: training every estimator family on a synthetic cohort

use biomarker_fusion::config::{ClassWeight, FeatureSelectionConfig, IntegrationConfig, ModelConfig};
use biomarker_fusion::integration::{integrate, IntegrationResult};
use biomarker_fusion::synthetic::{generate, SyntheticConfig};
use biomarker_fusion::training::{stratified_split, train, Classifier, StratifiedKFold, METRIC_NAMES};
use biomarker_fusion::FusionError;
use ndarray::Array1;

fn integrated(n_samples: usize) -> IntegrationResult {
    let cohort = generate(&SyntheticConfig::default().with_samples(n_samples).with_features(30, 20, 15)).unwrap();
    integrate(
        &cohort.tables(),
        &cohort.clinical,
        &IntegrationConfig::default(),
        &FeatureSelectionConfig::default().with_top_k(20),
    )
    .unwrap()
}

#[test]
fn test_every_estimator_family_trains() {
    let data = integrated(60);
    for (name, expected) in [
        ("logistic", "logistic_regression"),
        ("elastic_net", "elastic_net"),
        ("sgd_classifier", "sgd"),
        ("randomforest", "random_forest"),
    ] {
        let mut config = ModelConfig::default().with_estimator(name);
        if expected == "random_forest" {
            config = config.with_param("n_estimators", 30);
        }
        let result = train(&data.combined_features, &data.clinical, &config)
            .unwrap_or_else(|e| panic!("{} failed: {}", name, e));

        assert_eq!(result.estimator_name, name);
        assert_eq!(result.estimator.name(), expected);
        for metric in METRIC_NAMES {
            let value = result.metrics[metric];
            assert!((0.0..=1.0).contains(&value), "{} {} = {}", name, metric, value);
            assert!(result.cv_metrics.contains_key(metric));
        }
        assert_eq!(result.feature_importances.len(), data.combined_features.n_features());
        assert_eq!(result.test_predictions.len(), 12);
    }
}

#[test]
fn test_importances_sorted_descending() {
    let data = integrated(50);
    let result = train(&data.combined_features, &data.clinical, &ModelConfig::default()).unwrap();
    assert!(result
        .feature_importances
        .windows(2)
        .all(|w| w[0].importance >= w[1].importance));
    assert!(result.feature_importances.iter().all(|f| f.importance >= 0.0));
}

#[test]
fn test_predictions_are_held_out_samples() {
    let data = integrated(50);
    let result = train(&data.combined_features, &data.clinical, &ModelConfig::default()).unwrap();
    let samples = data.combined_features.samples();
    for p in &result.test_predictions {
        assert!(samples.contains(&p.sample_id));
        assert!((0.0..=1.0).contains(&p.score));
    }
    let frame = result.predictions_frame().unwrap();
    let names: Vec<String> = frame.get_column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(names, vec!["sample_id", "true_label", "predicted_label", "score"]);
}

#[test]
fn test_unknown_estimator_param_is_config_error() {
    let data = integrated(40);
    let config = ModelConfig::default().with_param("n_estimators", 10);
    let err = train(&data.combined_features, &data.clinical, &config).unwrap_err();
    assert!(matches!(err, FusionError::InvalidParameter { .. }));
    assert!(err.is_config_error());
}

#[test]
fn test_wrongly_typed_param_is_config_error() {
    let data = integrated(40);
    let config = ModelConfig::default().with_param("C", "strong");
    let err = train(&data.combined_features, &data.clinical, &config).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_unweighted_training_runs() {
    let data = integrated(40);
    let config = ModelConfig::default().with_class_weight(None);
    assert!(train(&data.combined_features, &data.clinical, &config).is_ok());
    let config = ModelConfig::default().with_class_weight(Some(ClassWeight::Balanced));
    assert!(train(&data.combined_features, &data.clinical, &config).is_ok());
}

#[test]
fn test_training_is_reproducible_across_thread_counts() {
    let data = integrated(50);
    let base = ModelConfig::default()
        .with_estimator("random_forest")
        .with_param("n_estimators", 20);
    let a = train(&data.combined_features, &data.clinical, &base.clone().with_n_jobs(1)).unwrap();
    let b = train(&data.combined_features, &data.clinical, &base.with_n_jobs(4)).unwrap();
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.cv_metrics, b.cv_metrics);
    assert_eq!(a.test_predictions, b.test_predictions);
}

#[test]
fn test_split_and_folds_are_stratified() {
    let y = Array1::from_iter((0..45).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }));
    let split = stratified_split(&y, 0.2, 42).unwrap();
    assert_eq!(split.test_indices.len(), 9);
    let test_pos = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
    assert_eq!(test_pos, 3);

    let folds = StratifiedKFold::new(5).with_random_state(42).split(&y).unwrap();
    let mut seen = vec![0usize; 45];
    for fold in &folds {
        for &i in &fold.test_indices {
            seen[i] += 1;
        }
        let pos = fold.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(pos, 3);
    }
    assert!(seen.iter().all(|&count| count == 1));
}
