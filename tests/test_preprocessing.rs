//! Integration test: per-modality preprocessing chains

use biomarker_fusion::config::{FeatureSelectionConfig, IntegrationConfig};
use biomarker_fusion::preprocessing::{preprocess, ImputeStrategy, ScaleMethod};
use biomarker_fusion::table::OmicsTable;
use ndarray::{array, Array2};

fn ids(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{}", prefix, i)).collect()
}

fn expression() -> OmicsTable {
    OmicsTable::new(
        "rna_seq",
        ids("S", 5),
        ids("g", 4),
        array![
            [1.0, 0.0, 10.0, 2.0],
            [2.0, 0.0, f64::NAN, 2.0],
            [3.0, 0.0, 30.0, 2.0],
            [4.0, 7.0, 40.0, f64::NAN],
            [f64::NAN, 0.0, 50.0, 2.0],
        ],
    )
    .unwrap()
}

fn no_scaling() -> IntegrationConfig {
    IntegrationConfig::default().with_scale(ScaleMethod::None)
}

#[test]
fn test_minmax_output_in_unit_interval() {
    let integration = IntegrationConfig::default().with_scale(ScaleMethod::MinMax);
    let out = preprocess(&expression(), &integration, &FeatureSelectionConfig::default()).unwrap();
    assert!(out.data().iter().all(|v| (0.0..=1.0).contains(v)));
    // constant column maps to 0
    let g3 = out.feature_index("g3").unwrap();
    assert!(out.data().column(g3).iter().all(|&v| v == 0.0));
}

#[test]
fn test_zscore_centres_columns() {
    let out = preprocess(
        &expression(),
        &IntegrationConfig::default(),
        &FeatureSelectionConfig::default(),
    )
    .unwrap();
    for col in out.data().columns() {
        let mean = col.sum() / col.len() as f64;
        assert!(mean.abs() < 1e-9);
    }
}

#[test]
fn test_median_imputation() {
    let integration = no_scaling().with_impute_strategy(Some(ImputeStrategy::Median));
    let out = preprocess(&expression(), &integration, &FeatureSelectionConfig::default()).unwrap();
    // g0 observed 1,2,3,4 → 2.5; g2 observed 10,30,40,50 → 35
    assert_eq!(out.data()[[4, 0]], 2.5);
    assert_eq!(out.data()[[1, 2]], 35.0);
}

#[test]
fn test_most_frequent_imputation_prefers_smallest_on_ties() {
    let table = OmicsTable::new(
        "m",
        ids("S", 5),
        vec!["x".into()],
        array![[3.0], [1.0], [3.0], [1.0], [f64::NAN]],
    )
    .unwrap();
    let integration = no_scaling().with_impute_strategy(Some(ImputeStrategy::MostFrequent));
    let out = preprocess(&table, &integration, &FeatureSelectionConfig::default()).unwrap();
    assert_eq!(out.data()[[4, 0]], 1.0);
}

#[test]
fn test_no_imputation_leaves_nan() {
    let integration = no_scaling().with_impute_strategy(None);
    let out = preprocess(&expression(), &integration, &FeatureSelectionConfig::default()).unwrap();
    assert!(out.has_missing());
    assert_eq!(out.n_features(), 4);
}

#[test]
fn test_sparsity_then_variance_then_top_k() {
    // g1 is mostly zero, g3 constant, g2 has the largest variance
    let integration = no_scaling().with_min_nonzero_fraction(0.5);
    let fs = FeatureSelectionConfig::default()
        .with_variance_threshold(0.0)
        .with_top_k(1);
    let out = preprocess(&expression(), &integration, &fs).unwrap();
    assert_eq!(out.features(), &["g2".to_string()]);
}

#[test]
fn test_top_k_emits_ranking_order() {
    let data = Array2::from_shape_fn((6, 4), |(i, j)| (i as f64) * (j as f64 + 1.0));
    let table = OmicsTable::new("t", ids("S", 6), ids("f", 4), data).unwrap();
    let fs = FeatureSelectionConfig::default().with_top_k(3);
    let out = preprocess(&table, &no_scaling(), &fs).unwrap();
    assert_eq!(out.features(), &["f3".to_string(), "f2".to_string(), "f1".to_string()]);
}

#[test]
fn test_top_k_not_smaller_than_width_is_noop() {
    let fs = FeatureSelectionConfig::default().with_top_k(10);
    let out = preprocess(&expression(), &no_scaling(), &fs).unwrap();
    assert_eq!(out.features(), expression().features());
}
