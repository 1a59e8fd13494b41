//! Integration test: loading omics and clinical tables from CSV

mod common;

use biomarker_fusion::config::{ClinicalConfig, TableConfig};
use biomarker_fusion::io::{load_clinical, load_table};
use biomarker_fusion::FusionError;
use common::csv;

#[test]
fn test_missing_tokens_read_as_nan() {
    let file = csv("sample_id,g1,g2,g3\nS1,NA,1,2\nS2,na,,3\nS3,null,4,5\n");
    let table = load_table("rna_seq", &TableConfig::new(file.path())).unwrap();
    assert!(table.data().column(0).iter().all(|v| v.is_nan()));
    assert!(table.data()[[1, 1]].is_nan());
    assert_eq!(table.data()[[2, 2]], 5.0);
}

#[test]
fn test_custom_id_column_and_subset_order() {
    let file = csv("patient,b,a,c\nP2,1,2,3\nP1,4,5,6\n");
    let config = TableConfig::new(file.path())
        .with_id_column("patient")
        .with_features(["a", "b"]);
    let table = load_table("methylation", &config).unwrap();
    assert_eq!(table.name(), "methylation");
    assert_eq!(table.samples(), &["P1".to_string(), "P2".to_string()]);
    assert_eq!(table.features(), &["a".to_string(), "b".to_string()]);
    assert_eq!(table.data()[[0, 0]], 5.0);
}

#[test]
fn test_missing_features_are_reported_sorted() {
    let file = csv("sample_id,a\nS1,1\n");
    let config = TableConfig::new(file.path()).with_features(["zeta", "a", "beta"]);
    match load_table("x", &config) {
        Err(FusionError::MissingFeatures { missing, source_name }) => {
            assert_eq!(missing, vec!["beta".to_string(), "zeta".to_string()]);
            assert!(source_name.ends_with(".csv"));
        }
        other => panic!("expected MissingFeatures, got {:?}", other.map(|t| t.n_features())),
    }
}

#[test]
fn test_duplicate_sample_fails() {
    let file = csv("sample_id,a\nS1,1\nS2,2\nS1,3\n");
    let err = load_table("x", &TableConfig::new(file.path())).unwrap_err();
    assert!(matches!(err, FusionError::DuplicateSample { ref sample, .. } if sample == "S1"));
}

#[test]
fn test_dropna_keeps_complete_rows_only() {
    let file = csv("sample_id,a,b\nS3,1,2\nS1,NA,2\nS2,1,\nS4,0,0\n");
    let table = load_table("x", &TableConfig::new(file.path()).with_dropna(true)).unwrap();
    assert_eq!(table.samples(), &["S3".to_string(), "S4".to_string()]);
    assert!(!table.has_missing());
}

#[test]
fn test_clinical_keeps_nulls_without_dropna() {
    let file = csv("sample_id,outcome,age\nS2,1,50\nS1,,61\n");
    let clinical = load_clinical(&ClinicalConfig::new(file.path())).unwrap();
    assert_eq!(clinical.samples(), &["S1".to_string(), "S2".to_string()]);
    assert_eq!(clinical.numeric_column("outcome").unwrap(), vec![None, Some(1.0)]);
    assert_eq!(clinical.outcome_column(), "outcome");
}

#[test]
fn test_clinical_unknown_covariate() {
    let file = csv("sample_id,outcome,age\nS1,1,50\n");
    let config = ClinicalConfig::new(file.path()).with_covariates(["age", "bmi"]);
    let err = load_clinical(&config).unwrap_err();
    assert!(matches!(err, FusionError::MissingFeatures { ref missing, .. } if missing == &vec!["bmi".to_string()]));
}

#[test]
fn test_clinical_custom_outcome_column() {
    let file = csv("id,response,stage\nB,0,I\nA,1,II\n");
    let config = ClinicalConfig::new(file.path())
        .with_id_column("id")
        .with_outcome_column("response");
    let clinical = load_clinical(&config).unwrap();
    assert_eq!(clinical.samples(), &["A".to_string(), "B".to_string()]);
    assert_eq!(clinical.numeric_column("response").unwrap(), vec![Some(1.0), Some(0.0)]);
}
