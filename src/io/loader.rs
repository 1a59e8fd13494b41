//! CSV loading for omics and clinical tables

use crate::config::{ClinicalConfig, TableConfig};
use crate::error::{FusionError, Result};
use crate::table::{ClinicalTable, OmicsTable};
use ndarray::Array2;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Tokens read as missing in addition to empty cells
const NULL_TOKENS: [&str; 3] = ["NA", "na", "null"];

/// Read a CSV file with a header row
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(FusionError::FileNotFound(path.to_path_buf()));
    }

    let parse_opts = CsvParseOptions::default().with_null_values(Some(NullValues::AllColumns(
        NULL_TOKENS.iter().map(|t| (*t).into()).collect(),
    )));

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse_opts)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Read CSV");
    Ok(df)
}

/// Load one omics modality
pub fn load_table(name: &str, config: &TableConfig) -> Result<OmicsTable> {
    let df = read_csv(&config.path)?;
    let source = config.path.display().to_string();
    let samples = sample_ids(&df, &config.id_column, &source)?;

    let features: Vec<String> = match &config.features {
        Some(requested) => {
            let available: HashSet<String> = df
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect();
            let mut missing: Vec<String> = requested
                .iter()
                .filter(|f| !available.contains(f.as_str()) || **f == config.id_column)
                .cloned()
                .collect();
            if !missing.is_empty() {
                missing.sort();
                missing.dedup();
                return Err(FusionError::MissingFeatures { source_name: source, missing });
            }
            requested.clone()
        }
        None => df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|c| *c != config.id_column)
            .collect(),
    };

    let mut data = Array2::from_elem((df.height(), features.len()), f64::NAN);
    for (j, feature) in features.iter().enumerate() {
        let values = numeric_values(&df, feature, &source)?;
        for (i, v) in values.into_iter().enumerate() {
            data[[i, j]] = v;
        }
    }

    let mut table = OmicsTable::new(name, samples, features, data).map_err(|e| match e {
        FusionError::DuplicateSample { sample, .. } => FusionError::DuplicateSample {
            sample,
            source_name: source.clone(),
        },
        other => other,
    })?;

    if config.dropna {
        let keep: Vec<usize> = table
            .data()
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| !row.iter().any(|v| v.is_nan()))
            .map(|(i, _)| i)
            .collect();
        table = table.select_rows(&keep);
    }

    let table = table.sorted_by_sample();
    info!(
        modality = name,
        n_samples = table.n_samples(),
        n_features = table.n_features(),
        "Loaded omics table"
    );
    Ok(table)
}

/// Load the clinical table
pub fn load_clinical(config: &ClinicalConfig) -> Result<ClinicalTable> {
    let df = read_csv(&config.path)?;
    let source = config.path.display().to_string();
    let samples = sample_ids(&df, &config.id_column, &source)?;

    let mut data = df.drop(&config.id_column)?;
    if data.column(&config.outcome_column).is_err() {
        return Err(FusionError::MissingColumn {
            column: config.outcome_column.clone(),
            source_name: source,
        });
    }

    // `features` narrows the table first, `covariates` then picks from what is left
    for columns in [&config.features, &config.covariates].into_iter().flatten() {
        data = keep_with_outcome(&data, &config.outcome_column, columns, &source)?;
    }

    let (samples, data) = if config.dropna {
        let mask = data
            .column(&config.outcome_column)?
            .as_materialized_series()
            .is_not_null();
        let samples = samples
            .into_iter()
            .zip(&mask)
            .filter(|(_, keep)| keep.unwrap_or(false))
            .map(|(s, _)| s)
            .collect::<Vec<_>>();
        (samples, data.filter(&mask)?)
    } else {
        (samples, data)
    };

    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.sort_by(|&a, &b| samples[a].cmp(&samples[b]));
    let idx = IdxCa::from_vec("idx".into(), order.iter().map(|&i| i as IdxSize).collect());
    let data = data.take(&idx)?;
    let samples: Vec<String> = order.into_iter().map(|i| samples[i].clone()).collect();

    let clinical = ClinicalTable::new(samples, data, config.outcome_column.clone()).map_err(|e| {
        match e {
            FusionError::DuplicateSample { sample, .. } => FusionError::DuplicateSample {
                sample,
                source_name: source.clone(),
            },
            other => other,
        }
    })?;
    info!(
        n_samples = clinical.n_samples(),
        outcome = clinical.outcome_column(),
        "Loaded clinical table"
    );
    Ok(clinical)
}

/// Select `columns` behind the outcome column
fn keep_with_outcome(
    data: &DataFrame,
    outcome: &str,
    columns: &[String],
    source: &str,
) -> Result<DataFrame> {
    let mut missing: Vec<String> = columns
        .iter()
        .filter(|c| data.column(c.as_str()).is_err())
        .cloned()
        .collect();
    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(FusionError::MissingFeatures {
            source_name: source.to_string(),
            missing,
        });
    }
    let mut keep = vec![outcome.to_string()];
    for c in columns {
        if !keep.contains(c) {
            keep.push(c.clone());
        }
    }
    Ok(data.select(keep)?)
}

fn sample_ids(df: &DataFrame, id_column: &str, source: &str) -> Result<Vec<String>> {
    let col = df.column(id_column).map_err(|_| FusionError::MissingColumn {
        column: id_column.to_string(),
        source_name: source.to_string(),
    })?;
    let ids = col.as_materialized_series().cast(&DataType::String)?;
    ids.str()?
        .into_iter()
        .enumerate()
        .map(|(row, id)| {
            id.map(str::to_string).ok_or_else(|| {
                FusionError::Data(format!("{}: row {} has no '{}' value", source, row + 1, id_column))
            })
        })
        .collect()
}

/// Feature column as floats with `NaN` for missing cells
fn numeric_values(df: &DataFrame, column: &str, source: &str) -> Result<Vec<f64>> {
    let series = df.column(column)?.as_materialized_series();
    // an all-missing column is inferred as text; let it through as NaN
    if matches!(series.dtype(), DataType::String) && series.null_count() < series.len() {
        return Err(FusionError::Data(format!(
            "column '{}' in {} is not numeric",
            column, source
        )));
    }
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_sorts_by_sample() {
        let file = csv("sample_id,g1,g2\nS2,1.0,2.0\nS1,3.0,NA\n");
        let table = load_table("rna_seq", &TableConfig::new(file.path())).unwrap();
        assert_eq!(table.samples(), &["S1".to_string(), "S2".to_string()]);
        assert_eq!(table.features(), &["g1".to_string(), "g2".to_string()]);
        assert_eq!(table.data()[[0, 0]], 3.0);
        assert!(table.data()[[0, 1]].is_nan());
    }

    #[test]
    fn test_missing_file() {
        let err = load_table("x", &TableConfig::new("/nonexistent/rna.csv")).unwrap_err();
        assert!(matches!(err, FusionError::FileNotFound(_)));
        assert!(err.is_resource_error());
    }

    #[test]
    fn test_missing_id_column() {
        let file = csv("id,g1\nS1,1\n");
        let err = load_table("x", &TableConfig::new(file.path())).unwrap_err();
        assert!(matches!(err, FusionError::MissingColumn { ref column, .. } if column == "sample_id"));
        assert!(err.is_data_error());
    }

    #[test]
    fn test_feature_subset() {
        let file = csv("sample_id,a,b,c\nS1,1,2,3\n");
        let config = TableConfig::new(file.path()).with_features(["c", "a"]);
        let table = load_table("x", &config).unwrap();
        assert_eq!(table.features(), &["c".to_string(), "a".to_string()]);

        let config = TableConfig::new(file.path()).with_features(["z", "a", "y"]);
        match load_table("x", &config).unwrap_err() {
            FusionError::MissingFeatures { missing, .. } => assert_eq!(missing, vec!["y", "z"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dropna_and_duplicates() {
        let file = csv("sample_id,a\nS1,1\nS2,\nS3,3\n");
        let table = load_table("x", &TableConfig::new(file.path()).with_dropna(true)).unwrap();
        assert_eq!(table.n_samples(), 2);

        let file = csv("sample_id,a\nS1,1\nS1,2\n");
        let err = load_table("x", &TableConfig::new(file.path())).unwrap_err();
        assert!(matches!(err, FusionError::DuplicateSample { .. }));
    }

    #[test]
    fn test_non_numeric_feature_rejected() {
        let file = csv("sample_id,a\nS1,high\nS2,low\n");
        let err = load_table("x", &TableConfig::new(file.path())).unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_load_clinical() {
        let file = csv("sample_id,age,outcome,stage\nS3,50,1,II\nS1,61,NA,I\nS2,45,0,III\n");
        let config = ClinicalConfig::new(file.path()).with_dropna(true).with_covariates(["age"]);
        let clinical = load_clinical(&config).unwrap();
        assert_eq!(clinical.samples(), &["S2".to_string(), "S3".to_string()]);
        assert_eq!(clinical.data().width(), 2);
        assert_eq!(
            clinical.numeric_column("outcome").unwrap(),
            vec![Some(0.0), Some(1.0)]
        );
    }

    #[test]
    fn test_clinical_feature_subset() {
        let file = csv("sample_id,age,outcome,stage,bmi\nS1,50,1,II,22.5\nS2,45,0,III,30.1\n");
        let config = ClinicalConfig {
            features: Some(vec!["bmi".to_string(), "age".to_string()]),
            ..ClinicalConfig::new(file.path())
        };
        let clinical = load_clinical(&config).unwrap();
        let names: Vec<String> = clinical.data().get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(names, ["outcome", "bmi", "age"]);

        // covariates pick from the narrowed table
        let err = load_clinical(&ClinicalConfig { covariates: Some(vec!["stage".to_string()]), ..config })
            .unwrap_err();
        assert!(matches!(err, FusionError::MissingFeatures { ref missing, .. } if missing == &["stage".to_string()]));
    }

    #[test]
    fn test_clinical_missing_outcome() {
        let file = csv("sample_id,label\nS1,1\n");
        let err = load_clinical(&ClinicalConfig::new(file.path())).unwrap_err();
        assert!(matches!(err, FusionError::MissingColumn { ref column, .. } if column == "outcome"));
    }
}
