//! Writing pipeline artifacts under a results directory

use crate::error::Result;
use crate::integration::{summary_frame, FeatureSummary, IntegrationResult};
use crate::training::ModelResult;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Save a DataFrame as CSV with a header row, creating parent directories
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    debug!(path = %path.display(), rows = df.height(), "Wrote CSV");
    Ok(())
}

/// Save any serializable value as pretty-printed JSON
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// Persist the standard artifact set. Returns artifact id → written path.
///
/// ```text
/// <results_dir>/tables/integrated_features.csv
/// <results_dir>/tables/modality_summary.csv
/// <results_dir>/tables/test_predictions.csv
/// <results_dir>/tables/feature_importances.csv
/// <results_dir>/metrics/test_metrics.json
/// <results_dir>/metrics/cv_metrics.json
/// ```
pub fn write_artifacts(
    results_dir: &Path,
    integration: &IntegrationResult,
    summary: &[FeatureSummary],
    model: &ModelResult,
) -> Result<BTreeMap<String, PathBuf>> {
    let tables = results_dir.join("tables");
    let metrics = results_dir.join("metrics");
    let mut outputs = BTreeMap::new();

    let path = tables.join("integrated_features.csv");
    write_csv(&mut integration.combined_features.to_dataframe("sample_id")?, &path)?;
    outputs.insert("integrated_features".to_string(), path);

    let path = tables.join("modality_summary.csv");
    write_csv(&mut summary_frame(summary)?, &path)?;
    outputs.insert("modality_summary".to_string(), path);

    let path = tables.join("test_predictions.csv");
    write_csv(&mut model.predictions_frame()?, &path)?;
    outputs.insert("test_predictions".to_string(), path);

    let path = tables.join("feature_importances.csv");
    write_csv(&mut model.importances_frame()?, &path)?;
    outputs.insert("feature_importances".to_string(), path);

    let path = metrics.join("test_metrics.json");
    write_json(&model.metrics, &path)?;
    outputs.insert("test_metrics".to_string(), path);

    let path = metrics.join("cv_metrics.json");
    write_json(&model.cv_metrics, &path)?;
    outputs.insert("cv_metrics".to_string(), path);

    info!(dir = %results_dir.display(), artifacts = outputs.len(), "Artifacts written");
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_csv_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.csv");
        let mut df = df!("a" => [1.0, 2.0], "b" => ["x", "y"]).unwrap();
        write_csv(&mut df, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("a,b"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_write_json_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        let mut map = BTreeMap::new();
        map.insert("roc_auc".to_string(), 0.75);
        write_json(&map, &path).unwrap();

        let back: BTreeMap<String, f64> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["roc_auc"], 0.75);
    }

    #[test]
    fn test_unwritable_target_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // a regular file cannot act as a directory
        let err = write_json(&1, &blocker.join("out.json")).unwrap_err();
        assert!(err.is_resource_error());
    }
}
