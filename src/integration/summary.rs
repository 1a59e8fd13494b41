//! Descriptive statistics of integrated feature blocks

use super::IntegrationResult;
use crate::error::Result;
use crate::table::OmicsTable;
use crate::utils::stats::nan_variance;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One row of the modality summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub modality: String,
    pub n_samples: usize,
    pub n_features: usize,
    /// Fraction of cells that are exactly zero
    pub sparsity: f64,
    /// Mean of the column sample variances
    pub mean_variance: f64,
}

impl FeatureSummary {
    /// Summarise one table under the given label
    pub fn from_table(modality: impl Into<String>, table: &OmicsTable) -> Self {
        let cells = table.n_samples() * table.n_features();
        let zeros = table.data().iter().filter(|v| **v == 0.0).count();
        let sparsity = if cells == 0 { 0.0 } else { zeros as f64 / cells as f64 };

        let variances: Vec<f64> = table
            .data()
            .columns()
            .into_iter()
            .filter_map(|col| nan_variance(col, 1))
            .collect();
        let mean_variance = if variances.is_empty() {
            0.0
        } else {
            variances.iter().sum::<f64>() / variances.len() as f64
        };

        Self {
            modality: modality.into(),
            n_samples: table.n_samples(),
            n_features: table.n_features(),
            sparsity,
            mean_variance,
        }
    }
}

/// One row per modality, then a `combined` row
pub fn compute_feature_summary(result: &IntegrationResult) -> Vec<FeatureSummary> {
    result
        .modality_frames
        .iter()
        .map(|t| FeatureSummary::from_table(t.name(), t))
        .chain(std::iter::once(FeatureSummary::from_table(
            "combined",
            &result.combined_features,
        )))
        .collect()
}

/// Summary rows as a polars frame, ready for CSV output
pub fn summary_frame(rows: &[FeatureSummary]) -> Result<DataFrame> {
    let df = df!(
        "modality" => rows.iter().map(|r| r.modality.clone()).collect::<Vec<_>>(),
        "n_samples" => rows.iter().map(|r| r.n_samples as u64).collect::<Vec<_>>(),
        "n_features" => rows.iter().map(|r| r.n_features as u64).collect::<Vec<_>>(),
        "sparsity" => rows.iter().map(|r| r.sparsity).collect::<Vec<_>>(),
        "mean_variance" => rows.iter().map(|r| r.mean_variance).collect::<Vec<_>>(),
    )?;
    Ok(df)
}
