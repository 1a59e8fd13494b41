//! Per-modality preprocessing
//!
//! Each modality passes through an ordered list of pure [`Transform`] steps:
//! 1. sparsity filter
//! 2. variance filter
//! 3. top-k by variance
//! 4. imputation
//! 5. scaling
//!
//! Steps never mutate their input; every step returns a new [`OmicsTable`].
//! Statistics are computed from the whole modality, before any train/test
//! split happens downstream.

mod imputer;
mod scaler;
pub mod feature_selection;

pub use feature_selection::{FeatureSelector, SelectionMethod};
pub use imputer::{ImputeStrategy, Imputer};
pub use scaler::{ScaleMethod, Scaler};

use crate::config::{FeatureSelectionConfig, IntegrationConfig};
use crate::error::{FusionError, Result};
use crate::table::OmicsTable;
use tracing::{debug, warn};

/// One preprocessing step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    SparsityFilter { min_fraction: f64 },
    VarianceFilter { threshold: f64 },
    TopK { k: usize },
    Impute(ImputeStrategy),
    Scale(ScaleMethod),
}

impl Transform {
    /// Short step name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Transform::SparsityFilter { .. } => "sparsity_filter",
            Transform::VarianceFilter { .. } => "variance_filter",
            Transform::TopK { .. } => "top_k",
            Transform::Impute(_) => "impute",
            Transform::Scale(_) => "scale",
        }
    }

    /// True for steps that only drop columns
    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            Transform::SparsityFilter { .. } | Transform::VarianceFilter { .. } | Transform::TopK { .. }
        )
    }

    /// Apply the step, producing a new table
    pub fn apply(&self, table: &OmicsTable) -> Result<OmicsTable> {
        match *self {
            Transform::SparsityFilter { min_fraction } => {
                select(table, FeatureSelector::non_zero_fraction(min_fraction))
            }
            Transform::VarianceFilter { threshold } => {
                let filtered = select(table, FeatureSelector::variance_threshold(threshold))?;
                if filtered.n_features() == 0 {
                    return Err(FusionError::Data(format!(
                        "variance threshold {} removed every feature of '{}'",
                        threshold,
                        table.name()
                    )));
                }
                Ok(filtered)
            }
            Transform::TopK { k } => {
                if k >= table.n_features() {
                    return Ok(table.clone());
                }
                select(table, FeatureSelector::top_k(k))
            }
            Transform::Impute(strategy) => impute(table, strategy),
            Transform::Scale(method) => {
                if method == ScaleMethod::None {
                    return Ok(table.clone());
                }
                let scaled = Scaler::new(method).fit_transform(table.data())?;
                table.with_data(scaled)
            }
        }
    }
}

/// Ordered steps implied by the configuration
pub fn build_steps(
    integration: &IntegrationConfig,
    feature_selection: &FeatureSelectionConfig,
) -> Vec<Transform> {
    let mut steps = Vec::with_capacity(5);
    if let Some(min_fraction) = integration.min_nonzero_fraction.filter(|f| *f > 0.0) {
        steps.push(Transform::SparsityFilter { min_fraction });
    }
    if let Some(threshold) = feature_selection.variance_threshold {
        steps.push(Transform::VarianceFilter { threshold });
    }
    if feature_selection.per_modality {
        if let Some(k) = feature_selection.top_k {
            steps.push(Transform::TopK { k });
        }
    }
    if let Some(strategy) = integration.impute_strategy {
        steps.push(Transform::Impute(strategy));
    }
    if integration.scale != ScaleMethod::None {
        steps.push(Transform::Scale(integration.scale));
    }
    steps
}

/// Run every configured step over one modality
pub fn preprocess(
    table: &OmicsTable,
    integration: &IntegrationConfig,
    feature_selection: &FeatureSelectionConfig,
) -> Result<OmicsTable> {
    run_steps(table, &build_steps(integration, feature_selection))
}

/// Preprocess every modality.
///
/// With `per_modality` disabled, `top_k` is applied once across all
/// modalities: after the filters, every remaining column is ranked by its
/// sample variance within its own modality and the `top_k` best columns
/// overall survive. Imputation and scaling run afterwards.
pub fn preprocess_modalities(
    tables: &[OmicsTable],
    integration: &IntegrationConfig,
    feature_selection: &FeatureSelectionConfig,
) -> Result<Vec<OmicsTable>> {
    let k = match feature_selection.top_k {
        Some(k) if !feature_selection.per_modality => k,
        _ => {
            return tables
                .iter()
                .map(|t| preprocess(t, integration, feature_selection))
                .collect()
        }
    };

    let (filters, rest): (Vec<Transform>, Vec<Transform>) = build_steps(integration, feature_selection)
        .into_iter()
        .partition(Transform::is_filter);

    let filtered = tables
        .iter()
        .map(|t| run_steps(t, &filters))
        .collect::<Result<Vec<_>>>()?;

    // (table, column, variance) in modality order, then column order
    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
    for (t, table) in filtered.iter().enumerate() {
        for (j, col) in table.data().columns().into_iter().enumerate() {
            let variance = crate::utils::stats::nan_variance(col, 1).unwrap_or(f64::NAN);
            candidates.push((t, j, variance));
        }
    }
    candidates.sort_by(|a, b| feature_selection::descending_nan_last(a.2, b.2));
    candidates.truncate(k);

    debug!(top_k = k, retained = candidates.len(), "Selected features across modalities");

    filtered
        .iter()
        .enumerate()
        .map(|(t, table)| {
            let keep: Vec<usize> = candidates
                .iter()
                .filter(|(owner, _, _)| *owner == t)
                .map(|(_, j, _)| *j)
                .collect();
            run_steps(&table.select_columns(&keep), &rest)
        })
        .collect()
}

fn run_steps(table: &OmicsTable, steps: &[Transform]) -> Result<OmicsTable> {
    let mut current = table.clone();
    for step in steps {
        let before = current.n_features();
        current = step.apply(&current)?;
        debug!(
            modality = table.name(),
            step = step.name(),
            features_before = before,
            features_after = current.n_features(),
            "Preprocessing step applied"
        );
    }
    Ok(current)
}

/// Impute missing cells; columns with no observed value are dropped
pub(crate) fn impute(table: &OmicsTable, strategy: ImputeStrategy) -> Result<OmicsTable> {
    let mut imputer = Imputer::new(strategy);
    imputer.fit(table.data())?;

    let unfillable = imputer.unfillable_columns();
    let filled = table.with_data(imputer.transform(table.data())?)?;
    if unfillable.is_empty() {
        return Ok(filled);
    }

    let dropped: Vec<&str> = unfillable.iter().map(|&i| table.features()[i].as_str()).collect();
    warn!(
        modality = table.name(),
        n_dropped = dropped.len(),
        columns = ?dropped,
        "Dropping columns with no observed values"
    );
    let keep: Vec<usize> = (0..table.n_features())
        .filter(|i| !unfillable.contains(i))
        .collect();
    Ok(filled.select_columns(&keep))
}

fn select(table: &OmicsTable, mut selector: FeatureSelector) -> Result<OmicsTable> {
    selector.fit(table.data())?;
    let indices = selector.selected_indices().ok_or(FusionError::ModelNotFitted)?;
    Ok(table.select_columns(indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn table() -> OmicsTable {
        OmicsTable::new(
            "rna_seq",
            vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()],
            vec!["flat".into(), "sparse".into(), "wide".into(), "gappy".into()],
            array![
                [1.0, 0.0, 10.0, 1.0],
                [1.0, 0.0, 20.0, f64::NAN],
                [1.0, 0.0, 30.0, 3.0],
                [1.0, 5.0, 40.0, 4.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_steps_order() {
        let integration = IntegrationConfig::default().with_min_nonzero_fraction(0.5);
        let fs = FeatureSelectionConfig::default()
            .with_variance_threshold(0.0)
            .with_top_k(2);
        let steps = build_steps(&integration, &fs);
        let names: Vec<_> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["sparsity_filter", "variance_filter", "top_k", "impute", "scale"]);
    }

    #[test]
    fn test_zero_fraction_skips_filter() {
        let integration = IntegrationConfig::default().with_min_nonzero_fraction(0.0);
        let steps = build_steps(&integration, &FeatureSelectionConfig::default());
        assert!(!steps.iter().any(|s| matches!(s, Transform::SparsityFilter { .. })));
    }

    #[test]
    fn test_preprocess_filters_and_fills() {
        let integration = IntegrationConfig::default().with_min_nonzero_fraction(0.5);
        let fs = FeatureSelectionConfig::default().with_variance_threshold(0.0);
        let out = preprocess(&table(), &integration, &fs).unwrap();
        assert_eq!(out.features(), &["wide".to_string(), "gappy".to_string()]);
        assert!(!out.has_missing());
        // input is left untouched
        assert_eq!(table().n_features(), 4);
    }

    #[test]
    fn test_variance_filter_emptying_table_fails() {
        let step = Transform::VarianceFilter { threshold: 1e6 };
        let err = step.apply(&table()).unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn test_impute_drops_all_missing_column() {
        let t = OmicsTable::new(
            "m",
            vec!["A".into(), "B".into()],
            vec!["x".into(), "empty".into()],
            array![[1.0, f64::NAN], [f64::NAN, f64::NAN]],
        )
        .unwrap();
        let out = impute(&t, ImputeStrategy::Mean).unwrap();
        assert_eq!(out.features(), &["x".to_string()]);
        assert_eq!(out.data()[[1, 0]], 1.0);
    }

    #[test]
    fn test_global_top_k_across_modalities() {
        let other = OmicsTable::new(
            "methylation",
            vec!["S1".into(), "S2".into()],
            vec!["big".into(), "small".into()],
            array![[0.0, 0.0], [1000.0, 0.1]],
        )
        .unwrap();
        let fs = FeatureSelectionConfig::default().with_top_k(2).with_per_modality(false);
        let out = preprocess_modalities(&[table(), other], &IntegrationConfig::default(), &fs).unwrap();
        // 'big' dominates, then rna 'wide'
        assert_eq!(out[0].features(), &["wide".to_string()]);
        assert_eq!(out[1].features(), &["big".to_string()]);
    }

    #[test]
    fn test_per_modality_top_k() {
        let fs = FeatureSelectionConfig::default().with_top_k(1);
        let out = preprocess_modalities(&[table()], &IntegrationConfig::default(), &fs).unwrap();
        assert_eq!(out[0].features(), &["wide".to_string()]);
    }

    #[test]
    fn test_no_scaling_keeps_values() {
        let step = Transform::Scale(ScaleMethod::None);
        let out = step.apply(&table()).unwrap();
        assert_eq!(out.features(), table().features());
        assert_eq!(out.data()[[3, 2]], 40.0);
    }
}
