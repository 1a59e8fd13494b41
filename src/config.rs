//! Pipeline configuration
//!
//! Mirrors the YAML layout: three modality sections, a clinical section, and
//! optional `integration`, `feature_selection`, `modeling` and
//! `visualization` sections that fall back to their defaults.

use crate::error::{FusionError, Result};
use crate::integration::JoinMode;
use crate::preprocessing::{ImputeStrategy, ScaleMethod};
use crate::training::estimator::build_estimator;
use crate::training::metrics::METRIC_NAMES;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Modality section names, in pipeline order
pub const MODALITIES: [&str; 3] = ["rna_seq", "methylation", "mutation"];

const REQUIRED_SECTIONS: [&str; 4] = ["rna_seq", "methylation", "mutation", "clinical"];

fn default_id_column() -> String {
    "sample_id".to_string()
}

fn default_outcome() -> String {
    "outcome".to_string()
}

/// Accepts `null`, `"none"` or a keyword parsed with `FromStr`
fn optional_keyword<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("none") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

/// A generic omics table on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub path: PathBuf,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Drop rows with any missing value
    #[serde(default)]
    pub dropna: bool,
    /// Explicit feature subset
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

impl TableConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_column: default_id_column(),
            dropna: false,
            features: None,
        }
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    pub fn with_dropna(mut self, dropna: bool) -> Self {
        self.dropna = dropna;
        self
    }

    pub fn with_features<S: Into<String>>(mut self, features: impl IntoIterator<Item = S>) -> Self {
        self.features = Some(features.into_iter().map(Into::into).collect());
        self
    }
}

/// The clinical metadata table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicalConfig {
    pub path: PathBuf,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Drop rows whose outcome is missing
    #[serde(default)]
    pub dropna: bool,
    /// Clinical columns to keep; the outcome column is always retained
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default = "default_outcome")]
    pub outcome_column: String,
    /// Columns kept next to the outcome; all columns when unset
    #[serde(default)]
    pub covariates: Option<Vec<String>>,
}

impl ClinicalConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_column: default_id_column(),
            dropna: false,
            features: None,
            outcome_column: default_outcome(),
            covariates: None,
        }
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    pub fn with_dropna(mut self, dropna: bool) -> Self {
        self.dropna = dropna;
        self
    }

    pub fn with_outcome_column(mut self, column: impl Into<String>) -> Self {
        self.outcome_column = column.into();
        self
    }

    pub fn with_covariates<S: Into<String>>(mut self, covariates: impl IntoIterator<Item = S>) -> Self {
        self.covariates = Some(covariates.into_iter().map(Into::into).collect());
        self
    }
}

/// Options that apply across modalities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationConfig {
    pub join: JoinMode,
    #[serde(deserialize_with = "optional_keyword")]
    pub impute_strategy: Option<ImputeStrategy>,
    pub scale: ScaleMethod,
    pub prefix_modality: bool,
    pub min_nonzero_fraction: Option<f64>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            join: JoinMode::Inner,
            impute_strategy: Some(ImputeStrategy::Mean),
            scale: ScaleMethod::ZScore,
            prefix_modality: true,
            min_nonzero_fraction: None,
        }
    }
}

impl IntegrationConfig {
    pub fn with_join(mut self, join: JoinMode) -> Self {
        self.join = join;
        self
    }

    pub fn with_impute_strategy(mut self, strategy: Option<ImputeStrategy>) -> Self {
        self.impute_strategy = strategy;
        self
    }

    pub fn with_scale(mut self, scale: ScaleMethod) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_prefix_modality(mut self, prefix: bool) -> Self {
        self.prefix_modality = prefix;
        self
    }

    pub fn with_min_nonzero_fraction(mut self, fraction: f64) -> Self {
        self.min_nonzero_fraction = Some(fraction);
        self
    }
}

/// Feature selection options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureSelectionConfig {
    pub top_k: Option<usize>,
    pub variance_threshold: Option<f64>,
    /// Apply `top_k` inside each modality rather than across all of them
    pub per_modality: bool,
}

impl Default for FeatureSelectionConfig {
    fn default() -> Self {
        Self {
            top_k: None,
            variance_threshold: None,
            per_modality: true,
        }
    }
}

impl FeatureSelectionConfig {
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    pub fn with_variance_threshold(mut self, threshold: f64) -> Self {
        self.variance_threshold = Some(threshold);
        self
    }

    pub fn with_per_modality(mut self, per_modality: bool) -> Self {
        self.per_modality = per_modality;
        self
    }
}

/// Class re-weighting scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassWeight {
    /// `n_samples / (n_classes * n_class_samples)`
    Balanced,
}

impl FromStr for ClassWeight {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" => Ok(ClassWeight::Balanced),
            other => Err(FusionError::invalid_param(
                "class_weight",
                other,
                "expected 'balanced' or none",
            )),
        }
    }
}

/// Model training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub estimator: String,
    /// Family-specific parameters, validated when the estimator is built
    pub estimator_params: BTreeMap<String, serde_json::Value>,
    pub target_column: String,
    pub test_size: f64,
    pub cv_folds: usize,
    pub scoring: String,
    pub random_state: u64,
    /// Worker threads for folds and trees; `-1` or `0` use every core
    pub n_jobs: i32,
    #[serde(deserialize_with = "optional_keyword")]
    pub class_weight: Option<ClassWeight>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            estimator: "logistic_regression".to_string(),
            estimator_params: BTreeMap::new(),
            target_column: default_outcome(),
            test_size: 0.2,
            cv_folds: 5,
            scoring: "roc_auc".to_string(),
            random_state: 42,
            n_jobs: 1,
            class_weight: Some(ClassWeight::Balanced),
        }
    }
}

impl ModelConfig {
    pub fn with_estimator(mut self, estimator: impl Into<String>) -> Self {
        self.estimator = estimator.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.estimator_params.insert(key.into(), value.into());
        self
    }

    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_scoring(mut self, scoring: impl Into<String>) -> Self {
        self.scoring = scoring.into();
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_class_weight(mut self, class_weight: Option<ClassWeight>) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Check every knob that can be checked without data
    pub fn validate(&self) -> Result<()> {
        build_estimator(self)?;
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(FusionError::invalid_param(
                "test_size",
                self.test_size,
                "must lie strictly between 0 and 1",
            ));
        }
        if self.cv_folds < 2 {
            return Err(FusionError::invalid_param("cv_folds", self.cv_folds, "must be at least 2"));
        }
        if !METRIC_NAMES.contains(&self.scoring.as_str()) {
            return Err(FusionError::invalid_param(
                "scoring",
                &self.scoring,
                "expected one of accuracy, roc_auc, average_precision, f1",
            ));
        }
        Ok(())
    }
}

/// Plot options; carried through the pipeline but not interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisualizationConfig {
    pub n_top_features: usize,
    pub correlation_method: String,
    pub output_formats: Vec<String>,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            n_top_features: 20,
            correlation_method: "spearman".to_string(),
            output_formats: vec!["png".to_string()],
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub rna_seq: TableConfig,
    pub methylation: TableConfig,
    pub mutation: TableConfig,
    pub clinical: ClinicalConfig,
    #[serde(default)]
    pub integration: IntegrationConfig,
    #[serde(default)]
    pub feature_selection: FeatureSelectionConfig,
    #[serde(default)]
    pub modeling: ModelConfig,
    #[serde(default)]
    pub visualization: VisualizationConfig,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl PipelineConfig {
    /// Create a configuration with default options for the given tables
    pub fn new(
        rna_seq: TableConfig,
        methylation: TableConfig,
        mutation: TableConfig,
        clinical: ClinicalConfig,
    ) -> Self {
        Self {
            rna_seq,
            methylation,
            mutation,
            clinical,
            integration: IntegrationConfig::default(),
            feature_selection: FeatureSelectionConfig::default(),
            modeling: ModelConfig::default(),
            visualization: VisualizationConfig::default(),
            results_dir: default_results_dir(),
        }
    }

    pub fn with_integration(mut self, integration: IntegrationConfig) -> Self {
        self.integration = integration;
        self
    }

    pub fn with_feature_selection(mut self, feature_selection: FeatureSelectionConfig) -> Self {
        self.feature_selection = feature_selection;
        self
    }

    pub fn with_modeling(mut self, modeling: ModelConfig) -> Self {
        self.modeling = modeling;
        self
    }

    pub fn with_visualization(mut self, visualization: VisualizationConfig) -> Self {
        self.visualization = visualization;
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Parse a YAML document
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        let mapping = match &value {
            serde_yaml::Value::Mapping(m) => m,
            serde_yaml::Value::Null => {
                return Err(FusionError::MissingSection(REQUIRED_SECTIONS[0].to_string()))
            }
            _ => {
                return Err(FusionError::Config(
                    "configuration YAML must define a mapping".to_string(),
                ))
            }
        };
        for section in REQUIRED_SECTIONS {
            if !mapping.contains_key(section) {
                return Err(FusionError::MissingSection(section.to_string()));
            }
        }
        Ok(serde_yaml::from_value(value)?)
    }

    /// Read a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FusionError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serialize back to YAML
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| FusionError::Serialization(e.to_string()))
    }

    /// Modality sections paired with their names, in pipeline order
    pub fn modalities(&self) -> [(&'static str, &TableConfig); 3] {
        [
            (MODALITIES[0], &self.rna_seq),
            (MODALITIES[1], &self.methylation),
            (MODALITIES[2], &self.mutation),
        ]
    }

    /// Check the configuration before touching any file
    pub fn validate(&self) -> Result<()> {
        for (name, table) in self.modalities() {
            if table.id_column.trim().is_empty() {
                return Err(FusionError::invalid_param(
                    &format!("{}.id_column", name),
                    "",
                    "must not be empty",
                ));
            }
        }
        if self.clinical.outcome_column.trim().is_empty() {
            return Err(FusionError::invalid_param(
                "clinical.outcome_column",
                "",
                "must not be empty",
            ));
        }
        if let Some(fraction) = self.integration.min_nonzero_fraction {
            if !fraction.is_finite() || fraction > 1.0 {
                return Err(FusionError::invalid_param(
                    "min_nonzero_fraction",
                    fraction,
                    "must not exceed 1",
                ));
            }
        }
        if self.feature_selection.top_k == Some(0) {
            return Err(FusionError::invalid_param("top_k", 0, "must be positive"));
        }
        if let Some(threshold) = self.feature_selection.variance_threshold {
            if !threshold.is_finite() {
                return Err(FusionError::invalid_param(
                    "variance_threshold",
                    threshold,
                    "must be finite",
                ));
            }
        }
        self.modeling.validate()
    }
}
