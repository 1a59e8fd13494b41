//! End-to-end orchestration: load, integrate, summarise, train, persist

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::integration::{compute_feature_summary, integrate, FeatureSummary, IntegrationResult};
use crate::io::{load_clinical, load_table, write_artifacts};
use crate::table::{ClinicalTable, OmicsTable};
use crate::training::{train, ModelResult};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Knobs that change what a run does beyond the configuration itself
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Persist the artifact set under `results_dir`
    pub write_outputs: bool,
}

impl RunOptions {
    pub fn with_write_outputs(mut self, write: bool) -> Self {
        self.write_outputs = write;
        self
    }
}

/// Output of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub config: PipelineConfig,
    pub integration: IntegrationResult,
    pub model: ModelResult,
    pub feature_summary: Vec<FeatureSummary>,
    /// Artifact id → path; empty unless outputs were written
    pub outputs: BTreeMap<String, PathBuf>,
}

impl PipelineResult {
    /// Cross-validated value of the configured scoring metric
    pub fn primary_score(&self) -> Option<f64> {
        self.model.primary_score(&self.config.modeling.scoring)
    }
}

/// Run the pipeline without persisting anything
pub fn run(config: &PipelineConfig) -> Result<PipelineResult> {
    run_with_options(config, RunOptions::default())
}

/// Validate, load every table, integrate, summarise, train and optionally
/// write artifacts
pub fn run_with_options(config: &PipelineConfig, options: RunOptions) -> Result<PipelineResult> {
    let start = Instant::now();
    config.validate()?;

    let tables = config
        .modalities()
        .iter()
        .map(|(name, table_config)| load_table(name, table_config))
        .collect::<Result<Vec<_>>>()?;
    let clinical = load_clinical(&config.clinical)?;
    info!(modalities = tables.len(), clinical_samples = clinical.n_samples(), "Tables loaded");

    let mut result = integrate_and_train(tables, clinical, config)?;

    if options.write_outputs {
        result.outputs = write_artifacts(
            &config.results_dir,
            &result.integration,
            &result.feature_summary,
            &result.model,
        )?;
    }

    info!(
        estimator = %result.model.estimator_name,
        scoring = %config.modeling.scoring,
        score = result.primary_score().unwrap_or(f64::NAN),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Pipeline finished"
    );
    Ok(result)
}

/// Pipeline over tables that are already in memory
pub fn integrate_and_train(
    tables: Vec<OmicsTable>,
    clinical: ClinicalTable,
    config: &PipelineConfig,
) -> Result<PipelineResult> {
    config.validate()?;
    let integration = integrate(
        &tables,
        &clinical,
        &config.integration,
        &config.feature_selection,
    )?;
    let feature_summary = compute_feature_summary(&integration);
    let model = train(
        &integration.combined_features,
        &integration.clinical,
        &config.modeling,
    )?;

    Ok(PipelineResult {
        config: config.clone(),
        integration,
        model,
        feature_summary,
        outputs: BTreeMap::new(),
    })
}
