//! Multi-modality integration
//!
//! Preprocesses every modality, aligns them with the clinical table and
//! concatenates the aligned blocks into one feature matrix.

mod align;
mod summary;

pub use align::{align, JoinMode};
pub use summary::{compute_feature_summary, summary_frame, FeatureSummary};

use crate::config::{FeatureSelectionConfig, IntegrationConfig};
use crate::error::Result;
use crate::preprocessing::{impute, preprocess_modalities};
use crate::table::{ClinicalTable, OmicsTable};
use std::collections::HashMap;
use tracing::{info, warn};

/// Output of [`integrate`]
#[derive(Debug, Clone)]
pub struct IntegrationResult {
    /// Aligned samples × all retained features
    pub combined_features: OmicsTable,
    /// Aligned, possibly prefixed, per-modality blocks in input order
    pub modality_frames: Vec<OmicsTable>,
    /// Clinical table aligned to the same samples
    pub clinical: ClinicalTable,
}

impl IntegrationResult {
    /// Look up a modality block by name
    pub fn modality(&self, name: &str) -> Option<&OmicsTable> {
        self.modality_frames.iter().find(|t| t.name() == name)
    }

    pub fn samples(&self) -> &[String] {
        self.combined_features.samples()
    }
}

/// Preprocess, align and concatenate omics modalities
pub fn integrate(
    tables: &[OmicsTable],
    clinical: &ClinicalTable,
    integration: &IntegrationConfig,
    feature_selection: &FeatureSelectionConfig,
) -> Result<IntegrationResult> {
    let processed = preprocess_modalities(tables, integration, feature_selection)?;
    let (aligned, clinical) = align(&processed, clinical, integration.join)?;

    let mut modality_frames = Vec::with_capacity(aligned.len());
    for table in aligned {
        // outer joins leave holes where a modality lacks a sample
        let table = match integration.impute_strategy {
            Some(strategy) if table.has_missing() => impute(&table, strategy)?,
            _ => table,
        };
        let table = if integration.prefix_modality {
            table.with_prefix(table.name())
        } else {
            table
        };
        modality_frames.push(table);
    }

    if !integration.prefix_modality {
        warn_on_collisions(&modality_frames);
    }

    let combined_features = OmicsTable::hconcat("combined", &modality_frames)?;
    info!(
        n_samples = combined_features.n_samples(),
        n_features = combined_features.n_features(),
        join = %integration.join,
        "Integrated modalities"
    );

    Ok(IntegrationResult {
        combined_features,
        modality_frames,
        clinical,
    })
}

fn warn_on_collisions(frames: &[OmicsTable]) {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for frame in frames {
        for feature in frame.features() {
            if let Some(previous) = owners.insert(feature.as_str(), frame.name()) {
                warn!(
                    feature = feature.as_str(),
                    first = previous,
                    second = frame.name(),
                    "Feature name collision without modality prefixes"
                );
            }
        }
    }
}
