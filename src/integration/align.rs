//! Sample-set reconciliation across modalities

use crate::error::{FusionError, Result};
use crate::table::{ClinicalTable, OmicsTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How sample sets are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum JoinMode {
    /// Samples present in every table
    #[default]
    Inner,
    /// Samples present in any table; gaps become missing values
    Outer,
}

impl FromStr for JoinMode {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinMode::Inner),
            "outer" => Ok(JoinMode::Outer),
            _ => Err(FusionError::InvalidJoinMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for JoinMode {
    type Error = FusionError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinMode::Inner => f.write_str("inner"),
            JoinMode::Outer => f.write_str("outer"),
        }
    }
}

/// Reindex every modality and the clinical table onto a shared, sorted
/// sample set
pub fn align(
    tables: &[OmicsTable],
    clinical: &ClinicalTable,
    join: JoinMode,
) -> Result<(Vec<OmicsTable>, ClinicalTable)> {
    let mut sets: Vec<BTreeSet<&str>> = tables
        .iter()
        .map(|t| t.samples().iter().map(String::as_str).collect())
        .collect();
    sets.push(clinical.samples().iter().map(String::as_str).collect());

    let mut iter = sets.into_iter();
    let first = iter.next().unwrap_or_default();
    let combined: BTreeSet<&str> = iter.fold(first, |acc, set| match join {
        JoinMode::Inner => acc.intersection(&set).copied().collect(),
        JoinMode::Outer => acc.union(&set).copied().collect(),
    });

    if combined.is_empty() {
        return Err(FusionError::EmptyAlignment {
            join: join.to_string(),
            tables: tables.len() + 1,
        });
    }

    let samples: Vec<String> = combined.into_iter().map(str::to_string).collect();
    debug!(join = %join, n_samples = samples.len(), "Aligned sample sets");

    let aligned = tables.iter().map(|t| t.reindex(&samples)).collect();
    let clinical = clinical.reindex(&samples)?;
    Ok((aligned, clinical))
}
