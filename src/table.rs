//! Sample-keyed tables shared by every pipeline stage
//!
//! [`OmicsTable`] holds one numeric modality (or the integrated matrix) as a
//! dense `ndarray` matrix with `NaN` for missing cells. [`ClinicalTable`]
//! keeps the clinical columns in a polars frame because they may be of any
//! dtype. Both keep their rows in the order of their `samples` vector.

use crate::error::{FusionError, Result};
use ndarray::{Array2, Axis};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

/// Numeric samples × features table for one modality
#[derive(Debug, Clone, PartialEq)]
pub struct OmicsTable {
    name: String,
    samples: Vec<String>,
    features: Vec<String>,
    data: Array2<f64>,
}

impl OmicsTable {
    /// Build a table, checking the matrix shape and sample uniqueness
    pub fn new(
        name: impl Into<String>,
        samples: Vec<String>,
        features: Vec<String>,
        data: Array2<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if data.nrows() != samples.len() || data.ncols() != features.len() {
            return Err(FusionError::Shape {
                expected: format!("{} x {}", samples.len(), features.len()),
                actual: format!("{} x {}", data.nrows(), data.ncols()),
            });
        }
        let mut seen = HashSet::with_capacity(samples.len());
        for sample in &samples {
            if !seen.insert(sample.as_str()) {
                return Err(FusionError::DuplicateSample {
                    sample: sample.clone(),
                    source_name: name,
                });
            }
        }
        Ok(Self { name, samples, features, data })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// True when the table has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if any cell is missing
    pub fn has_missing(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    /// Position of a feature column
    pub fn feature_index(&self, feature: &str) -> Option<usize> {
        self.features.iter().position(|f| f == feature)
    }

    /// Same keys, new values
    pub fn with_data(&self, data: Array2<f64>) -> Result<Self> {
        Self::new(self.name.clone(), self.samples.clone(), self.features.clone(), data)
    }

    /// Same data under a different table name
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keep the given columns, in the given order
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        let features = indices.iter().map(|&i| self.features[i].clone()).collect();
        let data = self.data.select(Axis(1), indices);
        Self {
            name: self.name.clone(),
            samples: self.samples.clone(),
            features,
            data,
        }
    }

    /// Keep the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let samples = indices.iter().map(|&i| self.samples[i].clone()).collect();
        let data = self.data.select(Axis(0), indices);
        Self {
            name: self.name.clone(),
            samples,
            features: self.features.clone(),
            data,
        }
    }

    /// Rows reordered to `samples`; samples absent from this table get `NaN` rows
    pub fn reindex(&self, samples: &[String]) -> Self {
        let positions: HashMap<&str, usize> = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let mut data = Array2::from_elem((samples.len(), self.n_features()), f64::NAN);
        for (row, sample) in samples.iter().enumerate() {
            if let Some(&src) = positions.get(sample.as_str()) {
                data.row_mut(row).assign(&self.data.row(src));
            }
        }

        Self {
            name: self.name.clone(),
            samples: samples.to_vec(),
            features: self.features.clone(),
            data,
        }
    }

    /// Rows sorted ascending by sample id
    pub fn sorted_by_sample(&self) -> Self {
        let mut order: Vec<usize> = (0..self.n_samples()).collect();
        order.sort_by(|&a, &b| self.samples[a].cmp(&self.samples[b]));
        self.select_rows(&order)
    }

    /// Every column renamed to `<prefix>__<feature>`
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let features = self
            .features
            .iter()
            .map(|f| format!("{}__{}", prefix, f))
            .collect();
        Self {
            name: self.name.clone(),
            samples: self.samples.clone(),
            features,
            data: self.data.clone(),
        }
    }

    /// Concatenate tables column-wise. Every table must share the same
    /// sample order.
    pub fn hconcat(name: impl Into<String>, tables: &[OmicsTable]) -> Result<Self> {
        let name = name.into();
        let Some(first) = tables.first() else {
            return Self::new(name, Vec::new(), Vec::new(), Array2::zeros((0, 0)));
        };

        for table in &tables[1..] {
            if table.samples != first.samples {
                return Err(FusionError::Data(format!(
                    "cannot concatenate '{}' and '{}': sample order differs",
                    first.name, table.name
                )));
            }
        }

        let views: Vec<_> = tables.iter().map(|t| t.data.view()).collect();
        let data = ndarray::concatenate(Axis(1), &views)?;
        let features = tables.iter().flat_map(|t| t.features.iter().cloned()).collect();
        Self::new(name, first.samples.clone(), features, data)
    }

    /// Convert to a polars frame with the sample ids in `id_column`
    pub fn to_dataframe(&self, id_column: &str) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.n_features() + 1);
        columns.push(Column::new(id_column.into(), self.samples.clone()));
        for (j, feature) in self.features.iter().enumerate() {
            let values: Vec<f64> = self.data.column(j).to_vec();
            columns.push(Column::new(feature.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Clinical annotations: any dtype, one row per sample
#[derive(Debug, Clone)]
pub struct ClinicalTable {
    samples: Vec<String>,
    data: DataFrame,
    outcome_column: String,
}

impl ClinicalTable {
    /// Build a clinical table. `data` rows must line up with `samples` and
    /// the outcome column must be present.
    pub fn new(
        samples: Vec<String>,
        data: DataFrame,
        outcome_column: impl Into<String>,
    ) -> Result<Self> {
        let outcome_column = outcome_column.into();
        if data.height() != samples.len() {
            return Err(FusionError::Shape {
                expected: format!("{} rows", samples.len()),
                actual: format!("{} rows", data.height()),
            });
        }
        if data.column(&outcome_column).is_err() {
            return Err(FusionError::MissingColumn {
                column: outcome_column,
                source_name: "clinical".to_string(),
            });
        }
        let mut seen = HashSet::with_capacity(samples.len());
        for sample in &samples {
            if !seen.insert(sample.as_str()) {
                return Err(FusionError::DuplicateSample {
                    sample: sample.clone(),
                    source_name: "clinical".to_string(),
                });
            }
        }
        Ok(Self { samples, data, outcome_column })
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn outcome_column(&self) -> &str {
        &self.outcome_column
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Rows reordered to `samples`; absent samples get null rows
    pub fn reindex(&self, samples: &[String]) -> Result<Self> {
        let positions: HashMap<&str, IdxSize> = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i as IdxSize))
            .collect();

        let idx = IdxCa::from_iter_options(
            "idx".into(),
            samples.iter().map(|s| positions.get(s.as_str()).copied()),
        );
        let data = self.data.take(&idx)?;

        Ok(Self {
            samples: samples.to_vec(),
            data,
            outcome_column: self.outcome_column.clone(),
        })
    }

    /// Values of a column as floats; nulls come back as `None`
    pub fn numeric_column(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let col = self.data.column(column).map_err(|_| FusionError::MissingColumn {
            column: column.to_string(),
            source_name: "clinical".to_string(),
        })?;
        let cast = col
            .as_materialized_series()
            .cast(&DataType::Float64)
            .map_err(|e| FusionError::Data(format!("column '{}' is not numeric: {}", column, e)))?;
        let ca = cast.f64()?;
        // a failed string->float cast shows up as extra nulls
        if ca.null_count() > col.null_count() {
            return Err(FusionError::Data(format!(
                "column '{}' contains non-numeric values",
                column
            )));
        }
        Ok(ca.into_iter().collect())
    }

    /// Clinical frame with the sample ids prepended as `id_column`
    pub fn to_dataframe(&self, id_column: &str) -> Result<DataFrame> {
        let mut df = self.data.clone();
        df.insert_column(0, Column::new(id_column.into(), self.samples.clone()))?;
        Ok(df)
    }
}
