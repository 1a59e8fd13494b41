//! Missing value imputation strategies

use crate::error::{FusionError, Result};
use crate::utils::stats::{nan_mean, nan_median, nan_mode};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Replace with the column mean
    Mean,
    /// Replace with the column median
    Median,
    /// Replace with the most frequent value (smallest on ties)
    MostFrequent,
}

impl FromStr for ImputeStrategy {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(ImputeStrategy::Mean),
            "median" => Ok(ImputeStrategy::Median),
            "most_frequent" | "mode" => Ok(ImputeStrategy::MostFrequent),
            other => Err(FusionError::invalid_param(
                "impute_strategy",
                other,
                "expected one of mean, median, most_frequent, none",
            )),
        }
    }
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImputeStrategy::Mean => "mean",
            ImputeStrategy::Median => "median",
            ImputeStrategy::MostFrequent => "most_frequent",
        };
        f.write_str(s)
    }
}

/// Imputer for handling missing values
///
/// Fill values are learned per column. Columns without a single observed
/// value have no fill value; callers decide whether to drop them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<Option<f64>>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    /// Fit the imputer to the data
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.fill_values = x
            .columns()
            .into_iter()
            .map(|col| match self.strategy {
                ImputeStrategy::Mean => nan_mean(col),
                ImputeStrategy::Median => nan_median(col),
                ImputeStrategy::MostFrequent => nan_mode(col),
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Learned fill value per column
    pub fn fill_values(&self) -> &[Option<f64>] {
        &self.fill_values
    }

    /// Indices of columns that could not be fitted (no observed values)
    pub fn unfillable_columns(&self) -> Vec<usize> {
        self.fill_values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Replace missing cells with the learned fill values.
    ///
    /// Columns with no fill value are left untouched.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(FusionError::ModelNotFitted);
        }
        if x.ncols() != self.fill_values.len() {
            return Err(FusionError::Shape {
                expected: format!("{} columns", self.fill_values.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut result = x.clone();
        for (mut col, fill) in result.columns_mut().into_iter().zip(&self.fill_values) {
            if let Some(fill) = fill {
                col.mapv_inplace(|v| if v.is_nan() { *fill } else { v });
            }
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn data() -> Array2<f64> {
        array![
            [1.0, 4.0, f64::NAN],
            [f64::NAN, 4.0, f64::NAN],
            [3.0, 8.0, f64::NAN],
            [8.0, f64::NAN, f64::NAN],
        ]
    }

    #[test]
    fn test_mean_imputation() {
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        let out = imputer.fit_transform(&data()).unwrap();
        assert!((out[[1, 0]] - 4.0).abs() < 1e-12);
        assert!((out[[3, 1]] - 16.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_median_and_most_frequent() {
        let mut median = Imputer::new(ImputeStrategy::Median);
        let out = median.fit_transform(&data()).unwrap();
        assert_eq!(out[[1, 0]], 3.0);

        let mut mode = Imputer::new(ImputeStrategy::MostFrequent);
        let out = mode.fit_transform(&data()).unwrap();
        assert_eq!(out[[3, 1]], 4.0);
    }

    #[test]
    fn test_all_missing_column_is_unfillable() {
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        imputer.fit(&data()).unwrap();
        assert_eq!(imputer.unfillable_columns(), vec![2]);
        let out = imputer.transform(&data()).unwrap();
        assert!(out[[0, 2]].is_nan());
    }

    #[test]
    fn test_transform_requires_fit() {
        let imputer = Imputer::new(ImputeStrategy::Median);
        assert!(matches!(
            imputer.transform(&data()),
            Err(FusionError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("most_frequent".parse::<ImputeStrategy>().unwrap(), ImputeStrategy::MostFrequent);
        assert!("knn".parse::<ImputeStrategy>().unwrap_err().is_config_error());
    }
}
