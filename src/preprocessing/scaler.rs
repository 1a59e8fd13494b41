//! Feature scaling implementations

use crate::error::{FusionError, Result};
use crate::utils::stats::{nan_mean, nan_min_max, nan_variance};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scaling method applied per column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMethod {
    /// Standard scaling (z-score normalization): (x - mean) / std
    #[serde(rename = "zscore", alias = "standard")]
    ZScore,
    /// Min-Max scaling: (x - min) / (max - min)
    #[serde(rename = "minmax")]
    MinMax,
    /// No scaling
    #[serde(rename = "none")]
    None,
}

impl Default for ScaleMethod {
    fn default() -> Self {
        ScaleMethod::ZScore
    }
}

impl FromStr for ScaleMethod {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zscore" | "standard" => Ok(ScaleMethod::ZScore),
            "minmax" => Ok(ScaleMethod::MinMax),
            "none" => Ok(ScaleMethod::None),
            other => Err(FusionError::invalid_param(
                "scale",
                other,
                "expected one of zscore, minmax, none",
            )),
        }
    }
}

impl fmt::Display for ScaleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScaleMethod::ZScore => "zscore",
            ScaleMethod::MinMax => "minmax",
            ScaleMethod::None => "none",
        };
        f.write_str(s)
    }
}

/// Parameters for a fitted column
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScalerParams {
    center: f64, // mean or min
    scale: f64,  // std or range; 0 marks a constant column
}

/// Feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    method: ScaleMethod,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(method: ScaleMethod) -> Self {
        Self {
            method,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the data. Missing cells are ignored.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.params = x
            .columns()
            .into_iter()
            .map(|col| match self.method {
                ScaleMethod::ZScore => ScalerParams {
                    center: nan_mean(col).unwrap_or(0.0),
                    scale: nan_variance(col, 0).map(f64::sqrt).unwrap_or(0.0),
                },
                ScaleMethod::MinMax => {
                    let (min, max) = nan_min_max(col).unwrap_or((0.0, 0.0));
                    ScalerParams { center: min, scale: max - min }
                }
                ScaleMethod::None => ScalerParams { center: 0.0, scale: 1.0 },
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data. `NaN` cells pass through unchanged.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(FusionError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(FusionError::Shape {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        if self.method == ScaleMethod::None {
            return Ok(x.clone());
        }

        let mut result = x.clone();
        for (mut col, p) in result.columns_mut().into_iter().zip(&self.params) {
            let p = *p;
            match self.method {
                ScaleMethod::ZScore if p.scale > 0.0 => {
                    col.mapv_inplace(|v| (v - p.center) / p.scale)
                }
                // constant column: centre only
                ScaleMethod::ZScore => col.mapv_inplace(|v| v - p.center),
                ScaleMethod::MinMax if p.scale > 0.0 => {
                    col.mapv_inplace(|v| (v - p.center) / p.scale)
                }
                ScaleMethod::MinMax => col.mapv_inplace(|v| if v.is_nan() { v } else { 0.0 }),
                ScaleMethod::None => {}
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
    use crate::utils::stats::nan_variance;
    use ndarray::{array, Axis};

    #[test]
    fn test_zscore_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let out = Scaler::new(ScaleMethod::ZScore).fit_transform(&x).unwrap();
        for col in out.columns() {
            assert!(col.mean().unwrap().abs() < 1e-12);
            assert!((nan_variance(col, 0).unwrap().sqrt() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zscore_constant_column_centred() {
        let x = array![[5.0], [5.0], [5.0]];
        let out = Scaler::new(ScaleMethod::ZScore).fit_transform(&x).unwrap();
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_minmax_range() {
        let x = array![[-2.0, 3.0], [0.0, 3.0], [6.0, 3.0]];
        let out = Scaler::new(ScaleMethod::MinMax).fit_transform(&x).unwrap();
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(out[[2, 0]], 1.0);
        assert_eq!(out.index_axis(Axis(1), 1).sum(), 0.0);
    }

    #[test]
    fn test_nan_passes_through() {
        let x = array![[1.0], [f64::NAN], [3.0]];
        let out = Scaler::new(ScaleMethod::ZScore).fit_transform(&x).unwrap();
        assert!(out[[1, 0]].is_nan());
        assert!((out[[0, 0]] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_method() {
        assert_eq!("standard".parse::<ScaleMethod>().unwrap(), ScaleMethod::ZScore);
        assert!("robust".parse::<ScaleMethod>().is_err());
    }
}
