//! Error types for the biomarker fusion pipeline

use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, FusionError>;

/// Main error type for the pipeline.
///
/// Variants fall into three families: configuration errors, data errors and
/// resource errors. See [`FusionError::is_config_error`],
/// [`FusionError::is_data_error`] and [`FusionError::is_resource_error`].
#[derive(Error, Debug)]
pub enum FusionError {
    // ----- configuration -----
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required configuration section: {0}")]
    MissingSection(String),

    #[error("Unknown estimator '{0}'")]
    UnknownEstimator(String),

    #[error("Invalid join mode '{0}': join must be 'inner' or 'outer'")]
    InvalidJoinMode(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    // ----- data -----
    #[error("Column '{column}' missing from {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Requested features not found in {source_name}: {missing:?}")]
    MissingFeatures {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("Duplicate sample id '{sample}' in {source_name}")]
    DuplicateSample { sample: String, source_name: String },

    #[error("No samples left after {join} alignment of {tables} table(s)")]
    EmptyAlignment { join: String, tables: usize },

    #[error("Insufficient samples: {0}")]
    InsufficientSamples(String),

    #[error("Unresolved missing values in {0}")]
    UnresolvedMissing(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    // ----- resources -----
    #[error("Data file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FusionError {
    /// Errors caused by an invalid configuration record
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            FusionError::Config(_)
                | FusionError::MissingSection(_)
                | FusionError::UnknownEstimator(_)
                | FusionError::InvalidJoinMode(_)
                | FusionError::InvalidParameter { .. }
        )
    }

    /// Errors caused by the content of the input tables
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            FusionError::MissingColumn { .. }
                | FusionError::MissingFeatures { .. }
                | FusionError::DuplicateSample { .. }
                | FusionError::EmptyAlignment { .. }
                | FusionError::InsufficientSamples(_)
                | FusionError::UnresolvedMissing(_)
                | FusionError::Data(_)
                | FusionError::Shape { .. }
                | FusionError::Computation(_)
                | FusionError::ModelNotFitted
        )
    }

    /// Local filesystem failures
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            FusionError::FileNotFound(_) | FusionError::Io(_) | FusionError::Serialization(_)
        )
    }

    pub(crate) fn invalid_param(name: &str, value: impl ToString, reason: &str) -> Self {
        FusionError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<PolarsError> for FusionError {
    fn from(err: PolarsError) -> Self {
        match err {
            // file access failures stay resource errors
            PolarsError::IO { error, msg } => {
                let text = match msg {
                    Some(msg) => format!("{}: {}", msg, error),
                    None => error.to_string(),
                };
                FusionError::Io(std::io::Error::new(error.kind(), text))
            }
            other => FusionError::Data(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for FusionError {
    fn from(err: serde_json::Error) -> Self {
        FusionError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for FusionError {
    fn from(err: serde_yaml::Error) -> Self {
        FusionError::Config(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FusionError {
    fn from(err: ndarray::ShapeError) -> Self {
        FusionError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FusionError::MissingColumn {
            column: "sample_id".to_string(),
            source_name: "rna.csv".to_string(),
        };
        assert_eq!(err.to_string(), "Column 'sample_id' missing from rna.csv");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read only");
        let err: FusionError = io_err.into();
        assert!(matches!(err, FusionError::Io(_)));
        assert!(err.is_resource_error());
    }

    #[test]
    fn test_polars_io_failure_is_resource_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let err: FusionError = PolarsError::from(io_err).into();
        assert!(matches!(err, FusionError::Io(ref e) if e.kind() == std::io::ErrorKind::PermissionDenied));
        assert!(err.is_resource_error());

        let err: FusionError = PolarsError::ColumnNotFound("age".into()).into();
        assert!(err.is_data_error());
    }

    #[test]
    fn test_error_families() {
        assert!(FusionError::UnknownEstimator("svm".into()).is_config_error());
        assert!(FusionError::InvalidJoinMode("left".into()).is_config_error());
        assert!(FusionError::InsufficientSamples("x".into()).is_data_error());
        assert!(!FusionError::InsufficientSamples("x".into()).is_config_error());
        assert!(FusionError::FileNotFound(PathBuf::from("a.csv")).is_resource_error());
    }
}
