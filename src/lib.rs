//! Biomarker Fusion - multi-omics integration and biomarker discovery
//!
//! This crate provides a complete pipeline from per-modality CSV tables to a
//! trained, cross-validated classifier:
//! - Table loading for RNA-seq, methylation, mutation and clinical data
//! - Per-modality preprocessing (filters, top-k, imputation, scaling)
//! - Sample alignment and feature-block integration
//! - Model training with stratified evaluation and feature importances
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`io`] - CSV loading and artifact persistence
//! - [`preprocessing`] - Ordered, stateless table transforms
//! - [`integration`] - Alignment, concatenation and feature summaries
//! - [`training`] - Classifiers, metrics, splits and cross-validation
//! - [`pipeline`] - End-to-end orchestration
//!
//! ## Supporting modules
//! - [`config`] - YAML-backed pipeline configuration
//! - [`table`] - Omics and clinical table types
//! - [`synthetic`] - Seeded synthetic cohorts for demos and tests
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

pub mod config;
pub mod table;

// Pipeline stages
pub mod io;
pub mod preprocessing;
pub mod integration;
pub mod training;
pub mod pipeline;

// Data generation
pub mod synthetic;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{FusionError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{FusionError, Result};

    // Configuration
    pub use crate::config::{
        ClinicalConfig, FeatureSelectionConfig, IntegrationConfig, ModelConfig, PipelineConfig,
        TableConfig,
    };

    // Tables
    pub use crate::table::{ClinicalTable, OmicsTable};

    // Loading
    pub use crate::io::{load_clinical, load_table, write_artifacts};

    // Preprocessing
    pub use crate::preprocessing::{preprocess, ImputeStrategy, ScaleMethod, Transform};

    // Integration
    pub use crate::integration::{
        align, compute_feature_summary, integrate, FeatureSummary, IntegrationResult, JoinMode,
    };

    // Training
    pub use crate::training::{train, Classifier, FeatureImportance, ModelResult};

    // Orchestration
    pub use crate::pipeline::{integrate_and_train, run, run_with_options, PipelineResult, RunOptions};

    // Synthetic data
    pub use crate::synthetic::{generate, SyntheticCohort, SyntheticConfig};
}
