//! Shared fixtures for integration tests

#![allow(dead_code)]

use biomarker_fusion::config::PipelineConfig;
use biomarker_fusion::synthetic::{demo_config, write_dataset, SyntheticConfig};
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// Small cohort written to `<dir>/data` with a config pointing at it
pub fn synthetic_workspace(n_samples: usize, seed: u64) -> (TempDir, PipelineConfig) {
    synthetic_workspace_with(n_samples, seed, (40, 30, 20))
}

/// Same as `synthetic_workspace` with explicit rna/methylation/mutation widths
pub fn synthetic_workspace_with(
    n_samples: usize,
    seed: u64,
    (rna, methylation, mutation): (usize, usize, usize),
) -> (TempDir, PipelineConfig) {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    let synthetic = SyntheticConfig::default()
        .with_seed(seed)
        .with_samples(n_samples)
        .with_features(rna, methylation, mutation);
    write_dataset(&data, &synthetic, None, &dir.path().join("results")).unwrap();
    let config = demo_config(&data, &dir.path().join("results"), seed);
    (dir, config)
}

pub fn csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".csv").unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
