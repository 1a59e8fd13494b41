//! Parallel processing utilities

use crate::error::{FusionError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the worker pool used by cross-validation and forests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of threads (None = use all available)
    pub n_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate an `n_jobs` knob: positive values are thread counts,
    /// `0` and negative values mean "all cores".
    pub fn from_n_jobs(n_jobs: i32) -> Self {
        if n_jobs > 0 {
            Self { n_threads: Some(n_jobs as usize) }
        } else {
            Self { n_threads: None }
        }
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n.max(1));
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }

    /// Run `op` inside a dedicated pool sized by this configuration
    pub fn install<OP, R>(&self, op: OP) -> Result<R>
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads())
            .build()
            .map_err(|e| FusionError::Computation(format!("thread pool: {}", e)))?;
        Ok(pool.install(op))
    }
}
