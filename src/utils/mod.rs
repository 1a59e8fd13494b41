//! Utility functions and types

mod parallel;
pub mod stats;

pub use parallel::ParallelConfig;
