//! File input and output
//!
//! [`loader`] turns CSV files into [`OmicsTable`](crate::table::OmicsTable)s
//! and [`ClinicalTable`](crate::table::ClinicalTable)s; [`persist`] writes
//! the artifact set of a finished run.

pub mod loader;
pub mod persist;

pub use loader::{load_clinical, load_table};
pub use persist::{write_artifacts, write_csv, write_json};
