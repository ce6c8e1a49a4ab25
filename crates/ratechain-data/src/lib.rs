//! Ratechain Data -- file-backed datasets and analyses.
//!
//! Loads items, factory groups, factories and processes from RON, JSON or
//! TOML files into a [`Dataset`](ratechain_core::dataset::Dataset), reads an
//! [`AnalysisConfig`] describing what to produce, runs the pass pipeline and
//! writes a [`Report`].

pub mod analysis;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod schema;

pub use analysis::{AnalysisConfig, SolverKind, load_analysis};
pub use loader::{DataLoadError, Format, load_dataset};
pub use pipeline::{analyze, run_analysis};
pub use report::{Report, write_report};
