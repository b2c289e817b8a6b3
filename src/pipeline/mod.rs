//! Pipeline composition and execution for variant-matrix cleaning.

mod runner;

pub use runner::{run_default, CleanedMatrices, Pipeline, PipelineConfig, PipelineStep};
