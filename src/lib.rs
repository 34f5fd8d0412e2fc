pub mod cli;
pub mod database_ops;
pub mod embedding;
pub mod normalization;
pub mod orchestrator;
pub mod tracing;

pub mod util {
    pub mod env;
}

#[cfg(test)]
mod testing;

pub use orchestrator::{PipelineOptions, RunSummary, SeedPipeline};
