//! Ingestion and aggregation for campus meter data.
//!
//! * [`reader`] discovers source files and parses rows into validated readings.
//! * [`merger`] combines per-source batches into one dataset.
//! * [`aggregator`] computes daily, weekly and hourly aggregates.
//! * [`analysis`] runs the whole pipeline and builds a [`analysis::PipelineReport`].

pub mod aggregator;
pub mod analysis;
pub mod merger;
pub mod reader;

pub use analysis::{run_pipeline, PipelineReport};
pub use merger::{merge, IngestReport};

pub use energy_core as core;
