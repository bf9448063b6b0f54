//! civdata-ingest library interface
//!
//! Multi-source representative reconciliation pipeline:
//! eligibility filter → source adapters → entity resolution → merge/score → upsert.
//!
//! Exposes public APIs for the batch binary and integration tests.

pub mod adapters;
pub mod config;
pub mod context;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod fusion;
pub mod identity;
pub mod names;
pub mod tracker;
pub mod types;
pub mod utils;
pub mod workflow;

pub use crate::context::RunContext;
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::workflow::{Pipeline, PipelineConfig};
