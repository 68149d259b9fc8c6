//! # privgraph
//!
//! Differentially-private synthetic graphs built from noisy community
//! summaries.
//!
//! A replicate partitions the input graph privately, releases per-community
//! statistics under Laplace noise, and rebuilds a graph from the noisy
//! statistics alone:
//!
//! | Stage | Module | Budget |
//! |-------|--------|--------|
//! | initial partition | [`community::CommunityInitializer`] | `e1` |
//! | refinement | [`community::CommunityRefiner`] | `e2` |
//! | summary release | [`summary::NoisySummary`] | `e3` |
//! | reconstruction | [`reconstruct::GraphReconstructor`] | none |
//!
//! [`experiment`] wraps the pipeline in the evaluation loop: replicates run
//! in parallel (`parallel` feature), are scored by [`metrics`] and written
//! to resumable CSV tables.
//!
//! ```rust
//! use privgraph::{Graph, PrivacyBudget, Synthesizer};
//!
//! let graph = Graph::from_edges(6, [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)]);
//! let budget = PrivacyBudget::split(2.0, 0.3, 0.3).unwrap();
//!
//! let synthesis = Synthesizer::default()
//!     .synthesize(&graph, &budget, 2, 42, 0)
//!     .unwrap();
//! assert_eq!(synthesis.graph.node_count(), 6);
//! ```

pub mod budget;
pub mod community;
pub mod config;
/// Error types used across `privgraph`.
pub mod error;
pub mod experiment;
pub mod graph;
pub mod io;
pub mod metrics;
pub mod noise;
pub mod pipeline;
pub mod reconstruct;
pub mod summary;


pub use budget::PrivacyBudget;
pub use community::{
    CommunityDetection, CommunityInitializer, CommunityRefiner, Louvain, Partition,
};
pub use config::{ExperimentConfig, PipelineConfig};
pub use error::{Error, Result};
pub use experiment::{run_dataset, run_experiment, run_sweep, ResultRow, RunOutcome, SweepPlan};
pub use graph::{Graph, GraphBuilder};
pub use metrics::{nmi, Baseline, Scores};
pub use pipeline::{Synthesis, Synthesizer};
pub use reconstruct::{GraphReconstructor, IntraStrategy};
pub use summary::{CommunitySummary, NoisySummary};
