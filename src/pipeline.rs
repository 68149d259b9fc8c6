//! One synthesis replicate.
//!
//! ```text
//! graph ─▶ initialize(e1, N) ─▶ refine(e2) ─▶ extract ─▶ release(e3) ─▶ reconstruct ─▶ synthetic graph
//! ```
//!
//! The initializer spends `e1` and the summary release spends `e3`, each
//! under edge adjacency. The refiner runs the exponential mechanism once per
//! visited node at `e2 / max_passes`; composed over all of its selections
//! its formal cost can reach `n · e2` (see [`crate::community::CommunityRefiner`]),
//! so `e1 + e2 + e3` is the nominal budget rather than a proven bound.
//!
//! Every random choice in a replicate is drawn from one [`ChaCha20Rng`]
//! stream identified by
//! `(seed, replicate)`, so replicates are independent of each other and of
//! the thread that runs them.

use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::budget::PrivacyBudget;
use crate::community::{CommunityInitializer, CommunityRefiner, Partition};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::reconstruct::GraphReconstructor;
use crate::summary::{CommunitySummary, NoisySummary};

/// Random stream for replicate `replicate` under `seed`.
pub fn replicate_rng(seed: u64, replicate: u64) -> ChaCha20Rng {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream(replicate);
    rng
}

/// Output of one replicate.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// The synthetic graph; same node count as the input.
    pub graph: Graph,
    /// Refined partition the summaries were taken over.
    pub partition: Partition,
    /// The noisy release the graph was built from.
    pub release: NoisySummary,
    pub(crate) summary: CommunitySummary,
}

impl Synthesis {
    /// The exact (non-private) summary behind `release`.
    pub fn true_summary(&self) -> &CommunitySummary {
        &self.summary
    }
}

/// Runs initialize, refine, release and reconstruct for one replicate.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    initializer: CommunityInitializer,
    refiner: CommunityRefiner,
    reconstructor: GraphReconstructor,
}

impl Synthesizer {
    /// Build every stage from `config`.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            initializer: config.initializer.build(),
            refiner: config.refiner.build(),
            reconstructor: config.reconstruction.build(),
        }
    }

    /// Synthesize with resolution `groups` on the stream of
    /// `(seed, replicate)`.
    pub fn synthesize(
        &self,
        graph: &Graph,
        budget: &PrivacyBudget,
        groups: usize,
        seed: u64,
        replicate: u64,
    ) -> Result<Synthesis> {
        let mut rng = replicate_rng(seed, replicate);
        self.synthesize_with_rng(graph, budget, groups, &mut rng)
    }

    /// Synthesize drawing from a caller-supplied random source.
    pub fn synthesize_with_rng<R: Rng + ?Sized>(
        &self,
        graph: &Graph,
        budget: &PrivacyBudget,
        groups: usize,
        rng: &mut R,
    ) -> Result<Synthesis> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::EmptyInput);
        }

        let initial = self.initializer.initialize(graph, budget.e1(), groups, rng)?;
        let partition = self.refiner.refine(graph, &initial, budget.e2(), rng)?;
        debug!(
            initial = initial.num_communities(),
            refined = partition.num_communities(),
            "partition ready"
        );

        let summary = CommunitySummary::extract(graph, &partition)?;
        let release = NoisySummary::release(&summary, budget.e3(), rng)?;
        let synthetic = self.reconstructor.reconstruct(n, &release, rng)?;
        debug!(
            nodes = n,
            edges = graph.edge_count(),
            synthetic_edges = synthetic.edge_count(),
            "replicate done"
        );

        Ok(Synthesis {
            graph: synthetic,
            partition,
            release,
            summary,
        })
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}
