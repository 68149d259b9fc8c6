//! Private initial partitioning.
//!
//! Nodes are dealt at random into `N` groups ("super-nodes"). The group-level
//! edge counts are released with the Laplace mechanism (one edge changes one
//! count by one, so sensitivity is 1), and Louvain runs on the noisy
//! super-graph. Every node inherits the community of its group.
//!
//! ```text
//! graph ──random groups──▶ N×N counts ──Laplace(1/e1)──▶ noisy super-graph
//!                                                         │ Louvain
//!                                  node partition ◀───────┘
//! ```
//!
//! The grouping never looks at edges, and Louvain only sees noisy counts, so
//! the whole stage spends exactly `e1`. `N` is the resolution knob: more
//! groups give Louvain finer material and generally more, smaller
//! communities, at the cost of more noise per group pair.

use rand::prelude::*;
use tracing::debug;

use super::louvain::Louvain;
use super::partition::Partition;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::noise::{project, Bounds, Laplace};
use crate::summary::{from_upper_triangle, upper_triangle};

/// Produces the initial partition under the detection budget `e1`.
#[derive(Debug, Clone, Default)]
pub struct CommunityInitializer {
    louvain: Louvain,
}

impl CommunityInitializer {
    /// Initializer with a default Louvain on the super-graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom Louvain configuration on the super-graph.
    pub fn with_louvain(mut self, louvain: Louvain) -> Self {
        self.louvain = louvain;
        self
    }

    /// Partition `graph` with `groups` random super-nodes and budget
    /// `epsilon`.
    ///
    /// `epsilon == 0` returns the random grouping itself. `groups` is capped
    /// at the node count.
    pub fn initialize<R: Rng + ?Sized>(
        &self,
        graph: &Graph,
        epsilon: f64,
        groups: usize,
        rng: &mut R,
    ) -> Result<Partition> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if groups == 0 {
            return Err(Error::InvalidParameter {
                name: "groups",
                message: "resolution must be at least 1".into(),
            });
        }
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: format!("detection budget must be finite and >= 0, got {epsilon}"),
            });
        }

        let g = groups.min(n);
        let group_of = random_groups(n, g, rng);

        if epsilon == 0.0 {
            return Ok(Partition::from_labels(group_of).renumbered());
        }

        let mut counts = ndarray::Array2::<u64>::zeros((g, g));
        for (u, v) in graph.edges() {
            let (a, b) = (group_of[u].min(group_of[v]), group_of[u].max(group_of[v]));
            counts[[a, b]] += 1;
        }

        let noise = Laplace::calibrated(1.0, epsilon)?;
        let noisy = project(
            &noise.add_noise(&upper_triangle(&counts), rng),
            Bounds::non_negative(),
        );
        let super_graph = from_upper_triangle(&noisy, g);

        let mut edges = Vec::new();
        let mut self_loops = vec![0.0; g];
        for a in 0..g {
            self_loops[a] = super_graph[[a, a]] as f64;
            for b in (a + 1)..g {
                let w = super_graph[[a, b]];
                if w > 0 {
                    edges.push((a, b, w as f64));
                }
            }
        }

        let group_partition = self.louvain.detect_weighted(g, &edges, &self_loops, rng)?;
        debug!(
            groups = g,
            communities = group_partition.num_communities(),
            "initial partition from noisy super-graph"
        );

        let labels = group_of
            .iter()
            .map(|&grp| group_partition.community_of(grp))
            .collect();
        Ok(Partition::from_labels(labels).renumbered())
    }
}

/// Shuffle nodes and deal them round-robin into `g` groups.
fn random_groups<R: Rng + ?Sized>(n: usize, g: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let mut group_of = vec![0; n];
    for (slot, &node) in order.iter().enumerate() {
        group_of[node] = slot % g;
    }
    group_of
}
