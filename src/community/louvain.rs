//! Louvain algorithm for community detection.
//!
//! Fast modularity optimization through local node moves and graph aggregation.
//!
//! ## The Algorithm (Blondel et al. 2008)
//!
//! Louvain is a multi-level, greedy modularity optimization algorithm:
//!
//! 1. **Phase 1 (Local Moving)**: Start with each node in its own community.
//!    Visit nodes in random order and move each to the neighboring community
//!    with highest modularity gain until no move improves.
//!
//! 2. **Phase 2 (Aggregation)**: Build a meta-graph where communities become
//!    single nodes. Edge weights are sums of edges between communities.
//!    Self-loops represent internal community edges.
//!
//! 3. **Iterate**: Repeat phases 1-2 on the meta-graph until modularity
//!    stops improving.
//!
//! ## Role in the Pipeline
//!
//! This detector is deterministic given its random source and never adds
//! noise itself. The private initializer runs it on an already-noised
//! super-graph (post-processing), and the evaluation layer runs it on the
//! true and synthetic graphs to compare community structure.
//!
//! ## References
//!
//! Blondel et al. (2008). "Fast unfolding of communities in large networks."
//! Journal of Statistical Mechanics: Theory and Experiment, P10008.

use super::partition::Partition;
use super::traits::CommunityDetection;
use crate::error::{Error, Result};
use crate::graph::Graph;
use rand::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Louvain community detection algorithm.
#[derive(Debug, Clone)]
pub struct Louvain {
    /// Resolution parameter (gamma).
    resolution: f64,
    /// Maximum passes over all nodes per level.
    max_iter: usize,
    /// Maximum levels of aggregation.
    max_levels: usize,
    /// Minimum modularity improvement to continue.
    min_modularity_gain: f64,
    /// Seed for the node visiting order in [`CommunityDetection::detect`].
    seed: u64,
}

impl Louvain {
    /// Create a new Louvain detector with default settings.
    pub fn new() -> Self {
        Self {
            resolution: 1.0,
            max_iter: 100,
            max_levels: 10,
            min_modularity_gain: 1e-7,
            seed: 42,
        }
    }

    /// Set resolution parameter.
    ///
    /// Higher values produce smaller communities.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set maximum iterations per level.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set maximum aggregation levels.
    pub fn with_max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Detect communities on an unweighted [`Graph`] with an external random
    /// source. Result is renumbered.
    pub fn partition_with_rng<R: Rng + ?Sized>(
        &self,
        graph: &Graph,
        rng: &mut R,
    ) -> Result<Partition> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        let edges: Vec<(usize, usize, f64)> = graph.edges().map(|(u, v)| (u, v, 1.0)).collect();
        let self_loops = vec![0.0; n];
        self.detect_weighted(n, &edges, &self_loops, rng)
    }

    /// Multi-level Louvain on a weighted graph given as an edge list
    /// (`i != j`, each pair once) plus per-node self-loop weights.
    ///
    /// Result is renumbered to `0..k-1`.
    pub fn detect_weighted<R: Rng + ?Sized>(
        &self,
        n: usize,
        edges: &[(usize, usize, f64)],
        self_loops: &[f64],
        rng: &mut R,
    ) -> Result<Partition> {
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if self_loops.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: self_loops.len(),
            });
        }
        if let Some(&(i, j, _)) = edges.iter().find(|&&(i, j, _)| i >= n || j >= n) {
            return Err(Error::InvalidParameter {
                name: "edges",
                message: format!("edge ({i}, {j}) out of range for {n} nodes"),
            });
        }

        // Node of the current level that each original node belongs to
        let mut membership: Vec<usize> = (0..n).collect();

        let mut current_n = n;
        let mut current_edges = edges.to_vec();
        let mut current_self_loops = self_loops.to_vec();
        let mut prev_modularity = self.modularity_weighted(
            current_n,
            &current_edges,
            &current_self_loops,
            &(0..n).collect::<Vec<_>>(),
        );

        for _level in 0..self.max_levels {
            // Phase 1: Local moving
            let (partition, improved) =
                self.local_moving(current_n, &current_edges, &current_self_loops, rng);

            if !improved {
                break;
            }

            let mod_now = self.modularity_weighted(
                current_n,
                &current_edges,
                &current_self_loops,
                &partition,
            );

            // Phase 2: Aggregate
            let (new_edges, new_self_loops, comm_to_new) =
                self.aggregate(&current_edges, &current_self_loops, &partition);

            for m in membership.iter_mut() {
                *m = comm_to_new[&partition[*m]];
            }

            let n_new = new_self_loops.len();
            if n_new == current_n || mod_now - prev_modularity < self.min_modularity_gain {
                break;
            }
            prev_modularity = mod_now;
            current_n = n_new;
            current_edges = new_edges;
            current_self_loops = new_self_loops;
        }

        Ok(Partition::from_labels(membership).renumbered())
    }

    /// Modularity of a weighted partition.
    ///
    /// ```text
    /// Q = Σ_c [ L_c / m - γ (D_c / 2m)² ]
    /// ```
    ///
    /// `L_c` is the internal weight of community `c` (self-loops included),
    /// `D_c` its total degree, `m` the total edge weight.
    fn modularity_weighted(
        &self,
        n: usize,
        edges: &[(usize, usize, f64)],
        self_loops: &[f64],
        communities: &[usize],
    ) -> f64 {
        let m: f64 = edges.iter().map(|(_, _, w)| w).sum::<f64>() + self_loops.iter().sum::<f64>();
        if m == 0.0 {
            return 0.0;
        }

        let k = communities.iter().max().map_or(0, |&c| c + 1);
        let mut internal = vec![0.0; k];
        let mut degree = vec![0.0; k];
        for &(i, j, w) in edges {
            let (ci, cj) = (communities[i], communities[j]);
            degree[ci] += w;
            degree[cj] += w;
            if ci == cj {
                internal[ci] += w;
            }
        }
        for (i, &sl) in self_loops.iter().enumerate().take(n) {
            let c = communities[i];
            internal[c] += sl;
            degree[c] += 2.0 * sl; // self-loops counted twice for degree
        }

        internal
            .iter()
            .zip(&degree)
            .map(|(&l, &d)| l / m - self.resolution * (d / (2.0 * m)).powi(2))
            .sum()
    }

    /// Phase 1: Local moving on weighted graph.
    /// Returns (communities, improved).
    fn local_moving<R: Rng + ?Sized>(
        &self,
        n: usize,
        edges: &[(usize, usize, f64)],
        self_loops: &[f64],
        rng: &mut R,
    ) -> (Vec<usize>, bool) {
        // Ordered maps keep tie-breaking reproducible for a given rng
        let mut adj: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        for &(i, j, w) in edges {
            *adj[i].entry(j).or_insert(0.0) += w;
            *adj[j].entry(i).or_insert(0.0) += w;
        }

        let m: f64 = edges.iter().map(|(_, _, w)| w).sum::<f64>() + self_loops.iter().sum::<f64>();
        if m == 0.0 {
            return ((0..n).collect(), false);
        }

        let mut degrees = vec![0.0; n];
        for &(i, j, w) in edges {
            degrees[i] += w;
            degrees[j] += w;
        }
        for (i, &sl) in self_loops.iter().enumerate() {
            degrees[i] += 2.0 * sl;
        }

        let mut communities: Vec<usize> = (0..n).collect();
        let mut community_degrees = degrees.clone();
        let mut any_improved = false;

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        for _iter in 0..self.max_iter {
            let mut improved = false;

            for &node in &order {
                let current_community = communities[node];
                let ki = degrees[node];

                // Temporarily remove node from community
                community_degrees[current_community] -= ki;

                let mut community_weights: BTreeMap<usize, f64> = BTreeMap::new();
                community_weights.insert(current_community, 0.0);
                for (&neighbor, &w) in &adj[node] {
                    *community_weights.entry(communities[neighbor]).or_insert(0.0) += w;
                }

                // Staying put is the baseline to beat
                let gain_of = |comm: usize, ki_in: f64| {
                    ki_in / m - self.resolution * community_degrees[comm] * ki / (2.0 * m * m)
                };
                let mut best_community = current_community;
                let mut best_gain = gain_of(current_community, community_weights[&current_community]);

                for (&target_comm, &ki_in) in &community_weights {
                    let gain = gain_of(target_comm, ki_in);
                    if gain > best_gain + 1e-12 {
                        best_gain = gain;
                        best_community = target_comm;
                    }
                }

                communities[node] = best_community;
                community_degrees[best_community] += ki;
                if best_community != current_community {
                    improved = true;
                    any_improved = true;
                }
            }

            if !improved {
                break;
            }
        }

        (communities, any_improved)
    }

    /// Phase 2: Aggregate graph based on communities.
    /// Returns (new_edges, new_self_loops, community_to_new_node).
    fn aggregate(
        &self,
        edges: &[(usize, usize, f64)],
        self_loops: &[f64],
        communities: &[usize],
    ) -> (Vec<(usize, usize, f64)>, Vec<f64>, HashMap<usize, usize>) {
        let mut unique_comms: Vec<usize> = communities.to_vec();
        unique_comms.sort_unstable();
        unique_comms.dedup();
        let n_new = unique_comms.len();

        let comm_to_new: HashMap<usize, usize> = unique_comms
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i))
            .collect();

        let mut new_edge_weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut new_self_loops = vec![0.0; n_new];
        for (i, &sl) in self_loops.iter().enumerate() {
            new_self_loops[comm_to_new[&communities[i]]] += sl;
        }
        for &(i, j, w) in edges {
            let ci = comm_to_new[&communities[i]];
            let cj = comm_to_new[&communities[j]];
            if ci == cj {
                new_self_loops[ci] += w;
            } else {
                let key = if ci < cj { (ci, cj) } else { (cj, ci) };
                *new_edge_weights.entry(key).or_insert(0.0) += w;
            }
        }

        let new_edges = new_edge_weights
            .into_iter()
            .map(|((i, j), w)| (i, j, w))
            .collect();

        (new_edges, new_self_loops, comm_to_new)
    }
}

impl Default for Louvain {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunityDetection for Louvain {
    fn detect(&self, graph: &Graph) -> Result<Partition> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.partition_with_rng(graph, &mut rng)
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }
}
