//! Graph reconstruction from a noisy community summary.
//!
//! Intra-community edges are realized from each community's noisy degree
//! sequence, inter-community edges from the noisy edge matrix. Everything
//! flows through one [`GraphBuilder`], which collapses duplicates and drops
//! self-loops, so the result is always simple and undirected.
//!
//! ## Intra strategies
//!
//! | Strategy | Degree fidelity | Notes |
//! |----------|-----------------|-------|
//! | [`IntraStrategy::HavelHakimi`] | exact on graphical sequences | greedy, random tie-breaks |
//! | [`IntraStrategy::ChungLu`] | in expectation | independent edges, `p = d_u·d_v / Σd` |
//!
//! ## Inter-community shrinkage
//!
//! For a pair of communities with noisy count `c`, `c` endpoint pairs are
//! drawn uniformly *with replacement*. Repeated pairs collapse, so the
//! realized number of distinct edges may fall short of `c`. This is not
//! corrected. The number of draws is also capped at
//! `MAX_DRAWS_PER_PAIR · |Ci| · |Cj|`; past that point every pair is hit
//! with probability above `1 - e⁻¹⁶`, so the cap bounds work on large noisy
//! counts without visibly changing the output.

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::{Graph, GraphBuilder};
use crate::summary::NoisySummary;

/// Upper bound on inter-community draws per cell, relative to the number of
/// distinct pairs available.
const MAX_DRAWS_PER_PAIR: u64 = 16;

/// How intra-community edges are realized from a degree sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntraStrategy {
    /// Deterministic-greedy realization with random tie-breaking.
    #[default]
    HavelHakimi,
    /// Independent edges with probability proportional to `d_u · d_v`.
    ChungLu,
}

/// Builds a synthetic graph from a [`NoisySummary`].
#[derive(Debug, Clone, Default)]
pub struct GraphReconstructor {
    intra: IntraStrategy,
}

impl GraphReconstructor {
    /// Reconstructor with the default intra strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set intra-community strategy.
    pub fn with_intra(mut self, intra: IntraStrategy) -> Self {
        self.intra = intra;
        self
    }

    /// Current intra-community strategy.
    pub fn intra(&self) -> IntraStrategy {
        self.intra
    }

    /// Reconstruct a graph over `n` nodes.
    ///
    /// Every member listed in `release` must be `< n`.
    pub fn reconstruct<R: Rng + ?Sized>(
        &self,
        n: usize,
        release: &NoisySummary,
        rng: &mut R,
    ) -> Result<Graph> {
        if let Some(&bad) = release.members().iter().flatten().find(|&&u| u >= n) {
            return Err(Error::InvalidParameter {
                name: "members",
                message: format!("node {bad} out of range for {n} nodes"),
            });
        }

        let mut builder = GraphBuilder::new(n);
        let members = release.members();

        for (nodes, degrees) in members.iter().zip(release.degree_sequences()) {
            let local = match self.intra {
                IntraStrategy::HavelHakimi => havel_hakimi(degrees, rng),
                IntraStrategy::ChungLu => chung_lu(degrees, rng),
            };
            for (a, b) in local {
                builder.add_edge(nodes[a], nodes[b]);
            }
        }
        let intra_edges = builder.edge_count();

        let matrix = release.edge_matrix();
        let k = members.len();
        for i in 0..k {
            for j in (i + 1)..k {
                let count = matrix[[i, j]];
                if count > 0 {
                    add_inter_edges(&mut builder, &members[i], &members[j], count, rng);
                }
            }
        }

        debug!(
            intra_edges,
            inter_edges = builder.edge_count() - intra_edges,
            strategy = ?self.intra,
            "reconstructed graph"
        );
        Ok(builder.build())
    }
}

/// Realize a degree sequence on local ids `0..m`.
///
/// Targets are clipped to `m-1` and, when the sum is odd, the largest entry
/// gives up one unit. Each round takes the node with the largest residual
/// demand and connects it to the next-highest residuals. Ties are broken by
/// a shuffle before a stable sort.
pub fn havel_hakimi<R: Rng + ?Sized>(degrees: &[u64], rng: &mut R) -> Vec<(usize, usize)> {
    let m = degrees.len();
    if m < 2 {
        return Vec::new();
    }
    let cap = (m - 1) as u64;
    let mut residual: Vec<u64> = degrees.iter().map(|&d| d.min(cap)).collect();
    if residual.iter().sum::<u64>() % 2 == 1 {
        if let Some(max_idx) = (0..m).max_by_key(|&i| residual[i]) {
            residual[max_idx] -= 1;
        }
    }

    let mut alive: Vec<usize> = (0..m).filter(|&i| residual[i] > 0).collect();
    let mut edges = Vec::new();

    while !alive.is_empty() {
        alive.shuffle(rng);
        alive.sort_by(|&a, &b| residual[b].cmp(&residual[a]));

        let head = alive[0];
        let demand = residual[head] as usize;
        residual[head] = 0;

        for &other in alive.iter().skip(1).take(demand) {
            edges.push((head.min(other), head.max(other)));
            residual[other] -= 1;
        }

        alive.retain(|&i| residual[i] > 0);
    }
    edges
}

/// Chung-Lu realization on local ids `0..m`.
pub fn chung_lu<R: Rng + ?Sized>(degrees: &[u64], rng: &mut R) -> Vec<(usize, usize)> {
    let m = degrees.len();
    let cap = m.saturating_sub(1) as u64;
    let d: Vec<f64> = degrees.iter().map(|&x| x.min(cap) as f64).collect();
    let total: f64 = d.iter().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut edges = Vec::new();
    for u in 0..m {
        if d[u] == 0.0 {
            continue;
        }
        for v in (u + 1)..m {
            let p = (d[u] * d[v] / total).min(1.0);
            if p > 0.0 && rng.random::<f64>() < p {
                edges.push((u, v));
            }
        }
    }
    edges
}

fn add_inter_edges<R: Rng + ?Sized>(
    builder: &mut GraphBuilder,
    left: &[usize],
    right: &[usize],
    count: u64,
    rng: &mut R,
) {
    if left.is_empty() || right.is_empty() {
        return;
    }
    let pairs = (left.len() as u64).saturating_mul(right.len() as u64);
    let draws = count.min(pairs.saturating_mul(MAX_DRAWS_PER_PAIR));
    for _ in 0..draws {
        let u = left[rng.random_range(0..left.len())];
        let v = right[rng.random_range(0..right.len())];
        builder.add_edge(u, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use proptest::prelude::*;
    use rand_chacha::ChaCha20Rng;

    fn degrees_of(m: usize, edges: &[(usize, usize)]) -> Vec<u64> {
        let mut d = vec![0; m];
        for &(a, b) in edges {
            d[a] += 1;
            d[b] += 1;
        }
        d
    }

    #[test]
    fn test_havel_hakimi_exact_on_graphical() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        for seq in [vec![2, 2, 2], vec![3, 3, 3, 3], vec![1, 1, 2, 2], vec![3, 2, 2, 1, 0]] {
            let edges = havel_hakimi(&seq, &mut rng);
            assert_eq!(degrees_of(seq.len(), &edges), seq, "sequence {seq:?}");
        }
    }

    #[test]
    fn test_havel_hakimi_odd_sum() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let edges = havel_hakimi(&[2, 1, 1, 1], &mut rng);
        let d = degrees_of(4, &edges);
        assert_eq!(d.iter().sum::<u64>() % 2, 0);
        assert!(d.iter().zip([2, 1, 1, 1]).all(|(&got, want)| got <= want));
    }

    #[test]
    fn test_havel_hakimi_clips_to_size() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let edges = havel_hakimi(&[9, 9, 9], &mut rng);
        assert_eq!(degrees_of(3, &edges), vec![2, 2, 2]);
    }

    #[test]
    fn test_havel_hakimi_tiny() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        assert!(havel_hakimi(&[], &mut rng).is_empty());
        assert!(havel_hakimi(&[4], &mut rng).is_empty());
        assert!(havel_hakimi(&[0, 0, 0], &mut rng).is_empty());
    }

    #[test]
    fn test_chung_lu_respects_bounds() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let edges = chung_lu(&[3, 3, 3, 3], &mut rng);
        let d = degrees_of(4, &edges);
        assert!(d.iter().all(|&x| x <= 3));
        assert!(edges.iter().all(|&(a, b)| a < b));
    }

    #[test]
    fn test_chung_lu_zero_sequence() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        assert!(chung_lu(&[0, 0, 0], &mut rng).is_empty());
    }

    #[test]
    fn test_reconstruct_two_communities() {
        let release = NoisySummary::from_parts(
            vec![vec![0, 1, 2], vec![3, 4, 5]],
            array![[6, 1], [1, 6]],
            vec![vec![2, 2, 2], vec![2, 2, 2]],
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let g = GraphReconstructor::new().reconstruct(6, &release, &mut rng).unwrap();
        assert_eq!(g.node_count(), 6);
        assert_eq!(g.edge_count(), 7);
        for (u, v) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            assert!(g.has_edge(u, v));
        }
    }

    #[test]
    fn test_inter_zero_adds_nothing() {
        let release = NoisySummary::from_parts(
            vec![vec![0, 1], vec![2, 3]],
            Array2::zeros((2, 2)),
            vec![vec![0, 0], vec![0, 0]],
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let g = GraphReconstructor::new().reconstruct(4, &release, &mut rng).unwrap();
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_inter_shrinkage_bounded_by_pairs() {
        let release = NoisySummary::from_parts(
            vec![vec![0, 1], vec![2, 3]],
            array![[0, 1000], [1000, 0]],
            vec![vec![0, 0], vec![0, 0]],
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let g = GraphReconstructor::new().reconstruct(4, &release, &mut rng).unwrap();
        assert!(g.edge_count() <= 4);
        assert!(!g.has_edge(0, 1) && !g.has_edge(2, 3));
    }

    #[test]
    fn test_huge_inter_count_is_capped() {
        let release = NoisySummary::from_parts(
            vec![vec![0], vec![1]],
            array![[0, 1_000_000_000_000], [1_000_000_000_000, 0]],
            vec![vec![0], vec![0]],
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        let g = GraphReconstructor::new().reconstruct(2, &release, &mut rng).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge(0, 1));
    }

    #[test]
    fn test_rejects_out_of_range_member() {
        let release =
            NoisySummary::from_parts(vec![vec![0, 9]], array![[0]], vec![vec![1, 1]]).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        assert!(GraphReconstructor::new().reconstruct(4, &release, &mut rng).is_err());
    }

    proptest! {
        #[test]
        fn prop_intra_within_size(seq in prop::collection::vec(0u64..20, 0..12), seed in any::<u64>()) {
            let m = seq.len();
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            for edges in [havel_hakimi(&seq, &mut rng), chung_lu(&seq, &mut rng)] {
                for &(a, b) in &edges {
                    prop_assert!(a < b && b < m);
                }
                let d = degrees_of(m, &edges);
                prop_assert!(d.iter().all(|&x| x as usize <= m.saturating_sub(1)));
            }
        }

        #[test]
        fn prop_havel_hakimi_never_exceeds_target(seq in prop::collection::vec(0u64..8, 0..10), seed in any::<u64>()) {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let edges = havel_hakimi(&seq, &mut rng);
            let d = degrees_of(seq.len(), &edges);
            for (got, want) in d.iter().zip(&seq) {
                prop_assert!(got <= want);
            }
        }
    }
}
