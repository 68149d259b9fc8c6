//! Utility metrics for synthetic graphs.
//!
//! A synthetic graph is scored against the input on structural statistics
//! and on community agreement.
//!
//! # Metrics Overview
//!
//! | Column | Function | Range | Best |
//! |--------|----------|-------|------|
//! | `nmi` | [`nmi`] of Louvain partitions | [0, 1] | 1 |
//! | `evc_overlap` | [`top_k_overlap`] of eigenvector centrality | [0, 1] | 1 |
//! | `evc_MAE` | [`top_k_mae`] of eigenvector centrality | [0, ∞) | 0 |
//! | `deg_kl` | [`kl_divergence`] of degree distributions | [0, ∞) | 0 |
//! | `diam_rel` | [`relative_error`] of [`diameter`] | [0, ∞) | 0 |
//! | `cc_rel` | [`relative_error`] of [`transitivity`] | [0, ∞) | 0 |
//! | `mod_rel` | [`relative_error`] of [`modularity`] | [0, ∞) | 0 |
//!
//! Statistics of the input graph are computed once into a [`Baseline`] and
//! shared by every replicate.
//!
//! # Example
//!
//! ```rust
//! use privgraph::metrics::{nmi, transitivity};
//! use privgraph::graph::Graph;
//!
//! let triangle = Graph::from_edges(3, [(0, 1), (1, 2), (0, 2)]);
//! assert!((transitivity(&triangle) - 1.0).abs() < 1e-12);
//!
//! let pred = [1, 1, 0, 0];
//! let truth = [0, 0, 1, 1];
//! assert!((nmi(&pred, &truth) - 1.0).abs() < 1e-12);
//! ```
//!
//! # References
//!
//! - Strehl & Ghosh (2002). "Cluster ensembles" (NMI)
//! - Newman (2006). "Modularity and community structure in networks"
//! - Bonacich (1987). "Power and centrality" (eigenvector centrality)

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::kosaraju_scc;
use rand::Rng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::community::{Louvain, Partition};
use crate::error::Result;
use crate::graph::Graph;

/// Normalized Mutual Information between two clusterings.
///
/// ```text
/// NMI(U, V) = 2 * I(U; V) / (H(U) + H(V))
/// ```
///
/// Returns 0 for mismatched or empty inputs and 1 when both clusterings
/// are constant.
pub fn nmi(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }
    let n = pred.len() as f64;

    let mut joint: HashMap<(usize, usize), usize> = HashMap::new();
    let mut p_pred: HashMap<usize, usize> = HashMap::new();
    let mut p_truth: HashMap<usize, usize> = HashMap::new();
    for (&p, &t) in pred.iter().zip(truth) {
        *joint.entry((p, t)).or_insert(0) += 1;
        *p_pred.entry(p).or_insert(0) += 1;
        *p_truth.entry(t).or_insert(0) += 1;
    }

    let entropy = |counts: &HashMap<usize, usize>| -> f64 {
        counts
            .values()
            .map(|&c| {
                let p = c as f64 / n;
                -p * p.ln()
            })
            .sum()
    };
    let h_pred = entropy(&p_pred);
    let h_truth = entropy(&p_truth);

    let mut mi = 0.0;
    for (&(p, t), &count) in &joint {
        let p_joint = count as f64 / n;
        let p_p = p_pred[&p] as f64 / n;
        let p_t = p_truth[&t] as f64 / n;
        mi += p_joint * (p_joint / (p_p * p_t)).ln();
    }

    let denom = h_pred + h_truth;
    if denom > 0.0 {
        (2.0 * mi / denom).clamp(0.0, 1.0)
    } else {
        1.0 // Both are constant
    }
}

/// Newman modularity of `partition` on `graph` (γ = 1).
///
/// ```text
/// Q = Σ_c [ L_c / m - (D_c / 2m)² ]
/// ```
pub fn modularity(graph: &Graph, partition: &Partition) -> f64 {
    let m = graph.edge_count() as f64;
    if m == 0.0 || partition.len() != graph.node_count() {
        return 0.0;
    }
    let mut internal: HashMap<usize, f64> = HashMap::new();
    let mut degree: HashMap<usize, f64> = HashMap::new();
    for (u, v) in graph.edges() {
        let (cu, cv) = (partition.community_of(u), partition.community_of(v));
        *degree.entry(cu).or_insert(0.0) += 1.0;
        *degree.entry(cv).or_insert(0.0) += 1.0;
        if cu == cv {
            *internal.entry(cu).or_insert(0.0) += 1.0;
        }
    }
    degree
        .iter()
        .map(|(c, &d)| internal.get(c).copied().unwrap_or(0.0) / m - (d / (2.0 * m)).powi(2))
        .sum()
}

/// Global clustering coefficient: `3 × triangles / connected triples`.
pub fn transitivity(graph: &Graph) -> f64 {
    let mut triangles = 0usize;
    let mut triples = 0usize;
    for u in 0..graph.node_count() {
        let d = graph.degree(u);
        triples += d * d.saturating_sub(1) / 2;
        for &v in graph.neighbors(u).iter().filter(|&&v| v > u) {
            triangles += sorted_intersection_above(graph.neighbors(u), graph.neighbors(v), v);
        }
    }
    if triples == 0 {
        0.0
    } else {
        3.0 * triangles as f64 / triples as f64
    }
}

/// Count common elements `> floor` of two sorted slices.
fn sorted_intersection_above(a: &[usize], b: &[usize], floor: usize) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                if a[i] > floor {
                    count += 1;
                }
                i += 1;
                j += 1;
            }
        }
    }
    count
}

/// Histogram of node degrees; entry `d` counts nodes of degree `d`.
pub fn degree_distribution(graph: &Graph) -> Vec<f64> {
    let degrees = graph.degrees();
    let max = degrees.iter().copied().max().unwrap_or(0);
    let mut hist = vec![0.0; max + 1];
    for d in degrees {
        hist[d] += 1.0;
    }
    hist
}

/// KL divergence `D(p ‖ q)` between two histograms.
///
/// Both are zero-padded to the same length, smoothed by `f64::EPSILON`
/// and normalized, so the result is finite.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    let len = p.len().max(q.len());
    if len == 0 {
        return 0.0;
    }
    let normalize = |h: &[f64]| -> Vec<f64> {
        let padded: Vec<f64> = (0..len)
            .map(|i| h.get(i).copied().unwrap_or(0.0).max(0.0) + f64::EPSILON)
            .collect();
        let total: f64 = padded.iter().sum();
        padded.into_iter().map(|x| x / total).collect()
    };
    let p = normalize(p);
    let q = normalize(q);
    p.iter()
        .zip(&q)
        .map(|(&pi, &qi)| pi * (pi / qi).ln())
        .sum::<f64>()
        .max(0.0)
}

/// Eigenvector centrality by power iteration on `A + I`.
///
/// Iterates until the L1 change drops below `1e-6 × n` or 10 000
/// iterations pass; the last iterate is returned either way. The vector
/// is L2-normalized and non-negative.
pub fn eigenvector_centrality(graph: &Graph) -> Vec<f64> {
    const MAX_ITER: usize = 10_000;
    const TOL: f64 = 1e-6;

    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }
    let mut x = vec![1.0 / n as f64; n];
    for _ in 0..MAX_ITER {
        let mut next = x.clone();
        for (u, next_u) in next.iter_mut().enumerate() {
            *next_u += graph.neighbors(u).iter().map(|&v| x[v]).sum::<f64>();
        }
        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return next;
        }
        for v in &mut next {
            *v /= norm;
        }
        let delta: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        x = next;
        if delta < n as f64 * TOL {
            break;
        }
    }
    x
}

/// Nodes sorted by descending score; ties keep node order.
fn ranking(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

/// Fraction of the top-`k` nodes by score that the two rankings share.
pub fn top_k_overlap(truth: &[f64], synthetic: &[f64], k: usize) -> f64 {
    let k = k.min(truth.len()).min(synthetic.len());
    if k == 0 {
        return 0.0;
    }
    let top: HashSet<usize> = ranking(truth).into_iter().take(k).collect();
    let shared = ranking(synthetic)
        .into_iter()
        .take(k)
        .filter(|v| top.contains(v))
        .count();
    shared as f64 / k as f64
}

/// Mean absolute difference between the top-`k` sorted score values.
pub fn top_k_mae(truth: &[f64], synthetic: &[f64], k: usize) -> f64 {
    let k = k.min(truth.len()).min(synthetic.len());
    if k == 0 {
        return 0.0;
    }
    let top = |scores: &[f64]| -> Vec<f64> {
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));
        sorted.truncate(k);
        sorted
    };
    top(truth)
        .iter()
        .zip(&top(synthetic))
        .map(|(a, b)| (a - b).abs())
        .sum::<f64>()
        / k as f64
}

/// Nodes of the largest connected component, ascending.
fn largest_component(graph: &Graph) -> Vec<usize> {
    // Every undirected edge is traversable both ways, so the strongly
    // connected components are the connected components.
    let mut best = kosaraju_scc(&graph.to_petgraph())
        .into_iter()
        .max_by_key(Vec::len)
        .map(|c| c.into_iter().map(|ix| ix.index()).collect::<Vec<_>>())
        .unwrap_or_default();
    best.sort_unstable();
    best
}

fn eccentricity(graph: &Graph, source: usize) -> usize {
    let mut dist = vec![usize::MAX; graph.node_count()];
    dist[source] = 0;
    let mut queue = VecDeque::from([source]);
    let mut far = 0;
    while let Some(u) = queue.pop_front() {
        far = far.max(dist[u]);
        for &v in graph.neighbors(u) {
            if dist[v] == usize::MAX {
                dist[v] = dist[u] + 1;
                queue.push_back(v);
            }
        }
    }
    far
}

/// Diameter of the largest connected component (BFS from every node).
pub fn diameter(graph: &Graph) -> usize {
    let component = largest_component(graph);

    #[cfg(feature = "parallel")]
    let diam = component
        .par_iter()
        .map(|&u| eccentricity(graph, u))
        .max()
        .unwrap_or(0);

    #[cfg(not(feature = "parallel"))]
    let diam = component
        .iter()
        .map(|&u| eccentricity(graph, u))
        .max()
        .unwrap_or(0);

    diam
}

/// `|truth - synthetic| / |truth|`, or the absolute error when `truth == 0`.
pub fn relative_error(truth: f64, synthetic: f64) -> f64 {
    let err = (truth - synthetic).abs();
    if truth == 0.0 {
        err
    } else {
        err / truth.abs()
    }
}

/// Scores of one synthetic graph against a [`Baseline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    /// NMI of the Louvain partitions of both graphs.
    pub nmi: f64,
    /// Top-1% eigenvector-centrality node overlap.
    pub evc_overlap: f64,
    /// Top-1% eigenvector-centrality value MAE.
    pub evc_mae: f64,
    /// KL divergence of degree distributions.
    pub deg_kl: f64,
    /// Relative diameter error.
    pub diam_rel: f64,
    /// Relative transitivity error.
    pub cc_rel: f64,
    /// Relative modularity error.
    pub mod_rel: f64,
}

/// Input-graph statistics, computed once per experiment.
#[derive(Debug, Clone)]
pub struct Baseline {
    partition: Partition,
    modularity: f64,
    degree_distribution: Vec<f64>,
    centrality: Vec<f64>,
    top_k: usize,
    diameter: usize,
    transitivity: f64,
    louvain: Louvain,
}

impl Baseline {
    /// Compute every input statistic. `rng` drives the Louvain run.
    pub fn compute<R: Rng + ?Sized>(graph: &Graph, rng: &mut R) -> Result<Self> {
        let louvain = Louvain::new();
        let partition = louvain.partition_with_rng(graph, rng)?;
        Ok(Self {
            modularity: modularity(graph, &partition),
            partition,
            degree_distribution: degree_distribution(graph),
            centrality: eigenvector_centrality(graph),
            top_k: (graph.node_count() / 100).max(1),
            diameter: diameter(graph),
            transitivity: transitivity(graph),
            louvain,
        })
    }

    /// Louvain partition of the input graph.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Modularity of [`Baseline::partition`].
    pub fn modularity(&self) -> f64 {
        self.modularity
    }

    /// Diameter of the input's largest component.
    pub fn diameter(&self) -> usize {
        self.diameter
    }

    /// Input transitivity.
    pub fn transitivity(&self) -> f64 {
        self.transitivity
    }

    /// Score a synthetic graph over the same node set.
    pub fn score<R: Rng + ?Sized>(&self, synthetic: &Graph, rng: &mut R) -> Result<Scores> {
        let partition = self.louvain.partition_with_rng(synthetic, rng)?;
        let centrality = eigenvector_centrality(synthetic);
        Ok(Scores {
            nmi: nmi(partition.labels(), self.partition.labels()),
            evc_overlap: top_k_overlap(&self.centrality, &centrality, self.top_k),
            evc_mae: top_k_mae(&self.centrality, &centrality, self.top_k),
            deg_kl: kl_divergence(&self.degree_distribution, &degree_distribution(synthetic)),
            diam_rel: relative_error(self.diameter as f64, diameter(synthetic) as f64),
            cc_rel: relative_error(self.transitivity, transitivity(synthetic)),
            mod_rel: relative_error(self.modularity, modularity(synthetic, &partition)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{clique_ring, two_triangles};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_nmi_perfect() {
        let pred = [0, 0, 1, 1, 2, 2];
        let truth = [0, 0, 1, 1, 2, 2];
        assert!((nmi(&pred, &truth) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_nmi_permuted() {
        // Same clustering, different labels
        let pred = [1, 1, 0, 0, 2, 2];
        let truth = [0, 0, 1, 1, 2, 2];
        assert!((nmi(&pred, &truth) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_nmi_independent() {
        let pred = [0, 1, 0, 1];
        let truth = [0, 0, 1, 1];
        assert!(nmi(&pred, &truth) < 1e-9);
        assert_eq!(nmi(&[0, 1], &[0]), 0.0);
    }

    #[test]
    fn test_transitivity() {
        let triangle = Graph::from_edges(3, [(0, 1), (1, 2), (0, 2)]);
        assert!((transitivity(&triangle) - 1.0).abs() < 1e-12);
        let path = Graph::from_edges(4, [(0, 1), (1, 2), (2, 3)]);
        assert_eq!(transitivity(&path), 0.0);
        // 2 triangles over 10 wedges
        let g = two_triangles();
        assert!((transitivity(&g) - 6.0 / 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_modularity_two_triangles() {
        let g = two_triangles();
        let p = Partition::from_labels(vec![0, 0, 0, 1, 1, 1]);
        // L_c = 3, D_c = 7, m = 7: 2 × (3/7 - 1/4)
        let expected = 2.0 * (3.0 / 7.0 - 0.25);
        assert!((modularity(&g, &p) - expected).abs() < 1e-12);
        assert!(modularity(&g, &Partition::single(6)).abs() < 1e-12);
    }

    #[test]
    fn test_diameter() {
        let path = Graph::from_edges(5, [(0, 1), (1, 2), (2, 3), (3, 4)]);
        assert_eq!(diameter(&path), 4);
        // Largest component only
        let split = Graph::from_edges(6, [(0, 1), (1, 2), (2, 3), (4, 5)]);
        assert_eq!(diameter(&split), 3);
        assert_eq!(diameter(&Graph::empty(3)), 0);
    }

    #[test]
    fn test_largest_component_members() {
        let g = Graph::from_edges(8, [(5, 6), (0, 7), (7, 3), (3, 0), (1, 2)]);
        assert_eq!(largest_component(&g), vec![0, 3, 7]);
        assert_eq!(largest_component(&Graph::empty(2)).len(), 1);
        assert!(largest_component(&Graph::empty(0)).is_empty());
    }

    #[test]
    fn test_kl_identical_is_zero() {
        let h = [0.0, 2.0, 5.0, 1.0];
        assert!(kl_divergence(&h, &h).abs() < 1e-12);
        assert!(kl_divergence(&h, &[3.0, 0.0, 1.0]) > 0.0);
        assert!(kl_divergence(&[1.0], &[0.0, 1.0]).is_finite());
    }

    #[test]
    fn test_degree_distribution() {
        let g = two_triangles();
        assert_eq!(degree_distribution(&g), vec![0.0, 0.0, 4.0, 2.0]);
    }

    #[test]
    fn test_eigenvector_centrality_star() {
        let star = Graph::from_edges(5, [(0, 1), (0, 2), (0, 3), (0, 4)]);
        let c = eigenvector_centrality(&star);
        let norm: f64 = c.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!((1..5).all(|i| c[0] > c[i]));
        assert!((1..5).all(|i| (c[i] - c[1]).abs() < 1e-9));
    }

    #[test]
    fn test_top_k() {
        let truth = [0.9, 0.1, 0.5, 0.3];
        let synth = [0.8, 0.6, 0.1, 0.3];
        assert_eq!(top_k_overlap(&truth, &synth, 1), 1.0);
        assert_eq!(top_k_overlap(&truth, &synth, 2), 0.5);
        assert!((top_k_mae(&truth, &synth, 2) - 0.1).abs() < 1e-12);
        assert_eq!(top_k_overlap(&truth, &synth, 0), 0.0);
    }

    #[test]
    fn test_relative_error() {
        assert_eq!(relative_error(4.0, 3.0), 0.25);
        assert_eq!(relative_error(0.0, 0.5), 0.5);
    }

    #[test]
    fn test_baseline_scores_itself() {
        let g = clique_ring();
        let baseline = Baseline::compute(&g, &mut ChaCha20Rng::seed_from_u64(0)).unwrap();
        let s = baseline.score(&g, &mut ChaCha20Rng::seed_from_u64(0)).unwrap();
        assert!((s.nmi - 1.0).abs() < 1e-9);
        assert_eq!(s.evc_overlap, 1.0);
        assert!(s.evc_mae < 1e-9);
        assert!(s.deg_kl.abs() < 1e-9);
        assert_eq!(s.diam_rel, 0.0);
        assert_eq!(s.cc_rel, 0.0);
        assert!(s.mod_rel < 1e-9);
    }
}
