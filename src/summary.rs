//! Community-level statistics and their private release.
//!
//! For a graph and a contiguous partition into `k` communities:
//!
//! - the **edge matrix** `E` is `k×k`, symmetric; `E[i][j]` counts edges
//!   between communities `i` and `j`, and `E[i][i]` is twice the number of
//!   edges inside community `i` (the row sum of the adjacency block);
//! - the **intra degree sequence** of community `i` lists, for each member
//!   in ascending node order, its number of neighbors inside `i`.
//!
//! Both are sensitive. [`NoisySummary::release`] privatizes them with the
//! summary budget `e3`:
//!
//! | Statistic | Sensitivity | Laplace scale | Projection |
//! |-----------|-------------|---------------|------------|
//! | upper triangle of `E` (k(k+1)/2 cells) | 1 | `1/e3` | non-negative |
//! | each intra degree sequence | 2 | `2/e3` | `[0, size-1]` |

use ndarray::Array2;
use rand::Rng;

use crate::community::Partition;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::noise::{project, Bounds, Laplace};

/// True community summary of a graph. Never released as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunitySummary {
    members: Vec<Vec<usize>>,
    edge_matrix: Array2<u64>,
    degree_sequences: Vec<Vec<u64>>,
}

impl CommunitySummary {
    /// Extract the edge matrix and intra degree sequences.
    ///
    /// The partition must cover every node and use contiguous ids.
    pub fn extract(graph: &Graph, partition: &Partition) -> Result<Self> {
        let n = graph.node_count();
        if partition.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: partition.len(),
            });
        }
        if !partition.is_contiguous() {
            return Err(Error::InvalidParameter {
                name: "partition",
                message: "community ids must be renumbered to 0..k-1".into(),
            });
        }

        let members = partition.members();
        let k = members.len();

        // Position of each node inside its community's member list
        let mut local = vec![0usize; n];
        for nodes in &members {
            for (pos, &node) in nodes.iter().enumerate() {
                local[node] = pos;
            }
        }

        let mut edge_matrix = Array2::<u64>::zeros((k, k));
        let mut degree_sequences: Vec<Vec<u64>> =
            members.iter().map(|nodes| vec![0; nodes.len()]).collect();

        for (u, v) in graph.edges() {
            let (cu, cv) = (partition.community_of(u), partition.community_of(v));
            if cu == cv {
                edge_matrix[[cu, cu]] += 2;
                degree_sequences[cu][local[u]] += 1;
                degree_sequences[cu][local[v]] += 1;
            } else {
                edge_matrix[[cu, cv]] += 1;
                edge_matrix[[cv, cu]] += 1;
            }
        }

        Ok(Self {
            members,
            edge_matrix,
            degree_sequences,
        })
    }

    /// Number of communities `k`.
    pub fn num_communities(&self) -> usize {
        self.members.len()
    }

    /// Members of each community, ascending by node index.
    pub fn members(&self) -> &[Vec<usize>] {
        &self.members
    }

    /// The `k×k` edge matrix.
    pub fn edge_matrix(&self) -> &Array2<u64> {
        &self.edge_matrix
    }

    /// Intra degree sequence of every community.
    pub fn degree_sequences(&self) -> &[Vec<u64>] {
        &self.degree_sequences
    }

    /// Number of edges inside community `i`.
    pub fn intra_edges(&self, i: usize) -> u64 {
        self.edge_matrix[[i, i]] / 2
    }

    /// Number of edges between communities `i` and `j`, `i != j`.
    pub fn inter_edges(&self, i: usize, j: usize) -> u64 {
        self.edge_matrix[[i, j]]
    }

    /// Total number of edges the summary describes.
    pub fn total_edges(&self) -> u64 {
        let k = self.num_communities();
        (0..k)
            .map(|i| self.intra_edges(i) + ((i + 1)..k).map(|j| self.inter_edges(i, j)).sum::<u64>())
            .sum()
    }
}

/// Differentially-private community summary.
#[derive(Debug, Clone, PartialEq)]
pub struct NoisySummary {
    members: Vec<Vec<usize>>,
    edge_matrix: Array2<u64>,
    degree_sequences: Vec<Vec<u64>>,
}

impl NoisySummary {
    /// Release `summary` under budget `e3`.
    ///
    /// The edge matrix and the degree sequences are each released with
    /// `e3`, at sensitivity 1 and 2 respectively.
    pub fn release<R: Rng + ?Sized>(
        summary: &CommunitySummary,
        e3: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let k = summary.num_communities();

        let edge_noise = Laplace::calibrated(1.0, e3)?;
        let noisy_cells = edge_noise.add_noise(&upper_triangle(&summary.edge_matrix), rng);
        let edge_matrix = from_upper_triangle(&project(&noisy_cells, Bounds::non_negative()), k);

        let degree_noise = Laplace::calibrated(2.0, e3)?;
        let degree_sequences = summary
            .degree_sequences
            .iter()
            .map(|seq| {
                let values: Vec<f64> = seq.iter().map(|&d| d as f64).collect();
                let upper = seq.len().saturating_sub(1) as u64;
                project(&degree_noise.add_noise(&values, rng), Bounds::at_most(upper))
            })
            .collect();

        Ok(Self {
            members: summary.members.clone(),
            edge_matrix,
            degree_sequences,
        })
    }

    /// Assemble a release from parts, e.g. one loaded from elsewhere.
    pub fn from_parts(
        members: Vec<Vec<usize>>,
        edge_matrix: Array2<u64>,
        degree_sequences: Vec<Vec<u64>>,
    ) -> Result<Self> {
        let k = members.len();
        if edge_matrix.dim() != (k, k) {
            return Err(Error::ShapeMismatch {
                expected: format!("{k}x{k}"),
                actual: format!("{}x{}", edge_matrix.nrows(), edge_matrix.ncols()),
            });
        }
        if degree_sequences.len() != k {
            return Err(Error::DimensionMismatch {
                expected: k,
                found: degree_sequences.len(),
            });
        }
        for (nodes, seq) in members.iter().zip(&degree_sequences) {
            if nodes.len() != seq.len() {
                return Err(Error::DimensionMismatch {
                    expected: nodes.len(),
                    found: seq.len(),
                });
            }
        }
        Ok(Self {
            members,
            edge_matrix,
            degree_sequences,
        })
    }

    /// Number of communities `k`.
    pub fn num_communities(&self) -> usize {
        self.members.len()
    }

    /// Members of each community. Membership is public by construction:
    /// it comes from the private partitioning stages.
    pub fn members(&self) -> &[Vec<usize>] {
        &self.members
    }

    /// Noisy `k×k` edge matrix.
    pub fn edge_matrix(&self) -> &Array2<u64> {
        &self.edge_matrix
    }

    /// Noisy, clamped intra degree sequences.
    pub fn degree_sequences(&self) -> &[Vec<u64>] {
        &self.degree_sequences
    }
}

/// Upper triangle (diagonal included), row-major.
pub(crate) fn upper_triangle(mat: &Array2<u64>) -> Vec<f64> {
    let k = mat.nrows();
    let mut cells = Vec::with_capacity(k * (k + 1) / 2);
    for i in 0..k {
        for j in i..k {
            cells.push(mat[[i, j]] as f64);
        }
    }
    cells
}

/// Symmetric `k×k` matrix from a row-major upper triangle.
pub(crate) fn from_upper_triangle(cells: &[u64], k: usize) -> Array2<u64> {
    let mut mat = Array2::zeros((k, k));
    let mut idx = 0;
    for i in 0..k {
        for j in i..k {
            let v = cells.get(idx).copied().unwrap_or(0);
            mat[[i, j]] = v;
            mat[[j, i]] = v;
            idx += 1;
        }
    }
    mat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{clique_ring, two_triangles};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn triangles_partition() -> Partition {
        Partition::from_labels(vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_two_triangles_summary() {
        let s = CommunitySummary::extract(&two_triangles(), &triangles_partition()).unwrap();

        assert_eq!(s.num_communities(), 2);
        assert_eq!(s.edge_matrix()[[0, 0]], 6);
        assert_eq!(s.edge_matrix()[[1, 1]], 6);
        assert_eq!(s.inter_edges(0, 1), 1);
        assert_eq!(s.inter_edges(1, 0), 1);
        assert_eq!(s.degree_sequences(), &[vec![2, 2, 2], vec![2, 2, 2]]);
        assert_eq!(s.total_edges(), 7);
    }

    #[test]
    fn test_single_community_degenerates_to_1x1() {
        let g = two_triangles();
        let s = CommunitySummary::extract(&g, &Partition::single(6)).unwrap();

        assert_eq!(s.edge_matrix().dim(), (1, 1));
        assert_eq!(s.edge_matrix()[[0, 0]], 2 * g.edge_count() as u64);
        assert_eq!(s.degree_sequences()[0], vec![2, 2, 3, 3, 2, 2]);
    }

    #[test]
    fn test_extract_rejects_mismatched_partition() {
        let g = two_triangles();
        assert!(matches!(
            CommunitySummary::extract(&g, &Partition::single(5)),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(CommunitySummary::extract(&g, &Partition::from_labels(vec![0, 0, 0, 3, 3, 3]))
            .is_err());
    }

    #[test]
    fn test_upper_triangle_layout() {
        let s = CommunitySummary::extract(&two_triangles(), &triangles_partition()).unwrap();
        let cells = upper_triangle(s.edge_matrix());
        assert_eq!(cells, vec![6.0, 1.0, 6.0]);
        let back = from_upper_triangle(&[6, 1, 6], 2);
        assert_eq!(&back, s.edge_matrix());
    }

    #[test]
    fn test_release_clamps_degree_sequences() {
        let g = clique_ring();
        let p = Partition::from_labels((0..20).map(|i| i / 5).collect());
        let s = CommunitySummary::extract(&g, &p).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(4);

        // Tiny budget: heavy noise, clamping does all the work
        let noisy = NoisySummary::release(&s, 0.05, &mut rng).unwrap();
        for (nodes, seq) in noisy.members().iter().zip(noisy.degree_sequences()) {
            assert_eq!(nodes.len(), seq.len());
            assert!(seq.iter().all(|&d| d <= nodes.len() as u64 - 1));
        }
        let e = noisy.edge_matrix();
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(e[[i, j]], e[[j, i]]);
            }
        }
    }

    #[test]
    fn test_release_large_budget_recovers_truth() {
        let g = clique_ring();
        let p = Partition::from_labels((0..20).map(|i| i / 5).collect());
        let s = CommunitySummary::extract(&g, &p).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(8);

        let noisy = NoisySummary::release(&s, 1e6, &mut rng).unwrap();
        assert_eq!(noisy.edge_matrix(), s.edge_matrix());
        assert_eq!(noisy.degree_sequences(), s.degree_sequences());
    }

    #[test]
    fn test_release_rejects_zero_budget() {
        let s = CommunitySummary::extract(&two_triangles(), &triangles_partition()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert!(NoisySummary::release(&s, 0.0, &mut rng).is_err());
    }

    #[test]
    fn test_from_parts_validates_shapes() {
        let members = vec![vec![0, 1], vec![2]];
        assert!(NoisySummary::from_parts(
            members.clone(),
            Array2::zeros((2, 2)),
            vec![vec![1, 1], vec![0]]
        )
        .is_ok());
        assert!(NoisySummary::from_parts(
            members.clone(),
            Array2::zeros((3, 3)),
            vec![vec![1, 1], vec![0]]
        )
        .is_err());
        assert!(
            NoisySummary::from_parts(members, Array2::zeros((2, 2)), vec![vec![1], vec![0]])
                .is_err()
        );
    }

    fn graph_and_partition() -> impl Strategy<Value = (Graph, Partition)> {
        (2usize..16).prop_flat_map(|n| {
            (
                prop::collection::vec((0..n, 0..n), 0..40),
                prop::collection::vec(0..4usize, n),
            )
                .prop_map(move |(edges, labels)| {
                    (
                        Graph::from_edges(n, edges),
                        Partition::from_labels(labels).renumbered(),
                    )
                })
        })
    }

    proptest! {
        #[test]
        fn prop_edge_matrix_symmetric_with_doubled_diagonal((g, p) in graph_and_partition()) {
            let s = CommunitySummary::extract(&g, &p).unwrap();
            let e = s.edge_matrix();
            let k = s.num_communities();
            for i in 0..k {
                for j in 0..k {
                    prop_assert_eq!(e[[i, j]], e[[j, i]]);
                }
                let intra = g
                    .edges()
                    .filter(|&(u, v)| p.community_of(u) == i && p.community_of(v) == i)
                    .count() as u64;
                prop_assert_eq!(e[[i, i]], 2 * intra);
                prop_assert_eq!(s.degree_sequences()[i].iter().sum::<u64>(), 2 * intra);
            }
            prop_assert_eq!(s.total_edges(), g.edge_count() as u64);
        }
    }
}
