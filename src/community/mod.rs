//! Community detection, plain and private.
//!
//! ## The Modularity Objective
//!
//! Every stage here optimizes (or samples according to) **modularity** Q,
//! which compares the edges inside communities with the number expected in
//! a random graph with the same degree sequence:
//!
//! ```text
//! Q = (1/2m) × Σ[A_ij - γ(k_i × k_j)/(2m)] × δ(c_i, c_j)
//! ```
//!
//! Where:
//! - m = total edge weight
//! - A_ij = edge weight between i and j
//! - k_i = degree of node i
//! - γ = resolution parameter
//! - δ(c_i, c_j) = 1 if i and j are in same community
//!
//! ## Stages
//!
//! - [`Louvain`]: non-private multi-level optimization. Used directly only on
//!   already-noisy input, where it is post-processing.
//! - [`CommunityInitializer`]: random super-nodes, Laplace-noised super-graph,
//!   Louvain on top. Spends `e1`.
//! - [`CommunityRefiner`]: local moving where each move is drawn from the
//!   exponential mechanism. Spends `e2`.
//!
//! ## Usage
//!
//! ```rust
//! use privgraph::community::{CommunityInitializer, CommunityRefiner};
//! use privgraph::graph::Graph;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let graph = Graph::from_edges(6, [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)]);
//! let mut rng = ChaCha20Rng::seed_from_u64(7);
//!
//! let initial = CommunityInitializer::new()
//!     .initialize(&graph, 1.0, 3, &mut rng)
//!     .unwrap();
//! let refined = CommunityRefiner::new()
//!     .refine(&graph, &initial, 1.0, &mut rng)
//!     .unwrap();
//! assert_eq!(refined.len(), 6);
//! ```
//!
//! ## References
//!
//! - Blondel et al. (2008). "Fast unfolding of communities in large networks."
//! - McSherry & Talwar (2007). "Mechanism Design via Differential Privacy."
//! - Yuan et al. (2023). "PrivGraph: Differentially Private Graph Data
//!   Publication by Exploiting Community Information."

mod init;
mod louvain;
mod partition;
mod refine;
mod traits;

pub use init::CommunityInitializer;
pub use louvain::Louvain;
pub use partition::Partition;
pub use refine::CommunityRefiner;
pub use traits::CommunityDetection;
