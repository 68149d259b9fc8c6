//! Simple undirected graphs.
//!
//! Every graph in the pipeline, input or synthetic, is a [`Graph`]: `n` nodes
//! with contiguous ids `0..n-1`, sorted neighbor lists, no self-loops and no
//! parallel edges. The only way to build one is through [`GraphBuilder`],
//! which normalizes each pair to `(min, max)` before storing it. That
//! normalization is the `M + Mᵗ` / rebinarize step of a dense adjacency
//! matrix, so symmetry and a zero diagonal hold by construction no matter
//! in which order or direction edges were written.

use std::collections::HashSet;

use ndarray::Array2;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;

/// An immutable simple undirected graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    adj: Vec<Vec<usize>>,
    edge_count: usize,
}

impl Graph {
    /// Graph with `n` isolated nodes.
    pub fn empty(n: usize) -> Self {
        Self {
            adj: vec![Vec::new(); n],
            edge_count: 0,
        }
    }

    /// Build from an edge iterator. Self-loops and duplicates are dropped;
    /// endpoints `>= n` panic in the builder, so callers validate first.
    pub fn from_edges(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut builder = GraphBuilder::new(n);
        for (u, v) in edges {
            builder.add_edge(u, v);
        }
        builder.build()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Sorted neighbors of `u`.
    pub fn neighbors(&self, u: usize) -> &[usize] {
        &self.adj[u]
    }

    /// Degree of `u`.
    pub fn degree(&self, u: usize) -> usize {
        self.adj[u].len()
    }

    /// Degree of every node.
    pub fn degrees(&self) -> Vec<usize> {
        self.adj.iter().map(Vec::len).collect()
    }

    /// Whether `u` and `v` are adjacent.
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        u < self.adj.len() && self.adj[u].binary_search(&v).is_ok()
    }

    /// Every undirected edge once, as `(u, v)` with `u < v`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adj
            .iter()
            .enumerate()
            .flat_map(|(u, nbrs)| nbrs.iter().filter(move |&&v| u < v).map(move |&v| (u, v)))
    }

    /// Dense 0/1 adjacency matrix.
    ///
    /// Quadratic in `n`; meant for tests and small graphs.
    pub fn adjacency_matrix(&self) -> Array2<u8> {
        let n = self.node_count();
        let mut mat = Array2::zeros((n, n));
        for (u, nbrs) in self.adj.iter().enumerate() {
            for &v in nbrs {
                mat[[u, v]] = 1;
            }
        }
        mat
    }

    /// Convert to a petgraph undirected graph with the same node indices.
    pub fn to_petgraph(&self) -> UnGraph<(), ()> {
        let mut graph = UnGraph::with_capacity(self.node_count(), self.edge_count);
        let nodes: Vec<_> = (0..self.node_count()).map(|_| graph.add_node(())).collect();
        for (u, v) in self.edges() {
            graph.add_edge(nodes[u], nodes[v], ());
        }
        graph
    }

    /// Build from a petgraph undirected graph, ignoring weights.
    pub fn from_petgraph<N, E>(graph: &UnGraph<N, E>) -> Self {
        Self::from_edges(
            graph.node_count(),
            graph
                .edge_references()
                .map(|e| (e.source().index(), e.target().index())),
        )
    }
}

/// Accumulates edges for a [`Graph`].
///
/// Writes may come in either direction and may repeat; the builder keeps one
/// copy of each unordered pair and ignores `u == v`.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    n: usize,
    pairs: HashSet<(usize, usize)>,
}

impl GraphBuilder {
    /// Builder over `n` nodes.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            pairs: HashSet::new(),
        }
    }

    /// Number of nodes the builder was created with.
    pub fn node_count(&self) -> usize {
        self.n
    }

    /// Record the undirected edge `{u, v}`. Returns `true` if it is new.
    ///
    /// # Panics
    ///
    /// If either endpoint is out of range.
    pub fn add_edge(&mut self, u: usize, v: usize) -> bool {
        assert!(
            u < self.n && v < self.n,
            "edge ({u}, {v}) out of range for {} nodes",
            self.n
        );
        if u == v {
            return false;
        }
        self.pairs.insert((u.min(v), u.max(v)))
    }

    /// Number of distinct edges recorded so far.
    pub fn edge_count(&self) -> usize {
        self.pairs.len()
    }

    /// Finish the graph.
    pub fn build(self) -> Graph {
        let mut adj = vec![Vec::new(); self.n];
        for &(u, v) in &self.pairs {
            adj[u].push(v);
            adj[v].push(u);
        }
        for nbrs in &mut adj {
            nbrs.sort_unstable();
        }
        Graph {
            adj,
            edge_count: self.pairs.len(),
        }
    }
}
