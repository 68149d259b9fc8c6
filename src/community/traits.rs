//! Community detection traits.

use super::partition::Partition;
use crate::error::Result;
use crate::graph::Graph;

/// Trait for non-private community detection algorithms.
pub trait CommunityDetection {
    /// Detect communities in a graph.
    ///
    /// Returns a renumbered partition covering every node.
    fn detect(&self, graph: &Graph) -> Result<Partition>;

    /// Get the resolution parameter (if applicable).
    fn resolution(&self) -> f64 {
        1.0
    }
}
