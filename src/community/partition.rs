//! Dense node → community assignments.

use std::collections::HashMap;

/// A total assignment of nodes `0..n-1` to community ids.
///
/// Ids are arbitrary until [`Partition::renumbered`] relabels them to a
/// contiguous `0..k-1` range; every matrix-indexed consumer works on the
/// renumbered form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    labels: Vec<usize>,
}

impl Partition {
    /// Wrap raw labels; `labels[i]` is the community of node `i`.
    pub fn from_labels(labels: Vec<usize>) -> Self {
        Self { labels }
    }

    /// Every node in its own community.
    pub fn singletons(n: usize) -> Self {
        Self {
            labels: (0..n).collect(),
        }
    }

    /// All nodes in one community.
    pub fn single(n: usize) -> Self {
        Self { labels: vec![0; n] }
    }

    /// Number of nodes covered.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the partition covers no nodes.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Community of `node`.
    pub fn community_of(&self, node: usize) -> usize {
        self.labels[node]
    }

    /// Raw labels.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Consume into raw labels.
    pub fn into_labels(self) -> Vec<usize> {
        self.labels
    }

    /// Number of distinct communities.
    pub fn num_communities(&self) -> usize {
        if self.is_contiguous() {
            return self.labels.iter().max().map_or(0, |&m| m + 1);
        }
        let mut unique = self.labels.clone();
        unique.sort_unstable();
        unique.dedup();
        unique.len()
    }

    /// Whether ids already form `0..k-1` with every id in use.
    pub fn is_contiguous(&self) -> bool {
        let Some(&max) = self.labels.iter().max() else {
            return true;
        };
        if max >= self.labels.len() {
            return false;
        }
        let mut seen = vec![false; max + 1];
        for &c in &self.labels {
            seen[c] = true;
        }
        seen.into_iter().all(|s| s)
    }

    /// Relabel to `0..k-1` in order of first appearance by node index.
    pub fn renumbered(&self) -> Partition {
        let mut mapping: HashMap<usize, usize> = HashMap::new();
        let labels = self
            .labels
            .iter()
            .map(|&c| {
                let next = mapping.len();
                *mapping.entry(c).or_insert(next)
            })
            .collect();
        Partition { labels }
    }

    /// Members of each community, ascending by node index.
    ///
    /// Indexed by the renumbered id, so `members()[c]` lists community `c`
    /// of [`Partition::renumbered`].
    pub fn members(&self) -> Vec<Vec<usize>> {
        let renumbered;
        let labels = if self.is_contiguous() {
            &self.labels
        } else {
            renumbered = self.renumbered();
            &renumbered.labels
        };
        let k = labels.iter().max().map_or(0, |&m| m + 1);
        let mut members = vec![Vec::new(); k];
        for (node, &c) in labels.iter().enumerate() {
            members[c].push(node);
        }
        members
    }
}
