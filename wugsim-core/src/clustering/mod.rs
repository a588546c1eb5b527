//! Clustering strategies over signed-weight graphs.
//!
//! Clusterers consume the annotated graph's soft-weight view, where a
//! positive edge is same-sense evidence and a negative edge is
//! different-sense evidence. Every clusterer returns the same shape: cluster
//! ids contiguous from zero, ordered by descending size.

mod annealing;
mod correlation;

use crate::error::Result;
use crate::graph::{Clustering, WeightedGraph};

pub use self::correlation::{CorrelationClusterer, CorrelationClustererBuilder};

/// A strategy recovering a sense partition from signed evidence.
///
/// Implementations own their random state; they receive the graph by
/// borrowed reference and must not retain it.
pub trait Clusterer: Send {
    /// Partitions the nodes of `graph`.
    ///
    /// # Errors
    /// Implementations surface broken internal invariants; recoverable
    /// conditions (empty graphs, isolated nodes) are representable results.
    fn cluster(&mut self, graph: &WeightedGraph) -> Result<Clustering>;
}

/// Orders clusters by descending size and assigns contiguous ids.
///
/// Ties break toward the cluster with the smallest member so the output is
/// deterministic; member lists come out sorted.
fn finalize_clusters(mut clusters: Vec<Vec<usize>>) -> Clustering {
    for cluster in &mut clusters {
        cluster.sort_unstable();
    }
    clusters.retain(|cluster| !cluster.is_empty());
    clusters.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    clusters.into_iter().enumerate().collect()
}

/// Clusters by connected components over positive edges.
///
/// The baseline strategy: every maximal positively-connected set of nodes is
/// one sense, negative evidence is ignored. Also the seed partition for the
/// correlation search.
///
/// # Examples
/// ```
/// use wugsim_core::{Clusterer, ConnectedComponentsClusterer, WeightedGraph};
///
/// let mut graph = WeightedGraph::new();
/// graph.add_edge(0, 1, 1.5)?;
/// graph.add_edge(2, 3, -0.5)?;
/// let clusters = ConnectedComponentsClusterer::new().cluster(&graph)?;
/// assert_eq!(clusters.len(), 3);
/// # Ok::<(), wugsim_core::WugError>(())
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectedComponentsClusterer;

impl ConnectedComponentsClusterer {
    /// Creates the component clusterer; it carries no configuration.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clusterer for ConnectedComponentsClusterer {
    fn cluster(&mut self, graph: &WeightedGraph) -> Result<Clustering> {
        Ok(finalize_clusters(graph.positive_components()))
    }
}

#[cfg(test)]
mod tests;
