//! Graph under construction during an annotation simulation.
//!
//! Wraps [`WeightedGraph`] with multi-judgement aggregation: every edge keeps
//! an append-only judgement history, and the materialized edge weight is the
//! median over the numeric (non-abstained) entries. Cluster labels live here
//! too, because the adaptive sampler reads them back each round.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, WugError};
use crate::judgement::{Judgement, LIKERT_MIDPOINT};

use super::{WeightedGraph, canonical_pair};

/// A partition of nodes: cluster id to member nodes.
///
/// Ids are contiguous from zero; clusters are ordered by descending size by
/// every clusterer in this crate.
pub type Clustering = BTreeMap<usize, Vec<usize>>;

/// Label marking a node that has not been placed in any cluster yet.
pub const UNCLUSTERED: i64 = -1;

/// Median of the numeric entries of a judgement history.
fn median_of(history: &[Judgement]) -> Option<f64> {
    let mut numeric: Vec<f64> = history.iter().filter_map(|j| j.value()).collect();
    if numeric.is_empty() {
        return None;
    }
    numeric.sort_by(f64::total_cmp);
    let mid = numeric.len() / 2;
    if numeric.len() % 2 == 1 {
        numeric.get(mid).copied()
    } else {
        match (numeric.get(mid - 1), numeric.get(mid)) {
            (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
            _ => None,
        }
    }
}

/// Simulated WUG being annotated.
///
/// Starts with no edges and all labels [`UNCLUSTERED`]; grows monotonically in
/// judgements and never shrinks. The node universe is fixed at construction.
///
/// # Examples
/// ```
/// use wugsim_core::{AnnotatedGraph, Judgement};
///
/// let mut graph = AnnotatedGraph::new(10);
/// graph.record_judgement(0, 1, Judgement::Value(3.0))?;
/// graph.record_judgement(1, 0, Judgement::Value(4.0))?;
/// assert_eq!(graph.get_edge(0, 1), Some(3.5));
/// assert_eq!(graph.soft_weight(0, 1), Some(1.0));
/// assert_eq!(graph.judgement_count(), 2);
/// # Ok::<(), wugsim_core::WugError>(())
/// ```
#[derive(Clone, Debug)]
pub struct AnnotatedGraph {
    graph: WeightedGraph,
    max_nodes: usize,
    histories: BTreeMap<(usize, usize), Vec<Judgement>>,
    soft_weights: BTreeMap<(usize, usize), f64>,
    labels: Vec<i64>,
    community_nodes: Clustering,
    last_edge: Option<(usize, usize)>,
    judgement_count: u64,
}

impl AnnotatedGraph {
    /// Creates an empty annotated graph over the node universe `[0, max_nodes)`.
    #[must_use]
    pub fn new(max_nodes: usize) -> Self {
        Self {
            graph: WeightedGraph::new(),
            max_nodes,
            histories: BTreeMap::new(),
            soft_weights: BTreeMap::new(),
            labels: vec![UNCLUSTERED; max_nodes],
            community_nodes: Clustering::new(),
            last_edge: None,
            judgement_count: 0,
        }
    }

    /// Size of the node universe this graph annotates.
    #[must_use]
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Appends one judgement to the pair's history and refreshes the median.
    ///
    /// Abstentions are preserved in the history. The edge only materializes
    /// once at least one numeric judgement exists; until then the pair is
    /// registered but [`Self::get_edge`] returns `None`. The judgement count
    /// advances for abstentions too.
    ///
    /// # Errors
    /// Returns [`WugError::SelfLoop`] when `u == v` and
    /// [`WugError::NodeOutOfBounds`] when an endpoint falls outside the node
    /// universe.
    pub fn record_judgement(&mut self, u: usize, v: usize, judgement: Judgement) -> Result<()> {
        if u == v {
            return Err(WugError::SelfLoop { node: u });
        }
        for node in [u, v] {
            if node >= self.max_nodes {
                return Err(WugError::NodeOutOfBounds {
                    node,
                    node_count: self.max_nodes,
                });
            }
        }

        let key = canonical_pair(u, v);
        let history = self.histories.entry(key).or_default();
        history.push(judgement);

        if let Some(weight) = median_of(history) {
            self.graph.add_edge(key.0, key.1, weight)?;
            self.soft_weights.insert(key, weight - LIKERT_MIDPOINT);
        }

        self.last_edge = Some((u, v));
        self.judgement_count += 1;
        Ok(())
    }

    /// Current (median) weight of a materialized edge.
    #[must_use]
    pub fn get_edge(&self, u: usize, v: usize) -> Option<f64> {
        self.graph.get_edge(u, v)
    }

    /// Current weight re-centred around the Likert midpoint.
    #[must_use]
    pub fn soft_weight(&self, u: usize, v: usize) -> Option<f64> {
        self.soft_weights.get(&canonical_pair(u, v)).copied()
    }

    /// Full judgement history of a pair, abstentions included.
    #[must_use]
    pub fn judgement_history(&self, u: usize, v: usize) -> Option<&[Judgement]> {
        self.histories
            .get(&canonical_pair(u, v))
            .map(Vec::as_slice)
    }

    /// Whether any judgement, numeric or abstained, was recorded for the pair.
    ///
    /// A registered pair has been queried before and is not asked again by
    /// the adaptive sampler, even when every judgement so far abstained.
    #[must_use]
    pub fn is_registered(&self, u: usize, v: usize) -> bool {
        self.histories.contains_key(&canonical_pair(u, v))
    }

    /// Iterates over every registered pair in canonical order.
    pub fn registered_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.histories.keys().copied()
    }

    /// Most recently touched pair, in the order it was recorded.
    #[must_use]
    pub fn last_edge(&self) -> Option<(usize, usize)> {
        self.last_edge
    }

    /// Total number of judgement appends, abstentions included.
    ///
    /// This is the canonical progress clock of a simulation.
    #[must_use]
    pub fn judgement_count(&self) -> u64 {
        self.judgement_count
    }

    /// The materialized-weight view of this graph.
    #[must_use]
    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    /// Current cluster label per node; [`UNCLUSTERED`] for unplaced nodes.
    #[must_use]
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Current partition, cluster id to member nodes.
    #[must_use]
    pub fn community_nodes(&self) -> &Clustering {
        &self.community_nodes
    }

    /// Cluster sizes in cluster-id order.
    #[must_use]
    pub fn community_sizes(&self) -> Vec<usize> {
        self.community_nodes.values().map(Vec::len).collect()
    }

    /// Number of clusters in the current partition.
    #[must_use]
    pub fn number_of_clusters(&self) -> usize {
        self.community_nodes.len()
    }

    /// Replaces the partition wholesale and rewrites the label vector.
    ///
    /// Every labelled node gets its cluster id; nodes absent from the new
    /// partition fall back to [`UNCLUSTERED`].
    ///
    /// # Errors
    /// Returns [`WugError::NodeOutOfBounds`] when the partition mentions a
    /// node outside the node universe.
    pub fn update_cluster_labels(&mut self, clusters: Clustering) -> Result<()> {
        for nodes in clusters.values() {
            for &node in nodes {
                if node >= self.max_nodes {
                    return Err(WugError::NodeOutOfBounds {
                        node,
                        node_count: self.max_nodes,
                    });
                }
            }
        }

        self.labels.fill(UNCLUSTERED);
        for (&cluster, nodes) in &clusters {
            for &node in nodes {
                if let Some(slot) = self.labels.get_mut(node) {
                    *slot = cluster as i64;
                }
            }
        }
        self.community_nodes = clusters;
        Ok(())
    }

    /// Signed-weight working view for clusterers.
    ///
    /// Contains every materialized node and edge, with weights re-centred
    /// around the Likert midpoint so sign encodes agreement.
    #[must_use]
    pub fn soft_weight_view(&self) -> WeightedGraph {
        let mut view = WeightedGraph::new();
        for node in self.graph.nodes() {
            view.add_node(node);
        }
        for (&(u, v), &soft) in &self.soft_weights {
            // Endpoints are distinct by construction.
            let _ = view.add_edge(u, v, soft);
        }
        view
    }

    /// Materialized edges grouped by their current weight, ascending.
    #[must_use]
    pub fn weight_groups(&self) -> Vec<(f64, Vec<(usize, usize)>)> {
        let mut edges: Vec<(f64, (usize, usize))> = self
            .graph
            .edges()
            .map(|(u, v, w)| (w, (u, v)))
            .collect();
        edges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut groups: Vec<(f64, Vec<(usize, usize)>)> = Vec::new();
        for (weight, pair) in edges {
            match groups.last_mut() {
                Some((current, members)) if *current == weight => members.push(pair),
                _ => groups.push((weight, vec![pair])),
            }
        }
        groups
    }
}

impl fmt::Display for AnnotatedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnnotatedGraph({} nodes, {} edges, {} judgements, {} communities)",
            self.graph.number_of_nodes(),
            self.graph.number_of_edges(),
            self.judgement_count,
            self.number_of_clusters()
        )
    }
}
