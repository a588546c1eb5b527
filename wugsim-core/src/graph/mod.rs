//! Undirected weighted graph primitive.
//!
//! Stores an adjacency list keyed by node id plus an edge table keyed by the
//! canonical sorted pair, which is all the simulation needs: edge lookup,
//! neighbour enumeration, connected components over positive edges, and
//! induced subgraphs. Ordered maps keep iteration deterministic so strategies
//! replay identically under a fixed seed.

mod annotated;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, WugError};

pub use self::annotated::{AnnotatedGraph, Clustering, UNCLUSTERED};

/// Returns the canonical `(min, max)` ordering of an undirected pair.
#[must_use]
pub fn canonical_pair(u: usize, v: usize) -> (usize, usize) {
    if u <= v { (u, v) } else { (v, u) }
}

/// Number of edges in a complete graph over `nodes` nodes.
#[must_use]
pub const fn complete_edge_count(nodes: usize) -> usize {
    nodes * nodes.saturating_sub(1) / 2
}

/// Undirected weighted graph with canonical edge storage.
///
/// # Examples
/// ```
/// use wugsim_core::WeightedGraph;
///
/// let mut graph = WeightedGraph::new();
/// graph.add_edge(3, 1, 4.0).expect("distinct endpoints");
/// assert_eq!(graph.get_edge(1, 3), Some(4.0));
/// assert_eq!(graph.get_edge(3, 1), Some(4.0));
/// assert_eq!(graph.number_of_nodes(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightedGraph {
    adjacency: BTreeMap<usize, BTreeSet<usize>>,
    edges: BTreeMap<(usize, usize), f64>,
}

impl WeightedGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node without attaching any edge.
    pub fn add_node(&mut self, node: usize) {
        self.adjacency.entry(node).or_default();
    }

    /// Inserts or updates the edge `(min(u, v), max(u, v))`.
    ///
    /// Insertion is idempotent; the weight is overwritten on every call.
    ///
    /// # Errors
    /// Returns [`WugError::SelfLoop`] when `u == v`.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: f64) -> Result<()> {
        if u == v {
            return Err(WugError::SelfLoop { node: u });
        }
        let (a, b) = canonical_pair(u, v);
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        self.edges.insert((a, b), weight);
        Ok(())
    }

    /// Returns the current weight of the edge, if present.
    #[must_use]
    pub fn get_edge(&self, u: usize, v: usize) -> Option<f64> {
        self.edges.get(&canonical_pair(u, v)).copied()
    }

    /// Removes an edge and returns its weight, if it was present.
    ///
    /// Endpoints stay registered as nodes even when their last edge goes.
    pub fn remove_edge(&mut self, u: usize, v: usize) -> Option<f64> {
        let (a, b) = canonical_pair(u, v);
        let weight = self.edges.remove(&(a, b))?;
        if let Some(neighbours) = self.adjacency.get_mut(&a) {
            neighbours.remove(&b);
        }
        if let Some(neighbours) = self.adjacency.get_mut(&b) {
            neighbours.remove(&a);
        }
        Some(weight)
    }

    /// Returns whether the node is registered.
    #[must_use]
    pub fn has_node(&self, node: usize) -> bool {
        self.adjacency.contains_key(&node)
    }

    /// Iterates over node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.adjacency.keys().copied()
    }

    /// Iterates over the neighbours of a node in ascending order.
    ///
    /// An unregistered node has no neighbours.
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|neighbours| neighbours.iter().copied())
    }

    /// Iterates over `(u, v, weight)` triples in canonical order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.edges.iter().map(|(&(u, v), &w)| (u, v, w))
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn number_of_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of stored edges.
    #[must_use]
    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }

    /// Connected components over edges with non-negative finite weight.
    ///
    /// Negative and non-finite weights are treated as absent, so components
    /// reflect positive (same-sense) evidence only. Isolated nodes form
    /// singleton components. Components are ordered by their smallest node
    /// and each component lists its nodes in ascending order.
    #[must_use]
    pub fn positive_components(&self) -> Vec<Vec<usize>> {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();

        for start in self.adjacency.keys().copied() {
            if seen.contains(&start) {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![start];
            seen.insert(start);
            while let Some(node) = stack.pop() {
                component.push(node);
                for neighbour in self.neighbors(node) {
                    if seen.contains(&neighbour) {
                        continue;
                    }
                    let keep = self
                        .get_edge(node, neighbour)
                        .is_some_and(|w| w.is_finite() && w >= 0.0);
                    if keep {
                        seen.insert(neighbour);
                        stack.push(neighbour);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }

        components
    }

    /// Induced subgraph over the given node set.
    ///
    /// Every requested node is registered in the result, with or without
    /// surviving edges.
    #[must_use]
    pub fn subgraph(&self, nodes: &BTreeSet<usize>) -> Self {
        let mut induced = Self::new();
        for &node in nodes {
            induced.add_node(node);
        }
        for (&(u, v), &w) in &self.edges {
            if nodes.contains(&u) && nodes.contains(&v) {
                induced.edges.insert((u, v), w);
                induced.adjacency.entry(u).or_default().insert(v);
                induced.adjacency.entry(v).or_default().insert(u);
            }
        }
        induced
    }
}

impl fmt::Display for WeightedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WeightedGraph({} nodes, {} edges)",
            self.number_of_nodes(),
            self.number_of_edges()
        )
    }
}
