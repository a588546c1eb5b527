//! Two-phase adaptive DWUG sampling.
//!
//! The first round explores a random node subset. Every later round reads the
//! current clustering back out of the annotated graph and splits its effort:
//! the combination phase bridges undecided nodes to established senses they
//! have never been compared against, while the exploration phase walks among
//! the remaining undecided nodes to build intra-sense evidence.

use std::collections::BTreeSet;

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, instrument};

use crate::error::{Result, WugError};
use crate::graph::{AnnotatedGraph, WeightedGraph, complete_edge_count};

use super::{Sampler, random_pair};

/// A node or edge quota, given either relative to the available pool or as
/// an absolute number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Count {
    /// Share of the pool, in `[0, 1]`.
    Fraction(f64),
    /// Fixed number, capped at the pool where one applies.
    Absolute(usize),
}

impl Count {
    fn validate(self, name: &'static str) -> Result<()> {
        match self {
            Self::Fraction(fraction) if !(0.0..=1.0).contains(&fraction) => {
                Err(WugError::FractionOutOfRange {
                    name,
                    got: fraction,
                })
            }
            _ => Ok(()),
        }
    }

    /// Resolves a node quota against the pool size, rounding fractions.
    fn resolve_nodes(self, pool: usize) -> usize {
        match self {
            Self::Fraction(fraction) => (pool as f64 * fraction).round() as usize,
            Self::Absolute(count) => count,
        }
    }

    /// Resolves an edge budget; fractional budgets are taken of the complete
    /// subgraph and kept fractional so a walk can overshoot to the ceiling.
    fn resolve_budget(self, pairs: usize) -> f64 {
        match self {
            Self::Fraction(fraction) => pairs as f64 * fraction,
            Self::Absolute(count) => count as f64,
        }
    }
}

/// Configures and constructs [`DwugSampler`] instances.
///
/// # Examples
/// ```
/// use wugsim_core::{Count, DwugSamplerBuilder};
///
/// let sampler = DwugSamplerBuilder::new()
///     .with_nodes_to_add(Count::Fraction(0.1))
///     .with_edges_to_draw(Count::Fraction(0.1))
///     .with_min_multi_cluster_size(2)
///     .with_seed(7)
///     .build()
///     .expect("configuration is valid");
/// ```
#[derive(Clone, Debug)]
pub struct DwugSamplerBuilder {
    nodes_to_add: Count,
    edges_to_draw: Count,
    min_multi_cluster_size: usize,
    random_fallback: usize,
    seed: u64,
}

impl Default for DwugSamplerBuilder {
    fn default() -> Self {
        Self {
            nodes_to_add: Count::Fraction(0.1),
            edges_to_draw: Count::Fraction(0.1),
            min_multi_cluster_size: 2,
            random_fallback: 0,
            seed: 0,
        }
    }
}

impl DwugSamplerBuilder {
    /// Creates a builder populated with the conventional DWUG quotas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the per-round node quota.
    #[must_use]
    pub fn with_nodes_to_add(mut self, nodes_to_add: Count) -> Self {
        self.nodes_to_add = nodes_to_add;
        self
    }

    /// Overrides the per-round exploration edge budget.
    #[must_use]
    pub fn with_edges_to_draw(mut self, edges_to_draw: Count) -> Self {
        self.edges_to_draw = edges_to_draw;
        self
    }

    /// Overrides the minimum size for a cluster to count as a stable sense.
    #[must_use]
    pub fn with_min_multi_cluster_size(mut self, size: usize) -> Self {
        self.min_multi_cluster_size = size;
        self
    }

    /// Emits this many random edges when a round would otherwise be empty;
    /// zero disables the fallback.
    #[must_use]
    pub fn with_random_fallback(mut self, random_fallback: usize) -> Self {
        self.random_fallback = random_fallback;
        self
    }

    /// Seeds the sampler's private random stream.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration and constructs a [`DwugSampler`].
    ///
    /// # Errors
    /// Returns [`WugError::FractionOutOfRange`] for quotas outside `[0, 1]`
    /// and [`WugError::MultiClusterSizeTooSmall`] when the stable-sense
    /// threshold would admit singletons.
    pub fn build(self) -> Result<DwugSampler> {
        self.nodes_to_add.validate("nodes_to_add")?;
        self.edges_to_draw.validate("edges_to_draw")?;
        if self.min_multi_cluster_size < 2 {
            return Err(WugError::MultiClusterSizeTooSmall {
                got: self.min_multi_cluster_size,
            });
        }
        Ok(DwugSampler {
            nodes_to_add: self.nodes_to_add,
            edges_to_draw: self.edges_to_draw,
            min_multi_cluster_size: self.min_multi_cluster_size,
            random_fallback: self.random_fallback,
            rng: SmallRng::seed_from_u64(self.seed),
        })
    }
}

/// The DWUG adaptive sampling strategy.
#[derive(Clone, Debug)]
pub struct DwugSampler {
    nodes_to_add: Count,
    edges_to_draw: Count,
    min_multi_cluster_size: usize,
    random_fallback: usize,
    rng: SmallRng,
}

impl DwugSampler {
    /// Whether any judgement connects `node` to a member of `cluster`.
    fn connected_to(annotated: &AnnotatedGraph, node: usize, cluster: &[usize]) -> bool {
        cluster
            .iter()
            .any(|&member| member != node && annotated.is_registered(node, member))
    }

    /// Self-avoiding-step random walk over `nodes` until the budget is met.
    ///
    /// Each step moves to a uniformly random node other than the current one.
    /// A fractional budget overshoots to its ceiling.
    fn exploration_walk(&mut self, nodes: &[usize], budget: f64) -> Vec<(usize, usize)> {
        if nodes.len() <= 1 {
            return Vec::new();
        }
        let Some(&start) = nodes.choose(&mut self.rng) else {
            return Vec::new();
        };

        let mut walk = Vec::new();
        let mut current = start;
        while (walk.len() as f64) < budget {
            let next = loop {
                let candidate = nodes[self.rng.gen_range(0..nodes.len())];
                if candidate != current {
                    break candidate;
                }
            };
            walk.push((current, next));
            current = next;
        }
        walk
    }

    /// First round: explore a fresh random subset of the universe.
    fn initial_round(&mut self, truth: &WeightedGraph) -> Vec<(usize, usize)> {
        let pool: Vec<usize> = truth.nodes().collect();
        let quota = self.nodes_to_add.resolve_nodes(pool.len()).min(pool.len());
        let chosen: Vec<usize> = pool
            .choose_multiple(&mut self.rng, quota)
            .copied()
            .collect();
        let pairs = complete_edge_count(chosen.len());
        let budget = self
            .edges_to_draw
            .resolve_budget(pairs)
            .min(pairs as f64);
        self.exploration_walk(&chosen, budget)
    }

    /// Later rounds: combination over undecided nodes, exploration over the
    /// rest.
    fn adaptive_round(
        &mut self,
        truth: &WeightedGraph,
        annotated: &AnnotatedGraph,
    ) -> Vec<(usize, usize)> {
        let communities = annotated.community_nodes();
        let multi_clusters: Vec<&Vec<usize>> = communities
            .values()
            .filter(|nodes| nodes.len() >= self.min_multi_cluster_size)
            .collect();
        let undecided: Vec<usize> = communities
            .values()
            .filter(|nodes| nodes.len() < self.min_multi_cluster_size)
            .flatten()
            .copied()
            .collect();

        let mut combination_nodes = Vec::new();
        let mut exploration_nodes = Vec::new();
        for node in undecided {
            let unseen_sense = multi_clusters
                .iter()
                .any(|cluster| !Self::connected_to(annotated, node, cluster));
            if unseen_sense {
                combination_nodes.push(node);
            } else {
                exploration_nodes.push(node);
            }
        }

        let seen: BTreeSet<usize> = annotated.graph().nodes().collect();
        let unseen: Vec<usize> = truth.nodes().filter(|n| !seen.contains(n)).collect();
        let quota = self
            .nodes_to_add
            .resolve_nodes(truth.number_of_nodes())
            .min(unseen.len());
        combination_nodes.extend(unseen.choose_multiple(&mut self.rng, quota).copied());

        let mut batch = Vec::new();
        for &node in &combination_nodes {
            for cluster in &multi_clusters {
                if !Self::connected_to(annotated, node, cluster) {
                    if let Some(&bridge) = cluster.choose(&mut self.rng) {
                        batch.push((node, bridge));
                    }
                }
            }
        }

        let budget = self
            .edges_to_draw
            .resolve_budget(complete_edge_count(exploration_nodes.len()));
        batch.extend(self.exploration_walk(&exploration_nodes, budget));

        debug!(
            combination = combination_nodes.len(),
            exploration = exploration_nodes.len(),
            batch = batch.len(),
            "adaptive round"
        );
        batch
    }

    fn fallback_round(&mut self, truth: &WeightedGraph) -> Vec<(usize, usize)> {
        let nodes: Vec<usize> = truth.nodes().collect();
        if nodes.len() < 2 {
            return Vec::new();
        }
        (0..self.random_fallback)
            .filter_map(|_| random_pair(&nodes, &mut self.rng))
            .collect()
    }
}

impl Sampler for DwugSampler {
    #[instrument(
        name = "sampling.dwug",
        skip(self, truth, annotated),
        fields(judgements = annotated.judgement_count()),
    )]
    fn sample(&mut self, truth: &WeightedGraph, annotated: &AnnotatedGraph) -> Vec<(usize, usize)> {
        if annotated.graph().number_of_edges() == 0 {
            return self.initial_round(truth);
        }
        let batch = self.adaptive_round(truth, annotated);
        if batch.is_empty() && self.random_fallback > 0 {
            debug!(fallback = self.random_fallback, "round was empty, sampling at random");
            return self.fallback_round(truth);
        }
        batch
    }
}
