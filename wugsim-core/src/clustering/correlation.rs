//! Correlation clustering via simulated annealing.
//!
//! Frames sense induction as signed-edge conflict minimization: an assignment
//! pays for every positive edge it cuts and every negative edge it keeps
//! inside a cluster. The search seeds from connected components over positive
//! edges, then anneals over a range of cluster-count ceilings, keeping the
//! lowest-loss assignment found anywhere (the seed included).

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use crate::error::{Result, WugError};
use crate::graph::{Clustering, WeightedGraph};

use super::annealing::anneal;
use super::{Clusterer, finalize_clusters};

/// Configures and constructs [`CorrelationClusterer`] instances.
///
/// # Examples
/// ```
/// use wugsim_core::CorrelationClustererBuilder;
///
/// let clusterer = CorrelationClustererBuilder::new()
///     .with_max_senses(10)
///     .with_max_attempts(200)
///     .with_max_iters(5000)
///     .with_seed(42)
///     .build()
///     .expect("configuration is valid");
/// ```
#[derive(Clone, Debug)]
pub struct CorrelationClustererBuilder {
    max_senses: usize,
    max_attempts: usize,
    max_iters: usize,
    initial: Option<Vec<Vec<usize>>>,
    split_non_evidence: bool,
    seed: u64,
}

impl Default for CorrelationClustererBuilder {
    fn default() -> Self {
        Self {
            max_senses: 10,
            max_attempts: 200,
            max_iters: 5000,
            initial: None,
            split_non_evidence: true,
            seed: 0,
        }
    }
}

impl CorrelationClustererBuilder {
    /// Creates a builder populated with the conventional search parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the maximum number of senses to try; ceilings `2..max_senses`
    /// are searched.
    #[must_use]
    pub fn with_max_senses(mut self, max_senses: usize) -> Self {
        self.max_senses = max_senses;
        self
    }

    /// Overrides the non-improving-step budget per annealing run.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Overrides the total step budget per annealing run.
    #[must_use]
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Seeds the search from a caller-supplied partition instead of positive
    /// connected components.
    #[must_use]
    pub fn with_initial(mut self, initial: Vec<Vec<usize>>) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Toggles splitting clusters that are not positively connected.
    #[must_use]
    pub fn with_split_non_evidence(mut self, split: bool) -> Self {
        self.split_non_evidence = split;
        self
    }

    /// Seeds the clusterer's private random stream.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration and constructs a [`CorrelationClusterer`].
    ///
    /// # Errors
    /// Returns [`WugError::SenseLimitTooSmall`] when `max_senses < 2` and
    /// [`WugError::ZeroCount`] when a step budget is zero.
    pub fn build(self) -> Result<CorrelationClusterer> {
        if self.max_senses < 2 {
            return Err(WugError::SenseLimitTooSmall {
                got: self.max_senses,
            });
        }
        if self.max_attempts == 0 {
            return Err(WugError::ZeroCount {
                name: "max_attempts",
            });
        }
        if self.max_iters == 0 {
            return Err(WugError::ZeroCount { name: "max_iters" });
        }
        Ok(CorrelationClusterer {
            max_senses: self.max_senses,
            max_attempts: self.max_attempts,
            max_iters: self.max_iters,
            initial: self.initial,
            split_non_evidence: self.split_non_evidence,
            seed: self.seed,
        })
    }
}

/// Signed-edge conflict minimizer.
///
/// The random stream is reseeded from the configured seed on every
/// [`Clusterer::cluster`] call, so clustering an unchanged graph twice yields
/// the same partition.
#[derive(Clone, Debug)]
pub struct CorrelationClusterer {
    max_senses: usize,
    max_attempts: usize,
    max_iters: usize,
    initial: Option<Vec<Vec<usize>>>,
    split_non_evidence: bool,
    seed: u64,
}

impl CorrelationClusterer {
    /// Conflict loss of an assignment: cut positive weight plus kept negative
    /// magnitude.
    fn conflict_loss(
        state: &[usize],
        positive: &[(usize, usize, f64)],
        negative: &[(usize, usize, f64)],
    ) -> f64 {
        let cut: f64 = positive
            .iter()
            .filter(|&&(i, j, _)| state[i] != state[j])
            .map(|&(_, _, w)| w)
            .sum();
        let kept: f64 = negative
            .iter()
            .filter(|&&(i, j, _)| state[i] == state[j])
            .map(|&(_, _, w)| w.abs())
            .sum();
        cut + kept
    }

    /// Groups nodes by their assignment value; empty ids vanish here.
    fn clusters_from_state(state: &[usize], nodes: &[usize]) -> Vec<Vec<usize>> {
        let mut by_assignment: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &cluster) in state.iter().enumerate() {
            by_assignment.entry(cluster).or_default().push(nodes[i]);
        }
        by_assignment.into_values().collect()
    }

    fn split_clusters(
        graph: &WeightedGraph,
        clusters: Vec<Vec<usize>>,
    ) -> Result<Vec<Vec<usize>>> {
        let before: BTreeSet<usize> = clusters.iter().flatten().copied().collect();
        let expected: usize = clusters.iter().map(Vec::len).sum();

        let mut out = Vec::new();
        for cluster in &clusters {
            let members: BTreeSet<usize> = cluster.iter().copied().collect();
            let induced = graph.subgraph(&members);
            out.extend(induced.positive_components());
        }

        let after: BTreeSet<usize> = out.iter().flatten().copied().collect();
        let got: usize = out.iter().map(Vec::len).sum();
        if before != after || expected != got {
            return Err(WugError::ClusterSplitMismatch { expected, got });
        }
        Ok(out)
    }
}

impl Clusterer for CorrelationClusterer {
    #[instrument(
        name = "clustering.correlation",
        err,
        skip(self, graph),
        fields(nodes = graph.number_of_nodes(), edges = graph.number_of_edges()),
    )]
    fn cluster(&mut self, graph: &WeightedGraph) -> Result<Clustering> {
        let nodes: Vec<usize> = graph.nodes().collect();
        if nodes.is_empty() {
            let mut empty = Clustering::new();
            empty.insert(0, Vec::new());
            return Ok(empty);
        }

        let index_of: BTreeMap<usize, usize> =
            nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        let seed_clusters = self
            .initial
            .clone()
            .unwrap_or_else(|| graph.positive_components());

        // Assignment vector over node indices; nodes the seed partition
        // misses become singleton clusters.
        let mut initial_state = vec![usize::MAX; nodes.len()];
        for (cluster, members) in seed_clusters.iter().enumerate() {
            for node in members {
                if let Some(&i) = index_of.get(node) {
                    initial_state[i] = cluster;
                }
            }
        }
        let mut next_fresh = seed_clusters.len();
        for slot in &mut initial_state {
            if *slot == usize::MAX {
                *slot = next_fresh;
                next_fresh += 1;
            }
        }

        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for (u, v, w) in graph.edges() {
            if !w.is_finite() {
                continue;
            }
            let (Some(&i), Some(&j)) = (index_of.get(&u), index_of.get(&v)) else {
                continue;
            };
            if w >= 0.0 {
                positive.push((i, j, w));
            } else {
                negative.push((i, j, w));
            }
        }
        let loss = |state: &[usize]| Self::conflict_loss(state, &positive, &negative);

        let initial_loss = loss(&initial_state);
        if initial_loss == 0.0 {
            debug!(loss = initial_loss, "seed partition is conflict-free");
            return Ok(finalize_clusters(Self::clusters_from_state(
                &initial_state,
                &nodes,
            )));
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let seed_cluster_count = next_fresh;
        let mut candidates: Vec<(Vec<usize>, f64)> = vec![(initial_state.clone(), initial_loss)];

        for ceiling in 2..self.max_senses {
            let seeded = anneal(
                &initial_state,
                ceiling.max(seed_cluster_count),
                &loss,
                self.max_attempts,
                self.max_iters,
                &mut rng,
            );
            candidates.push((seeded.state, seeded.loss));

            let random_state: Vec<usize> =
                (0..nodes.len()).map(|_| rng.gen_range(0..ceiling)).collect();
            let restarted = anneal(
                &random_state,
                ceiling,
                &loss,
                self.max_attempts,
                self.max_iters,
                &mut rng,
            );
            candidates.push((restarted.state, restarted.loss));
        }

        let best_loss = candidates
            .iter()
            .map(|(_, l)| *l)
            .fold(f64::INFINITY, f64::min);
        let winners: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, (_, l))| *l == best_loss)
            .map(|(i, _)| i)
            .collect();
        let chosen = winners[rng.gen_range(0..winners.len())];
        let (winning_state, _) = &candidates[chosen];
        debug!(
            loss = best_loss,
            candidates = candidates.len(),
            "picked minimum-conflict assignment"
        );

        let mut clusters = Self::clusters_from_state(winning_state, &nodes);

        if self.split_non_evidence {
            clusters = Self::split_clusters(graph, clusters)?;
        }

        Ok(finalize_clusters(clusters))
    }
}
