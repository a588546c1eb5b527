//! Stopping criteria for annotation simulations.
//!
//! Each criterion is a predicate over the annotated graph plus its own
//! configuration. Window-keeping criteria carry their history as instance
//! state: a criterion belongs to exactly one simulation, and parallel
//! simulations construct fresh instances. `reset` clears accumulated history
//! so an instance can be reused for a follow-up run.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::error::{Result, WugError};
use crate::graph::{AnnotatedGraph, WeightedGraph};
use crate::metrics::{
    adjusted_rand_index, average_pointwise_distance, cluster_size_distribution,
    entropy_approximation, jensen_shannon_divergence, mse_about_mean, percentile,
    rmse_about_mean,
};

/// A predicate deciding when a simulation has annotated enough.
pub trait StoppingCriterion: Send {
    /// Returns whether the simulation should stop after this round.
    fn should_stop(&mut self, annotated: &AnnotatedGraph) -> bool;

    /// Clears any accumulated history; stateless criteria are no-ops.
    fn reset(&mut self) {}
}

/// Stops once the judgement count reaches a budget.
#[derive(Clone, Copy, Debug)]
pub struct JudgementBudget {
    max_judgements: u64,
}

impl JudgementBudget {
    /// Creates a budget over the total number of judgement appends.
    #[must_use]
    pub fn new(max_judgements: u64) -> Self {
        Self { max_judgements }
    }
}

impl StoppingCriterion for JudgementBudget {
    fn should_stop(&mut self, annotated: &AnnotatedGraph) -> bool {
        annotated.judgement_count() >= self.max_judgements
    }
}

/// Stops once the annotated graph materializes a number of edges.
#[derive(Clone, Copy, Debug)]
pub struct EdgeCount {
    min_edges: usize,
}

impl EdgeCount {
    /// Creates a coverage criterion over materialized edges.
    #[must_use]
    pub fn new(min_edges: usize) -> Self {
        Self { min_edges }
    }
}

impl StoppingCriterion for EdgeCount {
    fn should_stop(&mut self, annotated: &AnnotatedGraph) -> bool {
        annotated.graph().number_of_edges() >= self.min_edges
    }
}

/// Stops once a fraction of a known edge total is materialized.
#[derive(Clone, Copy, Debug)]
pub struct EdgeFraction {
    fraction: f64,
    total_edges: usize,
}

impl EdgeFraction {
    /// Creates a coverage criterion relative to `total_edges`.
    ///
    /// # Errors
    /// Returns [`WugError::FractionOutOfRange`] when `fraction` leaves
    /// `[0, 1]`.
    pub fn new(fraction: f64, total_edges: usize) -> Result<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(WugError::FractionOutOfRange {
                name: "fraction",
                got: fraction,
            });
        }
        Ok(Self {
            fraction,
            total_edges,
        })
    }
}

impl StoppingCriterion for EdgeFraction {
    fn should_stop(&mut self, annotated: &AnnotatedGraph) -> bool {
        annotated.graph().number_of_edges() as f64 >= self.fraction * self.total_edges as f64
    }
}

/// How strongly two stable clusters must be tied together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connections {
    /// At least this many materialized edges between the pair.
    AtLeast(usize),
    /// Every cross pair must carry a materialized edge.
    Fully,
}

/// Stops once every pair of stable clusters is sufficiently connected.
///
/// Clusters below `min_cluster_size` are ignored. With no stable cluster the
/// criterion never fires; with exactly one, it fires once that cluster
/// reaches `single_cluster_size`.
#[derive(Clone, Copy, Debug)]
pub struct ClusterConnectivity {
    min_cluster_size: usize,
    connections: Connections,
    single_cluster_size: usize,
}

impl ClusterConnectivity {
    /// Creates the connectivity criterion.
    ///
    /// # Errors
    /// Returns [`WugError::MultiClusterSizeTooSmall`] when
    /// `min_cluster_size < 2`.
    pub fn new(
        min_cluster_size: usize,
        connections: Connections,
        single_cluster_size: usize,
    ) -> Result<Self> {
        if min_cluster_size < 2 {
            return Err(WugError::MultiClusterSizeTooSmall {
                got: min_cluster_size,
            });
        }
        Ok(Self {
            min_cluster_size,
            connections,
            single_cluster_size,
        })
    }

    fn pair_connected(
        &self,
        annotated: &AnnotatedGraph,
        left: &[usize],
        right: &[usize],
    ) -> bool {
        let required = match self.connections {
            Connections::AtLeast(count) => count,
            Connections::Fully => left.len() * right.len(),
        };
        if required == 0 {
            return true;
        }
        let mut found = 0usize;
        for &u in left {
            for &v in right {
                if annotated.get_edge(u, v).is_some() {
                    found += 1;
                    if found >= required {
                        return true;
                    }
                }
            }
        }
        false
    }
}

impl StoppingCriterion for ClusterConnectivity {
    fn should_stop(&mut self, annotated: &AnnotatedGraph) -> bool {
        let stable: Vec<&Vec<usize>> = annotated
            .community_nodes()
            .values()
            .filter(|nodes| nodes.len() >= self.min_cluster_size)
            .collect();

        match stable.as_slice() {
            [] => false,
            [only] => only.len() >= self.single_cluster_size,
            clusters => {
                for (i, left) in clusters.iter().enumerate() {
                    for right in clusters.iter().skip(i + 1) {
                        if !self.pair_connected(annotated, left, right) {
                            return false;
                        }
                    }
                }
                true
            }
        }
    }
}

/// Statistic tracked by a [`Convergence`] criterion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Statistic {
    /// Average pointwise distance over sampled pairs.
    Apd {
        /// Number of node pairs sampled per evaluation.
        sample_size: usize,
    },
    /// Entropy approximation over the materialized graph.
    EntropyApproximation {
        /// Minimum weight for an edge to count as same-sense evidence.
        threshold: f64,
    },
    /// Number of clusters in the current partition.
    ClusterCount,
    /// Adjusted Rand Index against the previous round's partition.
    AriToPrevious,
    /// Jensen–Shannon divergence against the previous round's cluster sizes.
    JsdToPrevious,
}

/// Dispersion measure applied to the sliding window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispersion {
    /// Mean squared error about the window mean.
    Mse,
    /// Root mean squared error about the window mean.
    Rmse,
}

/// Stops once a tracked statistic settles.
///
/// Keeps a sliding window of the statistic's recent values and fires when
/// the window is full and its dispersion about the window mean falls below
/// the threshold. History is instance-owned; never share one instance
/// between simulations.
#[derive(Clone, Debug)]
pub struct Convergence {
    statistic: Statistic,
    window_len: usize,
    threshold: f64,
    dispersion: Dispersion,
    window: VecDeque<f64>,
    previous_labels: Option<Vec<i64>>,
    previous_distribution: Option<Vec<f64>>,
    rng: SmallRng,
}

impl Convergence {
    /// Creates a convergence criterion over `statistic`.
    ///
    /// # Errors
    /// Returns [`WugError::WindowTooSmall`] for windows shorter than two
    /// observations and [`WugError::ZeroCount`] for a zero APD sample size.
    pub fn new(
        statistic: Statistic,
        window_len: usize,
        threshold: f64,
        dispersion: Dispersion,
        seed: u64,
    ) -> Result<Self> {
        if window_len < 2 {
            return Err(WugError::WindowTooSmall { got: window_len });
        }
        if let Statistic::Apd { sample_size: 0 } = statistic {
            return Err(WugError::ZeroCount {
                name: "sample_size",
            });
        }
        Ok(Self {
            statistic,
            window_len,
            threshold,
            dispersion,
            window: VecDeque::new(),
            previous_labels: None,
            previous_distribution: None,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    fn observe(&mut self, annotated: &AnnotatedGraph) -> f64 {
        match self.statistic {
            Statistic::Apd { sample_size } => {
                average_pointwise_distance(annotated.graph(), sample_size, &mut self.rng)
            }
            Statistic::EntropyApproximation { threshold } => {
                entropy_approximation(annotated.graph(), threshold)
            }
            Statistic::ClusterCount => annotated.number_of_clusters() as f64,
            Statistic::AriToPrevious => {
                let current = annotated.labels().to_vec();
                let value = match &self.previous_labels {
                    Some(previous) => adjusted_rand_index(previous, &current),
                    None => 1.0,
                };
                self.previous_labels = Some(current);
                value
            }
            Statistic::JsdToPrevious => {
                let current = cluster_size_distribution(
                    &annotated.community_sizes(),
                    annotated.graph().number_of_nodes(),
                );
                let value = match &self.previous_distribution {
                    Some(previous) => jensen_shannon_divergence(previous, &current),
                    None => 0.0,
                };
                self.previous_distribution = Some(current);
                value
            }
        }
    }
}

impl StoppingCriterion for Convergence {
    fn should_stop(&mut self, annotated: &AnnotatedGraph) -> bool {
        let value = self.observe(annotated);
        self.window.push_back(value);
        if self.window.len() > self.window_len {
            self.window.pop_front();
        }
        if self.window.len() < self.window_len {
            return false;
        }

        let series: Vec<f64> = self.window.iter().copied().collect();
        let dispersion = match self.dispersion {
            Dispersion::Mse => mse_about_mean(&series),
            Dispersion::Rmse => rmse_about_mean(&series),
        };
        dispersion < self.threshold
    }

    fn reset(&mut self) {
        self.window.clear();
        self.previous_labels = None;
        self.previous_distribution = None;
    }
}

/// Statistic evaluated on bootstrap-resampled subgraphs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BootstrapStatistic {
    /// Average pointwise distance, with its own pair budget.
    Apd {
        /// Number of node pairs sampled per evaluation.
        pairs: usize,
    },
    /// Entropy approximation over the resampled subgraph.
    EntropyApproximation {
        /// Minimum weight for an edge to count as same-sense evidence.
        threshold: f64,
    },
}

/// Stops once a resampled statistic's percentile interval clears a target
/// bound.
///
/// Each evaluation draws `rounds` subgraphs of `sample_size` randomly chosen
/// materialized edges, computes the statistic on each, and compares the
/// central `alpha` percentile interval against the configured bound. Both
/// interval endpoints are compared in the same direction, exactly as the
/// procedure has historically been run.
#[derive(Clone, Debug)]
pub struct Bootstrap {
    statistic: BootstrapStatistic,
    rounds: usize,
    sample_size: usize,
    alpha: f64,
    bound: (f64, f64),
    rng: SmallRng,
}

impl Bootstrap {
    /// Creates the bootstrap criterion.
    ///
    /// # Errors
    /// Returns [`WugError::ZeroCount`] for zero rounds or sample size and
    /// [`WugError::ProbabilityOutOfRange`] when `alpha` leaves `[0, 1]`.
    pub fn new(
        statistic: BootstrapStatistic,
        rounds: usize,
        sample_size: usize,
        alpha: f64,
        bound: (f64, f64),
        seed: u64,
    ) -> Result<Self> {
        if rounds == 0 {
            return Err(WugError::ZeroCount { name: "rounds" });
        }
        if sample_size == 0 {
            return Err(WugError::ZeroCount {
                name: "sample_size",
            });
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(WugError::ProbabilityOutOfRange {
                name: "alpha",
                got: alpha,
            });
        }
        Ok(Self {
            statistic,
            rounds,
            sample_size,
            alpha,
            bound,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    fn resample(&mut self, annotated: &AnnotatedGraph) -> WeightedGraph {
        let nodes: Vec<usize> = annotated.graph().nodes().collect();
        let mut resampled = WeightedGraph::new();
        if nodes.len() < 2 {
            return resampled;
        }
        for _ in 0..self.sample_size {
            let mut picked = nodes.choose_multiple(&mut self.rng, 2).copied();
            if let (Some(u), Some(v)) = (picked.next(), picked.next()) {
                if let Some(weight) = annotated.get_edge(u, v) {
                    // Endpoints are distinct, so this cannot fail.
                    let _ = resampled.add_edge(u, v, weight);
                }
            }
        }
        resampled
    }

    fn evaluate(&mut self, graph: &WeightedGraph) -> f64 {
        match self.statistic {
            BootstrapStatistic::Apd { pairs } => {
                average_pointwise_distance(graph, pairs, &mut self.rng)
            }
            BootstrapStatistic::EntropyApproximation { threshold } => {
                entropy_approximation(graph, threshold)
            }
        }
    }
}

impl StoppingCriterion for Bootstrap {
    fn should_stop(&mut self, annotated: &AnnotatedGraph) -> bool {
        let mut stats = Vec::with_capacity(self.rounds);
        for _ in 0..self.rounds {
            let resampled = self.resample(annotated);
            stats.push(self.evaluate(&resampled));
        }
        stats.sort_by(f64::total_cmp);

        let half_tail = (1.0 - self.alpha) / 2.0;
        let lower = percentile(&stats, half_tail * 100.0);
        let upper = percentile(&stats, (self.alpha + half_tail) * 100.0);
        self.bound.0 <= lower && self.bound.1 <= upper
    }
}
