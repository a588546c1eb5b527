//! The annotation simulation loop.
//!
//! One simulation owns its strategies and both graphs for the duration of a
//! run: each round it samples candidate pairs, routes them through the
//! annotator pool, records the judgements, re-clusters when a clusterer is
//! configured, notifies listeners, and finally consults the stopping
//! criteria. Independent simulations share nothing but the read-only ground
//! truth, so parameter grids fan out embarrassingly parallel.

mod listener;

use rand::Rng;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::annotator::Annotator;
use crate::clustering::Clusterer;
use crate::error::{Result, WugError};
use crate::graph::{AnnotatedGraph, WeightedGraph};
use crate::sampling::Sampler;
use crate::stopping::StoppingCriterion;

pub use self::listener::{Listener, MetricColumn, MetricListener, SnapshotListener};

/// How a batch edge is routed through a multi-annotator pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnnotatorAssignment {
    /// Every annotator judges every edge.
    #[default]
    All,
    /// One annotator is drawn uniformly per edge.
    Random,
}

/// Result of a finished simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Rounds executed.
    pub rounds: usize,
    /// Judgement count when the run ended.
    pub judgements: u64,
    /// Whether the run ended by exhausting the round limit instead of a
    /// stopping criterion.
    pub hit_round_limit: bool,
}

/// Configures and constructs [`Simulation`] instances.
///
/// # Examples
/// ```
/// use wugsim_core::{
///     AnnotatorBuilder, JudgementBudget, RandomSampler, SimulationBuilder,
/// };
///
/// let simulation = SimulationBuilder::new()
///     .with_sampler(RandomSampler::new(10, 1)?)
///     .add_annotator(AnnotatorBuilder::new().with_seed(2).build()?)
///     .add_stopping_criterion(JudgementBudget::new(100))
///     .build()?;
/// # let _ = simulation;
/// # Ok::<(), wugsim_core::WugError>(())
/// ```
pub struct SimulationBuilder {
    max_rounds: usize,
    sampler: Option<Box<dyn Sampler>>,
    annotators: Vec<Annotator>,
    assignment: AnnotatorAssignment,
    clusterer: Option<Box<dyn Clusterer>>,
    stopping: Vec<Box<dyn StoppingCriterion>>,
    listeners: Vec<Box<dyn Listener>>,
    seed: u64,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self {
            max_rounds: 500,
            sampler: None,
            annotators: Vec::new(),
            assignment: AnnotatorAssignment::default(),
            clusterer: None,
            stopping: Vec::new(),
            listeners: Vec::new(),
            seed: 0,
        }
    }
}

impl SimulationBuilder {
    /// Creates a builder with the conventional round limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of rounds so a simulation always terminates.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Sets the sampling strategy.
    #[must_use]
    pub fn with_sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Some(Box::new(sampler));
        self
    }

    /// Adds an annotator to the pool.
    #[must_use]
    pub fn add_annotator(mut self, annotator: Annotator) -> Self {
        self.annotators.push(annotator);
        self
    }

    /// Sets how edges are routed through the annotator pool.
    #[must_use]
    pub fn with_annotator_assignment(mut self, assignment: AnnotatorAssignment) -> Self {
        self.assignment = assignment;
        self
    }

    /// Sets the clustering strategy; without one, labels stay untouched.
    #[must_use]
    pub fn with_clusterer(mut self, clusterer: impl Clusterer + 'static) -> Self {
        self.clusterer = Some(Box::new(clusterer));
        self
    }

    /// Adds a stopping criterion; any firing criterion ends the run.
    #[must_use]
    pub fn add_stopping_criterion(mut self, criterion: impl StoppingCriterion + 'static) -> Self {
        self.stopping.push(Box::new(criterion));
        self
    }

    /// Adds a checkpoint listener.
    #[must_use]
    pub fn add_listener(mut self, listener: impl Listener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Seeds the loop's private random stream (annotator assignment).
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration and constructs a [`Simulation`].
    ///
    /// # Errors
    /// Returns [`WugError::MissingSampler`] without a sampler,
    /// [`WugError::NoAnnotators`] with an empty pool, and
    /// [`WugError::ZeroCount`] for a zero round limit.
    pub fn build(self) -> Result<Simulation> {
        let sampler = self.sampler.ok_or(WugError::MissingSampler)?;
        if self.annotators.is_empty() {
            return Err(WugError::NoAnnotators);
        }
        if self.max_rounds == 0 {
            return Err(WugError::ZeroCount { name: "max_rounds" });
        }
        Ok(Simulation {
            max_rounds: self.max_rounds,
            sampler,
            annotators: self.annotators,
            assignment: self.assignment,
            clusterer: self.clusterer,
            stopping: self.stopping,
            listeners: self.listeners,
            rng: SmallRng::seed_from_u64(self.seed),
        })
    }
}

/// One configured annotation experiment.
pub struct Simulation {
    max_rounds: usize,
    sampler: Box<dyn Sampler>,
    annotators: Vec<Annotator>,
    assignment: AnnotatorAssignment,
    clusterer: Option<Box<dyn Clusterer>>,
    stopping: Vec<Box<dyn StoppingCriterion>>,
    listeners: Vec<Box<dyn Listener>>,
    rng: SmallRng,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("max_rounds", &self.max_rounds)
            .field("annotators", &self.annotators)
            .field("assignment", &self.assignment)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Runs the loop until a stopping criterion fires or the round limit is
    /// exhausted.
    ///
    /// The ground truth is read-only; the annotated graph accumulates
    /// judgements and labels across the run and can be handed back in to
    /// continue a simulation.
    ///
    /// # Errors
    /// Surfaces [`WugError::ClusterSplitMismatch`] and the judgement
    /// recording errors; recoverable sampling conditions never error.
    #[instrument(
        name = "simulation.run",
        err,
        skip_all,
        fields(nodes = truth.number_of_nodes(), max_rounds = self.max_rounds),
    )]
    pub fn run(
        &mut self,
        truth: &WeightedGraph,
        annotated: &mut AnnotatedGraph,
    ) -> Result<Outcome> {
        for round in 0..self.max_rounds {
            let batch = self.sampler.sample(truth, annotated);
            for &(u, v) in &batch {
                let true_weight = truth.get_edge(u, v);
                match self.assignment {
                    AnnotatorAssignment::All => {
                        for annotator in &mut self.annotators {
                            annotated.record_judgement(u, v, annotator.judge(true_weight))?;
                        }
                    }
                    AnnotatorAssignment::Random => {
                        let pick = self.rng.gen_range(0..self.annotators.len());
                        let judgement = self.annotators[pick].judge(true_weight);
                        annotated.record_judgement(u, v, judgement)?;
                    }
                }
            }

            if let Some(clusterer) = self.clusterer.as_mut() {
                let view = annotated.soft_weight_view();
                let clusters = clusterer.cluster(&view)?;
                annotated.update_cluster_labels(clusters)?;
            }

            for listener in &mut self.listeners {
                listener.on_tick(annotated);
            }

            debug!(
                round,
                sampled = batch.len(),
                judgements = annotated.judgement_count(),
                clusters = annotated.number_of_clusters(),
                "round finished"
            );

            if self.stopping.iter_mut().any(|c| c.should_stop(annotated)) {
                info!(
                    rounds = round + 1,
                    judgements = annotated.judgement_count(),
                    "stopping criterion met"
                );
                return Ok(Outcome {
                    rounds: round + 1,
                    judgements: annotated.judgement_count(),
                    hit_round_limit: false,
                });
            }
        }

        info!(
            rounds = self.max_rounds,
            judgements = annotated.judgement_count(),
            "round limit exhausted"
        );
        Ok(Outcome {
            rounds: self.max_rounds,
            judgements: annotated.judgement_count(),
            hit_round_limit: true,
        })
    }
}

/// Runs independent simulations in parallel against a shared ground truth.
///
/// Each entry pairs a configured simulation with its own annotated graph;
/// nothing is shared between entries, so the runs are embarrassingly
/// parallel. Results come back in input order.
pub fn run_batch(
    truth: &WeightedGraph,
    runs: Vec<(Simulation, AnnotatedGraph)>,
) -> Vec<Result<(AnnotatedGraph, Outcome)>> {
    runs.into_par_iter()
        .map(|(mut simulation, mut annotated)| {
            let outcome = simulation.run(truth, &mut annotated)?;
            Ok((annotated, outcome))
        })
        .collect()
}
