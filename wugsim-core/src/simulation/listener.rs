//! Checkpoint listeners observing simulation state.
//!
//! Listeners run after every round; each keeps its own list of
//! judgement-count checkpoints and acts when the progress clock crosses one.
//! Sink failures are logged and skipped rather than aborting the simulation,
//! so a full disk never wastes an annotation run.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::warn;

use crate::error::{Result, WugError};
use crate::graph::AnnotatedGraph;
use crate::io::{MetricRow, MetricSink, Snapshot, SnapshotSink};
use crate::metrics::{
    adjusted_rand_index, bootstrap_ari, bootstrap_jsd, cluster_size_distribution,
    jensen_shannon_divergence,
};

/// Observes the annotated graph once per simulation round.
pub trait Listener: Send {
    /// Called after sampling, annotation, and clustering each round.
    fn on_tick(&mut self, annotated: &AnnotatedGraph);
}

/// Sorted judgement-count checkpoints with a fire-once cursor.
#[derive(Clone, Debug)]
struct Checkpoints {
    at: Vec<u64>,
    next: usize,
}

impl Checkpoints {
    fn new(mut at: Vec<u64>) -> Self {
        at.sort_unstable();
        at.dedup();
        Self { at, next: 0 }
    }

    /// Consumes every checkpoint the clock has crossed; returns whether at
    /// least one fired.
    fn due(&mut self, clock: u64) -> bool {
        let mut fired = false;
        while self.at.get(self.next).is_some_and(|&checkpoint| clock >= checkpoint) {
            self.next += 1;
            fired = true;
        }
        fired
    }
}

/// One column of the metric table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricColumn {
    /// Number of clusters in the current partition.
    ClusterNumber,
    /// Adjusted Rand Index against the reference labels.
    AdjustedRandIndex,
    /// Jensen–Shannon divergence against the reference cluster sizes.
    JensenShannonDivergence,
    /// Mean bootstrap JSD over resampled cluster distributions.
    BootstrapJsd {
        /// Number of resampling rounds averaged per checkpoint.
        rounds: usize,
        /// Nodes drawn with replacement per round.
        sample_size: usize,
    },
    /// Adjusted Rand Index over a bootstrap resample of shared labels.
    BootstrapAri {
        /// Label positions drawn with replacement.
        sample_size: usize,
    },
}

impl MetricColumn {
    fn name(self) -> &'static str {
        match self {
            Self::ClusterNumber => "cluster_number",
            Self::AdjustedRandIndex => "ari",
            Self::JensenShannonDivergence => "jsd",
            Self::BootstrapJsd { .. } => "bootstrap_jsd",
            Self::BootstrapAri { .. } => "bootstrap_ari",
        }
    }
}

/// Computes comparison metrics at checkpoints and appends them to a sink.
pub struct MetricListener {
    checkpoints: Checkpoints,
    columns: Vec<MetricColumn>,
    reference_labels: Vec<i64>,
    reference_distribution: Vec<f64>,
    sink: Box<dyn MetricSink>,
    rng: SmallRng,
}

impl MetricListener {
    /// Creates a metric listener.
    ///
    /// `reference_labels` is the ground-truth label per node and
    /// `reference_sizes` the ground-truth cluster sizes; both stay fixed for
    /// the lifetime of the listener.
    ///
    /// # Errors
    /// Returns [`WugError::ZeroCount`] when no columns are configured.
    pub fn new(
        checkpoints: Vec<u64>,
        columns: Vec<MetricColumn>,
        reference_labels: Vec<i64>,
        reference_sizes: &[usize],
        sink: Box<dyn MetricSink>,
        seed: u64,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(WugError::ZeroCount { name: "columns" });
        }
        let reference_distribution =
            cluster_size_distribution(reference_sizes, reference_labels.len());
        Ok(Self {
            checkpoints: Checkpoints::new(checkpoints),
            columns,
            reference_labels,
            reference_distribution,
            sink,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    fn evaluate(&mut self, column: MetricColumn, annotated: &AnnotatedGraph) -> f64 {
        match column {
            MetricColumn::ClusterNumber => annotated.number_of_clusters() as f64,
            MetricColumn::AdjustedRandIndex => {
                adjusted_rand_index(&self.reference_labels, annotated.labels())
            }
            MetricColumn::JensenShannonDivergence => {
                let current = cluster_size_distribution(
                    &annotated.community_sizes(),
                    annotated.graph().number_of_nodes(),
                );
                jensen_shannon_divergence(&self.reference_distribution, &current)
            }
            MetricColumn::BootstrapJsd {
                rounds,
                sample_size,
            } => {
                let total: f64 = (0..rounds)
                    .map(|_| {
                        bootstrap_jsd(
                            &self.reference_distribution,
                            annotated,
                            sample_size,
                            &mut self.rng,
                        )
                    })
                    .sum();
                if rounds == 0 { 0.0 } else { total / rounds as f64 }
            }
            MetricColumn::BootstrapAri { sample_size } => bootstrap_ari(
                &self.reference_labels,
                annotated.labels(),
                sample_size,
                &mut self.rng,
            ),
        }
    }
}

impl Listener for MetricListener {
    fn on_tick(&mut self, annotated: &AnnotatedGraph) {
        if !self.checkpoints.due(annotated.judgement_count()) {
            return;
        }

        let mut row = MetricRow {
            judgement_count: annotated.judgement_count(),
            values: std::collections::BTreeMap::new(),
        };
        for column in self.columns.clone() {
            row.values
                .insert(column.name().to_owned(), self.evaluate(column, annotated));
        }
        if let Err(error) = self.sink.write_row(&row) {
            warn!(%error, "failed to write metric row, continuing");
        }
    }
}

/// Serializes the annotated graph at checkpoints.
pub struct SnapshotListener {
    checkpoints: Checkpoints,
    sink: Box<dyn SnapshotSink>,
}

impl SnapshotListener {
    /// Creates a snapshot listener over the given checkpoints.
    #[must_use]
    pub fn new(checkpoints: Vec<u64>, sink: Box<dyn SnapshotSink>) -> Self {
        Self {
            checkpoints: Checkpoints::new(checkpoints),
            sink,
        }
    }
}

impl Listener for SnapshotListener {
    fn on_tick(&mut self, annotated: &AnnotatedGraph) {
        if !self.checkpoints.due(annotated.judgement_count()) {
            return;
        }
        let snapshot = Snapshot::capture(annotated);
        if let Err(error) = self.sink.write_snapshot(&snapshot) {
            warn!(%error, "failed to write snapshot, continuing");
        }
    }
}
