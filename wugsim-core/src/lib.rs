//! Simulation engine for Word Usage Graph (WUG) annotation studies.
//!
//! A WUG is an undirected weighted graph whose nodes are word usages and
//! whose edge weights are pairwise semantic-similarity judgements. This crate
//! simulates the annotation process that builds such graphs: a sampling
//! strategy proposes node pairs, simulated annotators judge them against a
//! known ground truth, the judgements accumulate into per-edge medians, a
//! clusterer recovers the sense inventory, and stopping criteria decide when
//! the graph is annotated well enough.
//!
//! The moving parts are deliberately pluggable — [`Sampler`], [`Clusterer`],
//! [`StoppingCriterion`], and [`Listener`] are the seams — while the
//! [`Simulation`] loop owns the orchestration. Every strategy is seeded
//! explicitly, so a run replays deterministically under the same
//! configuration; independent runs share nothing but the read-only ground
//! truth and can execute in parallel via [`run_batch`].

mod annotator;
mod clustering;
mod error;
mod graph;
mod io;
mod judgement;
pub mod metrics;
mod sampling;
mod simulation;
mod stopping;

pub use crate::{
    annotator::{Annotator, AnnotatorBuilder, ErrorDistribution, ErrorSign},
    clustering::{
        Clusterer, ConnectedComponentsClusterer, CorrelationClusterer,
        CorrelationClustererBuilder,
    },
    error::{Result, WugError, WugErrorCode},
    graph::{
        AnnotatedGraph, Clustering, UNCLUSTERED, WeightedGraph, canonical_pair,
        complete_edge_count,
    },
    io::{
        EdgeSnapshot, GraphLoader, GraphRecord, JsonGraphLoader, JsonLinesMetricSink,
        JsonLinesSnapshotSink, MemoryMetricSink, MetricRow, MetricSink, PersistenceError,
        Snapshot, SnapshotSink,
    },
    judgement::{Judgement, LIKERT_MIDPOINT},
    sampling::{Count, DwugSampler, DwugSamplerBuilder, PageRankSampler, RandomSampler, Sampler},
    simulation::{
        AnnotatorAssignment, Listener, MetricColumn, MetricListener, Outcome, Simulation,
        SimulationBuilder, SnapshotListener, run_batch,
    },
    stopping::{
        Bootstrap, BootstrapStatistic, ClusterConnectivity, Connections, Convergence, Dispersion,
        EdgeCount, EdgeFraction, JudgementBudget, Statistic, StoppingCriterion,
    },
};
