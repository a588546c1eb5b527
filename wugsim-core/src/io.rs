//! Loading ground truth and writing simulation artefacts.
//!
//! The on-disk formats are deliberately unremarkable: a ground-truth graph is
//! one JSON record of nodes and weighted edges, and snapshots and metric rows
//! go out as JSON lines. Consumers that need something else implement the
//! [`GraphLoader`], [`SnapshotSink`], or [`MetricSink`] traits themselves.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::WugError;
use crate::graph::{AnnotatedGraph, WeightedGraph};
use crate::judgement::Judgement;

/// Errors raised while reading or writing simulation artefacts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    /// The underlying file operation failed.
    #[error("file operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    /// The payload could not be (de)serialized.
    #[error("serialization failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    /// The loaded record described an invalid graph.
    #[error("loaded graph is invalid: {source}")]
    InvalidGraph {
        #[from]
        source: WugError,
    },
}

/// Serialized form of a ground-truth graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphRecord {
    /// Size of the node universe `[0, nodes)`.
    pub nodes: usize,
    /// Weighted edges as `(u, v, weight)` triples.
    pub edges: Vec<(usize, usize, f64)>,
}

/// Loads a ground-truth graph from an opaque location.
pub trait GraphLoader {
    /// Loads the graph stored at `path`.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] when the location cannot be read or does
    /// not hold a valid graph.
    fn load(&self, path: &Path) -> Result<WeightedGraph, PersistenceError>;
}

/// Reads [`GraphRecord`] JSON files.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use wugsim_core::{GraphLoader, JsonGraphLoader};
///
/// let truth = JsonGraphLoader.load(Path::new("graphs/n100_k3.json"))?;
/// assert!(truth.number_of_nodes() > 0);
/// # Ok::<(), wugsim_core::PersistenceError>(())
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonGraphLoader;

impl GraphLoader for JsonGraphLoader {
    fn load(&self, path: &Path) -> Result<WeightedGraph, PersistenceError> {
        let reader = BufReader::new(File::open(path)?);
        let record: GraphRecord = serde_json::from_reader(reader)?;

        let mut graph = WeightedGraph::new();
        for node in 0..record.nodes {
            graph.add_node(node);
        }
        for (u, v, w) in record.edges {
            graph.add_edge(u, v, w)?;
        }
        Ok(graph)
    }
}

/// One materialized or registered edge inside a [`Snapshot`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    /// Smaller endpoint of the canonical pair.
    pub u: usize,
    /// Larger endpoint of the canonical pair.
    pub v: usize,
    /// Current median weight; absent while every judgement abstained.
    pub weight: Option<f64>,
    /// Full judgement history, abstentions included.
    pub history: Vec<Judgement>,
}

/// Verbatim state of an annotated graph at a checkpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Progress clock at capture time.
    pub judgement_count: u64,
    /// Size of the node universe.
    pub nodes: usize,
    /// Every registered pair with its history and current weight.
    pub edges: Vec<EdgeSnapshot>,
    /// Cluster label per node, `-1` for unplaced nodes.
    pub labels: Vec<i64>,
    /// Current partition as member lists in cluster-id order.
    pub communities: Vec<Vec<usize>>,
}

impl Snapshot {
    /// Captures the complete current state of an annotated graph.
    #[must_use]
    pub fn capture(annotated: &AnnotatedGraph) -> Self {
        let edges = annotated
            .registered_pairs()
            .map(|(u, v)| EdgeSnapshot {
                u,
                v,
                weight: annotated.get_edge(u, v),
                history: annotated
                    .judgement_history(u, v)
                    .map(<[Judgement]>::to_vec)
                    .unwrap_or_default(),
            })
            .collect();
        Self {
            judgement_count: annotated.judgement_count(),
            nodes: annotated.max_nodes(),
            edges,
            labels: annotated.labels().to_vec(),
            communities: annotated.community_nodes().values().cloned().collect(),
        }
    }
}

/// Receives annotated-graph snapshots at checkpoints.
pub trait SnapshotSink: Send {
    /// Persists one snapshot.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] when the snapshot cannot be written.
    fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// One row of checkpoint metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Progress clock at evaluation time.
    pub judgement_count: u64,
    /// Metric values keyed by column name.
    pub values: BTreeMap<String, f64>,
}

/// Receives metric rows at checkpoints.
pub trait MetricSink: Send {
    /// Appends one row to the tabular output.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] when the row cannot be written.
    fn write_row(&mut self, row: &MetricRow) -> Result<(), PersistenceError>;
}

/// Writes snapshots as JSON lines.
#[derive(Debug)]
pub struct JsonLinesSnapshotSink<W: Write + Send> {
    writer: W,
}

impl JsonLinesSnapshotSink<BufWriter<File>> {
    /// Creates (or truncates) a snapshot file at `path`.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] when the file cannot be created.
    pub fn create(path: &Path) -> Result<Self, PersistenceError> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl<W: Write + Send> JsonLinesSnapshotSink<W> {
    /// Wraps an arbitrary writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> SnapshotSink for JsonLinesSnapshotSink<W> {
    fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes metric rows as JSON lines.
#[derive(Debug)]
pub struct JsonLinesMetricSink<W: Write + Send> {
    writer: W,
}

impl JsonLinesMetricSink<BufWriter<File>> {
    /// Creates (or truncates) a metric file at `path`.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] when the file cannot be created.
    pub fn create(path: &Path) -> Result<Self, PersistenceError> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl<W: Write + Send> JsonLinesMetricSink<W> {
    /// Wraps an arbitrary writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> MetricSink for JsonLinesMetricSink<W> {
    fn write_row(&mut self, row: &MetricRow) -> Result<(), PersistenceError> {
        serde_json::to_writer(&mut self.writer, row)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps metric rows in memory; intended for tests and ad-hoc inspection.
#[derive(Clone, Debug, Default)]
pub struct MemoryMetricSink {
    rows: Vec<MetricRow>,
}

impl MemoryMetricSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows collected so far, in arrival order.
    #[must_use]
    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }
}

impl MetricSink for MemoryMetricSink {
    fn write_row(&mut self, row: &MetricRow) -> Result<(), PersistenceError> {
        self.rows.push(row.clone());
        Ok(())
    }
}
