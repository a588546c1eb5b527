//! Error types for the wugsim core library.
//!
//! Defines the error enum exposed by the public API and a convenient result
//! alias. Recoverable conditions (empty sampling pools, non-comparable edges)
//! are absorbed inside the strategy that encounters them and never surface
//! here; only configuration mistakes and broken invariants do.

use std::fmt;

use thiserror::Error;

/// Stable codes describing [`WugError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum WugErrorCode {
    /// A judgement range was empty or inverted.
    EmptyJudgementRange,
    /// A probability parameter fell outside `[0, 1]`.
    ProbabilityOutOfRange,
    /// A distribution rate parameter was not strictly positive.
    NonPositiveRate,
    /// A fraction parameter fell outside `[0, 1]`.
    FractionOutOfRange,
    /// A count parameter that must be positive was zero.
    ZeroCount,
    /// The multi-cluster size threshold was below two.
    MultiClusterSizeTooSmall,
    /// The maximum sense count left no cluster counts to search.
    SenseLimitTooSmall,
    /// A convergence window cannot hold fewer than two observations.
    WindowTooSmall,
    /// An edge endpoint referenced a node outside the graph.
    NodeOutOfBounds,
    /// A judgement was recorded against a self-loop.
    SelfLoop,
    /// A simulation was built without a sampler.
    MissingSampler,
    /// A simulation was built without any annotator.
    NoAnnotators,
    /// Splitting non-evidence clusters changed the node set.
    ClusterSplitMismatch,
}

impl WugErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyJudgementRange => "WUG_EMPTY_JUDGEMENT_RANGE",
            Self::ProbabilityOutOfRange => "WUG_PROBABILITY_OUT_OF_RANGE",
            Self::NonPositiveRate => "WUG_NON_POSITIVE_RATE",
            Self::FractionOutOfRange => "WUG_FRACTION_OUT_OF_RANGE",
            Self::ZeroCount => "WUG_ZERO_COUNT",
            Self::MultiClusterSizeTooSmall => "WUG_MULTI_CLUSTER_SIZE_TOO_SMALL",
            Self::SenseLimitTooSmall => "WUG_SENSE_LIMIT_TOO_SMALL",
            Self::WindowTooSmall => "WUG_WINDOW_TOO_SMALL",
            Self::NodeOutOfBounds => "WUG_NODE_OUT_OF_BOUNDS",
            Self::SelfLoop => "WUG_SELF_LOOP",
            Self::MissingSampler => "WUG_MISSING_SAMPLER",
            Self::NoAnnotators => "WUG_NO_ANNOTATORS",
            Self::ClusterSplitMismatch => "WUG_CLUSTER_SPLIT_MISMATCH",
        }
    }
}

impl fmt::Display for WugErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type produced when configuring or running a simulation.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum WugError {
    /// A judgement range was empty or inverted.
    #[error("judgement range [{lo}, {hi}] is empty")]
    EmptyJudgementRange { lo: i64, hi: i64 },
    /// A probability parameter fell outside `[0, 1]`.
    #[error("`{name}` must lie in [0, 1] (got {got})")]
    ProbabilityOutOfRange { name: &'static str, got: f64 },
    /// A distribution rate parameter was not strictly positive.
    #[error("distribution rate must be strictly positive (got {got})")]
    NonPositiveRate { got: f64 },
    /// A fraction parameter fell outside `[0, 1]`.
    #[error("`{name}` must lie in [0, 1] (got {got})")]
    FractionOutOfRange { name: &'static str, got: f64 },
    /// A count parameter that must be positive was zero.
    #[error("`{name}` must be at least 1")]
    ZeroCount { name: &'static str },
    /// The multi-cluster size threshold was below two.
    #[error("min_multi_cluster_size must be at least 2 (got {got})")]
    MultiClusterSizeTooSmall { got: usize },
    /// The maximum sense count left no cluster counts to search.
    #[error("max_senses must be at least 2 (got {got})")]
    SenseLimitTooSmall { got: usize },
    /// A convergence window cannot hold fewer than two observations.
    #[error("convergence window must hold at least 2 observations (got {got})")]
    WindowTooSmall { got: usize },
    /// An edge endpoint referenced a node outside the graph.
    #[error("node {node} is out of bounds for a graph of {node_count} nodes")]
    NodeOutOfBounds { node: usize, node_count: usize },
    /// A judgement was recorded against a self-loop.
    #[error("cannot judge the pair ({node}, {node}); self-loops carry no similarity")]
    SelfLoop { node: usize },
    /// A simulation was built without a sampler.
    #[error("a simulation requires a sampler")]
    MissingSampler,
    /// A simulation was built without any annotator.
    #[error("a simulation requires at least one annotator")]
    NoAnnotators,
    /// Splitting non-evidence clusters changed the node set.
    #[error("cluster split changed the node set: {expected} nodes in, {got} nodes out")]
    ClusterSplitMismatch { expected: usize, got: usize },
}

impl WugError {
    /// Retrieve the stable [`WugErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> WugErrorCode {
        match self {
            Self::EmptyJudgementRange { .. } => WugErrorCode::EmptyJudgementRange,
            Self::ProbabilityOutOfRange { .. } => WugErrorCode::ProbabilityOutOfRange,
            Self::NonPositiveRate { .. } => WugErrorCode::NonPositiveRate,
            Self::FractionOutOfRange { .. } => WugErrorCode::FractionOutOfRange,
            Self::ZeroCount { .. } => WugErrorCode::ZeroCount,
            Self::MultiClusterSizeTooSmall { .. } => WugErrorCode::MultiClusterSizeTooSmall,
            Self::SenseLimitTooSmall { .. } => WugErrorCode::SenseLimitTooSmall,
            Self::WindowTooSmall { .. } => WugErrorCode::WindowTooSmall,
            Self::NodeOutOfBounds { .. } => WugErrorCode::NodeOutOfBounds,
            Self::SelfLoop { .. } => WugErrorCode::SelfLoop,
            Self::MissingSampler => WugErrorCode::MissingSampler,
            Self::NoAnnotators => WugErrorCode::NoAnnotators,
            Self::ClusterSplitMismatch { .. } => WugErrorCode::ClusterSplitMismatch,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, WugError>;
