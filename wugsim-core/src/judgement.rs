//! Judgement values produced by annotators.
//!
//! A judgement is either a numeric similarity rating on a Likert scale or an
//! explicit abstention. The abstention is a tagged variant rather than a NaN
//! sentinel so it cannot silently propagate through arithmetic.

use serde::{Deserialize, Serialize};

/// Midpoint of the 1–4 Likert scale; soft weights re-centre around it so the
/// sign of a weight encodes agreement versus disagreement.
pub const LIKERT_MIDPOINT: f64 = 2.5;

/// One annotator's rating of one edge.
///
/// # Examples
/// ```
/// use wugsim_core::Judgement;
///
/// assert_eq!(Judgement::Value(3.0).value(), Some(3.0));
/// assert!(Judgement::Missing.is_missing());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Judgement {
    /// A numeric similarity rating, typically on a `{1, 2, 3, 4}` scale.
    Value(f64),
    /// The annotator abstained; the pair was judged non-comparable.
    Missing,
}

impl Judgement {
    /// Returns the numeric rating, or `None` for an abstention.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(value),
            Self::Missing => None,
        }
    }

    /// Returns whether the annotator abstained.
    #[must_use]
    pub const fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<f64> for Judgement {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}
