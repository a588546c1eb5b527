//! Simulated annotators.
//!
//! An annotator turns the true weight of an edge into a (possibly noisy)
//! Likert judgement: with some probability it abstains, otherwise it draws an
//! integer error from a configured distribution, applies it with a sign
//! policy, and clamps the result into the output range. A pair absent from
//! the ground truth is always a non-comparison and yields an abstention.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution, Poisson};

use crate::error::{Result, WugError};
use crate::judgement::Judgement;

/// Integer-valued noise source for annotator errors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorDistribution {
    /// Poisson-distributed error magnitude with the given mean.
    Poisson {
        /// Mean error magnitude; must be strictly positive.
        lambda: f64,
    },
    /// Binomially-distributed error magnitude.
    Binomial {
        /// Number of trials.
        trials: u64,
        /// Per-trial success probability.
        p: f64,
    },
}

/// How the drawn error magnitude is applied to the rounded true weight.
///
/// The direction of annotator error is ambiguous in the field data, so it is
/// a configuration knob rather than a fixed rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorSign {
    /// Flip a fair coin for the sign, then clamp into the output range.
    #[default]
    FairCoin,
    /// Push the judgement toward the nearer end of the output range,
    /// breaking ties with a fair coin.
    TowardNearerBound,
}

/// Configures and constructs [`Annotator`] instances.
///
/// # Examples
/// ```
/// use wugsim_core::{AnnotatorBuilder, ErrorDistribution};
///
/// let annotator = AnnotatorBuilder::new()
///     .with_range(1, 4)
///     .with_distribution(ErrorDistribution::Poisson { lambda: 0.35 })
///     .with_missing_probability(0.1)
///     .with_seed(7)
///     .build()
///     .expect("configuration is valid");
/// assert_eq!(annotator.range(), (1, 4));
/// ```
#[derive(Clone, Debug)]
pub struct AnnotatorBuilder {
    lo: i64,
    hi: i64,
    p_missing: f64,
    distribution: ErrorDistribution,
    sign: ErrorSign,
    seed: u64,
}

impl Default for AnnotatorBuilder {
    fn default() -> Self {
        Self {
            lo: 1,
            hi: 4,
            p_missing: 0.0,
            distribution: ErrorDistribution::Poisson { lambda: 0.35 },
            sign: ErrorSign::FairCoin,
            seed: 0,
        }
    }
}

impl AnnotatorBuilder {
    /// Creates a builder populated with the conventional 1–4 Likert range.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the inclusive output range.
    #[must_use]
    pub fn with_range(mut self, lo: i64, hi: i64) -> Self {
        self.lo = lo;
        self.hi = hi;
        self
    }

    /// Overrides the abstention probability.
    #[must_use]
    pub fn with_missing_probability(mut self, p_missing: f64) -> Self {
        self.p_missing = p_missing;
        self
    }

    /// Overrides the error distribution.
    #[must_use]
    pub fn with_distribution(mut self, distribution: ErrorDistribution) -> Self {
        self.distribution = distribution;
        self
    }

    /// Overrides the error sign policy.
    #[must_use]
    pub fn with_sign(mut self, sign: ErrorSign) -> Self {
        self.sign = sign;
        self
    }

    /// Seeds the annotator's private random stream.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration and constructs an [`Annotator`].
    ///
    /// # Errors
    /// Returns [`WugError::EmptyJudgementRange`] for an inverted range,
    /// [`WugError::ProbabilityOutOfRange`] for probabilities outside `[0, 1]`,
    /// and [`WugError::NonPositiveRate`] for a non-positive Poisson mean.
    pub fn build(self) -> Result<Annotator> {
        if self.lo > self.hi {
            return Err(WugError::EmptyJudgementRange {
                lo: self.lo,
                hi: self.hi,
            });
        }
        if !(0.0..=1.0).contains(&self.p_missing) {
            return Err(WugError::ProbabilityOutOfRange {
                name: "p_missing",
                got: self.p_missing,
            });
        }
        let noise = match self.distribution {
            ErrorDistribution::Poisson { lambda } => {
                if lambda <= 0.0 {
                    return Err(WugError::NonPositiveRate { got: lambda });
                }
                Noise::Poisson(
                    Poisson::new(lambda).map_err(|_| WugError::NonPositiveRate { got: lambda })?,
                )
            }
            ErrorDistribution::Binomial { trials, p } => {
                if !(0.0..=1.0).contains(&p) {
                    return Err(WugError::ProbabilityOutOfRange {
                        name: "binomial_p",
                        got: p,
                    });
                }
                Noise::Binomial(
                    Binomial::new(trials, p).map_err(|_| WugError::ProbabilityOutOfRange {
                        name: "binomial_p",
                        got: p,
                    })?,
                )
            }
        };
        Ok(Annotator {
            lo: self.lo,
            hi: self.hi,
            p_missing: self.p_missing,
            noise,
            sign: self.sign,
            rng: SmallRng::seed_from_u64(self.seed),
        })
    }
}

#[derive(Clone, Debug)]
enum Noise {
    Poisson(Poisson<f64>),
    Binomial(Binomial),
}

impl Noise {
    fn sample(&self, rng: &mut SmallRng) -> i64 {
        match self {
            Self::Poisson(poisson) => poisson.sample(rng).round() as i64,
            Self::Binomial(binomial) => binomial.sample(rng) as i64,
        }
    }
}

/// Produces judgements for true edge weights.
///
/// Owns its random stream; two annotators built with the same seed and
/// configuration produce identical judgement sequences.
#[derive(Clone, Debug)]
pub struct Annotator {
    lo: i64,
    hi: i64,
    p_missing: f64,
    noise: Noise,
    sign: ErrorSign,
    rng: SmallRng,
}

impl Annotator {
    /// Inclusive output range of this annotator.
    #[must_use]
    pub fn range(&self) -> (i64, i64) {
        (self.lo, self.hi)
    }

    /// Abstention probability.
    #[must_use]
    pub fn missing_probability(&self) -> f64 {
        self.p_missing
    }

    /// Judges one edge given its true weight.
    ///
    /// `None` (the pair is not comparable in the ground truth) always yields
    /// [`Judgement::Missing`]. Otherwise the annotator abstains with its
    /// configured probability, or rounds the truth, applies a signed error
    /// draw, and clamps into the output range.
    pub fn judge(&mut self, truth: Option<f64>) -> Judgement {
        let Some(truth) = truth else {
            return Judgement::Missing;
        };
        if self.p_missing > 0.0 && self.rng.gen_bool(self.p_missing) {
            return Judgement::Missing;
        }

        let base = truth.round() as i64;
        let error = self.noise.sample(&mut self.rng);
        let negative = match self.sign {
            ErrorSign::FairCoin => self.rng.gen_bool(0.5),
            ErrorSign::TowardNearerBound => match (base - self.lo).cmp(&(self.hi - base)) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => self.rng.gen_bool(0.5),
            },
        };
        let judged = if negative { base - error } else { base + error };
        Judgement::Value(judged.clamp(self.lo, self.hi) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator(p_missing: f64, seed: u64) -> Annotator {
        AnnotatorBuilder::new()
            .with_missing_probability(p_missing)
            .with_seed(seed)
            .build()
            .expect("valid configuration")
    }

    #[test]
    fn non_comparable_pairs_always_abstain() {
        let mut annotator = annotator(0.0, 1);
        assert!(annotator.judge(None).is_missing());
    }

    #[test]
    fn certain_abstention_never_judges() {
        let mut annotator = annotator(1.0, 2);
        for _ in 0..32 {
            assert!(annotator.judge(Some(3.0)).is_missing());
        }
    }

    #[test]
    fn judgements_stay_within_the_output_range() {
        let mut annotator = AnnotatorBuilder::new()
            .with_distribution(ErrorDistribution::Poisson { lambda: 2.0 })
            .with_seed(3)
            .build()
            .expect("valid configuration");
        for truth in [1.0, 2.0, 3.0, 4.0] {
            for _ in 0..64 {
                let judged = annotator.judge(Some(truth)).value().expect("no abstention");
                assert!((1.0..=4.0).contains(&judged));
                assert_eq!(judged.fract(), 0.0);
            }
        }
    }

    #[test]
    fn same_seed_replays_the_same_judgements() {
        let mut left = annotator(0.3, 11);
        let mut right = annotator(0.3, 11);
        for _ in 0..64 {
            assert_eq!(left.judge(Some(2.0)), right.judge(Some(2.0)));
        }
    }

    #[test]
    fn inverted_range_fails_fast() {
        let err = AnnotatorBuilder::new()
            .with_range(4, 1)
            .build()
            .expect_err("inverted range");
        assert_eq!(err, WugError::EmptyJudgementRange { lo: 4, hi: 1 });
    }

    #[test]
    fn out_of_range_probability_fails_fast() {
        let err = AnnotatorBuilder::new()
            .with_missing_probability(1.5)
            .build()
            .expect_err("invalid probability");
        assert_eq!(err.code(), crate::error::WugErrorCode::ProbabilityOutOfRange);
    }

    #[test]
    fn non_positive_rate_fails_fast() {
        let err = AnnotatorBuilder::new()
            .with_distribution(ErrorDistribution::Poisson { lambda: 0.0 })
            .build()
            .expect_err("invalid rate");
        assert_eq!(err, WugError::NonPositiveRate { got: 0.0 });
    }
}
